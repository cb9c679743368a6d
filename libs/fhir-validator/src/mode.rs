//! Validator modes: how strictly non-error findings are treated

use crate::outcome::{IssueSeverity, ValidationIssue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorMode {
    /// Severities as reported by the engine
    #[default]
    Normal,
    /// Information becomes warning, warning becomes error
    Strict,
    /// Information and warning become error
    Pedantic,
}

impl ValidatorMode {
    pub fn lift(&self, severity: IssueSeverity) -> IssueSeverity {
        use crate::outcome::IssueSeverity::*;
        match (self, severity) {
            (_, Fatal) | (_, Error) | (Self::Normal, _) => severity,
            (Self::Strict, Warning) => Error,
            (Self::Strict, Information) => Warning,
            (Self::Pedantic, _) => Error,
        }
    }

    pub fn apply(&self, issues: &mut [ValidationIssue]) {
        if *self == Self::Normal {
            return;
        }
        for issue in issues {
            issue.severity = self.lift(issue.severity);
        }
    }
}

impl fmt::Display for ValidatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Strict => "strict",
            Self::Pedantic => "pedantic",
        })
    }
}

impl FromStr for ValidatorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "strict" => Ok(Self::Strict),
            "pedantic" => Ok(Self::Pedantic),
            other => Err(format!("unknown validator mode: {}", other)),
        }
    }
}
