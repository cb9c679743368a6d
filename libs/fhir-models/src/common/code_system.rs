//! FHIR CodeSystem model

use super::error::{Error, Result};
use crate::serde_helpers::{one_or_many, opt_bool_lenient, opt_string_lenient, string_lenient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// FHIR CodeSystem resource
///
/// Declares the existence of and describes a code system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeSystem {
    /// Resource type - always "CodeSystem"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// Logical id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Canonical identifier
    pub url: String,

    /// Business version
    #[serde(
        default,
        deserialize_with = "opt_string_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,

    /// Name (computer friendly)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Publication status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// If code comparison is case sensitive
    #[serde(
        default,
        deserialize_with = "opt_bool_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub case_sensitive: Option<bool>,

    /// Content type (not-present | example | fragment | complete | supplement)
    #[serde(default)]
    pub content: CodeSystemContentMode,

    /// Concepts in the code system
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub concept: Vec<CodeSystemConcept>,

    /// Additional content
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

fn default_resource_type() -> String {
    "CodeSystem".to_string()
}

/// Content mode for a code system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CodeSystemContentMode {
    NotPresent,
    Example,
    Fragment,
    #[default]
    Complete,
    Supplement,
}

/// Concept in the code system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeSystemConcept {
    /// Code that identifies the concept
    #[serde(deserialize_with = "string_lenient")]
    pub code: String,

    /// Text to display to the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    /// Child concepts (nested hierarchy)
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub concept: Vec<CodeSystemConcept>,
}

impl CodeSystem {
    /// Create a new complete CodeSystem with the given flat list of codes
    pub fn new<I, S>(url: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource_type: "CodeSystem".to_string(),
            id: None,
            url: url.into(),
            version: None,
            name: None,
            status: Some("active".to_string()),
            case_sensitive: None,
            content: CodeSystemContentMode::Complete,
            concept: codes
                .into_iter()
                .map(|code| CodeSystemConcept {
                    code: code.into(),
                    display: None,
                    concept: Vec::new(),
                })
                .collect(),
            extensions: HashMap::new(),
        }
    }

    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        let cs: Self = serde_json::from_value(value.clone())?;
        if cs.resource_type != "CodeSystem" {
            return Err(Error::UnexpectedResourceType {
                expected: "CodeSystem",
                found: cs.resource_type,
            });
        }
        Ok(cs)
    }

    /// Whether the concept list is authoritative for code membership
    pub fn is_enumerated(&self) -> bool {
        matches!(self.content, CodeSystemContentMode::Complete) && !self.concept.is_empty()
    }

    /// Find a code anywhere in the (possibly nested) concept hierarchy
    pub fn find_concept(&self, code: &str) -> Option<&CodeSystemConcept> {
        let case_sensitive = self.case_sensitive.unwrap_or(true);
        find_in(&self.concept, code, case_sensitive)
    }

    /// Check if the code system defines the code
    pub fn contains_code(&self, code: &str) -> bool {
        self.find_concept(code).is_some()
    }

    /// Total number of concepts including nested ones
    pub fn concept_count(&self) -> usize {
        fn count(concepts: &[CodeSystemConcept]) -> usize {
            concepts.iter().map(|c| 1 + count(&c.concept)).sum()
        }
        count(&self.concept)
    }
}

fn find_in<'a>(
    concepts: &'a [CodeSystemConcept],
    code: &str,
    case_sensitive: bool,
) -> Option<&'a CodeSystemConcept> {
    for concept in concepts {
        let hit = if case_sensitive {
            concept.code == code
        } else {
            concept.code.eq_ignore_ascii_case(code)
        };
        if hit {
            return Some(concept);
        }
        if let Some(found) = find_in(&concept.concept, code, case_sensitive) {
            return Some(found);
        }
    }
    None
}
