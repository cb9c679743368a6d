//! Validation results

use serde_json::Value;
use std::fmt;

/// Result of validating one document
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub resource_type: Option<String>,
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    pub fn success(resource_type: Option<String>) -> Self {
        Self {
            resource_type,
            valid: true,
            issues: Vec::new(),
        }
    }

    /// An outcome whose validity follows from the issues
    pub fn from_issues(resource_type: Option<String>, issues: Vec<ValidationIssue>) -> Self {
        let valid = !issues.iter().any(ValidationIssue::is_error);
        Self {
            resource_type,
            valid,
            issues,
        }
    }

    /// A failed validation call: one ERROR issue carrying the description
    pub fn failure(resource_type: Option<String>, description: impl Into<String>) -> Self {
        Self {
            resource_type,
            valid: false,
            issues: vec![ValidationIssue::error(IssueCode::Exception, description.into())],
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.valid
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.count(IssueSeverity::Warning)
    }

    pub fn information_count(&self) -> usize {
        self.count(IssueSeverity::Information)
    }

    fn count(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Recompute `valid` after issues were changed
    pub fn refresh_validity(&mut self) {
        self.valid = !self.issues.iter().any(ValidationIssue::is_error);
    }

    pub fn to_operation_outcome(&self) -> Value {
        serde_json::json!({
            "resourceType": "OperationOutcome",
            "issue": self.issues.iter().map(|i| i.to_json()).collect::<Vec<_>>()
        })
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({} error(s), {} warning(s))",
            if self.valid { "valid" } else { "invalid" },
            self.error_count(),
            self.warning_count()
        )?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

/// A single validation message
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: IssueCode,
    pub diagnostics: String,
    pub location: Option<String>,
    pub expression: Option<Vec<String>>,
}

impl ValidationIssue {
    pub fn new(severity: IssueSeverity, code: IssueCode, diagnostics: String) -> Self {
        Self {
            severity,
            code,
            diagnostics,
            location: None,
            expression: None,
        }
    }

    pub fn error(code: IssueCode, diagnostics: String) -> Self {
        Self::new(IssueSeverity::Error, code, diagnostics)
    }

    pub fn warning(code: IssueCode, diagnostics: String) -> Self {
        Self::new(IssueSeverity::Warning, code, diagnostics)
    }

    pub fn information(code: IssueCode, diagnostics: String) -> Self {
        Self::new(IssueSeverity::Information, code, diagnostics)
    }

    pub fn with_location(mut self, location: String) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_expression(mut self, expression: Vec<String>) -> Self {
        self.expression = Some(expression);
        self
    }

    /// Location and expression both point at `path`
    pub fn at(self, path: &str) -> Self {
        self.with_location(path.to_string())
            .with_expression(vec![path.to_string()])
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, IssueSeverity::Error | IssueSeverity::Fatal)
    }

    /// Move the issue below `prefix`, replacing the leading resource type of
    /// its location (`Task.id` below `Bundle.entry[0].resource` becomes
    /// `Bundle.entry[0].resource.id`)
    pub fn nested_under(mut self, prefix: &str) -> Self {
        fn rebase(path: &str, prefix: &str) -> String {
            match path.split_once('.') {
                Some((_, rest)) => format!("{}.{}", prefix, rest),
                None => prefix.to_string(),
            }
        }

        self.location = Some(match self.location.as_deref() {
            Some(location) => rebase(location, prefix),
            None => prefix.to_string(),
        });
        if let Some(expression) = self.expression.as_mut() {
            for path in expression.iter_mut() {
                *path = rebase(path, prefix);
            }
        }
        self
    }

    fn to_json(&self) -> Value {
        let mut issue = serde_json::json!({
            "severity": self.severity.code(),
            "code": self.code.to_string(),
            "diagnostics": self.diagnostics,
        });

        if let Some(ref loc) = self.location {
            issue["location"] = serde_json::json!([loc]);
        }

        if let Some(ref expr) = self.expression {
            issue["expression"] = serde_json::json!(expr);
        }

        issue
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(
                f,
                "[{}] {} @ {}: {}",
                self.severity, self.code, location, self.diagnostics
            ),
            None => write!(f, "[{}] {}: {}", self.severity, self.code, self.diagnostics),
        }
    }
}

/// Ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueSeverity {
    Information,
    Warning,
    Error,
    Fatal,
}

impl IssueSeverity {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "information",
        }
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal => write!(f, "FATAL"),
            Self::Error => write!(f, "ERROR"),
            Self::Warning => write!(f, "WARNING"),
            Self::Information => write!(f, "INFORMATION"),
        }
    }
}

/// The OperationOutcome issue types the engine reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCode {
    Invalid,
    Structure,
    Required,
    Value,
    Processing,
    NotSupported,
    NotFound,
    CodeInvalid,
    Exception,
    Informational,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Invalid => "invalid",
            Self::Structure => "structure",
            Self::Required => "required",
            Self::Value => "value",
            Self::Processing => "processing",
            Self::NotSupported => "not-supported",
            Self::NotFound => "not-found",
            Self::CodeInvalid => "code-invalid",
            Self::Exception => "exception",
            Self::Informational => "informational",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_counts() {
        let outcome = ValidationOutcome::from_issues(
            Some("Task".to_string()),
            vec![
                ValidationIssue::error(IssueCode::Required, "Missing required field".to_string()),
                ValidationIssue::warning(IssueCode::Value, "Deprecated code".to_string()),
                ValidationIssue::information(IssueCode::Informational, "Unchecked".to_string()),
            ],
        );

        assert!(!outcome.valid);
        assert!(outcome.has_errors());
        assert_eq!(outcome.error_count(), 1);
        assert_eq!(outcome.warning_count(), 1);
        assert_eq!(outcome.information_count(), 1);
    }

    #[test]
    fn test_failure_outcome() {
        let outcome = ValidationOutcome::failure(None, "boom");
        assert!(!outcome.valid);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].severity, IssueSeverity::Error);
        assert_eq!(outcome.issues[0].diagnostics, "boom");
    }

    #[test]
    fn test_operation_outcome_conversion() {
        let outcome = ValidationOutcome::from_issues(
            Some("Task".to_string()),
            vec![ValidationIssue::error(IssueCode::Required, "for is required".to_string())
                .at("Task.for")],
        );

        let op_outcome = outcome.to_operation_outcome();
        assert_eq!(op_outcome["resourceType"], "OperationOutcome");
        assert_eq!(op_outcome["issue"][0]["severity"], "error");
        assert_eq!(op_outcome["issue"][0]["code"], "required");
        assert_eq!(op_outcome["issue"][0]["location"][0], "Task.for");
    }

    #[test]
    fn test_nested_under() {
        let issue = ValidationIssue::error(IssueCode::Value, "x".to_string())
            .at("Task.intent")
            .nested_under("Bundle.entry[2].resource");
        assert_eq!(issue.location.as_deref(), Some("Bundle.entry[2].resource.intent"));
        assert_eq!(
            issue.expression,
            Some(vec!["Bundle.entry[2].resource.intent".to_string()])
        );

        let rootless = ValidationIssue::error(IssueCode::Value, "x".to_string())
            .nested_under("Bundle.entry[0].resource");
        assert_eq!(rootless.location.as_deref(), Some("Bundle.entry[0].resource"));
    }

    #[test]
    fn test_severity_order() {
        assert!(IssueSeverity::Information < IssueSeverity::Warning);
        assert!(IssueSeverity::Error < IssueSeverity::Fatal);
    }
}
