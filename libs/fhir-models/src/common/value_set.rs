//! FHIR ValueSet model

use super::error::{Error, Result};
use crate::serde_helpers::{one_or_many, opt_string_lenient, string_lenient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// FHIR ValueSet resource
///
/// A set of codes drawn from one or more code systems.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueSet {
    /// Resource type - always "ValueSet"
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

    /// Content logical definition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compose: Option<ValueSetCompose>,

    /// Used when the value set is expanded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expansion: Option<ValueSetExpansion>,

    /// Additional content
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

fn default_resource_type() -> String {
    "ValueSet".to_string()
}

/// Content logical definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ValueSetCompose {
    /// Include one or more codes from a code system or other value set(s)
    #[serde(default, deserialize_with = "one_or_many")]
    pub include: Vec<ValueSetInclude>,

    /// Explicitly exclude codes from a code system or other value sets
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<ValueSetInclude>,
}

/// Include or exclude codes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetInclude {
    /// The system the codes come from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Specific version of the code system referred to
    #[serde(
        default,
        deserialize_with = "opt_string_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,

    /// A concept defined in the system
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub concept: Vec<ValueSetConcept>,

    /// Select codes/concepts by their properties
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Value>,

    /// Select the contents included in this value set
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub value_set: Vec<String>,
}

/// A concept defined in the system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueSetConcept {
    /// Code or expression from system
    #[serde(deserialize_with = "string_lenient")]
    pub code: String,

    /// Text to display for this code for this value set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Expansion of a value set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ValueSetExpansion {
    /// Codes in the value set
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<ValueSetExpansionContains>,
}

/// Codes in an expansion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueSetExpansionContains {
    /// System value for the code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Code - if blank, this is not a selectable code
    #[serde(
        default,
        deserialize_with = "opt_string_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<String>,

    /// Codes contained under this entry
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<ValueSetExpansionContains>,
}

impl ValueSet {
    /// Create a ValueSet including whole code systems
    pub fn including_systems<I, S>(url: impl Into<String>, systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource_type: "ValueSet".to_string(),
            id: None,
            url: url.into(),
            version: None,
            name: None,
            status: Some("active".to_string()),
            compose: Some(ValueSetCompose {
                include: systems
                    .into_iter()
                    .map(|system| ValueSetInclude {
                        system: Some(system.into()),
                        ..Default::default()
                    })
                    .collect(),
                exclude: Vec::new(),
            }),
            expansion: None,
            extensions: HashMap::new(),
        }
    }

    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        let vs: Self = serde_json::from_value(value.clone())?;
        if vs.resource_type != "ValueSet" {
            return Err(Error::UnexpectedResourceType {
                expected: "ValueSet",
                found: vs.resource_type,
            });
        }
        Ok(vs)
    }

    /// Include components of the compose definition
    pub fn includes(&self) -> &[ValueSetInclude] {
        self.compose
            .as_ref()
            .map(|c| c.include.as_slice())
            .unwrap_or_default()
    }

    /// Exclude components of the compose definition
    pub fn excludes(&self) -> &[ValueSetInclude] {
        self.compose
            .as_ref()
            .map(|c| c.exclude.as_slice())
            .unwrap_or_default()
    }

    /// Check whether an expansion lists the (system, code) pair
    pub fn expansion_contains(&self, system: Option<&str>, code: &str) -> bool {
        fn walk(items: &[ValueSetExpansionContains], system: Option<&str>, code: &str) -> bool {
            items.iter().any(|c| {
                let system_ok = match (system, c.system.as_deref()) {
                    (Some(s), Some(cs)) => s == cs,
                    _ => true,
                };
                (system_ok && c.code.as_deref() == Some(code)) || walk(&c.contains, system, code)
            })
        }
        self.expansion
            .as_ref()
            .is_some_and(|e| walk(&e.contains, system, code))
    }
}

impl ValueSetInclude {
    /// Whether the component includes every code of its system
    pub fn is_whole_system(&self) -> bool {
        self.system.is_some()
            && self.concept.is_empty()
            && self.filter.is_empty()
            && self.value_set.is_empty()
    }

    /// Check whether the component explicitly enumerates the code
    pub fn lists_code(&self, code: &str) -> bool {
        self.concept.iter().any(|c| c.code == code)
    }
}
