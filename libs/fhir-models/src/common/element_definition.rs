//! FHIR ElementDefinition model
//!
//! Elements of StructureDefinition snapshots and differentials. `fixed[x]` and
//! `pattern[x]` are polymorphic, so they stay in the flattened `extensions` map
//! and are looked up through [`ElementDefinition::fixed_value`] and
//! [`ElementDefinition::pattern_value`].

use super::error::{Error, Result};
use crate::serde_helpers::{one_or_many, opt_bool_lenient, opt_string_lenient, opt_u32_lenient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// FHIR ElementDefinition - defines an element in a resource structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    /// Unique id for inter-element referencing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Path of the element in the hierarchy (e.g., "Task.identifier")
    pub path: String,

    /// Name for this particular element (in a slice)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice_name: Option<String>,

    /// Minimum cardinality
    #[serde(
        default,
        deserialize_with = "opt_u32_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub min: Option<u32>,

    /// Maximum cardinality (can be "*")
    #[serde(
        default,
        deserialize_with = "opt_string_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub max: Option<String>,

    /// Data type and profile for this element
    #[serde(
        rename = "type",
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub types: Vec<ElementDefinitionType>,

    /// ValueSet details if this is coded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<ElementDefinitionBinding>,

    /// This element is sliced - slices follow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slicing: Option<Value>,

    /// If this element must be supported
    #[serde(
        default,
        deserialize_with = "opt_bool_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub must_support: Option<bool>,

    /// Additional content beyond core fields (fixed[x], pattern[x], constraints, ...)
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

/// Data type for an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinitionType {
    /// Data type code
    #[serde(deserialize_with = "crate::serde_helpers::string_lenient")]
    pub code: String,

    /// Profiles (StructureDefinition canonical URLs) that apply
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<String>,

    /// Profiles for Reference/canonical target types
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub target_profile: Vec<String>,
}

/// Binding of a coded element to a ValueSet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinitionBinding {
    /// How strongly the value set is bound
    pub strength: BindingStrength,

    /// Human explanation of the value set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Canonical URL of the bound value set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_set: Option<String>,
}

/// Binding strength (required | extensible | preferred | example)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Required,
    Extensible,
    Preferred,
    Example,
}

/// Snapshot - the complete set of elements of a structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "one_or_many")]
    pub element: Vec<ElementDefinition>,
}

/// Differential - the elements that differ from the base definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Differential {
    #[serde(default, deserialize_with = "one_or_many")]
    pub element: Vec<ElementDefinition>,
}

impl Snapshot {
    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    /// Find an unsliced element by path
    pub fn get_element(&self, path: &str) -> Option<&ElementDefinition> {
        self.element
            .iter()
            .find(|e| e.path == path && e.slice_name.is_none())
    }

    /// Direct, unsliced children of the given path in snapshot order
    pub fn get_children(&self, parent_path: &str) -> Vec<&ElementDefinition> {
        self.element
            .iter()
            .filter(|e| e.parent_path().as_deref() == Some(parent_path) && !e.is_slice())
            .collect()
    }
}

impl ElementDefinition {
    /// Create a bare element with the given path and cardinality
    pub fn new(path: impl Into<String>, min: u32, max: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: Some(path.clone()),
            path,
            min: Some(min),
            max: Some(max.into()),
            ..Default::default()
        }
    }

    /// Get the key for this element (path:sliceName for slices, just path otherwise)
    pub fn key(&self) -> String {
        if let Some(ref slice_name) = self.slice_name {
            format!("{}:{}", self.path, slice_name)
        } else {
            self.path.clone()
        }
    }

    /// Check if this element has a slice name, or is nested below a slice
    pub fn is_slice(&self) -> bool {
        self.slice_name.is_some() || self.id.as_deref().is_some_and(|id| id.contains(':'))
    }

    /// Get the parent path (everything before the last '.')
    pub fn parent_path(&self) -> Option<String> {
        self.path.rfind('.').map(|pos| self.path[..pos].to_string())
    }

    /// Last path segment, without the `[x]` choice marker
    pub fn name(&self) -> &str {
        let last = self.path.rsplit('.').next().unwrap_or(&self.path);
        last.strip_suffix("[x]").unwrap_or(last)
    }

    /// Check if this is a choice type element (ends with [x])
    pub fn is_choice_type(&self) -> bool {
        self.path.ends_with("[x]")
    }

    /// Get type codes for this element
    pub fn type_codes(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.code.as_str()).collect()
    }

    /// Upper bound of the cardinality; `None` means unbounded
    pub fn max_cardinality(&self) -> Option<u32> {
        match self.max.as_deref() {
            None | Some("*") => None,
            Some(m) => m.parse::<u32>().ok(),
        }
    }

    /// Check if the element is prohibited (max = 0)
    pub fn is_prohibited(&self) -> bool {
        self.max_cardinality() == Some(0)
    }

    /// Get the cardinality as a string (e.g., "0..1", "1..*")
    pub fn cardinality_string(&self) -> String {
        let min = self.min.unwrap_or(0);
        let max = self.max.as_deref().unwrap_or("*");
        format!("{}..{}", min, max)
    }

    /// The `fixed[x]` constraint as (property name, value)
    pub fn fixed_value(&self) -> Option<(&str, &Value)> {
        self.prefixed_value("fixed")
    }

    /// The `pattern[x]` constraint as (property name, value)
    pub fn pattern_value(&self) -> Option<(&str, &Value)> {
        self.prefixed_value("pattern")
    }

    fn prefixed_value(&self, prefix: &str) -> Option<(&str, &Value)> {
        let mut keys: Vec<&String> = self
            .extensions
            .keys()
            .filter(|k| {
                k.strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
            })
            .collect();
        keys.sort();
        keys.first()
            .and_then(|k| self.extensions.get_key_value(k.as_str()))
            .map(|(k, v)| (k.as_str(), v))
    }
}
