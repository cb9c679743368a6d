//! FHIR StructureDefinition model
//!
//! Structural contracts: profiles on resources and the base resource definitions
//! they derive from.

use super::element_definition::{Differential, ElementDefinition, Snapshot};
use super::error::{Error, Result};
use crate::serde_helpers::{opt_bool_lenient, opt_string_lenient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// FHIR StructureDefinition resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructureDefinition {
    /// Resource type - always "StructureDefinition"
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
    #[serde(default)]
    pub name: String,

    /// Publication status (draft | active | retired | unknown)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// primitive-type | complex-type | resource | logical
    pub kind: StructureDefinitionKind,

    /// Whether the structure is abstract
    #[serde(
        rename = "abstract",
        default,
        deserialize_with = "opt_bool_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_abstract: Option<bool>,

    /// Type defined or constrained by this structure
    #[serde(rename = "type")]
    pub type_: String,

    /// Definition that this type is constrained/specialized from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_definition: Option<String>,

    /// specialization | constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation: Option<TypeDerivationRule>,

    /// Snapshot view of the structure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,

    /// Differential view of the structure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differential: Option<Differential>,

    /// Additional content beyond core fields
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

fn default_resource_type() -> String {
    "StructureDefinition".to_string()
}

/// Kind of structure being defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructureDefinitionKind {
    PrimitiveType,
    ComplexType,
    Resource,
    Logical,
}

/// How a type relates to its base definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDerivationRule {
    Specialization,
    Constraint,
}

impl StructureDefinition {
    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        let sd: Self = serde_json::from_value(value.clone())?;
        if sd.resource_type != "StructureDefinition" {
            return Err(Error::UnexpectedResourceType {
                expected: "StructureDefinition",
                found: sd.resource_type,
            });
        }
        Ok(sd)
    }

    /// Canonical URL including the business version, if any
    pub fn versioned_url(&self) -> String {
        match &self.version {
            Some(v) => format!("{}|{}", self.url, v),
            None => self.url.clone(),
        }
    }

    /// Whether a non-empty snapshot is present
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| !s.element.is_empty())
    }

    /// Snapshot elements, empty if there is no snapshot
    pub fn snapshot_elements(&self) -> &[ElementDefinition] {
        self.snapshot
            .as_ref()
            .map(|s| s.element.as_slice())
            .unwrap_or_default()
    }

    /// Differential elements, empty if there is no differential
    pub fn differential_elements(&self) -> &[ElementDefinition] {
        self.differential
            .as_ref()
            .map(|d| d.element.as_slice())
            .unwrap_or_default()
    }

    /// Check if this is a constraint on another structure (a profile)
    pub fn is_constraint(&self) -> bool {
        self.derivation == Some(TypeDerivationRule::Constraint)
    }
}
