//! FHIR NamingSystem model
//!
//! Identifier systems. In R4 a NamingSystem has no `url`; profile packages key
//! them by their unique ids.

use super::error::{Error, Result};
use crate::serde_helpers::{one_or_many, opt_bool_lenient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// FHIR NamingSystem resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NamingSystem {
    /// Resource type - always "NamingSystem"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// Logical id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Canonical identifier (R5 style, present in some packages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Name (computer friendly)
    #[serde(default)]
    pub name: String,

    /// Publication status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// codesystem | identifier | root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Unique identifiers used for the system
    #[serde(default, deserialize_with = "one_or_many")]
    pub unique_id: Vec<NamingSystemUniqueId>,

    /// Additional content
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

fn default_resource_type() -> String {
    "NamingSystem".to_string()
}

/// Unique identifier of a naming system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamingSystemUniqueId {
    /// oid | uuid | uri | other
    #[serde(rename = "type")]
    pub id_type: String,

    /// The unique identifier
    pub value: String,

    /// Is this the id that should be used for this type
    #[serde(
        default,
        deserialize_with = "opt_bool_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub preferred: Option<bool>,
}

impl NamingSystem {
    /// Create a naming system identified by a single uri
    pub fn with_uri(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            resource_type: "NamingSystem".to_string(),
            id: None,
            url: None,
            name: name.into(),
            status: Some("active".to_string()),
            kind: Some("identifier".to_string()),
            unique_id: vec![NamingSystemUniqueId {
                id_type: "uri".to_string(),
                value: uri.into(),
                preferred: Some(true),
            }],
            extensions: HashMap::new(),
        }
    }

    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        let ns: Self = serde_json::from_value(value.clone())?;
        if ns.resource_type != "NamingSystem" {
            return Err(Error::UnexpectedResourceType {
                expected: "NamingSystem",
                found: ns.resource_type,
            });
        }
        Ok(ns)
    }

    /// The URL this naming system is known by: first unique id, else `url`
    pub fn canonical_url(&self) -> Option<&str> {
        self.unique_id
            .first()
            .map(|id| id.value.as_str())
            .or(self.url.as_deref())
    }

    /// Check whether the given system string names this naming system
    pub fn identifies(&self, system: &str) -> bool {
        self.unique_id.iter().any(|id| id.value == system) || self.url.as_deref() == Some(system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unique_id_keys_naming_system() {
        let ns = NamingSystem::from_value(&json!({
            "resourceType": "NamingSystem",
            "name": "GEM_ERP_NS_PrescriptionId",
            "status": "active",
            "kind": "identifier",
            "uniqueId": { "type": "uri", "value": "https://gematik.de/fhir/erp/NamingSystem/GEM_ERP_NS_PrescriptionId" }
        }))
        .unwrap();

        assert_eq!(
            ns.canonical_url(),
            Some("https://gematik.de/fhir/erp/NamingSystem/GEM_ERP_NS_PrescriptionId")
        );
        assert!(ns.identifies("https://gematik.de/fhir/erp/NamingSystem/GEM_ERP_NS_PrescriptionId"));
    }

    #[test]
    fn test_url_fallback() {
        let mut ns = NamingSystem::with_uri("x", "urn:x");
        ns.unique_id.clear();
        ns.url = Some("http://example.org/ns".to_string());
        assert_eq!(ns.canonical_url(), Some("http://example.org/ns"));
    }
}
