//! FHIR Bundle model
//!
//! Only the container shape is typed; entry resources stay generic JSON so the
//! engine can walk them without knowing their concrete type.

use super::error::{Error, Result};
use crate::serde_helpers::one_or_many;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// FHIR Bundle resource
///
/// A container for a collection of resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Resource type - always "Bundle"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// Logical id of this artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Purpose of this bundle; `None` when absent or not a known code
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_bundle_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub bundle_type: Option<BundleType>,

    /// Entry in the bundle - will have a resource or information
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,

    /// Additional content beyond core fields
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

fn default_resource_type() -> String {
    "Bundle".to_string()
}

fn lenient_bundle_type<'de, D>(deserializer: D) -> std::result::Result<Option<BundleType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(BundleType::from_code))
}

/// Type of Bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    /// A set of resources composing a single coherent document
    Document,
    /// A message (application/response or application/request)
    Message,
    /// A transaction - intended to be processed atomically
    Transaction,
    /// Response to a transaction
    TransactionResponse,
    /// A set of independent actions
    Batch,
    /// Response to a batch
    BatchResponse,
    /// A list of resources with history
    History,
    /// Results of a search operation
    Searchset,
    /// A set of resources collected for a specific purpose
    Collection,
}

impl BundleType {
    /// Look up a bundle type by its code; unknown codes yield `None`
    pub fn from_code(code: &str) -> Option<Self> {
        let ty = match code.trim() {
            "document" => Self::Document,
            "message" => Self::Message,
            "transaction" => Self::Transaction,
            "transaction-response" => Self::TransactionResponse,
            "batch" => Self::Batch,
            "batch-response" => Self::BatchResponse,
            "history" => Self::History,
            "searchset" => Self::Searchset,
            "collection" => Self::Collection,
            _ => return None,
        };
        Some(ty)
    }

    /// The code of this bundle type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Message => "message",
            Self::Transaction => "transaction",
            Self::TransactionResponse => "transaction-response",
            Self::Batch => "batch",
            Self::BatchResponse => "batch-response",
            Self::History => "history",
            Self::Searchset => "searchset",
            Self::Collection => "collection",
        }
    }
}

impl fmt::Display for BundleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Entry in the bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    /// Full URL for the entry (relative to the base URL, or absolute)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    /// A resource in this bundle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    /// Additional content beyond core fields (request, response, search)
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

impl Bundle {
    /// Create a new Bundle of the given type
    pub fn new(bundle_type: BundleType) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            id: None,
            bundle_type: Some(bundle_type),
            entry: Vec::new(),
            extensions: HashMap::new(),
        }
    }

    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        let bundle: Self = serde_json::from_value(value.clone())?;
        if bundle.resource_type != "Bundle" {
            return Err(Error::UnexpectedResourceType {
                expected: "Bundle",
                found: bundle.resource_type,
            });
        }
        Ok(bundle)
    }

    /// Convert to JSON Value
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::from)
    }

    /// Check if this is a collection bundle
    pub fn is_collection(&self) -> bool {
        self.bundle_type == Some(BundleType::Collection)
    }

    /// Check if this is a search result bundle
    pub fn is_searchset(&self) -> bool {
        self.bundle_type == Some(BundleType::Searchset)
    }

    /// Resources of all entries, in document order
    pub fn resources(&self) -> impl Iterator<Item = &Value> {
        self.entry.iter().filter_map(|e| e.resource.as_ref())
    }

    /// Add a resource as a new entry
    pub fn add_resource(&mut self, full_url: Option<String>, resource: Value) {
        self.entry.push(BundleEntry {
            full_url,
            resource: Some(resource),
            extensions: HashMap::new(),
        });
    }
}
