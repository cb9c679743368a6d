//! FHIR serialization helpers.
//!
//! Documents arrive as JSON or XML. This crate detects the serialization,
//! decodes either form into one generic `serde_json::Value` tree and encodes a
//! tree back to either form. The XML mapping follows the HL7 FHIR rules:
//! - Root element uses the `resourceType` name.
//! - Primitive values are encoded with the `value` attribute.
//! - Primitive metadata (`id`, `extension`) is carried through `_field` entries.
//! - Repeated elements become arrays; a single element stays a scalar.
//! - Inline resources (`Bundle.entry.resource`, `contained`) are wrapped in an
//!   element named after their `resourceType`.

mod decode;
mod encode;

pub use decode::xml_to_value;
pub use encode::value_to_xml;

use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub(crate) const FHIR_NS: &str = "http://hl7.org/fhir";
pub(crate) const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Deepest element nesting accepted when decoding XML, matching `serde_json`'s recursion limit
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("content is empty")]
    Empty,
    #[error("content is neither JSON nor XML")]
    UnknownEncoding,
    #[error("expected a JSON object for the resource")]
    ExpectedObject,
    #[error("missing resourceType property")]
    MissingResourceType,
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("XML nesting exceeds {0} levels")]
    TooDeep(usize),
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FormatError>;

/// Supported serializations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingType {
    Json,
    Xml,
}

impl EncodingType {
    /// Detect the serialization from the first meaningful character
    pub fn detect(content: &str) -> Option<Self> {
        match strip_bom(content).trim_start().chars().next() {
            Some('{') => Some(Self::Json),
            Some('<') => Some(Self::Xml),
            _ => None,
        }
    }

    /// Usual file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }
}

impl fmt::Display for EncodingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("JSON"),
            Self::Xml => f.write_str("XML"),
        }
    }
}

/// Remove a leading UTF-8 byte order mark
pub fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

/// Decode raw bytes: strip the BOM and require UTF-8
pub fn decode_bytes(bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Parse a resource in either serialization into a generic tree
pub fn parse_resource(content: &str) -> Result<Value> {
    let content = strip_bom(content);
    if content.trim().is_empty() {
        return Err(FormatError::Empty);
    }
    match EncodingType::detect(content) {
        Some(EncodingType::Json) => {
            let value: Value = serde_json::from_str(content)?;
            if !value.is_object() {
                return Err(FormatError::ExpectedObject);
            }
            Ok(value)
        }
        Some(EncodingType::Xml) => xml_to_value(content),
        None => Err(FormatError::UnknownEncoding),
    }
}

/// Encode a generic resource tree in the requested serialization
pub fn encode(resource: &Value, encoding: EncodingType) -> Result<String> {
    match encoding {
        EncodingType::Json => Ok(serde_json::to_string_pretty(resource)?),
        EncodingType::Xml => value_to_xml(resource),
    }
}

/// Convert a FHIR JSON payload into its XML representation.
pub fn json_to_xml(input: &str) -> Result<String> {
    let value: Value = serde_json::from_str(input)?;
    value_to_xml(&value)
}

/// Convert a FHIR XML payload into its JSON representation.
pub fn xml_to_json(input: &str) -> Result<String> {
    let value = xml_to_value(input)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// The `resourceType` of a decoded tree
pub fn resource_type(resource: &Value) -> Option<&str> {
    resource.get("resourceType").and_then(Value::as_str)
}
