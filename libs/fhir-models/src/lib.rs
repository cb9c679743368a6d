//! Typed FHIR conformance payloads
//!
//! This crate provides the strongly-typed structures the profile validation
//! engine loads from profile packages: StructureDefinitions (with their
//! ElementDefinitions), CodeSystems, ValueSets and NamingSystems.
//!
//! # Design
//!
//! - **Partial models**: only the fields the engine reads are typed, everything
//!   else is kept in the flattened `extensions` map
//! - **Lenient decoding**: payloads converted from XML carry single items instead
//!   of one-element arrays and numbers where JSON has strings; the `serde_helpers`
//!   deserializers accept both shapes
//!
//! # Example
//!
//! ```rust
//! use erx_models::common::{StructureDefinition, StructureDefinitionKind};
//! use serde_json::json;
//!
//! let sd: StructureDefinition = serde_json::from_value(json!({
//!     "resourceType": "StructureDefinition",
//!     "url": "https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Task",
//!     "version": "1.4",
//!     "name": "GEM_ERP_PR_Task",
//!     "status": "active",
//!     "kind": "resource",
//!     "abstract": false,
//!     "type": "Task"
//! }))
//! .unwrap();
//!
//! assert_eq!(sd.type_, "Task");
//! assert_eq!(sd.kind, StructureDefinitionKind::Resource);
//! ```

pub mod common;
pub mod serde_helpers;

pub use common::*;
