//! FHIR R4 conformance models
//!
//! Partial models of the resources profile packages are made of

pub mod bundle;
pub mod code_system;
pub mod element_definition;
pub mod error;
pub mod naming_system;
pub mod structure_definition;
pub mod value_set;

// Re-export commonly used types
pub use bundle::*;
pub use code_system::*;
pub use element_definition::*;
pub use error::{Error, Result};
pub use naming_system::*;
pub use structure_definition::*;
pub use value_set::*;
