//! Conformance resource access for versioned profiles
//!
//! Loads the StructureDefinitions and terminology resources of one profile
//! generation through a [`PayloadLoader`] into an immutable
//! [`ProfileResourceStore`].

pub mod error;
pub mod loader;
pub mod store;

pub use error::{Error, Result};
pub use loader::{FileSystemLoader, InMemoryLoader, PayloadLoader};
pub use store::{
    ConformanceResource, MatchPrecision, ProfileResourceStore, ResourceKind, StoreMatch,
};
