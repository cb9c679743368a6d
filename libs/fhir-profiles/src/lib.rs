//! Profile families, versions and the canonical catalog of the e-prescription
//! FHIR profiles.
//!
//! A [`ProfileFamily`] owns a set of canonical URL namespaces and a closed list
//! of [`ProfileVersion`]s, each with a validity window. The [`catalog`] names
//! the structural contracts, code systems and naming systems published by each
//! family.
//!
//! ```
//! use erx_profiles::{ProfileFamily, VersionedProfile};
//! use chrono::NaiveDate;
//!
//! let family = ProfileFamily::resolve_by_name("de.gematik.erezept-workflow.r4").unwrap();
//! assert_eq!(family, ProfileFamily::ErpWorkflow);
//!
//! let on = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
//! let profile = VersionedProfile::resolve("de.gematik.erezept-workflow.r4", None, on).unwrap();
//! assert_eq!(profile.version.to_string(), "1.4.0");
//! ```

pub mod canonical;
pub mod catalog;
pub mod error;
pub mod family;
pub mod version;

pub use catalog::{
    resource_type_hint, AbdaErpPkvStructDef, CanonicalEntry, DeBasisCodeSystem,
    DeBasisNamingSystem, ErpWorkflowCodeSystem, ErpWorkflowLegacyStructDef,
    ErpWorkflowNamingSystem, ErpWorkflowStructDef, FixedStructDef, KbvItaErpStructDef,
    KbvItaForStructDef, PatientBillingCodeSystem, PatientBillingStructDef, StructureEntry,
};
pub use error::{ProfileError, Result};
pub use family::{ProfileFamily, VersionedProfile};
pub use version::{KnownVersion, ProfileVersion};
