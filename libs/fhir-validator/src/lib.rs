//! Version-aware validation of e-prescription FHIR resources
//!
//! Decides which of several concurrently supported profile versions a document
//! claims, and validates it against the catalog of structural and terminology
//! contracts of exactly that version.
//!
//! # Architecture
//!
//! ```text
//! ValidatorConfig (YAML / builder)
//!        │ compile()
//!        ▼
//! ValidationPlan ──► ProfileValidator
//!                     ├─ ProfileResourceStore per versioned profile
//!                     ├─ SupportChain (stores, base definitions, terminology,
//!                     │                snapshot generation, unchecked systems)
//!                     └─ Mutex<InstanceValidator>
//! ```
//!
//! # Example
//!
//! ```rust
//! use erx_validator::{ProfileConfig, ValidatorConfig, ValidatorMode};
//!
//! let plan = ValidatorConfig::builder()
//!     .mode(ValidatorMode::Strict)
//!     .profile(ProfileConfig::new("de.gematik.erezept-workflow.r4", Some("1.4.0")))
//!     .unchecked_code_system("http://fhir.de/CodeSystem/ifa/pzn")
//!     .build()
//!     .compile()
//!     .unwrap();
//!
//! assert_eq!(plan.profiles.len(), 1);
//! assert_eq!(plan.profiles[0].profile.to_string(), "de.gematik.erezept-workflow.r4|1.4.0");
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod mode;
pub mod orchestrator;
pub mod outcome;
pub mod plan;
pub mod support;

pub use config::{ProfileConfig, ValidatorConfig, ValidatorConfigBuilder, ValidatorKind};
pub use engine::InstanceValidator;
pub use error::{ConfigError, SnapshotError, ValidatorError};
pub use extractor::{extract_profile, is_unprofiled_searchset};
pub use mode::ValidatorMode;
pub use orchestrator::{build_validator, AcceptAllValidator, ProfileValidator, ResourceValidator};
pub use outcome::{IssueCode, IssueSeverity, ValidationIssue, ValidationOutcome};
pub use plan::{ProfilePlan, ValidationPlan};
pub use support::{CodeValidation, SupportChain, ValidationSupport};
