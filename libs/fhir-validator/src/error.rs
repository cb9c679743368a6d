use thiserror::Error;

/// Errors that abort building a validator
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Profile(#[from] erx_profiles::ProfileError),

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid message filter '{pattern}': {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unable to load resources for {profile}: {source}")]
    Store {
        profile: String,
        #[source]
        source: erx_context::Error,
    },

    #[error("profile {0} is configured more than once")]
    DuplicateProfile(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failures inside a validation call. Never returned to callers of the
/// orchestrator; they end up as an ERROR issue of the outcome.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("unable to decode content: {0}")]
    Decode(#[from] erx_format::FormatError),

    #[error("validation engine panicked: {0}")]
    Panic(String),

    #[error("validation engine lock is poisoned")]
    LockPoisoned,
}

/// Errors while deriving a snapshot from a differential
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("StructureDefinition {0} has neither snapshot nor differential")]
    MissingDifferential(String),

    #[error("StructureDefinition {0} has no baseDefinition")]
    MissingBaseDefinition(String),

    #[error("base StructureDefinition {0} not found")]
    BaseNotFound(String),

    #[error("circular baseDefinition reference while generating {0}")]
    Circular(String),

    #[error("no snapshot generator available for {0}")]
    NoGenerator(String),
}
