//! Error types for profile resolution

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Input does not contain a version: {0}")]
    MissingVersion(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Profile version {version} is not known for {family}")]
    UnknownVersion { family: String, version: String },

    #[error("Unable to determine a profile version for {family} valid on {date}")]
    NoDefaultVersion { family: String, date: NaiveDate },
}

pub type Result<T> = std::result::Result<T, ProfileError>;
