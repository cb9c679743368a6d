//! Error types for conformance payload models

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("expected a {expected} payload, got resourceType '{found}'")]
    UnexpectedResourceType { expected: &'static str, found: String },

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
