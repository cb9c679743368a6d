//! Error types for resource stores and payload loaders

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Source payload not found: {0}")]
    PayloadNotFound(String),

    #[error("Unable to decode source payload {location}: {message}")]
    UndecodablePayload { location: String, message: String },

    #[error("Invalid conformance resource in {location}: {source}")]
    InvalidResource {
        location: String,
        #[source]
        source: erx_models::Error,
    },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
