//! Domain error types
//!
//! This module defines the error hierarchy for the export pipeline.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main export error type
///
/// This is the primary error type used throughout the pipeline. The variants
/// map onto the failure classes a job can end in: bad input, a missing
/// organization, an upload failure, an oversized file, or a store read failure.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Export target was missing or malformed; nothing is scheduled
    #[error("Invalid export configuration: {0}")]
    InvalidConfig(String),

    /// The export target carries no organization identifier
    #[error("No organization could be found")]
    MissingOrganization,

    /// Object storage rejected or failed a transfer
    #[error("Upload failed: {0}")]
    Upload(#[from] StorageError),

    /// A file exceeded the configured upload ceiling
    #[error("File {key} exceeds the upload limit: {written} bytes written, limit is {limit} bytes")]
    OversizedFile { key: String, written: u64, limit: u64 },

    /// The entity store could not be read
    #[error("Entity store error: {0}")]
    Store(#[from] StoreError),

    /// A job state change that would move the job backwards
    #[error("Invalid job state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// No job record with the given id exists
    #[error("Export job not found: {0}")]
    JobNotFound(String),

    /// The external scheduler refused the job
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Pipeline configuration errors (TOML, validation)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl ExportError {
    /// Whether the error is scoped to one collection and should not stop the walk
    pub fn is_collection_local(&self) -> bool {
        matches!(self, ExportError::Store(StoreError::QueryRejected { .. }))
    }
}

/// Entity store errors
///
/// Errors raised by the backing entity store while walking an application.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Application id does not resolve to a store
    #[error("Application not found: {0}")]
    ApplicationNotFound(String),

    /// The store refused the query for one collection
    #[error("Query rejected for collection '{collection}': {message}")]
    QueryRejected { collection: String, message: String },

    /// A page or dictionary read failed
    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// Failed to reach the store
    #[error("Failed to connect to entity store: {0}")]
    ConnectionFailed(String),
}

/// Object storage errors
///
/// Errors raised while talking to the destination object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to reach the storage endpoint
    #[error("Failed to connect to object storage: {0}")]
    ConnectionFailed(String),

    /// Credentials were refused
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Non-success response
    #[error("Request failed: {status} - {message}")]
    RequestFailed { status: u16, message: String },

    /// Response could not be interpreted
    #[error("Invalid response from object storage: {0}")]
    InvalidResponse(String),

    /// Local file access failed during a transfer
    #[error("I/O error during transfer: {0}")]
    Io(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ExportError {
    fn from(err: toml::de::Error) -> Self {
        ExportError::Configuration(format!("TOML parse error: {err}"))
    }
}
