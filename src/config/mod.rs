//! Configuration management for the export pipeline.
//!
//! This module provides TOML-based configuration loading, parsing, and
//! validation for the settings shared by every export run. Per-job settings
//! (bucket, credentials, organization) travel in an
//! [`ExportTarget`](crate::domain::ExportTarget) instead.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use entity_export::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("entity-export.toml")?;
//!
//! println!("Page size: {}", config.export.page_size);
//! println!("Upload ceiling: {} bytes", config.upload.max_size_bytes);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`ExportSettings`] - Page size, rotation threshold, heartbeat interval, scheduling grace
//! - [`UploadConfig`] - Multipart part size and upload ceiling
//! - [`S3Config`] - S3-compatible endpoint and region
//! - [`LoggingConfig`] - Rolling JSON log files
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [export]
//! page_size = 250
//! rotation_threshold = 1000
//! heartbeat_interval_ms = 5000
//!
//! [upload]
//! part_size_bytes = 5242880
//! max_size_bytes = 52428800
//!
//! [storage]
//! endpoint = "${S3_ENDPOINT}"
//! region = "us-east-1"
//! ```
//!
//! # Environment Variables
//!
//! `${VAR_NAME}` placeholders are substituted from the environment (a `.env`
//! file is read first). Any key can also be overridden directly with
//! `ENTITY_EXPORT_<SECTION>_<KEY>`:
//!
//! ```bash
//! export ENTITY_EXPORT_UPLOAD_MAX_SIZE_BYTES=104857600
//! export ENTITY_EXPORT_STORAGE_ENDPOINT="http://localhost:9000"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, ExportSettings, LoggingConfig, PipelineConfig, S3Config, UploadConfig,
    MIB, MIN_PART_SIZE_BYTES,
};
pub use secret::{secret_string, SecretString, SecretValue};
