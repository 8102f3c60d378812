//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - human-readable console output
//! - optional JSON log files with daily or hourly rotation
//! - `RUST_LOG` filtering, falling back to the configured level
//!
//! # Example
//!
//! ```no_run
//! use entity_export::config::LoggingConfig;
//! use entity_export::logging::init_logging;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(job_id = "1b4e28ba-2fa1-11d2-883f-0016d3cca427", "Export job scheduled");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};
