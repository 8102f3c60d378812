//! Configuration schema types
//!
//! This module defines the pipeline configuration structure that maps to the
//! TOML file. Job-specific destinations live in
//! [`ExportTarget`](crate::domain::ExportTarget), not here.

use serde::{Deserialize, Serialize};

/// One mebibyte
pub const MIB: u64 = 1024 * 1024;

/// Smallest part size object storage accepts for non-final multipart parts
pub const MIN_PART_SIZE_BYTES: u64 = 5 * MIB;

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Walk and scheduling settings
    #[serde(default)]
    pub export: ExportSettings,

    /// Chunked upload settings
    #[serde(default)]
    pub upload: UploadConfig,

    /// S3-compatible endpoint settings
    #[serde(default)]
    pub storage: S3Config,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.export.validate()?;
        self.upload.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Walk and scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Entities requested per store page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Entity count at which output files rotate
    #[serde(default = "default_rotation_threshold")]
    pub rotation_threshold: u64,

    /// Minimum wall-clock gap between heartbeats, in milliseconds
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Delay between scheduling and the earliest run, in milliseconds
    #[serde(default = "default_schedule_grace_ms")]
    pub schedule_grace_ms: u64,

    /// Parent directory for scratch files (system temp dir when unset)
    #[serde(default)]
    pub scratch_dir: Option<String>,
}

impl ExportSettings {
    fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 || self.page_size > 1000 {
            return Err(format!(
                "export.page_size must be between 1 and 1000, got {}",
                self.page_size
            ));
        }

        if self.rotation_threshold == 0 {
            return Err("export.rotation_threshold must be greater than 0".to_string());
        }

        if self.heartbeat_interval_ms == 0 {
            return Err("export.heartbeat_interval_ms must be greater than 0".to_string());
        }

        if self.schedule_grace_ms > 60_000 {
            return Err(format!(
                "export.schedule_grace_ms must be at most 60000, got {}",
                self.schedule_grace_ms
            ));
        }

        if let Some(dir) = &self.scratch_dir {
            if dir.trim().is_empty() {
                return Err("export.scratch_dir cannot be empty when set".to_string());
            }
        }

        Ok(())
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            rotation_threshold: default_rotation_threshold(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            schedule_grace_ms: default_schedule_grace_ms(),
            scratch_dir: None,
        }
    }
}

/// Chunked upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Single-shot threshold and multipart part size, in bytes
    #[serde(default = "default_part_size_bytes")]
    pub part_size_bytes: u64,

    /// Largest file a multipart upload may carry, in bytes
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
}

impl UploadConfig {
    fn validate(&self) -> Result<(), String> {
        if self.part_size_bytes < MIN_PART_SIZE_BYTES {
            return Err(format!(
                "upload.part_size_bytes must be at least {} bytes, got {}",
                MIN_PART_SIZE_BYTES, self.part_size_bytes
            ));
        }

        if self.max_size_bytes < self.part_size_bytes {
            return Err(format!(
                "upload.max_size_bytes ({}) must not be smaller than upload.part_size_bytes ({})",
                self.max_size_bytes, self.part_size_bytes
            ));
        }

        Ok(())
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            part_size_bytes: default_part_size_bytes(),
            max_size_bytes: default_max_size_bytes(),
        }
    }
}

/// S3-compatible endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Endpoint base URL; requests use path-style addressing
    #[serde(default = "default_s3_endpoint")]
    pub endpoint: String,

    /// Signing region
    #[serde(default = "default_s3_region")]
    pub region: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl S3Config {
    fn validate(&self) -> Result<(), String> {
        if self.endpoint.is_empty() {
            return Err("storage.endpoint cannot be empty".to_string());
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err("storage.endpoint must start with http:// or https://".to_string());
        }

        if self.region.trim().is_empty() {
            return Err("storage.region cannot be empty".to_string());
        }

        if self.timeout_seconds == 0 {
            return Err("storage.timeout_seconds must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: default_s3_endpoint(),
            region: default_s3_region(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write JSON logs to rolling files
    #[serde(default)]
    pub local_enabled: bool,

    /// Log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Rotation policy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_page_size() -> usize {
    250
}

fn default_rotation_threshold() -> u64 {
    1000
}

fn default_heartbeat_interval_ms() -> u64 {
    5000
}

fn default_schedule_grace_ms() -> u64 {
    250
}

fn default_part_size_bytes() -> u64 {
    5 * MIB
}

fn default_max_size_bytes() -> u64 {
    50 * MIB
}

fn default_s3_endpoint() -> String {
    "https://s3.amazonaws.com".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_local_path() -> String {
    "/var/log/entity-export".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.export.page_size, 250);
        assert_eq!(config.export.rotation_threshold, 1000);
        assert_eq!(config.export.heartbeat_interval_ms, 5000);
        assert_eq!(config.export.schedule_grace_ms, 250);
        assert_eq!(config.upload.part_size_bytes, 5 * MIB);
        assert_eq!(config.upload.max_size_bytes, 50 * MIB);
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_export_settings_validation() {
        let mut settings = ExportSettings::default();
        settings.page_size = 0;
        assert!(settings.validate().is_err());

        settings.page_size = 250;
        settings.rotation_threshold = 0;
        assert!(settings.validate().is_err());

        settings.rotation_threshold = 1000;
        settings.scratch_dir = Some("  ".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_upload_config_rejects_small_parts() {
        let config = UploadConfig {
            part_size_bytes: MIB,
            max_size_bytes: 50 * MIB,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_upload_config_rejects_ceiling_below_part_size() {
        let config = UploadConfig {
            part_size_bytes: 5 * MIB,
            max_size_bytes: 4 * MIB,
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("max_size_bytes"));
    }

    #[test]
    fn test_s3_config_validation() {
        let mut config = S3Config::default();
        assert!(config.validate().is_ok());

        config.endpoint = "s3.amazonaws.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_rotation_validation() {
        let mut config = LoggingConfig::default();
        config.local_rotation = "weekly".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: PipelineConfig = toml::from_str("[application]\nlog_level = \"debug\"\n").unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.export.page_size, 250);
        assert_eq!(config.storage.region, "us-east-1");
    }
}
