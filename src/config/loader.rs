//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::PipelineConfig;
use crate::domain::errors::ExportError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Loads a `.env` file from the working directory, if one exists
/// 2. Reads the TOML file
/// 3. Performs environment variable substitution (`${VAR}` syntax)
/// 4. Parses the TOML into [`PipelineConfig`]
/// 5. Applies environment variable overrides (`ENTITY_EXPORT_*` prefix)
/// 6. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use entity_export::config::loader::load_config;
///
/// let config = load_config("entity-export.toml").expect("Failed to load config");
/// assert!(config.upload.part_size_bytes >= 5 * 1024 * 1024);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();

    dotenvy::dotenv().ok();

    if !path.exists() {
        return Err(ExportError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ExportError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: PipelineConfig = toml::from_str(&contents)
        .map_err(|e| ExportError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        ExportError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are copied through untouched. Every missing variable is
/// reported in a single error.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ExportError::Configuration(format!("Invalid placeholder pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed = processed.replace(&format!("${{{}}}", var_name), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed);
    }

    if !missing_vars.is_empty() {
        return Err(ExportError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Applies environment variable overrides using the `ENTITY_EXPORT_` prefix
///
/// Variables follow the pattern `ENTITY_EXPORT_<SECTION>_<KEY>`, for example
/// `ENTITY_EXPORT_UPLOAD_MAX_SIZE_BYTES`. Unparseable numbers are ignored.
fn apply_env_overrides(config: &mut PipelineConfig) {
    if let Ok(val) = std::env::var("ENTITY_EXPORT_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Export overrides
    if let Some(size) = env_parse("ENTITY_EXPORT_EXPORT_PAGE_SIZE") {
        config.export.page_size = size;
    }
    if let Some(threshold) = env_parse("ENTITY_EXPORT_EXPORT_ROTATION_THRESHOLD") {
        config.export.rotation_threshold = threshold;
    }
    if let Some(interval) = env_parse("ENTITY_EXPORT_EXPORT_HEARTBEAT_INTERVAL_MS") {
        config.export.heartbeat_interval_ms = interval;
    }
    if let Some(grace) = env_parse("ENTITY_EXPORT_EXPORT_SCHEDULE_GRACE_MS") {
        config.export.schedule_grace_ms = grace;
    }
    if let Ok(val) = std::env::var("ENTITY_EXPORT_EXPORT_SCRATCH_DIR") {
        config.export.scratch_dir = Some(val);
    }

    // Upload overrides
    if let Some(size) = env_parse("ENTITY_EXPORT_UPLOAD_PART_SIZE_BYTES") {
        config.upload.part_size_bytes = size;
    }
    if let Some(size) = env_parse("ENTITY_EXPORT_UPLOAD_MAX_SIZE_BYTES") {
        config.upload.max_size_bytes = size;
    }

    // Storage overrides
    if let Ok(val) = std::env::var("ENTITY_EXPORT_STORAGE_ENDPOINT") {
        config.storage.endpoint = val;
    }
    if let Ok(val) = std::env::var("ENTITY_EXPORT_STORAGE_REGION") {
        config.storage.region = val;
    }
    if let Some(timeout) = env_parse("ENTITY_EXPORT_STORAGE_TIMEOUT_SECONDS") {
        config.storage.timeout_seconds = timeout;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("ENTITY_EXPORT_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("ENTITY_EXPORT_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("ENTITY_EXPORT_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }
}
