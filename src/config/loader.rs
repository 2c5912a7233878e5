//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{Environment, TelemetryConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Log endpoint override.
pub const LOGGING_ENDPOINT_VAR: &str = "NEXT_PUBLIC_LOGGING_ENDPOINT";
/// Error monitoring endpoint override.
pub const ERROR_MONITORING_ENDPOINT_VAR: &str = "NEXT_PUBLIC_ERROR_MONITORING_ENDPOINT";
/// Environment override.
pub const ENVIRONMENT_VAR: &str = "NODE_ENV";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment: {0}")]
    Environment(String),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Fields missing from the file take the defaults of the environment the
/// file declares (or `NODE_ENV`), then environment variables are applied.
pub fn load_config(path: &Path) -> Result<TelemetryConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content, |key| std::env::var(key).ok())?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build a validated configuration purely from environment variables.
pub fn from_env() -> Result<TelemetryConfig, ConfigError> {
    let config = config_from_vars(|key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn config_from_vars<F>(var: F) -> Result<TelemetryConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let environment = match non_empty(var(ENVIRONMENT_VAR)) {
        Some(raw) => raw.parse().map_err(ConfigError::Environment)?,
        None => Environment::default(),
    };
    let mut config = TelemetryConfig::for_environment(environment);
    apply_env_overrides(&mut config, &var);
    Ok(config)
}

/// Parse TOML text layered over environment-specific defaults.
pub(crate) fn parse_config<F>(content: &str, var: F) -> Result<TelemetryConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let file: toml::Table = toml::from_str(content)?;

    let environment = match file.get("environment").and_then(|v| v.as_str()) {
        Some(raw) => raw.parse().map_err(ConfigError::Environment)?,
        None => match non_empty(var(ENVIRONMENT_VAR)) {
            Some(raw) => raw.parse().map_err(ConfigError::Environment)?,
            None => Environment::default(),
        },
    };

    let base = TelemetryConfig::for_environment(environment);
    let mut merged = match toml::Value::try_from(&base) {
        Ok(toml::Value::Table(table)) => table,
        _ => toml::Table::new(),
    };
    merge_tables(&mut merged, file);
    // Already resolved above; the raw spelling may be an alias.
    merged.remove("environment");

    let mut config: TelemetryConfig = toml::Value::Table(merged).try_into()?;
    config.environment = environment;
    apply_env_overrides(&mut config, &var);
    Ok(config)
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn apply_env_overrides<F>(config: &mut TelemetryConfig, var: &F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = non_empty(var(LOGGING_ENDPOINT_VAR)) {
        config.remote.logging_endpoint = Some(endpoint);
    }
    if let Some(endpoint) = non_empty(var(ERROR_MONITORING_ENDPOINT_VAR)) {
        config.remote.error_monitoring_endpoint = Some(endpoint);
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
