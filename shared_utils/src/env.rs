//! Environment variable helpers shared by the store and its CLI.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading process-level configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable is set but holds nothing usable (empty or not UTF-8).
    #[error("Environment variable {name} is invalid: {reason}")]
    InvalidEnvVar {
        /// Name of the offending variable.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, ConfigError> {
    match get_env_var_opt(name)? {
        Some(v) => Ok(v),
        None => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

/// Reads an optional environment variable.
///
/// Unset and whitespace-only values both yield `Ok(None)`; a value that is
/// not valid UTF-8 is an error rather than silently ignored.
pub fn get_env_var_opt(name: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => Ok(Some(v.trim().to_string())),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidEnvVar {
            name: name.to_string(),
            reason: "value is not valid UTF-8".to_string(),
        }),
    }
}

/// Reads an optional environment variable and interprets it as a filesystem path.
pub fn get_env_path(name: &str) -> Result<Option<PathBuf>, ConfigError> {
    Ok(get_env_var_opt(name)?.map(PathBuf::from))
}
