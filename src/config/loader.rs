//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ApiConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {name}: {reason}")]
    Env { name: &'static str, reason: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then process environment, then validate.
pub fn load_config(path: Option<&Path>) -> Result<ApiConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => ApiConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML file without applying overrides or validation.
pub fn read_config_file(path: &Path) -> Result<ApiConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides read through `lookup`.
///
/// Recognized: `PORT`, `APP_ENV`, `DATABASE_URI`, `JWT_SECRET`,
/// `RATE_LIMIT_MAX`, `RATE_LIMIT_WINDOW_SECS`.
pub fn apply_env_overrides<F>(config: &mut ApiConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        config.listener.port = parse_env("PORT", &port)?;
    }
    if let Some(mode) = lookup("APP_ENV") {
        config.environment.mode = mode
            .parse()
            .map_err(|reason| ConfigError::Env { name: "APP_ENV", reason })?;
    }
    if let Some(uri) = lookup("DATABASE_URI") {
        config.environment.production_database_uri = Some(uri);
    }
    if let Some(secret) = lookup("JWT_SECRET") {
        config.auth.jwt_secret = secret;
    }
    if let Some(max) = lookup("RATE_LIMIT_MAX") {
        config.rate_limit.max_requests = parse_env("RATE_LIMIT_MAX", &max)?;
    }
    if let Some(window) = lookup("RATE_LIMIT_WINDOW_SECS") {
        config.rate_limit.window_secs = parse_env("RATE_LIMIT_WINDOW_SECS", &window)?;
    }
    Ok(())
}

fn parse_env<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EnvironmentMode;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ApiConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("PORT", "4000"),
                ("APP_ENV", "production"),
                ("DATABASE_URI", "mongodb://prod:27017/movies"),
                ("JWT_SECRET", "s3cret"),
                ("RATE_LIMIT_MAX", "10"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.port, 4000);
        assert_eq!(config.environment.mode, EnvironmentMode::Production);
        assert_eq!(config.environment.database_uri(), Some("mongodb://prod:27017/movies"));
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.rate_limit.window_secs, 900);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = ApiConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: "PORT", .. }));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("movies-api-{}.toml", std::process::id()));
        fs::write(&path, "[rate_limit]\nmax_requests = 5\nwindow_secs = 10\nidle_evict_secs = 20\n").unwrap();

        let config = read_config_file(&path);
        fs::remove_file(&path).unwrap();

        let config = config.unwrap();
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.idle_evict_secs, 20);
        assert_eq!(config.listener.port, 3000);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_lists_fields() {
        let err = ConfigError::Validation(vec![
            ValidationError { field: "a", reason: "bad".into() },
            ValidationError { field: "b", reason: "worse".into() },
        ]);
        assert_eq!(err.to_string(), "Validation failed: a: bad, b: worse");
    }
}
