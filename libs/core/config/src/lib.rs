//! Environment-driven configuration shared by the products service crates.
//!
//! Every setting is read once at process start through [`FromEnv`]. Problems are
//! collected with [`ConfigErrors`] so a misconfigured deployment reports every
//! missing or malformed variable in one go instead of failing on the first.

pub mod nats;
pub mod server;
pub mod tracing;

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },

    #[error("Config validation error: {}", join_errors(.0))]
    Invalid(Vec<ConfigError>),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Application environment
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        let app_env = env_or_default("APP_ENV", "development");

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Load an environment variable, falling back to `default` when unset
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Load an environment variable or return [`ConfigError::MissingEnvVar`]
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

/// Parse a raw value for `key`, mapping failures to [`ConfigError::ParseError`]
pub fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
        key: key.to_string(),
        details: e.to_string(),
    })
}

/// Load and parse a required environment variable
pub fn env_required_parse<T>(key: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    parse_value(key, &env_required(key)?)
}

/// Accumulates configuration errors so they can be reported together.
///
/// ```
/// use core_config::{env_required, ConfigErrors};
///
/// let mut errors = ConfigErrors::default();
/// let url = errors.take(env_required("SOME_UNSET_VARIABLE_FOR_DOCS"));
/// assert!(url.is_none());
/// assert!(errors.into_result().is_err());
/// ```
#[derive(Debug, Default)]
pub struct ConfigErrors(Vec<ConfigError>);

impl ConfigErrors {
    /// Keep the value of `result`, or record its error and return `None`
    pub fn take<T>(&mut self, result: Result<T, ConfigError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(ConfigError::Invalid(nested)) => {
                self.0.extend(nested);
                None
            }
            Err(err) => {
                self.0.push(err);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise every recorded error
    pub fn into_result(self) -> Result<(), ConfigError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(self.0))
        }
    }

    /// Collapse into a single [`ConfigError::Invalid`]
    pub fn into_error(self) -> ConfigError {
        ConfigError::Invalid(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        temp_env::with_var_unset("APP_ENV", || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Development);
            assert!(env.is_development());
            assert!(!env.is_production());
        });
    }

    #[test]
    fn test_environment_production_case_insensitive() {
        temp_env::with_var("APP_ENV", Some("PRODUCTION"), || {
            assert_eq!(Environment::from_env(), Environment::Production);
        });
    }

    #[test]
    fn test_env_or_default() {
        temp_env::with_var("TEST_VAR", Some("test_value"), || {
            assert_eq!(env_or_default("TEST_VAR", "default"), "test_value");
        });
        temp_env::with_var_unset("MISSING_VAR", || {
            assert_eq!(env_or_default("MISSING_VAR", "default_value"), "default_value");
        });
    }

    #[test]
    fn test_env_required_missing() {
        temp_env::with_var_unset("MISSING_REQUIRED", || {
            let err = env_required("MISSING_REQUIRED").unwrap_err();
            assert!(err.to_string().contains("MISSING_REQUIRED"));
            assert!(err.to_string().contains("required"));
        });
    }

    #[test]
    fn test_env_required_blank_is_missing() {
        temp_env::with_var("BLANK_REQUIRED", Some("   "), || {
            let result = env_required("BLANK_REQUIRED");
            assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
        });
    }

    #[test]
    fn test_env_required_parse() {
        temp_env::with_var("NUMERIC_VAR", Some(" 3000 "), || {
            let value: u16 = env_required_parse("NUMERIC_VAR").unwrap();
            assert_eq!(value, 3000);
        });
        temp_env::with_var("NUMERIC_VAR", Some("abc"), || {
            let result = env_required_parse::<u16>("NUMERIC_VAR");
            assert!(matches!(result, Err(ConfigError::ParseError { .. })));
        });
    }

    #[test]
    fn test_config_errors_reports_everything() {
        let mut errors = ConfigErrors::default();
        let first: Option<String> = errors.take(Err(ConfigError::MissingEnvVar("PORT".into())));
        let second: Option<u16> = errors.take(Err(ConfigError::ParseError {
            key: "DB_MAX_CONNECTIONS".into(),
            details: "invalid digit found in string".into(),
        }));
        let third = errors.take(Ok::<_, ConfigError>(42));

        assert!(first.is_none());
        assert!(second.is_none());
        assert_eq!(third, Some(42));

        let message = errors.into_result().unwrap_err().to_string();
        assert!(message.starts_with("Config validation error"));
        assert!(message.contains("PORT"));
        assert!(message.contains("DB_MAX_CONNECTIONS"));
    }

    #[test]
    fn test_config_errors_flattens_nested() {
        let mut errors = ConfigErrors::default();
        let _: Option<()> = errors.take(Err(ConfigError::Invalid(vec![
            ConfigError::MissingEnvVar("A".into()),
            ConfigError::MissingEnvVar("B".into()),
        ])));
        match errors.into_error() {
            ConfigError::Invalid(inner) => assert_eq!(inner.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_config_errors_empty_is_ok() {
        let errors = ConfigErrors::default();
        assert!(errors.is_empty());
        assert!(errors.into_result().is_ok());
    }
}
