//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use plumb_telemetry::LogFormat;

use crate::{ConfigError, PlumbConfig, UnmatchedPolicy};

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file or string (TOML or JSON)
/// 3. Environment variables
///
/// # Example
///
/// ```no_run
/// use plumb_config::ConfigLoader;
///
/// # fn main() -> Result<(), plumb_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("plumb.toml")?
///     .with_env_prefix("PLUMB")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: PlumbConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PlumbConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with default configuration values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = PlumbConfig::default();
        self
    }

    /// Start with the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use plumb_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = PlumbConfig::development();
        self
    }

    /// Start with the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = PlumbConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension: `.toml` or `.json`. Sections the
    /// file omits take their default values; unknown fields are rejected.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, cannot be read, has an
    /// unsupported extension, or does not parse.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.config = parse(&content, format)?;

        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `format` (`"toml"` or `"json"`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use plumb_config::{ConfigLoader, UnmatchedPolicy};
    ///
    /// let toml = r#"
    ///     [query]
    ///     length = 4096
    ///
    ///     [dispatcher]
    ///     unmatched = "error"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.query.length, 4096);
    /// assert_eq!(config.dispatcher.unmatched, UnmatchedPolicy::Error);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, format)?;
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`, e.g.
    /// `PLUMB__QUERY__LENGTH=4096` or `PLUMB__LOGGING__FORMAT=compact`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment variable overrides (if a prefix was set) and
    /// validates the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or validation
    /// fails.
    pub fn load(mut self) -> Result<PlumbConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix, env::vars())?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without validation.
    #[must_use]
    pub fn load_unvalidated(self) -> PlumbConfig {
        self.config
    }

    fn apply_env_overrides<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars: Vec<(String, String)> = vars
            .into_iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(key_without_prefix) = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
        else {
            return Ok(());
        };

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let logging = &mut self.config.logging;

        match parts.as_slice() {
            ["QUERY", "LENGTH"] => {
                self.config.query.length = parse_usize(key, value)?;
            }
            ["QUERY", "DEPTH"] => {
                self.config.query.depth = parse_usize(key, value)?;
            }
            ["BODY", "LENGTH"] => {
                self.config.body.length = parse_usize(key, value)?;
            }
            ["BODY", "READ_LENGTH"] => {
                self.config.body.read_length = parse_usize(key, value)?;
            }
            ["DISPATCHER", "UNMATCHED"] => {
                self.config.dispatcher.unmatched = match value.to_lowercase().as_str() {
                    "not_found" => UnmatchedPolicy::NotFound,
                    "error" => UnmatchedPolicy::Error,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'not_found' or 'error'",
                        ))
                    }
                };
            }
            ["LOGGING", "ENABLED"] => {
                logging.enabled = parse_bool_var(key, value)?;
            }
            ["LOGGING", "LEVEL"] => {
                logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    "compact" => LogFormat::Compact,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json', 'pretty' or 'compact'",
                        ))
                    }
                };
            }
            ["LOGGING", "SPAN_EVENTS"] => {
                logging.span_events = parse_bool_var(key, value)?;
            }
            ["LOGGING", "FILE_LINE_INFO"] => {
                logging.file_line_info = parse_bool_var(key, value)?;
            }
            ["LOGGING", "THREAD_IDS"] => {
                logging.thread_ids = parse_bool_var(key, value)?;
            }
            ["LOGGING", "INCLUDE_TARGET"] => {
                logging.include_target = parse_bool_var(key, value)?;
            }

            // Unknown keys are ignored
            _ => {}
        }

        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<PlumbConfig, ConfigError> {
    match format.to_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .replace('_', "")
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, PlumbConfig::default());
    }

    #[test]
    fn test_loader_with_production() {
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_loader_with_string_toml() {
        let toml = r#"
            [body]
            length = 1024
            read_length = 256

            [logging]
            level = "warn"
            format = "compact"
        "#;

        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.body.length, 1024);
        assert_eq!(config.body.read_length, 256);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.query.length, 1_000_000);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"dispatcher": {"unmatched": "error"}}"#;

        let config = ConfigLoader::new()
            .with_string(json, "JSON")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.dispatcher.unmatched, UnmatchedPolicy::Error);
    }

    #[test]
    fn test_loader_rejects_unknown_fields() {
        let result = ConfigLoader::new().with_string("[server]\nport = 80", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));

        let result = ConfigLoader::new().with_string(r#"{"query": {"limit": 1}}"#, "json");
        assert!(matches!(result, Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_loader_rejects_unknown_format() {
        let result = ConfigLoader::new().with_string("query:\n  length: 1", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(f)) if f == "yaml"));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/plumb.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/plumb.toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config, PlumbConfig::default());
    }

    #[test]
    fn test_load_validates() {
        let toml = "[body]\nlength = 10\nread_length = 20";
        let loader = ConfigLoader::new().with_string(toml, "toml").unwrap();
        assert!(matches!(loader.load(), Err(ConfigError::InvalidValue { .. })));

        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load_unvalidated();
        assert_eq!(config.body.read_length, 20);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));

        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("no"), Some(false));

        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_apply_env_limits() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_overrides(
                "TEST",
                vars(&[
                    ("TEST__QUERY__LENGTH", "2048"),
                    ("TEST__QUERY__DEPTH", "8"),
                    ("TEST__BODY__LENGTH", "4_000"),
                    ("TEST__BODY__READ_LENGTH", "1000"),
                    ("OTHER__QUERY__LENGTH", "1"),
                ]),
            )
            .unwrap();

        assert_eq!(loader.config.query.length, 2048);
        assert_eq!(loader.config.query.depth, 8);
        assert_eq!(loader.config.body.length, 4000);
        assert_eq!(loader.config.body.read_length, 1000);
    }

    #[test]
    fn test_apply_env_dispatcher_and_logging() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_overrides(
                "TEST",
                vars(&[
                    ("TEST__DISPATCHER__UNMATCHED", "error"),
                    ("TEST__LOGGING__LEVEL", "debug"),
                    ("TEST__LOGGING__FORMAT", "Pretty"),
                    ("TEST__LOGGING__SPAN_EVENTS", "yes"),
                    ("TEST__LOGGING__INCLUDE_TARGET", "off"),
                ]),
            )
            .unwrap();

        let config = loader.load_unvalidated();
        assert_eq!(config.dispatcher.unmatched, UnmatchedPolicy::Error);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.span_events);
        assert!(!config.logging.include_target);
    }

    #[test]
    fn test_apply_env_invalid_values() {
        let mut loader = ConfigLoader::new();
        for (key, value) in [
            ("TEST__QUERY__LENGTH", "lots"),
            ("TEST__DISPATCHER__UNMATCHED", "ignore"),
            ("TEST__LOGGING__FORMAT", "xml"),
            ("TEST__LOGGING__ENABLED", "maybe"),
        ] {
            let result = loader.apply_env_var(key, value, "TEST");
            assert!(
                matches!(result, Err(ConfigError::EnvParseError { ref var, .. }) if var == key),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_apply_env_ignores_unknown_keys() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__SERVER__PORT", "80", "TEST")
            .unwrap();
        loader.apply_env_var("TESTING", "1", "TEST").unwrap();
        assert_eq!(loader.load_unvalidated(), PlumbConfig::default());
    }
}
