//! Configuration types.

use plumb_core::{
    ReadBodyOptions, DEFAULT_BODY_LENGTH, DEFAULT_QUERY_DEPTH, DEFAULT_QUERY_LENGTH,
    DEFAULT_READ_LENGTH,
};
use plumb_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Complete Plumb configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use plumb_config::{PlumbConfig, UnmatchedPolicy};
///
/// let config = PlumbConfig::default();
/// assert_eq!(config.query.length, 1_000_000);
/// assert_eq!(config.dispatcher.unmatched, UnmatchedPolicy::NotFound);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct PlumbConfig {
    /// Query string decoding.
    #[serde(default)]
    pub query: QueryConfig,

    /// Request body reading.
    #[serde(default)]
    pub body: BodyConfig,

    /// Dispatcher behavior.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LogConfig,
}

impl PlumbConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a limit is zero, if
    /// `body.read_length` exceeds `body.length`, or if `logging.level` is
    /// not a valid filter directive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.length == 0 {
            return Err(ConfigError::invalid_value("query.length", "must be greater than 0"));
        }
        if self.query.depth == 0 {
            return Err(ConfigError::invalid_value("query.depth", "must be greater than 0"));
        }
        if self.body.length == 0 {
            return Err(ConfigError::invalid_value("body.length", "must be greater than 0"));
        }
        if self.body.read_length == 0 {
            return Err(ConfigError::invalid_value(
                "body.read_length",
                "must be greater than 0",
            ));
        }
        if self.body.read_length > self.body.length {
            return Err(ConfigError::invalid_value(
                "body.read_length",
                format!(
                    "must not exceed body.length ({} > {})",
                    self.body.read_length, self.body.length
                ),
            ));
        }
        if let Err(err) = plumb_telemetry::create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", err.to_string()));
        }
        Ok(())
    }

    /// Create a development configuration preset: debug level, pretty logs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LogConfig::development(),
            ..Self::default()
        }
    }

    /// Create a production configuration preset: info level, JSON logs.
    ///
    /// # Example
    ///
    /// ```
    /// use plumb_config::PlumbConfig;
    ///
    /// let config = PlumbConfig::production();
    /// assert_eq!(config.logging.format, plumb_telemetry::LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        Self {
            logging: LogConfig::production(),
            ..Self::default()
        }
    }
}

/// Query string decoding limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Maximum query string length in bytes.
    pub length: usize,

    /// Maximum number of `[key]` levels in one key.
    pub depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_QUERY_LENGTH,
            depth: DEFAULT_QUERY_DEPTH,
        }
    }
}

/// Request body reading limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BodyConfig {
    /// Bytes after which one read returns a partial body.
    pub length: usize,

    /// Bytes requested from the transport per read.
    pub read_length: usize,
}

impl BodyConfig {
    /// Converts to the options taken by `Conn::read_body`.
    #[must_use]
    pub const fn read_options(&self) -> ReadBodyOptions {
        ReadBodyOptions::new(self.length, self.read_length)
    }
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_BODY_LENGTH,
            read_length: DEFAULT_READ_LENGTH,
        }
    }
}

/// What the dispatcher does when no route matches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Send `404 Not Found`.
    #[default]
    NotFound,
    /// Return the no-route error to the caller.
    Error,
}

/// Dispatcher behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Policy for requests no route matched.
    pub unmatched: UnmatchedPolicy,
}
