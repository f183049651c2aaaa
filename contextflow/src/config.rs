//! Configuration for the request dispatcher.

use crate::context::keys;
use crate::errors::ConfigError;
use crate::observability::LogFormat;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable for [`DispatchConfig::timeout_ms`].
pub const ENV_TIMEOUT_MS: &str = "CONTEXTFLOW_TIMEOUT_MS";
/// Environment variable for [`DispatchConfig::request_id_header`].
pub const ENV_REQUEST_ID_HEADER: &str = "CONTEXTFLOW_REQUEST_ID_HEADER";
/// Environment variable for [`DispatchConfig::log_format`].
pub const ENV_LOG_FORMAT: &str = "CONTEXTFLOW_LOG_FORMAT";
/// Environment variable for [`DispatchConfig::expose_error_details`].
pub const ENV_EXPOSE_ERRORS: &str = "CONTEXTFLOW_EXPOSE_ERRORS";
/// Environment variable for [`DispatchConfig::max_context_entries`].
pub const ENV_MAX_CONTEXT_ENTRIES: &str = "CONTEXTFLOW_MAX_CONTEXT_ENTRIES";

/// Settings used to assemble a [`Dispatcher`](crate::dispatch::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Per-invocation timeout in milliseconds. `None` disables the timeout filter.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Context key holding the request id.
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,
    /// Whether internal error messages reach the caller.
    #[serde(default)]
    pub expose_error_details: bool,
    /// Maximum entries per context scope.
    #[serde(default)]
    pub max_context_entries: Option<usize>,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_request_id_header() -> String {
    keys::REQUEST_ID.to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            request_id_header: default_request_id_header(),
            expose_error_details: false,
            max_context_entries: None,
            log_format: LogFormat::default(),
        }
    }
}

impl DispatchConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the request id key. Header names are stored lowercased.
    #[must_use]
    pub fn with_request_id_header(mut self, header: impl Into<String>) -> Self {
        self.request_id_header = header.into().trim().to_ascii_lowercase();
        self
    }

    /// Exposes internal error messages in error actions.
    #[must_use]
    pub const fn with_exposed_errors(mut self, expose: bool) -> Self {
        self.expose_error_details = expose;
        self
    }

    /// Limits entries per context scope.
    #[must_use]
    pub const fn with_max_context_entries(mut self, max: usize) -> Self {
        self.max_context_entries = Some(max);
        self
    }

    /// Sets the log format.
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Context key the request id is stored under: the header name, lowercased.
    #[must_use]
    pub fn request_id_key(&self) -> String {
        self.request_id_header.trim().to_ascii_lowercase()
    }

    /// Gets the timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Loads defaults overridden by `CONTEXTFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|var| std::env::var(var).ok())
    }

    /// Like [`DispatchConfig::from_env`], reading variables through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            config.timeout_ms = Some(parse_env(ENV_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_REQUEST_ID_HEADER) {
            config.request_id_header = raw.trim().to_ascii_lowercase();
        }
        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            config.log_format = parse_env(ENV_LOG_FORMAT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_EXPOSE_ERRORS) {
            config.expose_error_details = parse_env(ENV_EXPOSE_ERRORS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_CONTEXT_ENTRIES) {
            config.max_context_entries = Some(parse_env(ENV_MAX_CONTEXT_ENTRIES, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that every field is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::invalid_field(
                "timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.request_id_header.trim().is_empty() {
            return Err(ConfigError::invalid_field(
                "request_id_header",
                "must not be empty",
            ));
        }
        if self.max_context_entries == Some(0) {
            return Err(ConfigError::invalid_field(
                "max_context_entries",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn parse_env<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|err: T::Err| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: raw.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::new();
        assert_eq!(config.timeout(), None);
        assert_eq!(config.request_id_header, "x-request-id");
        assert!(!config.expose_error_details);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = DispatchConfig::new()
            .with_timeout(Duration::from_secs(2))
            .with_request_id_header("x-correlation-id")
            .with_exposed_errors(true)
            .with_max_context_entries(16)
            .with_log_format(LogFormat::Json);

        assert_eq!(config.timeout_ms, Some(2000));
        assert_eq!(config.timeout(), Some(Duration::from_secs(2)));
        assert_eq!(config.request_id_header, "x-correlation-id");
        assert_eq!(config.max_context_entries, Some(16));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: DispatchConfig =
            serde_json::from_value(serde_json::json!({"timeout_ms": 250, "log_format": "json"}))
                .unwrap();
        assert_eq!(
            config,
            DispatchConfig::new()
                .with_timeout(Duration::from_millis(250))
                .with_log_format(LogFormat::Json)
        );
    }

    #[test]
    fn test_from_env_overrides() {
        let config = DispatchConfig::from_env_with(env(&[
            (ENV_TIMEOUT_MS, "1500"),
            (ENV_REQUEST_ID_HEADER, " x-trace "),
            (ENV_LOG_FORMAT, "compact"),
            (ENV_EXPOSE_ERRORS, "true"),
            (ENV_MAX_CONTEXT_ENTRIES, "8"),
        ]))
        .unwrap();

        assert_eq!(config.timeout_ms, Some(1500));
        assert_eq!(config.request_id_header, "x-trace");
        assert_eq!(config.log_format, LogFormat::Compact);
        assert!(config.expose_error_details);
        assert_eq!(config.max_context_entries, Some(8));
    }

    #[test]
    fn test_from_env_rejects_garbage() {
        let err = DispatchConfig::from_env_with(env(&[(ENV_TIMEOUT_MS, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == ENV_TIMEOUT_MS));

        let err = DispatchConfig::from_env_with(env(&[(ENV_LOG_FORMAT, "xml")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value `xml` for CONTEXTFLOW_LOG_FORMAT: unknown log format: xml"
        );
    }

    #[test]
    fn test_validate_ranges() {
        let zero = DispatchConfig {
            timeout_ms: Some(0),
            ..DispatchConfig::default()
        };
        assert_eq!(
            zero.validate(),
            Err(ConfigError::invalid_field("timeout_ms", "must be greater than zero"))
        );

        let mixed: DispatchConfig =
            serde_json::from_value(serde_json::json!({"request_id_header": "X-Trace-Id"})).unwrap();
        assert_eq!(mixed.request_id_key(), "x-trace-id");
        assert_eq!(
            DispatchConfig::new().with_request_id_header("X-Correlation-Id").request_id_header,
            "x-correlation-id"
        );

        let blank = DispatchConfig::new().with_request_id_header("  ");
        assert!(blank.validate().is_err());

        assert_eq!(DispatchConfig::from_env_with(env(&[])), Ok(DispatchConfig::default()));
        assert!(DispatchConfig::from_env_with(env(&[(ENV_MAX_CONTEXT_ENTRIES, "0")])).is_err());
    }
}
