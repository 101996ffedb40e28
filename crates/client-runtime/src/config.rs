//! Client configuration from environment variables.

use sc_04_compute_module::MIN_ENTROPY;
use sc_06_secure_channel::TrustAnchor;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CHANNEL_URL: &str = "http://localhost:3000/channel";

/// Discovery lives next to the channel endpoint.
fn discovery_url_for(channel_url: &str) -> String {
    format!("{channel_url}_information")
}

fn flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required URL is empty.
    #[error("{0} cannot be empty")]
    EmptyUrl(&'static str),

    /// Invalid size or count limit.
    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    /// Invalid timeout value.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    /// The build carries no trust anchor.
    #[error("no trust anchor compiled in; rebuild with SC_TRUST_ANCHOR set")]
    MissingTrustAnchor,

    /// The compiled-in trust anchor does not decode.
    #[error("invalid trust anchor: {0}")]
    InvalidTrustAnchor(String),
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Whether to enable console output
    pub console_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            console_output: true,
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Where the signed server key is published.
    pub discovery_url: String,

    /// Where packed queries are posted.
    pub channel_url: String,

    /// Depth of the bounded channels between the two contexts.
    pub bridge_capacity: usize,

    /// Entropy pool size in bytes.
    pub entropy_pool_size: usize,

    /// Timeout for each HTTP request.
    pub http_timeout_secs: u64,

    pub telemetry: TelemetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            discovery_url: discovery_url_for(DEFAULT_CHANNEL_URL),
            channel_url: DEFAULT_CHANNEL_URL.to_string(),
            bridge_capacity: 64,
            entropy_pool_size: 1024,
            http_timeout_secs: 30,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SC_CHANNEL_URL`: Secure channel endpoint (default: http://localhost:3000/channel)
    /// - `SC_DISCOVERY_URL`: Discovery endpoint (default: `<channel url>_information`)
    /// - `SC_BRIDGE_CAPACITY`: Bridge channel depth (default: 64)
    /// - `SC_ENTROPY_POOL_SIZE`: Entropy pool bytes (default: 1024)
    /// - `SC_HTTP_TIMEOUT_SECS`: HTTP timeout (default: 30)
    /// - `SC_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `SC_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `SC_CONSOLE_OUTPUT`: Enable console output (default: true)
    ///
    /// The trust anchor is fixed at build time; see [`compiled_trust_anchor`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse().ok());

        let channel_url = lookup("SC_CHANNEL_URL").unwrap_or(defaults.channel_url);
        Self {
            discovery_url: lookup("SC_DISCOVERY_URL")
                .unwrap_or_else(|| discovery_url_for(&channel_url)),
            channel_url,
            bridge_capacity: number("SC_BRIDGE_CAPACITY").unwrap_or(defaults.bridge_capacity),
            entropy_pool_size: number("SC_ENTROPY_POOL_SIZE")
                .unwrap_or(defaults.entropy_pool_size),
            http_timeout_secs: lookup("SC_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.http_timeout_secs),
            telemetry: TelemetryConfig {
                log_level: lookup("SC_LOG_LEVEL")
                    .or_else(|| lookup("RUST_LOG"))
                    .unwrap_or(defaults.telemetry.log_level),
                json_logs: lookup("SC_JSON_LOGS")
                    .map(|v| flag(&v))
                    .unwrap_or(defaults.telemetry.json_logs),
                console_output: lookup("SC_CONSOLE_OUTPUT")
                    .map(|v| !v.eq_ignore_ascii_case("false") && v != "0")
                    .unwrap_or(defaults.telemetry.console_output),
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery_url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl("discovery_url"));
        }
        if self.channel_url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl("channel_url"));
        }

        if self.bridge_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "bridge_capacity cannot be 0".into(),
            ));
        }

        // The module refuses to seed an RNG from less.
        if self.entropy_pool_size < MIN_ENTROPY {
            return Err(ConfigError::InvalidLimit(format!(
                "entropy_pool_size must be at least {MIN_ENTROPY} bytes, got {}",
                self.entropy_pool_size
            )));
        }

        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "http_timeout_secs cannot be 0".into(),
            ));
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// The trust anchor compiled into the build.
///
/// Set with `SC_TRUST_ANCHOR` when compiling; the variable is not read at
/// run time.
pub fn compiled_trust_anchor() -> Result<TrustAnchor, ConfigError> {
    TrustAnchor::compiled()
        .ok_or(ConfigError::MissingTrustAnchor)?
        .map_err(|e| ConfigError::InvalidTrustAnchor(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.channel_url, "http://localhost:3000/channel");
        assert_eq!(config.discovery_url, "http://localhost:3000/channel_information");
        assert_eq!(config.entropy_pool_size, 1024);
    }

    #[test]
    fn test_discovery_follows_channel_url() {
        let config = ClientConfig::from_lookup(lookup(&[("SC_CHANNEL_URL", "https://api.example/c")]));
        assert_eq!(config.discovery_url, "https://api.example/c_information");

        let config = ClientConfig::from_lookup(lookup(&[
            ("SC_CHANNEL_URL", "https://api.example/c"),
            ("SC_DISCOVERY_URL", "https://keys.example/"),
        ]));
        assert_eq!(config.discovery_url, "https://keys.example/");
    }

    #[test]
    fn test_from_lookup_reads_settings() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("SC_BRIDGE_CAPACITY", "8"),
            ("SC_ENTROPY_POOL_SIZE", "4096"),
            ("SC_HTTP_TIMEOUT_SECS", "5"),
            ("RUST_LOG", "debug"),
            ("SC_JSON_LOGS", "TRUE"),
            ("SC_CONSOLE_OUTPUT", "0"),
        ]));
        assert_eq!(config.bridge_capacity, 8);
        assert_eq!(config.entropy_pool_size, 4096);
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
        assert_eq!(config.telemetry.log_level, "debug");
        assert!(config.telemetry.json_logs);
        assert!(!config.telemetry.console_output);
    }

    #[test]
    fn test_unparsable_numbers_fall_back() {
        let config = ClientConfig::from_lookup(lookup(&[("SC_BRIDGE_CAPACITY", "lots")]));
        assert_eq!(config.bridge_capacity, ClientConfig::default().bridge_capacity);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ClientConfig {
            bridge_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimit(_))));

        let config = ClientConfig {
            entropy_pool_size: 512,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimit(_))));

        let config = ClientConfig {
            channel_url: " ".into(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyUrl("channel_url")));

        let config = ClientConfig {
            http_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeout(_))));
    }

    #[test]
    fn test_trust_anchor_not_configurable_at_runtime() {
        let config = ClientConfig::from_lookup(lookup(&[("SC_TRUST_ANCHOR", "AAAA")]));
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("trust_anchor").is_none());

        let config: ClientConfig = serde_json::from_str(r#"{"trust_anchor": "AAAA"}"#).unwrap();
        assert!(serde_json::to_value(&config).unwrap().get("trust_anchor").is_none());
    }

    #[test]
    fn test_compiled_trust_anchor() {
        match TrustAnchor::compiled() {
            None => assert_eq!(compiled_trust_anchor().unwrap_err(), ConfigError::MissingTrustAnchor),
            Some(Ok(anchor)) => assert_eq!(compiled_trust_anchor().unwrap().key(), anchor.key()),
            Some(Err(_)) => assert!(matches!(
                compiled_trust_anchor(),
                Err(ConfigError::InvalidTrustAnchor(_))
            )),
        }
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"bridge_capacity": 4, "telemetry": {"json_logs": true}}"#)
                .unwrap();
        assert_eq!(config.bridge_capacity, 4);
        assert!(config.telemetry.json_logs);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.channel_url, DEFAULT_CHANNEL_URL);
    }
}
