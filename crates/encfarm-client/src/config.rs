//! Client configuration.
//!
//! Supports loading configuration from:
//! 1. A YAML file (`--config`, or `~/.encfarm/config.yaml` when present)
//! 2. Environment variables (with `ENCFARM_` prefix)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line flags (applied by the CLI)
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;
use crate::wait::{ExponentialBackoff, FixedInterval, WaitPolicy};

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Poll loop settings.
    #[serde(default)]
    pub polling: PollingConfig,
}

/// API server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// API base URL (e.g. "http://localhost:3000/api")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

/// Poll loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between polls in seconds (first delay when backoff is enabled)
    #[serde(default = "default_interval")]
    pub interval_seconds: f64,

    /// Give up after this many seconds; unset polls until a terminal state
    #[serde(default)]
    pub max_wait_seconds: Option<u64>,

    /// Backoff between polls
    #[serde(default)]
    pub backoff: BackoffConfig,
}

/// Exponential backoff settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Grow the delay between polls
    #[serde(default)]
    pub enabled: bool,

    /// Growth factor per tick
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upper bound for a single delay in seconds
    #[serde(default = "default_max_interval")]
    pub max_interval_seconds: f64,
}

// Default value functions
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_interval() -> f64 {
    1.0
}

fn default_multiplier() -> f64 {
    1.5
}

fn default_max_interval() -> f64 {
    30.0
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            interval_seconds: default_interval(),
            max_wait_seconds: None,
            backoff: BackoffConfig::default(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig {
            enabled: false,
            multiplier: default_multiplier(),
            max_interval_seconds: default_max_interval(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::IoError(format!("{}: {e}", path.as_ref().display()))
        })?;

        let config: ClientConfig = serde_yaml_ng::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with the following precedence:
    /// 1. The given file, or the default file if it exists
    /// 2. Environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(path)?,
                None => ClientConfig::default(),
            },
        };

        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Merge process environment variables into this configuration.
    pub fn merge_env(self) -> Self {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    /// Merge variables from `lookup` into this configuration.
    ///
    /// Only variables that are set override the current values; values that
    /// fail to parse are ignored.
    pub fn merge_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ENCFARM_SERVER") {
            self.server.base_url = v;
        }
        if let Some(v) = lookup("ENCFARM_TIMEOUT") {
            if let Ok(val) = v.parse() {
                self.server.timeout_seconds = val;
            }
        }
        if let Some(v) = lookup("ENCFARM_POLL_INTERVAL") {
            if let Ok(val) = v.parse() {
                self.polling.interval_seconds = val;
            }
        }
        if let Some(v) = lookup("ENCFARM_MAX_WAIT") {
            if let Ok(val) = v.parse() {
                self.polling.max_wait_seconds = Some(val);
            }
        }
        if let Some(v) = lookup("ENCFARM_BACKOFF") {
            self.polling.backoff.enabled = matches!(v.as_str(), "1" | "true" | "yes" | "on");
        }

        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server base_url must not be empty".to_string(),
            ));
        }

        if self.server.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }

        let interval = self.polling.interval_seconds;
        if !(interval.is_finite() && interval > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "interval_seconds must be a positive number (got {interval})"
            )));
        }

        if self.polling.max_wait_seconds == Some(0) {
            return Err(ConfigError::ValidationError(
                "max_wait_seconds must be greater than 0; omit it to wait indefinitely"
                    .to_string(),
            ));
        }

        let backoff = &self.polling.backoff;
        if backoff.enabled {
            if !(backoff.multiplier.is_finite() && backoff.multiplier >= 1.0) {
                return Err(ConfigError::ValidationError(format!(
                    "backoff multiplier must be >= 1.0 (got {})",
                    backoff.multiplier
                )));
            }
            if !(backoff.max_interval_seconds.is_finite() && backoff.max_interval_seconds > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "backoff max_interval_seconds must be positive (got {})",
                    backoff.max_interval_seconds
                )));
            }
        }

        Ok(())
    }

    /// Build the wait policy described by the polling section.
    pub fn wait_policy(&self) -> Box<dyn WaitPolicy> {
        let interval = seconds(self.polling.interval_seconds).unwrap_or(Duration::from_secs(1));
        let backoff = &self.polling.backoff;
        if backoff.enabled {
            let max = seconds(backoff.max_interval_seconds).unwrap_or(interval);
            Box::new(ExponentialBackoff::new(interval, backoff.multiplier, max))
        } else {
            Box::new(FixedInterval::new(interval))
        }
    }

    /// Maximum time to wait for a job, if bounded.
    pub fn max_wait(&self) -> Option<Duration> {
        self.polling.max_wait_seconds.map(Duration::from_secs)
    }
}

/// Default configuration file location (`~/.encfarm/config.yaml`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".encfarm").join("config.yaml"))
}

fn seconds(value: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(value)
        .ok()
        .filter(|d| !d.is_zero())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.server.base_url, "http://localhost:3000/api");
        assert_eq!(config.polling.interval_seconds, 1.0);
        assert!(config.max_wait().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_wait_policy_is_one_second() {
        let policy = ClientConfig::default().wait_policy();
        assert_eq!(policy.next_delay(0), Duration::from_secs(1));
        assert_eq!(policy.next_delay(50), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_policy() {
        let mut config = ClientConfig::default();
        config.polling.backoff.enabled = true;
        config.polling.backoff.multiplier = 2.0;
        config.polling.backoff.max_interval_seconds = 5.0;
        let policy = config.wait_policy();
        assert_eq!(policy.next_delay(1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(10), Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ClientConfig::default();
        config.polling.interval_seconds = 0.0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.server.base_url = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.polling.max_wait_seconds = Some(0);
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.polling.backoff.enabled = true;
        config.polling.backoff.multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ENCFARM_SERVER", "http://farm.internal:8080/api"),
            ("ENCFARM_POLL_INTERVAL", "2.5"),
            ("ENCFARM_MAX_WAIT", "600"),
            ("ENCFARM_TIMEOUT", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::default()
            .merge_env_with(|key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.server.base_url, "http://farm.internal:8080/api");
        assert_eq!(config.polling.interval_seconds, 2.5);
        assert_eq!(config.max_wait(), Some(Duration::from_secs(600)));
        // Unparseable values leave the default in place
        assert_eq!(config.server.timeout_seconds, 10);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  base_url: http://encode-01:3000/api\npolling:\n  interval_seconds: 0.5\n  backoff:\n    enabled: true"
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.base_url, "http://encode-01:3000/api");
        assert_eq!(config.server.timeout_seconds, 10);
        assert_eq!(config.polling.interval_seconds, 0.5);
        assert!(config.polling.backoff.enabled);
        assert_eq!(config.polling.backoff.multiplier, 1.5);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ClientConfig::from_file("/nonexistent/encfarm.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "polling: [not, a, map]").unwrap();
        let err = ClientConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
