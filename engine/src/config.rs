//! Engine configuration.
//!
//! Values come from environment variables (a `.env` file is honoured by the
//! demo binary through `dotenvy`), with defaults for everything:
//!
//! | Variable                      | Default | Meaning                              |
//! |-------------------------------|---------|--------------------------------------|
//! | `RAFFLE_MAX_PER_OWNER`        | `3`     | Raffles one owner may hold           |
//! | `RAFFLE_DEFAULT_COUNTRY_CODE` | `54`    | Prefix for contacts without `+`      |
//! | `RAFFLE_SLUG_MAX_LEN`         | `50`    | Longest accepted or derived slug     |
//! | `METRICS_ADDR`                | unset   | Prometheus scrape address            |
//! | `RUST_LOG`                    | `info`  | Tracing filter                       |
//!
//! # Example
//!
//! ```no_run
//! use raffle_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! println!("Quota: {}", config.registry.max_raffles_per_owner);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but does not parse
    #[error("Failed to parse {var}: {message}")]
    Parse {
        /// Variable name
        var: &'static str,
        /// Parser message
        message: String,
    },
    /// A parsed value is out of range
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Registry limits and input normalization settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Raffles one owner may hold at the same time
    pub max_raffles_per_owner: usize,
    /// Country code prefixed to owner contacts typed without `+`
    pub default_country_code: String,
    /// Longest accepted or derived slug
    pub slug_max_len: usize,
}

impl RegistryConfig {
    /// Validate registry configuration
    ///
    /// # Errors
    ///
    /// Returns error if a limit is zero or the country code is not numeric.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_raffles_per_owner == 0 {
            return Err(ConfigError::Validation(
                "max_raffles_per_owner must be > 0".to_string(),
            ));
        }
        // Room for at least one letter plus a "-NN" suffix
        if self.slug_max_len < 4 {
            return Err(ConfigError::Validation("slug_max_len must be >= 4".to_string()));
        }
        if self.default_country_code.is_empty()
            || !self.default_country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ConfigError::Validation(format!(
                "default_country_code must be digits, got '{}'",
                self.default_country_code
            )));
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_raffles_per_owner: 3,
            default_country_code: "54".to_string(),
            slug_max_len: 50,
        }
    }
}

/// Logging and metrics settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Tracing filter directive
    pub log_level: String,
    /// Prometheus scrape address; metrics stay disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_addr: None,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Registry settings
    pub registry: RegistryConfig,
    /// Telemetry settings
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a variable does not parse or a value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns error if a variable does not parse or a value is out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(max) = parsed(&lookup, "RAFFLE_MAX_PER_OWNER")? {
            config.registry.max_raffles_per_owner = max;
        }
        if let Some(code) = lookup("RAFFLE_DEFAULT_COUNTRY_CODE") {
            config.registry.default_country_code = code.trim().trim_start_matches('+').to_string();
        }
        if let Some(len) = parsed(&lookup, "RAFFLE_SLUG_MAX_LEN")? {
            config.registry.slug_max_len = len;
        }
        config.telemetry.metrics_addr = parsed(&lookup, "METRICS_ADDR")?;
        if let Some(level) = lookup("RUST_LOG") {
            config.telemetry.log_level = level;
        }

        config.registry.validate()?;
        Ok(config)
    }
}

fn parsed<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
                var,
                message: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.registry.max_raffles_per_owner, 3);
        assert_eq!(config.telemetry.metrics_addr, None);
    }

    #[test]
    fn variables_override_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("RAFFLE_MAX_PER_OWNER", "5"),
            ("RAFFLE_DEFAULT_COUNTRY_CODE", "+1"),
            ("METRICS_ADDR", "127.0.0.1:9000"),
        ]))
        .unwrap();
        assert_eq!(config.registry.max_raffles_per_owner, 5);
        assert_eq!(config.registry.default_country_code, "1");
        assert_eq!(
            config.telemetry.metrics_addr,
            Some("127.0.0.1:9000".parse().unwrap())
        );
    }

    #[test]
    fn unparsable_values_name_the_variable() {
        let error = Config::from_lookup(lookup(&[("RAFFLE_SLUG_MAX_LEN", "long")])).unwrap_err();
        assert!(matches!(
            error,
            ConfigError::Parse {
                var: "RAFFLE_SLUG_MAX_LEN",
                ..
            }
        ));
    }

    #[test]
    fn zero_quota_is_rejected() {
        let error = Config::from_lookup(lookup(&[("RAFFLE_MAX_PER_OWNER", "0")])).unwrap_err();
        assert!(matches!(error, ConfigError::Validation(_)));
    }
}
