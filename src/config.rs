//! Relay configuration.

use crate::error::{RelayError, Result};
use crate::log::DEFAULT_MAX_LOG_SIZE;
use std::time::Duration;

/// Default delay between two polls of the log by one subscription.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Default capacity of each subscription's output buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Relay configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// How often each subscription checks the log for new events.
    /// Default: 200ms
    pub poll_interval: Duration,

    /// Events retained before the oldest are evicted.
    /// Default: 10,000
    pub max_log_size: usize,

    /// Max undelivered events buffered per subscriber; overflow waits in the log.
    /// Default: 1000
    pub buffer_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_log_size: DEFAULT_MAX_LOG_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl RelayConfig {
    /// Defaults overlaid with `POLL_INTERVAL_MS`, `MAX_LOG_SIZE` and
    /// `SUBSCRIPTION_BUFFER_SIZE` from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`RelayConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64, _>(&lookup, "POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(size) = parse_var(&lookup, "MAX_LOG_SIZE")? {
            config.max_log_size = size;
        }
        if let Some(size) = parse_var(&lookup, "SUBSCRIPTION_BUFFER_SIZE")? {
            config.buffer_size = size;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(RelayError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.max_log_size == 0 {
            return Err(RelayError::InvalidConfig(
                "max log size must be greater than zero".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(RelayError::InvalidConfig(
                "buffer size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| RelayError::InvalidConfig(format!("{key}={raw:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(200));
        assert_eq!(config.max_log_size, 10_000);
        assert_eq!(config.buffer_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lookup_overrides() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            ("POLL_INTERVAL_MS", "50"),
            ("MAX_LOG_SIZE", " 500 "),
        ]))
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.max_log_size, 500);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_unparseable_value() {
        let result = RelayConfig::from_lookup(lookup_from(&[("MAX_LOG_SIZE", "lots")]));
        assert!(matches!(result, Err(RelayError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_values_rejected() {
        let result = RelayConfig::from_lookup(lookup_from(&[("POLL_INTERVAL_MS", "0")]));
        assert!(matches!(result, Err(RelayError::InvalidConfig(_))));

        let config = RelayConfig {
            buffer_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RelayError::InvalidConfig(_))));
    }
}
