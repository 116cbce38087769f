use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use validator::Validate;

use crate::core::client::cluster_client::DeleteOptions;
use crate::errors::DaoError;

/// Runtime knobs for the resource core, read from `KDASH_*` env vars.
#[derive(Debug, Clone, Validate)]
pub struct CoreConfig {
    /// Consecutive resubscribe failures before a cache is flagged stale.
    #[validate(range(min = 1))]
    pub watch_stale_threshold: u32,
    #[validate(range(min = 1))]
    pub watch_backoff_base_ms: u64,
    #[validate(range(min = 1))]
    pub watch_backoff_max_ms: u64,
    #[validate(range(min = 1))]
    pub watch_sync_timeout_ms: u64,
    /// Capacity of a log tail queue; producers block when it is full.
    #[validate(range(min = 1))]
    pub log_buffer: usize,
    #[validate(range(min = 0))]
    pub log_tail_lines: i64,
    pub delete_grace_seconds: Option<u32>,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            watch_stale_threshold: 5,
            watch_backoff_base_ms: 500,
            watch_backoff_max_ms: 30_000,
            watch_sync_timeout_ms: 10_000,
            log_buffer: 100,
            log_tail_lines: 100,
            delete_grace_seconds: None,
            log_dir: default_log_dir(),
            log_level: "info".into(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    env::var("HOME")
        .map(|home| PathBuf::from(home).join(".kdash").join("logs"))
        .unwrap_or_else(|_| PathBuf::from("logs"))
}

/// Watch/cache settings handed to the factory.
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    pub stale_threshold: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub sync_timeout: Duration,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        CoreConfig::default().factory_config()
    }
}

/// Log tailing settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub buffer: usize,
    pub tail_lines: i64,
}

impl Default for LogConfig {
    fn default() -> Self {
        CoreConfig::default().log_config()
    }
}

impl CoreConfig {
    /// Load `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self, DaoError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DaoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            watch_stale_threshold: parse_or(&lookup, "KDASH_WATCH_STALE_THRESHOLD", defaults.watch_stale_threshold)?,
            watch_backoff_base_ms: parse_or(&lookup, "KDASH_WATCH_BACKOFF_BASE_MS", defaults.watch_backoff_base_ms)?,
            watch_backoff_max_ms: parse_or(&lookup, "KDASH_WATCH_BACKOFF_MAX_MS", defaults.watch_backoff_max_ms)?,
            watch_sync_timeout_ms: parse_or(&lookup, "KDASH_WATCH_SYNC_TIMEOUT_MS", defaults.watch_sync_timeout_ms)?,
            log_buffer: parse_or(&lookup, "KDASH_LOG_BUFFER", defaults.log_buffer)?,
            log_tail_lines: parse_or(&lookup, "KDASH_LOG_TAIL_LINES", defaults.log_tail_lines)?,
            delete_grace_seconds: match lookup("KDASH_DELETE_GRACE_SECONDS") {
                Some(raw) => Some(parse_value("KDASH_DELETE_GRACE_SECONDS", &raw)?),
                None => defaults.delete_grace_seconds,
            },
            log_dir: lookup("KDASH_LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            log_level: lookup("KDASH_LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        config
            .validate()
            .map_err(|e| DaoError::Config(e.to_string()))?;

        if config.watch_backoff_max_ms < config.watch_backoff_base_ms {
            return Err(DaoError::Config(format!(
                "KDASH_WATCH_BACKOFF_MAX_MS ({}) is below KDASH_WATCH_BACKOFF_BASE_MS ({})",
                config.watch_backoff_max_ms, config.watch_backoff_base_ms
            )));
        }

        Ok(config)
    }

    pub fn factory_config(&self) -> FactoryConfig {
        FactoryConfig {
            stale_threshold: self.watch_stale_threshold,
            backoff_base: Duration::from_millis(self.watch_backoff_base_ms),
            backoff_max: Duration::from_millis(self.watch_backoff_max_ms),
            sync_timeout: Duration::from_millis(self.watch_sync_timeout_ms),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            buffer: self.log_buffer,
            tail_lines: self.log_tail_lines,
        }
    }

    /// Delete options carrying the configured grace period and no propagation override.
    pub fn delete_options(&self) -> DeleteOptions {
        DeleteOptions {
            propagation: None,
            grace_period_seconds: self.delete_grace_seconds,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, DaoError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, DaoError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| DaoError::Config(format!("{key}={raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_keys_fall_back_to_defaults() {
        let config = CoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.watch_stale_threshold, 5);
        assert_eq!(config.log_buffer, 100);
        assert_eq!(config.delete_grace_seconds, None);
        assert_eq!(config.factory_config().backoff_base, Duration::from_millis(500));
    }

    #[test]
    fn env_values_override_defaults() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            ("KDASH_WATCH_STALE_THRESHOLD", "3"),
            ("KDASH_LOG_BUFFER", " 16 "),
            ("KDASH_DELETE_GRACE_SECONDS", "0"),
            ("KDASH_LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.watch_stale_threshold, 3);
        assert_eq!(config.log_config().buffer, 16);
        assert_eq!(config.delete_options().grace_period_seconds, Some(0));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let err = CoreConfig::from_lookup(lookup_from(&[("KDASH_WATCH_STALE_THRESHOLD", "0")]))
            .unwrap_err();
        assert!(matches!(err, DaoError::Config(_)));
    }

    #[test]
    fn backoff_max_below_base_is_rejected() {
        let err = CoreConfig::from_lookup(lookup_from(&[
            ("KDASH_WATCH_BACKOFF_BASE_MS", "1000"),
            ("KDASH_WATCH_BACKOFF_MAX_MS", "10"),
        ]))
        .unwrap_err();
        assert!(matches!(err, DaoError::Config(_)));
    }

    #[test]
    fn garbage_values_name_the_key() {
        let err = CoreConfig::from_lookup(lookup_from(&[("KDASH_LOG_BUFFER", "lots")])).unwrap_err();
        assert!(err.to_string().contains("KDASH_LOG_BUFFER"));
    }
}
