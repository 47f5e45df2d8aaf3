//! Server configuration
//!
//! Built-in defaults are layered under `GAMESCORE_*` environment variables.
//! Nested keys use a double underscore, e.g.
//! `GAMESCORE_CACHE__SCOREBOARD_TTL_SECS=5`.

use anyhow::{Context, Result};
use gamescore_core::RateLimitPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bind_address: String,
    pub data_dir: PathBuf,
    /// Defaults to `<data_dir>/gamescore.db`
    pub database_path: Option<String>,
    /// Interval between `: keepalive` comments on event streams
    pub keepalive_secs: u64,
    pub cache: CacheSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub events_list_size: usize,
    pub events_list_ttl_secs: u64,
    pub event_detail_size: usize,
    pub event_detail_ttl_secs: u64,
    pub scoreboard_size: usize,
    pub scoreboard_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub window_secs: u64,
    pub scoreboard_limit: u32,
    pub stream_limit: u32,
    pub scores_limit: u32,
    pub create_event_limit: u32,
    pub cleanup_interval_secs: u64,
}

impl RateLimitSettings {
    fn policy(&self, limit: u32) -> RateLimitPolicy {
        RateLimitPolicy::new(limit, Duration::from_secs(self.window_secs))
    }

    pub fn scoreboard(&self) -> RateLimitPolicy {
        self.policy(self.scoreboard_limit)
    }

    pub fn stream(&self) -> RateLimitPolicy {
        self.policy(self.stream_limit)
    }

    pub fn scores(&self) -> RateLimitPolicy {
        self.policy(self.scores_limit)
    }

    pub fn create_event(&self) -> RateLimitPolicy {
        self.policy(self.create_event_limit)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            data_dir: PathBuf::from("./data"),
            database_path: None,
            keepalive_secs: 30,
            cache: CacheSettings {
                events_list_size: 50,
                events_list_ttl_secs: 30,
                event_detail_size: 100,
                event_detail_ttl_secs: 60,
                scoreboard_size: 200,
                scoreboard_ttl_secs: 10,
            },
            rate_limit: RateLimitSettings {
                window_secs: 60,
                scoreboard_limit: 60,
                stream_limit: 120,
                scores_limit: 60,
                create_event_limit: 10,
                cleanup_interval_secs: 5 * 60,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        info!("Loading configuration from environment...");

        let defaults = ::config::Config::try_from(&Config::default())
            .context("Failed to build default configuration")?;

        let settings = ::config::Config::builder()
            .add_source(defaults)
            .add_source(
                ::config::Environment::with_prefix("GAMESCORE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn database_path(&self) -> String {
        self.database_path.clone().unwrap_or_else(|| {
            self.data_dir
                .join("gamescore.db")
                .to_string_lossy()
                .to_string()
        })
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.keepalive(), Duration::from_secs(30));
        assert_eq!(config.rate_limit.stream().limit, 120);
        assert_eq!(config.rate_limit.scoreboard().window, Duration::from_secs(60));
        assert!(config.database_path().ends_with("gamescore.db"));
    }

    #[test]
    fn test_explicit_database_path_wins() {
        let config = Config {
            database_path: Some("/tmp/scores.db".to_string()),
            ..Config::default()
        };
        assert_eq!(config.database_path(), "/tmp/scores.db");
    }
}
