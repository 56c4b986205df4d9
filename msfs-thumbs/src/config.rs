//! Engine configuration.
//!
//! Tunables for the negative cache, the save throttle and the background job
//! pool. Stored as JSON in the app data directory; every field has a default
//! so a partial or missing file is fine.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::app_dirs;
use crate::core::clock::HOUR_MS;
use crate::logger;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a "no thumbnail" result is trusted before rescanning
    pub negative_ttl_hours: u64,
    /// Minimum spacing between two throttled saves
    pub save_throttle_ms: u64,
    /// Lower bound for the deferred flush delay
    pub flush_min_delay_ms: u64,
    /// Upper bound for the deferred flush delay
    pub flush_max_delay_ms: u64,
    /// Tolerance when comparing a cached mtime with the file on disk
    pub mtime_epsilon_ms: i64,
    /// Simultaneous background discoveries
    pub max_concurrent_jobs: usize,
    /// Override for the cache directory (defaults to the app data dir)
    pub cache_dir: Option<PathBuf>,
    pub debug_logging: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            negative_ttl_hours: 6,
            save_throttle_ms: 500,
            flush_min_delay_ms: 50,
            flush_max_delay_ms: 1000,
            mtime_epsilon_ms: 86,
            max_concurrent_jobs: 3,
            cache_dir: None,
            debug_logging: false,
        }
    }
}

impl EngineConfig {
    /// Load from the default location, falling back to defaults on any error
    pub fn load() -> Self {
        Self::load_from(&app_dirs::get_config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match Self::load_internal(path) {
            Ok(config) => config,
            Err(e) => {
                logger::log_debug(
                    &format!("Failed to load config, using defaults: {}", e),
                    Some("config"),
                );
                Self::default()
            }
        }
    }

    fn load_internal(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config.sanitized())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Clamp values that would break the throttle or job pool
    fn sanitized(mut self) -> Self {
        self.max_concurrent_jobs = self.max_concurrent_jobs.max(1);
        self.flush_max_delay_ms = self.flush_max_delay_ms.max(self.flush_min_delay_ms);
        self.mtime_epsilon_ms = self.mtime_epsilon_ms.max(0);
        self
    }

    /// Saturates instead of overflowing for absurd hour counts
    pub fn negative_ttl_ms(&self) -> i64 {
        i64::try_from(self.negative_ttl_hours)
            .ok()
            .and_then(|hours| hours.checked_mul(HOUR_MS))
            .unwrap_or(i64::MAX)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(app_dirs::get_cache_dir)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.save_throttle_ms)
    }

    pub fn flush_window(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.flush_min_delay_ms),
            Duration::from_millis(self.flush_max_delay_ms),
        )
    }
}
