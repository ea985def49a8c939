//! Client settings: refresh cadence, cache lifetimes and chart transition timing.
//!
//! Read from $XDG_CONFIG_HOME/sentinel/settings.json (every field optional), then
//! overridden by `SENTINEL_*` environment variables.

use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::chart::animation::TransitionConfig;
use crate::series::CacheTtl;

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("sentinel")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sentinel")
    }
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub metrics_refresh_secs: u64,
    pub logs_refresh_secs: u64,
    pub sync_check_secs: u64,
    pub live_cache_secs: u64,
    pub historical_cache_secs: u64,
    pub contract_ms: u64,
    pub expand_ms: u64,
    pub recent_log_limit: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            metrics_refresh_secs: 10,
            logs_refresh_secs: 5,
            sync_check_secs: 30,
            live_cache_secs: 10,
            historical_cache_secs: 300,
            contract_ms: 180,
            expand_ms: 450,
            recent_log_limit: 100,
        }
    }
}

impl Settings {
    /// File, then environment. A missing or malformed file yields defaults.
    pub fn load() -> Self {
        let path = settings_path();
        let mut s = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
                Settings::default()
            }),
            Err(_) => Settings::default(),
        };
        s.apply_env(|k| std::env::var(k).ok());
        s
    }

    /// Apply `SENTINEL_*` overrides; `get` looks a variable up by name.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, get: F) {
        let num = |key: &str| get(key).and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(v) = num("SENTINEL_METRICS_REFRESH_SECS") {
            self.metrics_refresh_secs = v.max(1);
        }
        if let Some(v) = num("SENTINEL_LOGS_REFRESH_SECS") {
            self.logs_refresh_secs = v.max(1);
        }
        if let Some(v) = num("SENTINEL_SYNC_CHECK_SECS") {
            self.sync_check_secs = v.max(1);
        }
        if let Some(v) = num("SENTINEL_CONTRACT_MS") {
            self.contract_ms = v;
        }
        if let Some(v) = num("SENTINEL_EXPAND_MS") {
            self.expand_ms = v;
        }
    }

    pub fn metrics_refresh(&self) -> Duration {
        Duration::from_secs(self.metrics_refresh_secs.max(1))
    }

    pub fn logs_refresh(&self) -> Duration {
        Duration::from_secs(self.logs_refresh_secs.max(1))
    }

    pub fn sync_check(&self) -> Duration {
        Duration::from_secs(self.sync_check_secs.max(1))
    }

    pub fn cache_ttl(&self) -> CacheTtl {
        CacheTtl {
            live: Duration::from_secs(self.live_cache_secs),
            historical: Duration::from_secs(self.historical_cache_secs),
        }
    }

    pub fn transition(&self) -> TransitionConfig {
        TransitionConfig {
            contract: Duration::from_millis(self.contract_ms),
            expand: Duration::from_millis(self.expand_ms),
        }
    }
}
