//! File logging. The terminal belongs to the UI, so tracing output goes to
//! $XDG_CONFIG_HOME/sentinel/sentinel.log. Filter via `SENTINEL_LOG` (default `info`).

use std::{fs, path::PathBuf, sync::Mutex};

use tracing_subscriber::EnvFilter;

use crate::config::config_dir;

pub fn log_path() -> PathBuf {
    config_dir().join("sentinel.log")
}

pub fn init() -> std::io::Result<PathBuf> {
    let path = log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
    let filter = EnvFilter::try_from_env("SENTINEL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    // a second init (tests, demo restarts) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(path)
}
