mod config;
mod settings;

pub use config::{Config, NotificationsConfig, PersistenceConfig, SchedulerConfig};
pub use settings::{
    FileSettingsStore, MemorySettingsStore, Settings, SettingsStore, Theme, SETTINGS_KEY,
};

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/timekeeper[-dev]/` based on TIMEKEEPER_ENV.
///
/// Set TIMEKEEPER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TIMEKEEPER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timekeeper-dev")
    } else {
        base_dir.join("timekeeper")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
