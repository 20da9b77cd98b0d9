mod config;
mod history;
mod settings;

pub use config::Config;
pub use history::HistoryDb;
pub use settings::SettingsStore;

use std::path::PathBuf;

/// Returns `~/.config/antisnooze[-dev]/` based on ANTISNOOZE_ENV.
///
/// Set ANTISNOOZE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("ANTISNOOZE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("antisnooze-dev")
    } else {
        base_dir.join("antisnooze")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
