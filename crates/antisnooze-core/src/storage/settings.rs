//! JSON persistence for the user's alarm settings.
//!
//! Settings are small and rewritten whole on every change, so a plain
//! JSON file at `~/.config/antisnooze/settings.json` is enough. The file
//! uses the same camelCase field names as the sync wire format, so a
//! payload received from the companion can be stored as-is.

use std::path::{Path, PathBuf};

use crate::alarm::AlarmSettings;
use crate::error::StorageError;

use super::data_dir;

/// File-backed store for [`AlarmSettings`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store at the default location under the data directory.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn open_default() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::ReadFailed {
            path: PathBuf::from("~/.config/antisnooze"),
            message: e.to_string(),
        })?;
        Ok(Self::at(dir.join("settings.json")))
    }

    /// Store at an explicit file path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored settings. A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<AlarmSettings, StorageError> {
        if !self.path.exists() {
            return Ok(AlarmSettings::default());
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| StorageError::ReadFailed {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        serde_json::from_str(&content).map_err(|e| StorageError::ReadFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Replace the stored settings.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, settings: &AlarmSettings) -> Result<(), StorageError> {
        let content =
            serde_json::to_string_pretty(settings).map_err(|e| StorageError::WriteFailed {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        std::fs::write(&self.path, content).map_err(|e| StorageError::WriteFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::VibrationIntensity;
    use chrono::NaiveTime;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::at(dir.path().join("settings.json"));
        let settings = store.load().unwrap();
        assert_eq!(settings, AlarmSettings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::at(dir.path().join("settings.json"));

        let settings = AlarmSettings {
            wake_up_time: NaiveTime::from_hms_opt(5, 45, 0).unwrap(),
            is_active: true,
            vibration_intensity: VibrationIntensity::Strong,
            repeat_days: [true, false, false, false, false, false, true],
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn corrupt_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();

        let store = SettingsStore::at(path);
        assert!(matches!(
            store.load(),
            Err(StorageError::ReadFailed { .. })
        ));
    }
}
