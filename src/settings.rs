use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Remembered sensor connection. Not consulted by the engine itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    pub last_connection: Option<String>,
    pub auto_connect: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSettings {
    #[serde(default)]
    connection: ConnectionSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    /// Read settings from `path`. A missing or unreadable file yields defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring corrupt settings file {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn connection(&self) -> ConnectionSettings {
        self.read().connection.clone()
    }

    pub fn update_connection(&self, settings: ConnectionSettings) -> Result<()> {
        let mut guard = self.write();
        guard.connection = settings;
        self.persist(&guard)
    }

    /// Record the connection that was just used, keeping the auto-connect flag.
    pub fn remember_connection(&self, connection: &str) -> Result<()> {
        let mut guard = self.write();
        if guard.connection.last_connection.as_deref() == Some(connection) {
            return Ok(());
        }
        guard.connection.last_connection = Some(connection.to_string());
        self.persist(&guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.connection(), ConnectionSettings::default());
    }

    #[test]
    fn test_update_is_written_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        let settings = ConnectionSettings {
            last_connection: Some("/dev/ttyACM0".into()),
            auto_connect: true,
        };
        store.update_connection(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.connection(), settings);
    }

    #[test]
    fn test_remember_connection_keeps_flag() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        store
            .update_connection(ConnectionSettings {
                last_connection: None,
                auto_connect: true,
            })
            .unwrap();

        store.remember_connection("/dev/ttyUSB1").unwrap();

        let connection = store.connection();
        assert_eq!(connection.last_connection.as_deref(), Some("/dev/ttyUSB1"));
        assert!(connection.auto_connect);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.connection(), ConnectionSettings::default());
    }
}
