use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

const SETTINGS_ENV: &str = "FASTWAY_SETTINGS";
const APP_DIR: &str = "fastway";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HistoryBackend {
    Memory,
    Sqlite,
}

impl Default for HistoryBackend {
    fn default() -> Self {
        HistoryBackend::Memory
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FastSettings {
    pub tick_interval_ms: u64,
    pub history_backend: HistoryBackend,
    /// Only read when `history_backend` is `sqlite`.
    pub database_path: Option<PathBuf>,
}

impl Default for FastSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            history_backend: HistoryBackend::Memory,
            database_path: None,
        }
    }
}

impl FastSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<FastSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            FastSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> FastSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: FastSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    /// Writes the current settings out if no file exists yet, so there is
    /// something to edit. Returns whether a file was written.
    pub fn write_defaults_if_missing(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.update(self.settings())?;
        Ok(true)
    }

    /// Database location: the configured path, else next to the settings file.
    pub fn database_path(&self) -> PathBuf {
        match &self.read().database_path {
            Some(path) => path.clone(),
            None => self.path.with_file_name("fastway.sqlite3"),
        }
    }

    fn persist(&self, data: &FastSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, FastSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, FastSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `$FASTWAY_SETTINGS`, else `<data dir>/fastway/settings.json`.
pub fn default_settings_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(SETTINGS_ENV) {
        return Ok(PathBuf::from(path));
    }

    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join("settings.json"))
        .ok_or_else(|| anyhow!("no data directory available; set {SETTINGS_ENV}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.settings(), FastSettings::default());
        assert_eq!(store.settings().tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let settings = FastSettings {
            tick_interval_ms: 250,
            history_backend: HistoryBackend::Sqlite,
            database_path: None,
        };
        store.update(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.settings(), settings);
    }

    #[test]
    fn first_run_writes_defaults_once() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        assert!(store.write_defaults_if_missing().unwrap());
        assert!(store.path().exists());
        assert!(!store.write_defaults_if_missing().unwrap());

        let written = SettingsStore::new(store.path().to_path_buf()).unwrap();
        assert_eq!(written.settings(), FastSettings::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "historyBackend": "sqlite" }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().settings();
        assert_eq!(settings.history_backend, HistoryBackend::Sqlite);
        assert_eq!(settings.tick_interval_ms, 1000);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        assert_eq!(
            SettingsStore::new(path).unwrap().settings(),
            FastSettings::default()
        );
    }

    #[test]
    fn database_defaults_next_to_settings() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.database_path(), dir.path().join("fastway.sqlite3"));
    }
}
