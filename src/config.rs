use crate::model::{MAX_VOLUME, Settings};
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const APP_DIR: &str = "playdeck";
const SETTINGS_FILE: &str = "settings.json";
const DEFAULT_LIBRARY_DIR: &str = "Playlist";

pub const CONFIG_DIR_ENV: &str = "PLAYDECK_CONFIG_DIR";
pub const LIBRARY_DIR_ENV: &str = "PLAYDECK_LIBRARY_DIR";

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

/// Library directory from the environment, falling back to `./Playlist`.
pub fn default_library_dir() -> PathBuf {
    env::var(LIBRARY_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LIBRARY_DIR))
}

/// Reads the settings file. A missing file yields defaults; a malformed one
/// yields defaults and a warning.
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read settings, using defaults");
            return Settings::default();
        }
    };

    match serde_json::from_str::<Settings>(&raw) {
        Ok(settings) => settings.clamped(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "malformed settings file, using defaults");
            Settings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&settings.clamped())?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub trait SettingsStore: Send {
    fn volume(&self) -> u8;
    fn set_volume(&mut self, volume: u8) -> Result<()>;
    fn shuffle(&self) -> bool;
    fn set_shuffle(&mut self, shuffle: bool) -> Result<()>;
}

/// Settings persisted as a flat JSON record, re-read on every access.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn update(&self, apply: impl FnOnce(&mut Settings)) -> Result<()> {
        let mut settings = load_settings(&self.path);
        apply(&mut settings);
        save_settings(&self.path, &settings)
    }
}

impl SettingsStore for JsonSettingsStore {
    fn volume(&self) -> u8 {
        load_settings(&self.path).volume
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        self.update(|settings| settings.volume = volume.min(MAX_VOLUME))
    }

    fn shuffle(&self) -> bool {
        load_settings(&self.path).is_shuffling
    }

    fn set_shuffle(&mut self, shuffle: bool) -> Result<()> {
        self.update(|settings| settings.is_shuffling = shuffle)
    }
}
