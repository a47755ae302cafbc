use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// User configuration. Field names serialize in PascalCase so the file stays
/// readable by (and compatible with) the original agent's settings file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Settings {
    pub check_interval_hours: u32,
    pub show_notifications: bool,
    pub periodic_checks_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            check_interval_hours: 1,
            show_notifications: true,
            periodic_checks_enabled: true,
        }
    }
}

impl Settings {
    /// The interval floor is one hour; a zero from a hand-edited file is
    /// clamped rather than rejected.
    pub fn normalized(mut self) -> Self {
        if self.check_interval_hours == 0 {
            self.check_interval_hours = 1;
        }
        self
    }
}

/// Reloadable configuration seam. The scheduler re-reads through this after
/// every completed check, so edits apply on the next tick.
pub trait SettingsSource: Send + Sync {
    fn current(&self) -> Settings;
}

/// File-backed settings store. A missing or unreadable file yields defaults.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        config_root().join("butler").join("settings-v2.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Settings {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str::<Settings>(&text) {
                Ok(settings) => settings.normalized(),
                Err(error) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        %error,
                        "settings file unreadable; using defaults"
                    );
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        }
    }

    pub fn save(&self, settings: &Settings) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, json)
    }
}

impl SettingsSource for SettingsStore {
    fn current(&self) -> Settings {
        self.load()
    }
}

fn config_root() -> PathBuf {
    if let Some(appdata) = std::env::var_os("APPDATA") {
        return PathBuf::from(appdata);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg);
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".config");
    }
    PathBuf::from(".")
}
