use super::GlobalSettings;
use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Default settings file name, looked up in the current directory.
pub const DEFAULT_SETTINGS_FILE: &str = "itest-runner.toml";

/// Loads and persists [`GlobalSettings`].
pub struct SettingsLoader {
    /// Path to the settings file.
    config_file: Option<PathBuf>,
    /// Whether a missing settings file falls back to defaults.
    allow_missing: bool,
    /// Whether `ITEST_RUNNER_*` overrides are applied.
    use_env: bool,
}

impl SettingsLoader {
    /// Create a new settings loader.
    pub fn new() -> Self {
        Self {
            config_file: None,
            allow_missing: false,
            use_env: true,
        }
    }

    /// Set the settings file path.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Treat a missing settings file as empty instead of an error.
    pub fn allow_missing(mut self) -> Self {
        self.allow_missing = true;
        self
    }

    /// Disable `ITEST_RUNNER_*` environment overrides.
    pub fn no_env_overrides(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Load settings from all enabled sources.
    ///
    /// Priority (later sources override earlier):
    /// 1. Default values
    /// 2. Settings TOML file
    /// 3. Individual env var overrides (`ITEST_RUNNER_*`)
    pub fn load(self) -> Result<GlobalSettings> {
        let mut settings = GlobalSettings::default();

        if let Some(ref path) = self.config_file {
            if path.exists() {
                settings = GlobalSettings::from_toml_file(path)?;
                log::debug!("loaded settings from {}", path.display());
            } else if self.allow_missing {
                log::debug!("{} not found, using default settings", path.display());
            } else {
                return Err(Error::config(format!(
                    "settings file not found: {}",
                    path.display()
                )));
            }
        }

        if self.use_env {
            super::env::apply_env_overrides(&mut settings);
        }

        Ok(settings)
    }

    /// Persist settings to a TOML file, creating parent directories as needed.
    pub fn save(path: &Path, settings: &GlobalSettings) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                crate::util::ensure_dir_exists(parent)?;
            }
        }
        let content = toml::to_string_pretty(settings)?;
        std::fs::write(path, content)?;
        log::info!("saved settings to {}", path.display());
        Ok(())
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}
