//! Settings for push coordination.
//!
//! Settings are read from a TOML file. Missing keys fall back to the
//! defaults below, and a missing default file means all defaults.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Repository whose branches are merged without a repo prefix
    pub main_repository: String,
    /// Remote holding deploy branches
    pub remote: String,
    /// Command run after merging when localization changes are present
    pub localization_step: String,
    /// Base token of the merge command
    pub merge_command: String,
    /// Seconds between checklist refreshes
    pub checklist_interval_secs: u64,
    /// JSON file backing the push store
    pub state_file: PathBuf,
    /// Acting user
    pub user: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            main_repository: "main".to_string(),
            remote: "canon".to_string(),
            localization_step: "localizables_push_website.py".to_string(),
            merge_command: "merge-branches".to_string(),
            checklist_interval_secs: 30,
            state_file: default_state_file(),
            user: std::env::var("USER").unwrap_or_else(|_| "pushmaster".to_string()),
        }
    }
}

fn default_state_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pushmanager")
        .join("state.json")
}

/// Location of the default settings file, if a config dir exists
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pushmanager").join("config.toml"))
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present, otherwise defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::InvalidArguments {
                        reason: format!("config file {} does not exist", path.display()),
                    }
                    .into());
                }
                Self::from_file(path)
            }
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Checklist refresh period, at least one second
    pub fn checklist_interval(&self) -> Duration {
        Duration::from_secs(self.checklist_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "main_repository = \"www\"\nchecklist_interval_secs = 5").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.main_repository, "www");
        assert_eq!(settings.checklist_interval(), Duration::from_secs(5));
        assert_eq!(settings.merge_command, "merge-branches");
        assert_eq!(settings.remote, "canon");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_zero_interval_clamped() {
        let settings = Settings {
            checklist_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(settings.checklist_interval(), Duration::from_secs(1));
    }
}
