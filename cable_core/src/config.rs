//! # Application Configuration
//!
//! Settings read from `cablecalc.toml`. Every key is optional; a missing
//! file means all defaults.
//!
//! ```toml
//! projects_dir = "/srv/projects/cables"
//! autosave_delay_ms = 600
//! user_id = "j.smith"
//! default_steady_vd_limit_pct = 5.0
//! default_starting_vd_limit_pct = 15.0
//! ```
//!
//! `CABLECALC_PROJECTS_DIR` overrides `projects_dir`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{CalcError, CalcResult};

/// Config file name looked up in the projects directory
pub const CONFIG_FILE_NAME: &str = "cablecalc.toml";

/// Environment variable overriding `projects_dir`
pub const PROJECTS_DIR_ENV: &str = "CABLECALC_PROJECTS_DIR";

const DEFAULT_PROJECTS_DIR_NAME: &str = "CableCalcProjects";

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

fn default_projects_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_PROJECTS_DIR_NAME)
}

fn default_autosave_delay_ms() -> u64 {
    600
}

fn default_user_id() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn default_steady_vd_limit_pct() -> f64 {
    5.0
}

fn default_starting_vd_limit_pct() -> f64 {
    15.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where project workbooks live
    #[serde(default = "default_projects_dir")]
    pub projects_dir: PathBuf,
    /// Quiet period before an edit is autosaved
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,
    /// Shown to other users when this user holds a project lock
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Steady-state voltage drop limit pre-filled into new calculations, %
    #[serde(default = "default_steady_vd_limit_pct")]
    pub default_steady_vd_limit_pct: f64,
    /// Starting voltage drop limit pre-filled into new calculations, %
    #[serde(default = "default_starting_vd_limit_pct")]
    pub default_starting_vd_limit_pct: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            projects_dir: default_projects_dir(),
            autosave_delay_ms: default_autosave_delay_ms(),
            user_id: default_user_id(),
            default_steady_vd_limit_pct: default_steady_vd_limit_pct(),
            default_starting_vd_limit_pct: default_starting_vd_limit_pct(),
        }
    }
}

impl AppConfig {
    /// Parse TOML text; absent keys take their defaults.
    pub fn from_toml_str(text: &str) -> CalcResult<Self> {
        toml::from_str(text).map_err(|e| CalcError::serialization(format!("Invalid config: {}", e)))
    }

    /// Load from an explicit file. A missing file gives the defaults.
    pub fn load_from(path: &Path) -> CalcResult<Self> {
        let config = match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                AppConfig::default()
            }
            Err(e) => {
                return Err(CalcError::file_error("read config", path.display().to_string(), e.to_string()));
            }
        };
        Ok(config.with_env_overrides())
    }

    /// Load `cablecalc.toml` from the projects directory (after applying
    /// the environment override to find it).
    pub fn load() -> CalcResult<Self> {
        let dir = std::env::var_os(PROJECTS_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_projects_dir);
        Self::load_from(&dir.join(CONFIG_FILE_NAME))
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os(PROJECTS_DIR_ENV).filter(|d| !d.is_empty()) {
            self.projects_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn to_toml_string(&self) -> CalcResult<String> {
        toml::to_string_pretty(self).map_err(|e| CalcError::serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml_str("autosave_delay_ms = 250\nuser_id = \"j.smith\"").unwrap();
        assert_eq!(config.autosave_delay(), Duration::from_millis(250));
        assert_eq!(config.user_id, "j.smith");
        assert_eq!(config.default_steady_vd_limit_pct, 5.0);
        assert_eq!(config.default_starting_vd_limit_pct, 15.0);
    }

    #[test]
    fn test_invalid_toml() {
        let err = AppConfig::from_toml_str("autosave_delay_ms = \"soon\"").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig {
            projects_dir: PathBuf::from("/srv/cables"),
            ..AppConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(AppConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.autosave_delay_ms, 600);
    }
}
