//! Application settings

use super::ConfigError;
use crate::core::decoder::DecoderConfig;
use crate::core::session::SessionConfig;
use crate::core::transport::SerialConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// CSV log file used when none is configured
pub const DEFAULT_CSV_PATH: &str = "signal_analysis_data.csv";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial port settings
    pub serial: SerialConfig,
    /// Decoder settings
    pub decoder: DecoderConfig,
    /// Poll loop settings
    pub session: SessionConfig,
    /// CSV log settings
    pub csv: CsvConfig,
}

impl AppConfig {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_optional(super::config_file().as_deref())
    }

    /// Load config from `path`, or use defaults when there is no location at all
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                warn!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load config from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = super::config_file().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(io_err)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// CSV log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// Append decoded packets to the log
    pub enabled: bool,
    /// Log file
    pub path: PathBuf,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(DEFAULT_CSV_PATH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::SerialParity;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.decoder.max_line_bytes, 64 * 1024);
        assert!(!config.decoder.reset_unstarted_sections_on_complete);
        assert_eq!(config.session.poll_interval_ms, 10);
        assert!(config.csv.enabled);
        assert_eq!(config.csv.path, PathBuf::from("signal_analysis_data.csv"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.serial.baud_rate, 115200);
    }

    #[test]
    fn test_no_config_location_gives_defaults() {
        let config = AppConfig::load_optional(None).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert!(config.csv.enabled);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[csv]\nenabled = false\n").unwrap();
        assert!(!AppConfig::load_optional(Some(&path)).unwrap().csv.enabled);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[serial]\nport = \"COM4\"\nparity = \"even\"\n\n[decoder]\nreset_unstarted_sections_on_complete = true\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.serial.port, "COM4");
        assert_eq!(config.serial.parity, SerialParity::Even);
        assert_eq!(config.serial.baud_rate, 115200);
        assert!(config.decoder.reset_unstarted_sections_on_complete);
        assert_eq!(config.decoder.max_line_bytes, 64 * 1024);
        assert!(config.csv.enabled);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.session.emit_queue_depth = 8;
        config.csv.enabled = false;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.session.emit_queue_depth, 8);
        assert!(!loaded.csv.enabled);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[serial\nport = 3").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
