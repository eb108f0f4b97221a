//! Configuration types for the inspection station.
//!
//! Configuration lives in `<root>/.qcflow/config.toml`. Every section and
//! key is optional; missing keys keep their defaults. Paths derived from the
//! root are always recomputed, never read from the file.

use crate::error::{QcError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory under the root holding configuration and data.
pub const QCFLOW_DIR: &str = ".qcflow";

/// File name of the session snapshot inside the data directory.
pub const SNAPSHOT_FILE: &str = "session.json";

/// Configuration file written by `qcflow init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# qcflow station configuration

[station]
# project_id = 28
# technician_id = 4

[storage]
# data_dir = ".qcflow/data"

[guidance]
# template_dir = ".qcflow/templates"

[timer]
tick_ms = 1000

[location]
# latitude = 19.4326
# longitude = -99.1332
# accuracy = 12.0
"#;

/// Main station configuration.
///
/// Built with [`QcConfig::new`] for defaults or [`QcConfig::load`] to apply
/// the configuration file on top of them.
#[derive(Debug, Clone, PartialEq)]
pub struct QcConfig {
    /// Station root directory.
    pub root: PathBuf,

    /// Path to the configuration file (`.qcflow/config.toml`).
    pub config_file: PathBuf,

    /// Directory for audit records, progress and the session snapshot.
    pub data_dir: PathBuf,

    /// Path to the session snapshot.
    pub snapshot_file: PathBuf,

    /// Station identity and counter settings.
    pub station: StationConfig,

    /// Guidance template settings.
    pub guidance: GuidanceConfig,

    /// Timer display settings.
    pub timer: TimerConfig,

    /// Fixed station coordinates.
    pub location: LocationConfig,
}

impl QcConfig {
    /// Creates a configuration with defaults for `root`.
    pub fn new(root: PathBuf) -> Self {
        let data_dir = root.join(QCFLOW_DIR).join("data");
        Self {
            config_file: root.join(QCFLOW_DIR).join("config.toml"),
            snapshot_file: data_dir.join(SNAPSHOT_FILE),
            data_dir,
            root,
            station: StationConfig::default(),
            guidance: GuidanceConfig::default(),
            timer: TimerConfig::default(),
            location: LocationConfig::default(),
        }
    }

    /// Loads `<root>/.qcflow/config.toml` over the defaults.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `QcError::ConfigParseError` for malformed TOML and
    /// `QcError::InvalidConfig` for values rejected by [`validate`](Self::validate).
    pub fn load(root: PathBuf) -> Result<Self> {
        let mut config = Self::new(root);
        if !config.config_file.exists() {
            tracing::debug!(path = %config.config_file.display(), "no config file, using defaults");
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config.config_file)?;
        let file: ConfigFile = toml::from_str(&content).map_err(|e| {
            QcError::ConfigParseError(format!("{}: {}", config.config_file.display(), e))
        })?;

        config.station = file.station;
        config.guidance = file.guidance;
        config.timer = file.timer;
        config.location = file.location;
        if let Some(data_dir) = file.storage.data_dir {
            config.data_dir = config.resolve(&data_dir);
            config.snapshot_file = config.data_dir.join(SNAPSHOT_FILE);
        }
        if let Some(template_dir) = config.guidance.template_dir.take() {
            config.guidance.template_dir = Some(config.resolve(&template_dir));
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `QcError::InvalidConfig` for a zero `tick_ms`, or
    /// coordinates given without their pair.
    pub fn validate(&self) -> Result<()> {
        if self.timer.tick_ms == 0 {
            return Err(QcError::InvalidConfig("timer.tick_ms must be at least 1".into()));
        }
        if self.location.latitude.is_some() != self.location.longitude.is_some() {
            return Err(QcError::InvalidConfig(
                "location.latitude and location.longitude must be set together".into(),
            ));
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Station identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Project to check in to when none is given on the command line.
    pub project_id: Option<i64>,

    /// Technician recorded on checkpoints and quality answers.
    pub technician_id: Option<i64>,
}

/// Where audit data is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory; relative paths are resolved against the root.
    pub data_dir: Option<PathBuf>,
}

/// Guidance template settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// Directory whose `.j2` files override the built-in guidance.
    pub template_dir: Option<PathBuf>,
}

/// Timer display settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Interval between elapsed-time display refreshes.
    pub tick_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self { tick_ms: 1000 }
    }
}

/// Fixed coordinates for stations without a location service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
}

/// On-disk shape of `config.toml`. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    station: StationConfig,
    storage: StorageConfig,
    guidance: GuidanceConfig,
    timer: TimerConfig,
    location: LocationConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = QcConfig::new(PathBuf::from("/station"));
        assert_eq!(config.config_file, PathBuf::from("/station/.qcflow/config.toml"));
        assert_eq!(config.data_dir, PathBuf::from("/station/.qcflow/data"));
        assert_eq!(
            config.snapshot_file,
            PathBuf::from("/station/.qcflow/data/session.json")
        );
        assert_eq!(config.timer.tick_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_toml_parses_to_defaults() {
        let file: ConfigFile = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(file.station, StationConfig::default());
        assert_eq!(file.timer, TimerConfig::default());
        assert_eq!(file.location, LocationConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_tick() {
        let mut config = QcConfig::new(PathBuf::from("/station"));
        config.timer.tick_ms = 0;
        assert!(matches!(config.validate(), Err(QcError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_half_coordinates() {
        let mut config = QcConfig::new(PathBuf::from("/station"));
        config.location.latitude = Some(19.4);
        assert!(matches!(config.validate(), Err(QcError::InvalidConfig(_))));
    }
}
