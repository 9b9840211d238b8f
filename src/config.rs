use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::aggregate::{AverageRounding, ScoreAggregator};
use crate::app_dirs::AppDirs;
use crate::error::ConfigError;
use crate::machine::RoundStateMachine;
use crate::projection::{DEFAULT_MAP_HEIGHT_PX, DEFAULT_MAP_WIDTH_PX};
use crate::score::{ScoreCalculator, DEFAULT_SIGMA_METERS};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub sigma_meters: f64,
    pub average_rounding: AverageRounding,
    pub map_width_px: u32,
    pub map_height_px: u32,
    pub dataset_path: PathBuf,
    pub images_dir: PathBuf,
    pub record_history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sigma_meters: DEFAULT_SIGMA_METERS,
            average_rounding: AverageRounding::default(),
            map_width_px: DEFAULT_MAP_WIDTH_PX,
            map_height_px: DEFAULT_MAP_HEIGHT_PX,
            dataset_path: PathBuf::from("dataset/coords.csv"),
            images_dir: PathBuf::from("dataset/images"),
            record_history: true,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ScoreCalculator::new(self.sigma_meters)?;
        if self.map_width_px == 0 || self.map_height_px == 0 {
            return Err(ConfigError::InvalidMapSize {
                width: self.map_width_px,
                height: self.map_height_px,
            });
        }
        Ok(())
    }

    /// Build the state machine for these scoring rules.
    pub fn machine(&self) -> Result<RoundStateMachine, ConfigError> {
        self.validate()?;
        Ok(RoundStateMachine::new(
            ScoreCalculator::new(self.sigma_meters)?,
            ScoreAggregator::new(self.average_rounding),
        ))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("geoguess_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing or unreadable files fall back to defaults.
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) if cfg.validate().is_ok() => cfg,
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "ignoring invalid config file");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        cfg.validate()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
