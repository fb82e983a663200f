//! Configuration file support for Dosekit.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/dosekit/config.toml`.

use crate::combo::MAX_PIECES_LIMIT;
use crate::numeric::clamp;
use crate::{Error, Preference, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub packaging: PackagingConfig,

    #[serde(default)]
    pub supply: SupplyConfig,
}

/// Combination search defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_pieces")]
    pub max_pieces: usize,

    #[serde(default)]
    pub preference: Preference,

    #[serde(default = "default_true")]
    pub allow_halves: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_pieces: default_max_pieces(),
            preference: Preference::default(),
            allow_halves: true,
        }
    }
}

/// Pack size defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackagingConfig {
    #[serde(default = "default_box_size")]
    pub box_size: u32,

    #[serde(default = "default_tablets_per_sheet")]
    pub tablets_per_sheet: u32,

    #[serde(default = "default_sheets_per_box")]
    pub sheets_per_box: u32,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            box_size: default_box_size(),
            tablets_per_sheet: default_tablets_per_sheet(),
            sheets_per_box: default_sheets_per_box(),
        }
    }
}

/// Injectable supply defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SupplyConfig {
    #[serde(default = "default_capacity")]
    pub capacity: f64,

    #[serde(default = "default_containers_per_box")]
    pub containers_per_box: u32,

    #[serde(default = "default_priming_units")]
    pub priming_units: f64,

    #[serde(default = "default_discard_after_days")]
    pub discard_after_days: u32,

    #[serde(default = "default_true")]
    pub split_injections: bool,
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            containers_per_box: default_containers_per_box(),
            priming_units: default_priming_units(),
            discard_after_days: default_discard_after_days(),
            split_injections: true,
        }
    }
}

// Default value functions
fn default_max_pieces() -> usize {
    6
}

fn default_true() -> bool {
    true
}

fn default_box_size() -> u32 {
    28
}

fn default_tablets_per_sheet() -> u32 {
    14
}

fn default_sheets_per_box() -> u32 {
    2
}

fn default_capacity() -> f64 {
    300.0
}

fn default_containers_per_box() -> u32 {
    5
}

fn default_priming_units() -> f64 {
    2.0
}

fn default_discard_after_days() -> u32 {
    28
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .ok_or_else(|| Error::Config("could not determine a config directory".into()))?;
        Ok(base.join("dosekit").join("config.toml"))
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Configured piece bound, clamped to what the search accepts
    pub fn search_max_pieces(&self) -> usize {
        clamp(self.search.max_pieces as f64, 1.0, MAX_PIECES_LIMIT as f64) as usize
    }
}
