use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::{KanbanError, KanbanResult};

pub const DEFAULT_POSITION_STEP: f64 = 1000.0;
pub const DEFAULT_MIN_GAP: f64 = 1e-6;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Tuning knobs for position allocation and renumbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Spacing used at the head/tail of a sequence and by renumbering.
    #[serde(default = "default_position_step")]
    pub position_step: f64,
    /// Neighbor gaps below this mark a sequence as fragmented.
    #[serde(default = "default_min_gap")]
    pub min_gap: f64,
    /// Renumber the destination container after a move leaves it fragmented.
    #[serde(default = "default_auto_normalize")]
    pub auto_normalize: bool,
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
}

fn default_position_step() -> f64 {
    DEFAULT_POSITION_STEP
}

fn default_min_gap() -> f64 {
    DEFAULT_MIN_GAP
}

fn default_auto_normalize() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            position_step: DEFAULT_POSITION_STEP,
            min_gap: DEFAULT_MIN_GAP,
            auto_normalize: true,
            sweep_interval_secs: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> KanbanResult<()> {
        if !self.position_step.is_finite() || self.position_step <= 0.0 {
            return Err(KanbanError::Validation(format!(
                "position_step must be a positive finite number, got {}",
                self.position_step
            )));
        }
        if !self.min_gap.is_finite() || self.min_gap < 0.0 {
            return Err(KanbanError::Validation(format!(
                "min_gap must be a non-negative finite number, got {}",
                self.min_gap
            )));
        }
        if self.min_gap >= self.position_step {
            return Err(KanbanError::Validation(
                "min_gap must be smaller than position_step".to_string(),
            ));
        }
        if self.sweep_interval_secs == Some(0) {
            return Err(KanbanError::Validation(
                "sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/kanban/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("kanban/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("kanban\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Loads the user config, falling back to defaults when the file is
    /// missing, unreadable, malformed or out of range.
    pub fn load() -> Self {
        if let Some(config_path) = Self::config_path() {
            if config_path.exists() {
                if let Ok(content) = std::fs::read_to_string(&config_path) {
                    if let Ok(config) = Self::from_toml(&content) {
                        return config;
                    }
                }
            }
        }
        Self::default()
    }

    pub fn from_toml(content: &str) -> KanbanResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| KanbanError::Serialization(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }
}
