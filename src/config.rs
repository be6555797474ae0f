//! Board runtime configuration
//!
//! Tunable parameters for the virtual board process.  Loaded from a JSON
//! file by the binary; every field has a default so a partial file works.

use serde::{Deserialize, Serialize};

use crate::equipment::{DONT_STOP_MINUTES, EquipmentModel};
use crate::error::{BoardError, Result};

/// Display units reported with body temperatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Fahrenheit,
    Celsius,
}

/// Core board configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardConfig {
    // --- Topology ---
    /// Board model name, part or code (`nxp`, `NXPS`, `2`, ...)
    pub model: String,

    // --- Timing ---
    /// Status polling interval (milliseconds)
    pub status_interval_ms: u64,
    /// Delay between reaching Ready and the deferred health check (milliseconds)
    pub health_check_delay_ms: u64,
    /// How long a light-group sequence action stays visible (milliseconds)
    pub light_sequence_ms: u64,

    // --- Defaults ---
    /// Egg timer assigned to new circuits and features (minutes)
    pub default_egg_timer: u16,
    pub units: Units,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            model: "nxp".into(),

            status_interval_ms: 3000,
            health_check_delay_ms: 5000,
            light_sequence_ms: 20_000,

            default_egg_timer: 720,
            units: Units::Fahrenheit,
        }
    }
}

impl BoardConfig {
    /// Parse a JSON document, filling absent fields with defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| BoardError::InvalidParameter(format!("board config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if EquipmentModel::lookup(&self.model).is_none() {
            return Err(BoardError::UnknownModel(self.model.clone()));
        }
        if self.status_interval_ms == 0 || self.health_check_delay_ms == 0 || self.light_sequence_ms == 0 {
            return Err(BoardError::InvalidParameter("intervals must be non-zero".into()));
        }
        if self.default_egg_timer > DONT_STOP_MINUTES {
            return Err(BoardError::InvalidParameter(format!(
                "default egg timer {} exceeds {}",
                self.default_egg_timer, DONT_STOP_MINUTES
            )));
        }
        Ok(())
    }
}
