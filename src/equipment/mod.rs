//! Equipment catalog — categories, capacity limits and value maps.
//!
//! Nothing in here touches the trees.  These are the fixed tables the
//! orchestrator and routers consult: which board models exist, how many
//! of each item a model may carry, and what the numeric codes mean.

pub mod catalog;
pub mod models;

use core::fmt;

use serde::{Deserialize, Serialize};

pub use catalog::{
    BodyType, ChemControllerType, CircuitFunction, DesiredState, HeatSource, HeaterType,
    LightAction, LightTheme, PumpType, VirtualCircuit,
};
pub use models::EquipmentModel;

/// Auto-off duration meaning "never stop".
pub const DONT_STOP_MINUTES: u16 = 1440;

/// Controller id of this board when it owns an item (`master`).
pub const BOARD_MASTER: u8 = 1;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Equipment category.  Each category has its own id space and router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Body,
    Circuit,
    Feature,
    CircuitGroup,
    LightGroup,
    VirtualCircuit,
    Valve,
    Heater,
    Pump,
    ChemController,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Body => "body",
            Self::Circuit => "circuit",
            Self::Feature => "feature",
            Self::CircuitGroup => "circuit group",
            Self::LightGroup => "light group",
            Self::VirtualCircuit => "virtual circuit",
            Self::Valve => "valve",
            Self::Heater => "heater",
            Self::Pump => "pump",
            Self::ChemController => "chem controller",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Capacity limits
// ---------------------------------------------------------------------------

/// Global capacity limits applied to both trees when a model is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentLimits {
    pub max_bodies: u16,
    pub max_circuits: u16,
    pub max_features: u16,
    pub max_valves: u16,
    pub max_heaters: u16,
    pub max_light_groups: u16,
    pub max_circuit_groups: u16,
    pub max_schedules: u16,
    pub max_pumps: u16,
}

impl EquipmentLimits {
    /// Limits for a virtual board carrying `model`.  Only the body count
    /// varies between models.
    pub fn for_model(model: &EquipmentModel) -> Self {
        Self {
            max_bodies: u16::from(model.bodies),
            max_circuits: 40,
            max_features: 32,
            max_valves: 32,
            max_heaters: 16,
            max_light_groups: 16,
            max_circuit_groups: 16,
            max_schedules: 100,
            max_pumps: 16,
        }
    }
}

// ---------------------------------------------------------------------------
// Egg timer
// ---------------------------------------------------------------------------

/// Merge an egg-timer update and return the derived `dont_stop` flag.
///
/// `dont_stop = Some(true)` forces the sentinel; an explicit `egg_timer`
/// is clamped to `0..=1440`.  The returned flag is always
/// `egg_timer == 1440`.
pub fn merge_egg_timer(current: &mut u16, egg_timer: Option<u16>, dont_stop: Option<bool>) -> bool {
    if dont_stop == Some(true) {
        *current = DONT_STOP_MINUTES;
    } else if let Some(minutes) = egg_timer {
        *current = minutes.min(DONT_STOP_MINUTES);
    }
    *current == DONT_STOP_MINUTES
}
