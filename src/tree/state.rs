//! State tree: live, broadcastable attributes of every active entity.
//!
//! Each state entry carries a `has_changed` dirty flag.  The flag is never
//! serialised; [`Trees::take_changes`](super::Trees::take_changes) turns
//! dirty entries into broadcast payloads and clears it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::equipment::{
    BodyType, ChemControllerType, CircuitFunction, HeatSource, HeaterType, LightAction,
    LightTheme, PumpType,
};

/// Message code owned by equipment verification.
pub const EQUIPMENT_MESSAGE_CODE: &str = "EQ";

// ── Controller status ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatus {
    pub val: u8,
    pub name: &'static str,
    pub percent: u8,
}

impl Default for ControllerStatus {
    fn default() -> Self {
        Self {
            val: 3,
            name: "uninitialized",
            percent: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipmentMessage {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
}

// ── The tree ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTree {
    pub status: ControllerStatus,
    pub messages: Vec<EquipmentMessage>,
    pub bodies: BTreeMap<u16, BodyState>,
    pub circuits: BTreeMap<u16, CircuitState>,
    pub features: BTreeMap<u16, CircuitState>,
    pub circuit_groups: BTreeMap<u16, GroupState>,
    pub light_groups: BTreeMap<u16, GroupState>,
    pub valves: BTreeMap<u16, ValveState>,
    pub heaters: BTreeMap<u16, HeaterState>,
    pub pumps: BTreeMap<u16, PumpState>,
    pub chem_controllers: BTreeMap<u16, ChemControllerState>,
}

impl StateTree {
    /// Live on/off of a circuit, feature or group; `None` if not active.
    pub fn is_on(&self, id: u16) -> Option<bool> {
        self.circuits
            .get(&id)
            .or_else(|| self.features.get(&id))
            .map(|c| c.is_on)
            .or_else(|| self.circuit_groups.get(&id).map(|g| g.is_on))
            .or_else(|| self.light_groups.get(&id).map(|g| g.is_on))
    }

    /// True when any active circuit or feature of `function` is on.
    pub fn any_on(&self, function: CircuitFunction) -> bool {
        self.circuits
            .values()
            .chain(self.features.values())
            .any(|c| c.function == function && c.is_on)
    }

    pub fn push_message(&mut self, code: &'static str, severity: Severity, message: String) {
        self.messages.push(EquipmentMessage {
            code,
            severity,
            message,
        });
    }

    pub fn clear_messages(&mut self, code: &str) {
        self.messages.retain(|m| m.code != code);
    }
}

// ── State entities ────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyState {
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub body_type: BodyType,
    pub circuit: u16,
    pub is_on: bool,
    pub set_point: u8,
    pub heat_mode: HeatSource,
    /// Heat sources selectable given the installed heaters.
    pub heat_sources: Vec<HeatSource>,
    #[serde(skip)]
    pub has_changed: bool,
}

/// Live state of a circuit or feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitState {
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub function: CircuitFunction,
    pub is_on: bool,
    pub level: Option<u8>,
    pub lighting_theme: Option<LightTheme>,
    #[serde(skip)]
    pub has_changed: bool,
}

/// Live state of a circuit group or light group.  `is_on` is derived from
/// the members on every status pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupState {
    pub id: u16,
    pub name: String,
    pub is_on: bool,
    pub lighting_theme: Option<LightTheme>,
    pub action: LightAction,
    #[serde(skip)]
    pub has_changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValveState {
    pub id: u16,
    pub name: String,
    pub circuit: u16,
    pub is_diverted: bool,
    #[serde(skip)]
    pub has_changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaterState {
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub heater_type: HeaterType,
    pub is_on: bool,
    #[serde(skip)]
    pub has_changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PumpState {
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub pump_type: PumpType,
    pub is_on: bool,
    #[serde(skip)]
    pub has_changed: bool,
}

/// Readings reported by a chemistry controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChemReadings {
    pub ph_level: Option<f32>,
    pub orp_level: Option<u16>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChemControllerState {
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub chem_type: ChemControllerType,
    #[serde(flatten)]
    pub readings: ChemReadings,
    #[serde(skip)]
    pub has_changed: bool,
}
