//! Configuration tree: the persisted description of installed equipment.

use std::collections::BTreeMap;

use heapless::Vec as HVec;
use serde::{Deserialize, Serialize};

use crate::equipment::{
    BodyType, ChemControllerType, CircuitFunction, DesiredState, EquipmentLimits, HeatSource,
    HeaterType, LightTheme, PumpType, merge_egg_timer,
};
use crate::ids::EquipmentIds;

/// Maximum members in a circuit or light group.
pub const MAX_GROUP_MEMBERS: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigTree {
    /// Code of the board model the tree was built for.
    pub model: Option<u8>,
    pub limits: EquipmentLimits,
    #[serde(skip_deserializing)]
    pub equipment_ids: Option<EquipmentIds>,
    pub bodies: BTreeMap<u16, Body>,
    pub circuits: BTreeMap<u16, Circuit>,
    pub features: BTreeMap<u16, Feature>,
    pub circuit_groups: BTreeMap<u16, CircuitGroup>,
    pub light_groups: BTreeMap<u16, LightGroup>,
    pub valves: BTreeMap<u16, Valve>,
    pub heaters: BTreeMap<u16, Heater>,
    pub pumps: BTreeMap<u16, Pump>,
    pub chem_controllers: BTreeMap<u16, ChemController>,
}

impl ConfigTree {
    /// Re-derive `dont_stop` from the egg timer on every timed entity.
    /// Snapshots from disk may disagree with themselves.
    pub fn normalize_egg_timers(&mut self) {
        for c in self.circuits.values_mut() {
            c.dont_stop = merge_egg_timer(&mut c.egg_timer, None, None);
        }
        for f in self.features.values_mut() {
            f.dont_stop = merge_egg_timer(&mut f.egg_timer, None, None);
        }
        for g in self.circuit_groups.values_mut() {
            g.dont_stop = merge_egg_timer(&mut g.egg_timer, None, None);
        }
        for g in self.light_groups.values_mut() {
            g.dont_stop = merge_egg_timer(&mut g.egg_timer, None, None);
        }
    }
}

// ── Bodies ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Body {
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub body_type: BodyType,
    /// Circuit that turns this body on.
    pub circuit: u16,
    /// Gallons.
    pub capacity: u32,
    pub set_point: u8,
    pub heat_mode: HeatSource,
    pub is_active: bool,
    pub master: u8,
}

// ── Circuits and features ─────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Circuit {
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub function: CircuitFunction,
    pub is_active: bool,
    pub master: u8,
    pub egg_timer: u16,
    pub dont_stop: bool,
    pub show_in_features: bool,
    pub lighting_theme: Option<LightTheme>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Feature {
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub function: CircuitFunction,
    pub is_active: bool,
    pub master: u8,
    pub egg_timer: u16,
    pub dont_stop: bool,
    pub show_in_features: bool,
}

// ── Groups ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupMember {
    pub circuit: u16,
    pub desired_state: DesiredState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CircuitGroup {
    pub id: u16,
    pub name: String,
    pub is_active: bool,
    pub master: u8,
    pub egg_timer: u16,
    pub dont_stop: bool,
    pub members: HVec<GroupMember, MAX_GROUP_MEMBERS>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LightGroupMember {
    pub circuit: u16,
    pub color: u8,
    pub swim_delay: u8,
    pub position: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LightGroup {
    pub id: u16,
    pub name: String,
    pub is_active: bool,
    pub master: u8,
    pub egg_timer: u16,
    pub dont_stop: bool,
    pub lighting_theme: Option<LightTheme>,
    pub members: HVec<LightGroupMember, MAX_GROUP_MEMBERS>,
}

// ── Valves, heaters, pumps ────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Valve {
    pub id: u16,
    pub name: String,
    /// Circuit (or virtual circuit) that diverts this valve; 0 when unbound.
    pub circuit: u16,
    pub is_intake: bool,
    pub is_return: bool,
    pub is_virtual: bool,
    pub is_active: bool,
    pub master: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Heater {
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub heater_type: HeaterType,
    /// Body served by the heater; 0 serves every body.
    pub body: u16,
    pub is_virtual: bool,
    pub is_active: bool,
    pub master: u8,
    pub address: Option<u8>,
}

impl Heater {
    pub fn serves(&self, body: u16) -> bool {
        self.body == 0 || self.body == body
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Pump {
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub pump_type: PumpType,
    /// Circuit that runs a relay pump; 0 when unbound.
    pub circuit: u16,
    pub is_active: bool,
    pub master: u8,
}

// ── Chemistry ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChemController {
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub chem_type: ChemControllerType,
    pub address: Option<u8>,
    pub body: u16,
    pub is_active: bool,
    pub master: u8,
    pub ph_set_point: f32,
    pub orp_set_point: u16,
}

impl ChemController {
    /// Active, typed and addressed: ready to be polled.
    pub fn is_fully_configured(&self) -> bool {
        self.is_active && self.chem_type != ChemControllerType::None && self.address.is_some()
    }
}
