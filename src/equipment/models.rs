//! Board model descriptors.
//!
//! A single [`EquipmentModel`] value drives the entire shape of the
//! rebuilt trees: how many bodies exist, whether they share one physical
//! vessel, and how many synthetic valves the topology needs.

use serde::Serialize;

/// Descriptor of a virtual board topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentModel {
    /// Numeric model code stored in the module slot.
    pub code: u8,
    pub name: &'static str,
    pub part: &'static str,
    pub desc: &'static str,
    pub bodies: u8,
    pub valves: u8,
    /// One physical body alternately serving pool or spa.
    pub shared: bool,
    /// Two independent pool-type bodies.
    pub dual: bool,
    pub chlorinators: u8,
    pub chem_controllers: u8,
}

/// Every model the virtual board can emulate.
pub const MODELS: [EquipmentModel; 4] = [
    EquipmentModel {
        code: 0,
        name: "nxp",
        part: "NXP",
        desc: "Nixie Single Body",
        bodies: 1,
        valves: 0,
        shared: false,
        dual: false,
        chlorinators: 1,
        chem_controllers: 1,
    },
    EquipmentModel {
        code: 1,
        name: "nxps",
        part: "NXPS",
        desc: "Nixie Shared Body",
        bodies: 2,
        valves: 2,
        shared: true,
        dual: false,
        chlorinators: 1,
        chem_controllers: 1,
    },
    EquipmentModel {
        code: 2,
        name: "nxpd",
        part: "NXPD",
        desc: "Nixie Dual Body",
        bodies: 2,
        valves: 0,
        shared: false,
        dual: true,
        chlorinators: 2,
        chem_controllers: 2,
    },
    EquipmentModel {
        code: 255,
        name: "nxnb",
        part: "NXNB",
        desc: "Nixie No Body",
        bodies: 0,
        valves: 0,
        shared: false,
        dual: false,
        chlorinators: 0,
        chem_controllers: 0,
    },
];

impl EquipmentModel {
    /// Resolve a model by name (`nxps`), part (`NXPS`) or numeric code (`1`).
    pub fn lookup(key: &str) -> Option<&'static EquipmentModel> {
        let key = key.trim();
        if let Ok(code) = key.parse::<u8>() {
            return Self::by_code(code);
        }
        MODELS
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(key) || m.part.eq_ignore_ascii_case(key))
    }

    pub fn by_code(code: u8) -> Option<&'static EquipmentModel> {
        MODELS.iter().find(|m| m.code == code)
    }

    /// The model used when none has been declared yet.
    pub fn default_model() -> &'static EquipmentModel {
        &MODELS[0]
    }
}
