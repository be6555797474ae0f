//! Equipment id allocator.
//!
//! Circuits, features, groups and virtual circuits share one numeric id
//! space, partitioned into per-category ranges:
//!
//! ```text
//!   1 ..= maxCircuits          circuits
//!   129 ..= 128 + maxFeatures  features
//!   193 ..= 192 + maxGroups    circuit groups + light groups
//!   237 ..= 254                virtual circuits
//! ```
//!
//! Ranges are pure functions of the current [`EquipmentLimits`]; nothing
//! here is cached, so a model switch is picked up by the next call.

use serde::Serialize;

use crate::equipment::{Category, EquipmentLimits};
use crate::error::{BoardError, Result};

pub const FEATURE_ID_START: u16 = 129;
pub const CIRCUIT_GROUP_ID_START: u16 = 193;
pub const VIRTUAL_CIRCUIT_ID_START: u16 = 237;
pub const VIRTUAL_CIRCUIT_ID_END: u16 = 254;

/// Valves below this id are reserved for board-defined valves.
pub const VALVE_ID_FLOOR: u16 = 50;
/// Heaters at or below 255 belong to physical controllers.
pub const HEATER_ID_FLOOR: u16 = 256;

/// Fixed circuit ids of the two body circuits.
pub const POOL_CIRCUIT_ID: u16 = 6;
pub const SPA_CIRCUIT_ID: u16 = 1;
pub const RESERVED_CIRCUIT_IDS: [u16; 2] = [SPA_CIRCUIT_ID, POOL_CIRCUIT_ID];

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

/// Inclusive id range.  `start > end` means the range is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdRange {
    pub start: u16,
    pub end: u16,
}

impl IdRange {
    pub fn contains(&self, id: u16) -> bool {
        id >= self.start && id <= self.end
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }
}

/// Categories that draw ids from the shared circuit id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdCategory {
    Circuits,
    Features,
    CircuitGroups,
    VirtualCircuits,
}

impl IdCategory {
    pub fn range(self, limits: &EquipmentLimits) -> IdRange {
        match self {
            Self::Circuits => IdRange {
                start: 1,
                end: limits.max_circuits,
            },
            Self::Features => IdRange {
                start: FEATURE_ID_START,
                end: (FEATURE_ID_START + limits.max_features).saturating_sub(1),
            },
            Self::CircuitGroups => IdRange {
                start: CIRCUIT_GROUP_ID_START,
                end: (CIRCUIT_GROUP_ID_START + limits.max_circuit_groups).saturating_sub(1),
            },
            Self::VirtualCircuits => IdRange {
                start: VIRTUAL_CIRCUIT_ID_START,
                end: VIRTUAL_CIRCUIT_ID_END,
            },
        }
    }

    /// Category reported in errors for this id space.
    pub fn category(self) -> Category {
        match self {
            Self::Circuits => Category::Circuit,
            Self::Features => Category::Feature,
            Self::CircuitGroups => Category::CircuitGroup,
            Self::VirtualCircuits => Category::VirtualCircuit,
        }
    }
}

pub fn is_in_range(category: IdCategory, limits: &EquipmentLimits, id: u16) -> bool {
    category.range(limits).contains(id)
}

/// Classify an id with precedence groups > features > circuits.
pub fn classify(limits: &EquipmentLimits, id: u16) -> Option<IdCategory> {
    [
        IdCategory::CircuitGroups,
        IdCategory::Features,
        IdCategory::Circuits,
    ]
    .into_iter()
    .find(|c| is_in_range(*c, limits, id))
}

/// Smallest id in `category`'s range that is neither active nor reserved.
pub fn allocate_next(
    category: IdCategory,
    limits: &EquipmentLimits,
    active: impl IntoIterator<Item = u16>,
    reserved: &[u16],
) -> Result<u16> {
    let active: Vec<u16> = active.into_iter().collect();
    category
        .range(limits)
        .iter()
        .find(|id| !active.contains(id) && !reserved.contains(id))
        .ok_or(BoardError::RangeExhausted(category.category()))
}

/// One past the highest existing id, but never below `floor`.
pub fn next_above_floor(floor: u16, existing: impl IntoIterator<Item = u16>) -> u16 {
    existing
        .into_iter()
        .max()
        .map_or(floor, |max| max.saturating_add(1).max(floor))
}

/// Parse a client-supplied id for `category`.
pub fn parse_id(category: Category, raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| BoardError::invalid_id(category, raw))
}

// ---------------------------------------------------------------------------
// Published ranges
// ---------------------------------------------------------------------------

/// Current ranges, written into the configuration tree so clients can
/// see which ids are valid for each category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentIds {
    pub circuits: IdRange,
    pub features: IdRange,
    pub circuit_groups: IdRange,
    pub virtual_circuits: IdRange,
}

impl EquipmentIds {
    pub fn for_limits(limits: &EquipmentLimits) -> Self {
        Self {
            circuits: IdCategory::Circuits.range(limits),
            features: IdCategory::Features.range(limits),
            circuit_groups: IdCategory::CircuitGroups.range(limits),
            virtual_circuits: IdCategory::VirtualCircuits.range(limits),
        }
    }
}
