//! Value maps for the virtual board.
//!
//! Numeric codes are the ones clients already speak; each enum converts
//! to and from its code and carries the behavioural flags the routers
//! need (is this a light, does this circuit have a heat source, ...).

use serde::{Deserialize, Serialize};

// ── Circuit functions ─────────────────────────────────────────

/// Semantic function of a circuit or feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CircuitFunction {
    #[default]
    Generic = 0,
    Spillway = 1,
    MasterCleaner = 2,
    ChemRelay = 3,
    Light = 4,
    IntelliBrite = 5,
    GloBrite = 6,
    GloBriteWhite = 7,
    MagicStream = 8,
    Dimmer = 9,
    ColorCascade = 10,
    MasterCleaner2 = 11,
    Pool = 12,
    Spa = 13,
}

impl CircuitFunction {
    pub fn from_code(code: u8) -> Option<Self> {
        let f = match code {
            0 => Self::Generic,
            1 => Self::Spillway,
            2 => Self::MasterCleaner,
            3 => Self::ChemRelay,
            4 => Self::Light,
            5 => Self::IntelliBrite,
            6 => Self::GloBrite,
            7 => Self::GloBriteWhite,
            8 => Self::MagicStream,
            9 => Self::Dimmer,
            10 => Self::ColorCascade,
            11 => Self::MasterCleaner2,
            12 => Self::Pool,
            13 => Self::Spa,
            _ => return None,
        };
        Some(f)
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn desc(self) -> &'static str {
        match self {
            Self::Generic => "Generic",
            Self::Spillway => "Spillway",
            Self::MasterCleaner => "Master Cleaner",
            Self::ChemRelay => "Chem Relay",
            Self::Light => "Light",
            Self::IntelliBrite => "Intellibrite",
            Self::GloBrite => "GloBrite",
            Self::GloBriteWhite => "GloBrite White",
            Self::MagicStream => "Magicstream",
            Self::Dimmer => "Dimmer",
            Self::ColorCascade => "ColorCascade",
            Self::MasterCleaner2 => "Master Cleaner 2",
            Self::Pool => "Pool",
            Self::Spa => "Spa",
        }
    }

    pub fn is_light(self) -> bool {
        matches!(self.code(), 4..=10)
    }

    pub fn has_heat_source(self) -> bool {
        matches!(self, Self::Pool | Self::Spa)
    }

    /// The body type that must be off while this one runs on a shared
    /// body.  `None` for non-body functions.
    pub fn opposite_body(self) -> Option<Self> {
        match self {
            Self::Pool => Some(Self::Spa),
            Self::Spa => Some(Self::Pool),
            _ => None,
        }
    }
}

// ── Virtual circuits ──────────────────────────────────────────

/// A board-defined circuit that has no relay of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VirtualCircuit {
    pub id: u16,
    pub name: &'static str,
    pub desc: &'static str,
}

impl VirtualCircuit {
    /// Pool/spa diversion; intake and return valves follow it.
    pub const POOL_SPA: u16 = 247;

    pub const ALL: [VirtualCircuit; 12] = [
        Self::new(237, "heatBoost", "Heat Boost"),
        Self::new(238, "heatEnable", "Heat Enable"),
        Self::new(239, "pumpSpeedUp", "Pump Speed +"),
        Self::new(240, "pumpSpeedDown", "Pump Speed -"),
        Self::new(244, "poolHeater", "Pool Heater"),
        Self::new(245, "spaHeater", "Spa Heater"),
        Self::new(246, "freeze", "Freeze"),
        Self::new(247, "poolSpa", "Pool/Spa"),
        Self::new(248, "solarHeat", "Solar Heat"),
        Self::new(251, "heater", "Heater"),
        Self::new(252, "solar", "Solar"),
        Self::new(254, "poolHeatEnable", "Pool Heat Enable"),
    ];

    const fn new(id: u16, name: &'static str, desc: &'static str) -> Self {
        Self { id, name, desc }
    }

    pub fn by_id(id: u16) -> Option<&'static VirtualCircuit> {
        Self::ALL.iter().find(|v| v.id == id)
    }
}

// ── Light themes and sequence actions ─────────────────────────

/// Theme codes accepted by light-group theme commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LightTheme {
    Off = 0,
    On = 1,
    Sync = 128,
    Swim = 144,
    Set = 160,
    Party = 177,
    Romance = 178,
    Caribbean = 179,
    American = 180,
    Sunset = 181,
    Royal = 182,
    Save = 190,
    Recall = 191,
    Blue = 193,
    Green = 194,
    Red = 195,
    White = 196,
    Magenta = 197,
}

impl LightTheme {
    pub fn from_code(code: u8) -> Option<Self> {
        let t = match code {
            0 => Self::Off,
            1 => Self::On,
            128 => Self::Sync,
            144 => Self::Swim,
            160 => Self::Set,
            177 => Self::Party,
            178 => Self::Romance,
            179 => Self::Caribbean,
            180 => Self::American,
            181 => Self::Sunset,
            182 => Self::Royal,
            190 => Self::Save,
            191 => Self::Recall,
            193 => Self::Blue,
            194 => Self::Green,
            195 => Self::Red,
            196 => Self::White,
            197 => Self::Magenta,
            _ => return None,
        };
        Some(t)
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn is_off(self) -> bool {
        self == Self::Off
    }

    /// Timed sequence started when a group switches to this theme.
    pub fn action(self) -> Option<LightAction> {
        match self {
            Self::Off | Self::On => None,
            Self::Sync => Some(LightAction::Sync),
            Self::Swim => Some(LightAction::Swim),
            Self::Set => Some(LightAction::Set),
            Self::Save | Self::Recall => Some(LightAction::Other),
            _ => Some(LightAction::Color),
        }
    }
}

/// Transient sequence code shown on a light group while it animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LightAction {
    #[default]
    Idle = 0,
    Sync = 1,
    Set = 2,
    Swim = 3,
    Color = 4,
    Other = 5,
}

// ── Group members ─────────────────────────────────────────────

/// State a circuit-group member is driven to when the group is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    Off,
    #[default]
    On,
    Ignore,
}

impl DesiredState {
    /// 0 = off, 1 = on, 2 = ignore.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::On),
            2 => Some(Self::Ignore),
            _ => None,
        }
    }

    /// The live state that counts as "matching"; `None` for ignored members.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Off => Some(false),
            Self::On => Some(true),
            Self::Ignore => None,
        }
    }
}

// ── Bodies and heat ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    #[default]
    Pool,
    Spa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaterType {
    #[default]
    Gas,
    Solar,
    HeatPump,
    UltraTemp,
    Hybrid,
}

/// Heat sources a body can select.  Which ones are offered depends on
/// the heaters currently installed for that body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatSource {
    #[default]
    Off,
    Heater,
    Solar,
    SolarPref,
    HeatPump,
    HeatPumpPref,
    UltraTemp,
    UltraTempPref,
}

impl HeatSource {
    /// Eligible sources for a body served by `heaters`.
    pub fn eligible(heaters: impl IntoIterator<Item = HeaterType>) -> Vec<HeatSource> {
        let (mut gas, mut solar, mut heatpump, mut ultratemp) = (false, false, false, false);
        for h in heaters {
            match h {
                HeaterType::Gas | HeaterType::Hybrid => gas = true,
                HeaterType::Solar => solar = true,
                HeaterType::HeatPump => heatpump = true,
                HeaterType::UltraTemp => ultratemp = true,
            }
        }
        let mut sources = vec![Self::Off];
        if gas {
            sources.push(Self::Heater);
        }
        if solar {
            sources.push(Self::Solar);
            if gas {
                sources.push(Self::SolarPref);
            }
        }
        if heatpump {
            sources.push(Self::HeatPump);
            if gas {
                sources.push(Self::HeatPumpPref);
            }
        }
        if ultratemp {
            sources.push(Self::UltraTemp);
            if gas {
                sources.push(Self::UltraTempPref);
            }
        }
        sources
    }
}

// ── Pumps ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpType {
    #[default]
    Ss,
    Ds,
    Vs,
    Vsf,
    Vf,
    Sf,
}

impl PumpType {
    /// Relay-driven pumps are actuated by this board directly.
    pub fn is_relay(self) -> bool {
        matches!(self, Self::Ss | Self::Ds | Self::Sf)
    }
}

// ── Chemistry ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChemControllerType {
    #[default]
    None,
    IntelliChem,
    Rem,
    HomeGrown,
}
