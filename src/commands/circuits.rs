//! Circuit router.
//!
//! `set_state` is the single entry point clients use for anything in the
//! circuit id space.  The id is classified with precedence
//! group > feature > circuit and dispatched to the owning router; plain
//! circuits go through the shared-body rule before the relay is driven.

use core::future::Future;
use core::pin::Pin;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::HardwareGateway;
use crate::board::Board;
use crate::equipment::{
    BOARD_MASTER, Category, CircuitFunction, LightTheme, VirtualCircuit, merge_egg_timer,
};
use crate::error::{BoardError, Result};
use crate::ids::{
    IdCategory, POOL_CIRCUIT_ID, RESERVED_CIRCUIT_IDS, SPA_CIRCUIT_ID, allocate_next, classify,
    is_in_range,
};
use crate::tree::config::{Body, Circuit};

/// Partial circuit update.  Absent fields keep their prior value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CircuitUpdate {
    pub id: Option<u16>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub function: Option<CircuitFunction>,
    pub egg_timer: Option<u16>,
    pub dont_stop: Option<bool>,
    pub show_in_features: Option<bool>,
}

/// Entry of a circuit picker list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitReference {
    pub id: u16,
    pub name: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub function: Option<CircuitFunction>,
}

/// Which kinds of entries [`CircuitCommands::circuit_references`] lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceFilter {
    pub circuits: bool,
    pub features: bool,
    pub virtual_circuits: bool,
    pub groups: bool,
}

pub fn default_circuit_name(id: u16) -> String {
    match id {
        SPA_CIRCUIT_ID => "Spa".into(),
        POOL_CIRCUIT_ID => "Pool".into(),
        _ => format!("Aux {id}"),
    }
}

pub struct CircuitCommands<'a, G: HardwareGateway + 'static> {
    board: &'a Board<G>,
}

impl<'a, G: HardwareGateway + 'static> CircuitCommands<'a, G> {
    pub(crate) fn new(board: &'a Board<G>) -> Self {
        Self { board }
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    /// Turn anything in the circuit id space on or off.
    pub async fn set_state(&self, id: u16, on: bool) -> Result<()> {
        let limits = self.board.with_trees(|t| t.config.limits);
        match classify(&limits, id) {
            Some(IdCategory::CircuitGroups) => {
                // Groups fan back into this router; erase the type to break the cycle.
                let groups = self.board.groups();
                let fut: Pin<Box<dyn Future<Output = Result<()>> + '_>> =
                    Box::pin(groups.set_group_state(id, on));
                fut.await
            }
            Some(IdCategory::Features) => self.board.features().set_feature_state(id, on).await,
            Some(IdCategory::Circuits) => self.set_circuit_state(id, on).await,
            _ => Err(BoardError::invalid_id(Category::Circuit, id)),
        }
    }

    pub async fn toggle_state(&self, id: u16) -> Result<()> {
        let limits = self.board.with_trees(|t| t.config.limits);
        if classify(&limits, id).is_none() {
            return Err(BoardError::invalid_id(Category::Circuit, id));
        }
        let current = self
            .board
            .with_trees(|t| t.state.is_on(id))
            .ok_or(BoardError::not_found(Category::Circuit, id))?;
        self.set_state(id, !current).await
    }

    async fn set_circuit_state(&self, id: u16, on: bool) -> Result<()> {
        let circuit = self
            .board
            .with_trees(|t| t.config_of::<Circuit>(id).filter(|c| c.is_active).cloned())
            .ok_or(BoardError::not_found(Category::Circuit, id))?;

        let _guard = self.board.suspend_status();
        let result = self.actuate(&circuit, on).await;
        if let Err(e) = self.board.valves().sync_valve_states().await {
            warn!("Circuit {}: valve sync failed: {}", id, e);
        }
        result
    }

    /// Drive one circuit, first switching off the opposite body when the
    /// board shares one vessel between pool and spa.
    async fn actuate(&self, circuit: &Circuit, on: bool) -> Result<()> {
        let shared = self.board.model().is_some_and(|m| m.shared);
        if on && shared {
            if let Some(opposite) = circuit.function.opposite_body() {
                // Body commands take turns; each reads the other's confirmed state.
                let _turn = self.board.inner.body_switch.lock().await;
                let running: Vec<(u16, String)> = self.board.with_trees(|t| {
                    t.config
                        .circuits
                        .values()
                        .filter(|c| c.function == opposite && c.id != circuit.id)
                        .filter(|c| t.state.is_on(c.id).unwrap_or(false))
                        .map(|c| (c.id, c.name.clone()))
                        .collect()
                });
                for (other, name) in running {
                    info!("Turning off shared body {} circuit", name);
                    self.switch(other, false).await?;
                }
                return self.switch(circuit.id, on).await;
            }
        }
        self.switch(circuit.id, on).await
    }

    /// Command the relay and, once confirmed, record the live state.
    async fn switch(&self, id: u16, on: bool) -> Result<()> {
        self.board.gateway().set_circuit_state(id, on).await?;
        self.board.with_trees_mut(|t| {
            t.touch::<Circuit>(id, |s| s.is_on = on);
            let bodies: Vec<u16> = t
                .config
                .bodies
                .values()
                .filter(|b| b.circuit == id)
                .map(|b| b.id)
                .collect();
            for body in bodies {
                t.touch::<Body>(body, |s| s.is_on = on);
            }
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lights
    // -----------------------------------------------------------------------

    pub async fn set_light_theme(&self, id: u16, theme: u8) -> Result<()> {
        let theme = LightTheme::from_code(theme)
            .ok_or_else(|| BoardError::InvalidParameter(format!("unknown light theme {theme}")))?;
        let circuit = self.active_circuit(id)?;
        if !circuit.function.is_light() {
            return Err(BoardError::InvalidParameter(format!(
                "circuit {id} is not a light"
            )));
        }
        self.board.with_trees_mut(|t| {
            t.touch::<Circuit>(id, |s| s.lighting_theme = Some(theme));
        });
        self.board.emit_changes();
        Ok(())
    }

    /// Set a dimmer level (1-100) and turn the circuit on.
    pub async fn set_dimmer_level(&self, id: u16, level: u8) -> Result<()> {
        if !(1..=100).contains(&level) {
            return Err(BoardError::InvalidParameter(format!(
                "dimmer level {level} outside 1..=100"
            )));
        }
        self.active_circuit(id)?;
        self.board.with_trees_mut(|t| {
            t.touch::<Circuit>(id, |s| s.level = Some(level));
        });
        self.set_circuit_state(id, true).await
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Create or update a circuit.  Metadata is forwarded to the gateway
    /// in the background.
    pub async fn set_circuit(&self, update: CircuitUpdate) -> Result<Circuit> {
        let default_egg_timer = self.board.config().default_egg_timer;
        let circuit = self.board.with_trees_mut(|t| -> Result<Circuit> {
            let limits = t.config.limits;
            let id = match update.id.filter(|id| *id != 0) {
                Some(id) if is_in_range(IdCategory::Circuits, &limits, id) => id,
                Some(id) => return Err(BoardError::invalid_id(Category::Circuit, id)),
                None => allocate_next(
                    IdCategory::Circuits,
                    &limits,
                    t.config.circuits.keys().copied(),
                    &RESERVED_CIRCUIT_IDS,
                )?,
            };
            let mut circuit = t.config_of::<Circuit>(id).cloned().unwrap_or_else(|| Circuit {
                id,
                name: default_circuit_name(id),
                is_active: true,
                master: BOARD_MASTER,
                egg_timer: default_egg_timer,
                show_in_features: true,
                ..Circuit::default()
            });
            if let Some(name) = update.name.clone() {
                circuit.name = name;
            }
            if let Some(function) = update.function {
                circuit.function = function;
            }
            if let Some(show) = update.show_in_features {
                circuit.show_in_features = show;
            }
            circuit.dont_stop = merge_egg_timer(&mut circuit.egg_timer, update.egg_timer, update.dont_stop);
            circuit.is_active = true;
            t.commit(circuit.clone());
            Ok(circuit)
        })?;
        self.board.emit_changes();

        let board = self.board.clone();
        let forwarded = circuit.clone();
        self.board
            .spawn(async move {
                if let Err(e) = board.gateway().set_circuit(&forwarded).await {
                    warn!("Circuit {}: gateway rejected config: {}", forwarded.id, e);
                }
            })
            .detach();
        Ok(circuit)
    }

    /// Delete a circuit or a feature; they share one id space.
    pub async fn delete_circuit(&self, id: u16) -> Result<()> {
        let limits = self.board.with_trees(|t| t.config.limits);
        if is_in_range(IdCategory::Features, &limits, id) {
            return self.board.features().delete_feature(id).await;
        }
        if !is_in_range(IdCategory::Circuits, &limits, id) {
            return Err(BoardError::invalid_id(Category::Circuit, id));
        }
        self.board
            .with_trees_mut(|t| t.remove::<Circuit>(id))
            .ok_or(BoardError::not_found(Category::Circuit, id))?;
        self.board.emit_changes();
        self.board.gateway().remove_circuit(id).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn circuit_references(&self, filter: ReferenceFilter) -> Vec<CircuitReference> {
        self.board.with_trees(|t| {
            let c = &t.config;
            let mut refs = Vec::new();
            if filter.circuits {
                refs.extend(c.circuits.values().filter(|x| x.is_active).map(|x| {
                    reference(x.id, &x.name, Category::Circuit, Some(x.function))
                }));
            }
            if filter.features {
                refs.extend(c.features.values().filter(|x| x.is_active).map(|x| {
                    reference(x.id, &x.name, Category::Feature, Some(x.function))
                }));
            }
            if filter.virtual_circuits {
                refs.extend(VirtualCircuit::ALL.iter().map(|v| {
                    reference(v.id, v.desc, Category::VirtualCircuit, None)
                }));
            }
            if filter.groups {
                refs.extend(c.circuit_groups.values().filter(|x| x.is_active).map(|x| {
                    reference(x.id, &x.name, Category::CircuitGroup, None)
                }));
                refs.extend(c.light_groups.values().filter(|x| x.is_active).map(|x| {
                    reference(x.id, &x.name, Category::LightGroup, None)
                }));
            }
            refs.sort_by_key(|r| r.id);
            refs
        })
    }

    /// Active circuits with a light function.
    pub fn light_references(&self) -> Vec<CircuitReference> {
        self.board.with_trees(|t| {
            t.config
                .circuits
                .values()
                .filter(|c| c.is_active && c.function.is_light())
                .map(|c| reference(c.id, &c.name, Category::Circuit, Some(c.function)))
                .collect()
        })
    }

    fn active_circuit(&self, id: u16) -> Result<Circuit> {
        let limits = self.board.with_trees(|t| t.config.limits);
        if !is_in_range(IdCategory::Circuits, &limits, id) {
            return Err(BoardError::invalid_id(Category::Circuit, id));
        }
        self.board
            .with_trees(|t| t.config_of::<Circuit>(id).filter(|c| c.is_active).cloned())
            .ok_or(BoardError::not_found(Category::Circuit, id))
    }
}

fn reference(id: u16, name: &str, category: Category, function: Option<CircuitFunction>) -> CircuitReference {
    CircuitReference {
        id,
        name: name.to_string(),
        category,
        function,
    }
}
