//! Valve router.  Valve positions follow the circuits they are bound to;
//! the pool/spa virtual circuit diverts whenever any spa circuit is on.

use log::{debug, warn};
use serde::Deserialize;

use crate::app::ports::HardwareGateway;
use crate::board::Board;
use crate::equipment::{BOARD_MASTER, Category, CircuitFunction, VirtualCircuit};
use crate::error::{BoardError, Result};
use crate::ids::{VALVE_ID_FLOOR, next_above_floor};
use crate::tree::Trees;
use crate::tree::config::Valve;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValveUpdate {
    pub id: Option<u16>,
    pub name: Option<String>,
    pub circuit: Option<u16>,
    pub is_intake: Option<bool>,
    pub is_return: Option<bool>,
}

/// Position each active valve should be in, given current live state.
pub fn desired_positions(trees: &Trees) -> Vec<(u16, bool)> {
    trees
        .config
        .valves
        .values()
        .filter(|v| v.is_active && v.circuit != 0)
        .map(|v| {
            let diverted = if v.circuit == VirtualCircuit::POOL_SPA {
                trees.state.any_on(CircuitFunction::Spa)
            } else {
                trees.state.is_on(v.circuit).unwrap_or(false)
            };
            (v.id, diverted)
        })
        .collect()
}

pub struct ValveCommands<'a, G: HardwareGateway + 'static> {
    board: &'a Board<G>,
}

impl<'a, G: HardwareGateway + 'static> ValveCommands<'a, G> {
    pub(crate) fn new(board: &'a Board<G>) -> Self {
        Self { board }
    }

    pub async fn set_valve(&self, update: ValveUpdate) -> Result<Valve> {
        let valve = self.board.with_trees(|t| -> Result<Valve> {
            let id = match update.id.filter(|id| *id != 0) {
                Some(id) => id,
                None => next_above_floor(VALVE_ID_FLOOR, t.config.valves.keys().copied()),
            };
            let mut valve = t.config_of::<Valve>(id).cloned().unwrap_or_else(|| Valve {
                id,
                name: format!("Valve {id}"),
                master: BOARD_MASTER,
                ..Valve::default()
            });
            if let Some(name) = update.name.clone() {
                valve.name = name;
            }
            if let Some(circuit) = update.circuit {
                valve.circuit = circuit;
            }
            if let Some(intake) = update.is_intake {
                valve.is_intake = intake;
            }
            if let Some(ret) = update.is_return {
                valve.is_return = ret;
            }
            valve.is_active = true;
            Ok(valve)
        })?;

        self.board.with_trees_mut(|t| t.commit(valve.clone()));
        self.board.emit_changes();
        self.board.gateway().set_valve(&valve).await?;
        if let Err(e) = self.sync_valve_states().await {
            warn!("Valve {}: position sync failed: {}", valve.id, e);
        }
        Ok(valve)
    }

    pub async fn delete_valve(&self, id: u16) -> Result<()> {
        self.board
            .with_trees_mut(|t| t.remove::<Valve>(id))
            .ok_or(BoardError::not_found(Category::Valve, id))?;
        self.board.emit_changes();
        self.board.gateway().remove_valve(id).await?;
        Ok(())
    }

    /// Drive a valve and record the position once the gateway confirms.
    pub async fn set_valve_state(&self, id: u16, diverted: bool) -> Result<()> {
        let exists = self
            .board
            .with_trees(|t| t.config_of::<Valve>(id).is_some_and(|v| v.is_active));
        if !exists {
            return Err(BoardError::not_found(Category::Valve, id));
        }
        self.board.gateway().set_valve_state(id, diverted).await?;
        self.board
            .with_trees_mut(|t| t.touch::<Valve>(id, |s| s.is_diverted = diverted));
        Ok(())
    }

    /// Bring every valve in line with its circuit.  Only valves whose
    /// position differs are commanded; the first failure is returned after
    /// the rest have been tried.
    pub async fn sync_valve_states(&self) -> Result<()> {
        let pending: Vec<(u16, bool)> = self.board.with_trees(|t| {
            desired_positions(t)
                .into_iter()
                .filter(|(id, diverted)| {
                    t.state_of::<Valve>(*id).is_some_and(|s| s.is_diverted != *diverted)
                })
                .collect()
        });
        let mut first_err = None;
        for (id, diverted) in pending {
            debug!("Valve {} -> {}", id, if diverted { "diverted" } else { "home" });
            if let Err(e) = self.set_valve_state(id, diverted).await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
