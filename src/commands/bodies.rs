//! Body router.  Bodies are created and removed only by the orchestrator
//! during a topology rebuild; clients may edit the user-facing fields.

use serde::Deserialize;

use crate::app::ports::HardwareGateway;
use crate::board::Board;
use crate::equipment::{Category, HeatSource};
use crate::error::{BoardError, Result};
use crate::tree::config::Body;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BodyUpdate {
    pub id: u16,
    pub name: Option<String>,
    pub capacity: Option<u32>,
    pub set_point: Option<u8>,
    pub heat_mode: Option<HeatSource>,
}

pub struct BodyCommands<'a, G: HardwareGateway + 'static> {
    board: &'a Board<G>,
}

impl<'a, G: HardwareGateway + 'static> BodyCommands<'a, G> {
    pub(crate) fn new(board: &'a Board<G>) -> Self {
        Self { board }
    }

    pub fn set_body(&self, update: BodyUpdate) -> Result<Body> {
        let body = self.board.with_trees_mut(|t| -> Result<Body> {
            let mut body = t
                .config_of::<Body>(update.id)
                .filter(|b| b.is_active)
                .cloned()
                .ok_or(BoardError::not_found(Category::Body, update.id))?;
            if let Some(mode) = update.heat_mode {
                let eligible = t
                    .state_of::<Body>(body.id)
                    .is_some_and(|s| s.heat_sources.contains(&mode));
                if mode != HeatSource::Off && !eligible {
                    return Err(BoardError::InvalidParameter(format!(
                        "heat mode {mode:?} is not available for body {}",
                        body.id
                    )));
                }
                body.heat_mode = mode;
            }
            if let Some(name) = update.name.clone() {
                body.name = name;
            }
            if let Some(capacity) = update.capacity {
                body.capacity = capacity;
            }
            if let Some(set_point) = update.set_point {
                body.set_point = set_point;
            }
            t.commit(body.clone());
            Ok(body)
        })?;
        self.board.emit_changes();
        Ok(body)
    }
}
