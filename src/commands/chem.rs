//! Chemistry controller router.  Besides plain configuration, the only
//! extra duty is keeping the polling registry in step: a controller is
//! polled by the status loop exactly while it is fully configured.

use log::info;
use serde::Deserialize;

use crate::app::ports::HardwareGateway;
use crate::board::Board;
use crate::equipment::{BOARD_MASTER, Category, ChemControllerType};
use crate::error::{BoardError, Result};
use crate::ids::next_above_floor;
use crate::tree::config::ChemController;
use crate::tree::state::ChemReadings;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChemControllerUpdate {
    pub id: Option<u16>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub chem_type: Option<ChemControllerType>,
    pub address: Option<u8>,
    pub body: Option<u16>,
    pub ph_set_point: Option<f32>,
    pub orp_set_point: Option<u16>,
}

pub struct ChemCommands<'a, G: HardwareGateway + 'static> {
    board: &'a Board<G>,
}

impl<'a, G: HardwareGateway + 'static> ChemCommands<'a, G> {
    pub(crate) fn new(board: &'a Board<G>) -> Self {
        Self { board }
    }

    pub async fn set_chem_controller(&self, update: ChemControllerUpdate) -> Result<ChemController> {
        let controller = self.board.with_trees(|t| -> Result<ChemController> {
            let id = match update.id.filter(|id| *id != 0) {
                Some(id) => id,
                None => next_above_floor(1, t.config.chem_controllers.keys().copied()),
            };
            let mut c = t.config_of::<ChemController>(id).cloned().unwrap_or_else(|| ChemController {
                id,
                name: format!("Chem Controller {id}"),
                body: 1,
                master: BOARD_MASTER,
                ph_set_point: 7.4,
                orp_set_point: 650,
                ..ChemController::default()
            });
            if let Some(name) = update.name.clone() {
                c.name = name;
            }
            if let Some(kind) = update.chem_type {
                c.chem_type = kind;
            }
            if update.address.is_some() {
                c.address = update.address;
            }
            if let Some(body) = update.body {
                c.body = body;
            }
            if let Some(ph) = update.ph_set_point {
                if !(0.0..=14.0).contains(&ph) {
                    return Err(BoardError::InvalidParameter(format!("pH set point {ph} out of range")));
                }
                c.ph_set_point = ph;
            }
            if let Some(orp) = update.orp_set_point {
                c.orp_set_point = orp;
            }
            c.is_active = true;
            Ok(c)
        })?;

        self.board.with_trees_mut(|t| t.commit(controller.clone()));
        self.register(&controller);
        self.board.emit_changes();
        self.board.gateway().set_chem_controller(&controller).await?;
        Ok(controller)
    }

    /// Record readings reported for a controller.
    pub fn set_chem_controller_state(&self, id: u16, readings: ChemReadings) -> Result<()> {
        let found = self
            .board
            .with_trees_mut(|t| t.touch::<ChemController>(id, |s| s.readings = readings));
        if !found {
            return Err(BoardError::not_found(Category::ChemController, id));
        }
        self.board.emit_changes();
        Ok(())
    }

    pub async fn delete_chem_controller(&self, id: u16) -> Result<()> {
        let removed = self
            .board
            .with_trees_mut(|t| t.remove::<ChemController>(id))
            .ok_or(BoardError::not_found(Category::ChemController, id))?;
        self.register(&removed);
        self.board.emit_changes();
        self.board.gateway().remove_chem_controller(id).await?;
        Ok(())
    }

    fn register(&self, controller: &ChemController) {
        let mut polling = self.board.inner.chem_polling.borrow_mut();
        if controller.is_fully_configured() {
            if polling.insert(controller.id) {
                info!("Chem controller {}: polling started", controller.id);
            }
        } else if polling.remove(&controller.id) {
            info!("Chem controller {}: polling stopped", controller.id);
        }
    }
}
