//! Heater router.  Heaters created here are virtual and numbered from
//! [`HEATER_ID_FLOOR`] so they never collide with physical heaters.

use serde::Deserialize;

use crate::app::ports::HardwareGateway;
use crate::board::Board;
use crate::board::orchestrator::update_heater_services;
use crate::equipment::{BOARD_MASTER, Category, HeaterType};
use crate::error::{BoardError, Result};
use crate::ids::{HEATER_ID_FLOOR, next_above_floor};
use crate::tree::config::Heater;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeaterUpdate {
    pub id: Option<u16>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub heater_type: Option<HeaterType>,
    pub body: Option<u16>,
    pub address: Option<u8>,
}

pub struct HeaterCommands<'a, G: HardwareGateway + 'static> {
    board: &'a Board<G>,
}

impl<'a, G: HardwareGateway + 'static> HeaterCommands<'a, G> {
    pub(crate) fn new(board: &'a Board<G>) -> Self {
        Self { board }
    }

    pub async fn set_heater(&self, update: HeaterUpdate) -> Result<Heater> {
        let heater = self.board.with_trees(|t| -> Result<Heater> {
            let id = match update.id.filter(|id| *id != 0) {
                Some(id) if id < HEATER_ID_FLOOR => {
                    return Err(BoardError::invalid_id(Category::Heater, id));
                }
                Some(id) => id,
                None => next_above_floor(HEATER_ID_FLOOR, t.config.heaters.keys().copied()),
            };
            let mut heater = t.config_of::<Heater>(id).cloned().unwrap_or_else(|| Heater {
                id,
                name: format!("Heater {id}"),
                ..Heater::default()
            });
            if let Some(name) = update.name.clone() {
                heater.name = name;
            }
            if let Some(kind) = update.heater_type {
                heater.heater_type = kind;
            }
            if let Some(body) = update.body {
                if body != 0 && t.config.bodies.get(&body).is_none_or(|b| !b.is_active) {
                    return Err(BoardError::InvalidParameter(format!(
                        "heater body {body} does not exist"
                    )));
                }
                heater.body = body;
            }
            if update.address.is_some() {
                heater.address = update.address;
            }
            heater.is_virtual = true;
            heater.is_active = true;
            heater.master = BOARD_MASTER;
            Ok(heater)
        })?;

        self.board.with_trees_mut(|t| {
            t.commit(heater.clone());
            update_heater_services(t);
        });
        self.board.emit_changes();
        self.board.gateway().set_heater(&heater).await?;
        Ok(heater)
    }

    pub async fn delete_heater(&self, id: u16) -> Result<()> {
        self.board
            .with_trees_mut(|t| {
                let removed = t.remove::<Heater>(id);
                update_heater_services(t);
                removed
            })
            .ok_or(BoardError::not_found(Category::Heater, id))?;
        self.board.emit_changes();
        self.board.gateway().remove_heater(id).await?;
        Ok(())
    }
}
