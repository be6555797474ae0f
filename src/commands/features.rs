//! Feature router.  Features have no relay of their own: turning one on
//! only changes live state, which valves, pumps and groups then follow.

use log::warn;
use serde::Deserialize;

use crate::app::ports::HardwareGateway;
use crate::board::Board;
use crate::equipment::{BOARD_MASTER, Category, CircuitFunction, merge_egg_timer};
use crate::error::{BoardError, Result};
use crate::ids::{IdCategory, allocate_next, is_in_range};
use crate::tree::config::Feature;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureUpdate {
    pub id: Option<u16>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub function: Option<CircuitFunction>,
    pub egg_timer: Option<u16>,
    pub dont_stop: Option<bool>,
    pub show_in_features: Option<bool>,
}

pub struct FeatureCommands<'a, G: HardwareGateway + 'static> {
    board: &'a Board<G>,
}

impl<'a, G: HardwareGateway + 'static> FeatureCommands<'a, G> {
    pub(crate) fn new(board: &'a Board<G>) -> Self {
        Self { board }
    }

    pub async fn set_feature(&self, update: FeatureUpdate) -> Result<Feature> {
        let default_egg_timer = self.board.config().default_egg_timer;
        let feature = self.board.with_trees_mut(|t| -> Result<Feature> {
            let limits = t.config.limits;
            let id = match update.id.filter(|id| *id != 0) {
                Some(id) if is_in_range(IdCategory::Features, &limits, id) => id,
                Some(id) => return Err(BoardError::invalid_id(Category::Feature, id)),
                None => allocate_next(
                    IdCategory::Features,
                    &limits,
                    t.config.features.keys().copied(),
                    &[],
                )?,
            };
            let mut feature = t.config_of::<Feature>(id).cloned().unwrap_or_else(|| Feature {
                id,
                name: format!("feature{id}"),
                master: BOARD_MASTER,
                egg_timer: default_egg_timer,
                show_in_features: true,
                ..Feature::default()
            });
            if let Some(name) = update.name.clone() {
                feature.name = name;
            }
            if let Some(function) = update.function {
                feature.function = function;
            }
            if let Some(show) = update.show_in_features {
                feature.show_in_features = show;
            }
            feature.dont_stop = merge_egg_timer(&mut feature.egg_timer, update.egg_timer, update.dont_stop);
            feature.is_active = true;
            t.commit(feature.clone());
            Ok(feature)
        })?;
        self.board.emit_changes();
        Ok(feature)
    }

    pub async fn delete_feature(&self, id: u16) -> Result<()> {
        self.check_range(id)?;
        self.board
            .with_trees_mut(|t| t.remove::<Feature>(id))
            .ok_or(BoardError::not_found(Category::Feature, id))?;
        self.board.emit_changes();
        Ok(())
    }

    pub async fn set_feature_state(&self, id: u16, on: bool) -> Result<()> {
        self.check_range(id)?;
        let _guard = self.board.suspend_status();
        let found = self
            .board
            .with_trees_mut(|t| t.touch::<Feature>(id, |s| s.is_on = on));
        if !found {
            return Err(BoardError::not_found(Category::Feature, id));
        }
        if let Err(e) = self.board.valves().sync_valve_states().await {
            warn!("Feature {}: valve sync failed: {}", id, e);
        }
        Ok(())
    }

    pub async fn toggle_feature_state(&self, id: u16) -> Result<()> {
        self.check_range(id)?;
        let current = self
            .board
            .with_trees(|t| t.state_of::<Feature>(id).map(|s| s.is_on))
            .ok_or(BoardError::not_found(Category::Feature, id))?;
        self.set_feature_state(id, !current).await
    }

    fn check_range(&self, id: u16) -> Result<()> {
        let limits = self.board.with_trees(|t| t.config.limits);
        if is_in_range(IdCategory::Features, &limits, id) {
            Ok(())
        } else {
            Err(BoardError::invalid_id(Category::Feature, id))
        }
    }
}
