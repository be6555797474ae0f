//! Periodic status pass and the deferred health check.

use core::time::Duration;

use log::{debug, warn};

use crate::app::ports::HardwareGateway;
use crate::commands::groups::recompute_group_states;
use crate::tree::Trees;
use crate::tree::config::{ChemController, Pump};

use super::Board;
use super::lifecycle::BoardState;

impl<G: HardwareGateway + 'static> Board<G> {
    /// One status pass.  Skipped while a command holds polling suspended.
    pub async fn process_status(&self) {
        if self.is_status_suspended() {
            debug!("Status pass skipped: polling suspended");
            return;
        }
        let _guard = self.suspend_status();
        self.with_trees_mut(|t| {
            recompute_group_states(t);
            derive_pump_states(t);
        });
        if let Err(e) = self.valves().sync_valve_states().await {
            warn!("Status pass: valve sync failed: {}", e);
        }
        self.poll_chem_controllers().await;
    }

    async fn poll_chem_controllers(&self) {
        let ids = self.polled_chem_controllers();
        for id in ids {
            match self.gateway().poll_chem_controller(id).await {
                Ok(readings) => {
                    self.with_trees_mut(|t| {
                        t.touch::<ChemController>(id, |s| s.readings = readings);
                    });
                }
                Err(e) => warn!("Chem controller {}: poll failed: {}", id, e),
            }
        }
    }

    pub(crate) fn start_status_loop(&self) {
        let board = self.clone();
        let interval = Duration::from_millis(self.config().status_interval_ms);
        let task = self.spawn(async move {
            loop {
                async_io_mini::Timer::after(interval).await;
                if board.board_state() != BoardState::Ready {
                    break;
                }
                board.process_status().await;
            }
        });
        *self.inner.status_task.borrow_mut() = Some(task);
    }

    /// Cancel the status loop and any pending health check.
    pub(crate) fn stop_status_loop(&self) {
        self.inner.status_task.borrow_mut().take();
        self.inner.health_task.borrow_mut().take();
    }

    pub(crate) fn schedule_health_check(&self) {
        let board = self.clone();
        let delay = Duration::from_millis(self.config().health_check_delay_ms);
        let task = self.spawn(async move {
            async_io_mini::Timer::after(delay).await;
            debug!("Deferred health check");
            board.process_status().await;
        });
        *self.inner.health_task.borrow_mut() = Some(task);
    }
}

/// Relay pumps run exactly when their bound circuit is on.
pub(crate) fn derive_pump_states(trees: &mut Trees) {
    let updates: Vec<(u16, bool)> = trees
        .config
        .pumps
        .values()
        .filter(|p| p.is_active && p.pump_type.is_relay() && p.circuit != 0)
        .map(|p| (p.id, trees.state.is_on(p.circuit).unwrap_or(false)))
        .filter(|(id, on)| trees.state.pumps.get(id).is_some_and(|s| s.is_on != *on))
        .collect();
    for (id, on) in updates {
        trees.touch::<Pump>(id, |s| s.is_on = on);
    }
}
