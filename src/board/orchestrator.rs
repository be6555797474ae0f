//! Topology selection and (re)initialization.
//!
//! `set_model` rebuilds both trees for a board model:
//!
//! ```text
//!  stop polling ─▶ resolve model ─▶ limits ─▶ bodies/body circuits
//!      ─▶ intake/return valves ─▶ id ranges ─▶ verify setup
//!      ─▶ gateway init ─▶ heat sources ─▶ cleanup ─▶ READY + polling
//! ```
//!
//! Only an unknown model or a failed gateway initialization is fatal;
//! everything else is recorded as an `EQ` equipment message.

use log::{error, info, warn};

use crate::app::ports::HardwareGateway;
use crate::equipment::{
    BOARD_MASTER, BodyType, CircuitFunction, EquipmentLimits, EquipmentModel, HeatSource,
    VirtualCircuit,
};
use crate::error::{BoardError, Result};
use crate::ids::{EquipmentIds, POOL_CIRCUIT_ID, SPA_CIRCUIT_ID, next_above_floor};
use crate::tree::Trees;
use crate::tree::config::{Body, Circuit, ConfigTree, Valve};
use crate::tree::state::{EQUIPMENT_MESSAGE_CODE, Severity};

use super::Board;
use super::lifecycle::BoardState;

const POOL_BODY_ID: u16 = 1;
const SPA_BODY_ID: u16 = 2;

impl<G: HardwareGateway + 'static> Board<G> {
    /// Switch the board to `model` (name, part or code) and rebuild.
    /// Returns the rebuilt configuration snapshot.
    pub async fn set_model(&self, model: &str) -> Result<ConfigTree> {
        let guard = self.suspend_status();
        self.stop_status_loop();
        self.transition(BoardState::Initializing);
        self.with_trees_mut(|t| {
            t.state.clear_messages(EQUIPMENT_MESSAGE_CODE);
            t.messages_changed();
        });

        let result = self.rebuild(model).await;
        match result {
            Ok(()) => {
                self.transition(BoardState::Ready);
                info!("{} control board initialized", self.model_desc());
                self.schedule_health_check();
                self.start_status_loop();
                drop(guard);
                Ok(self.config_snapshot())
            }
            Err(e) => {
                error!("Error initializing virtual control board: {}", e);
                self.transition(BoardState::Failed);
                drop(guard);
                Err(e)
            }
        }
    }

    /// Re-run initialization with the current model.
    pub async fn initialize(&self) -> Result<ConfigTree> {
        let current = self.with_trees(|t| t.config.model);
        let key = match current {
            Some(code) => code.to_string(),
            None => self.config().model.clone(),
        };
        self.set_model(&key).await
    }

    /// Replace the configuration tree wholesale (e.g. from a persisted
    /// snapshot).  Call [`initialize`](Self::initialize) afterwards.
    pub fn load_snapshot(&self, config: ConfigTree) {
        self.with_trees_mut(|t| {
            let status = t.state.status.clone();
            *t = Trees::new(config);
            t.set_status(status);
        });
        self.emit_changes();
    }

    // -----------------------------------------------------------------------
    // Rebuild steps
    // -----------------------------------------------------------------------

    async fn rebuild(&self, key: &str) -> Result<()> {
        let model = EquipmentModel::lookup(key).ok_or_else(|| BoardError::UnknownModel(key.to_string()))?;
        let limits = EquipmentLimits::for_model(model);
        let egg_timer = self.config().default_egg_timer;

        self.with_trees_mut(|t| {
            t.config.model = Some(model.code);
            t.config.limits = limits;
            rebuild_bodies(t, model, egg_timer);
            init_valves(t, model);
            t.config.equipment_ids = Some(EquipmentIds::for_limits(&limits));
        });
        self.emit_changes();

        self.transition(BoardState::Verifying);
        self.verify_setup().await;

        let snapshot = self.config_snapshot();
        self.gateway()
            .initialize(&snapshot)
            .await
            .map_err(|e| BoardError::InitializationFailure(e.to_string()))?;

        self.with_trees_mut(update_heater_services);
        self.cleanup_state();
        Ok(())
    }

    /// Ask the gateway to initialise every circuit, heater and relay pump
    /// this board owns.  Failures become warnings.
    async fn verify_setup(&self) {
        let (circuits, heaters, pumps) = self.with_trees(|t| {
            let c = &t.config;
            (
                c.circuits
                    .values()
                    .filter(|x| x.is_active && x.master == BOARD_MASTER)
                    .cloned()
                    .collect::<Vec<_>>(),
                c.heaters
                    .values()
                    .filter(|x| x.is_active && x.master == BOARD_MASTER)
                    .cloned()
                    .collect::<Vec<_>>(),
                c.pumps
                    .values()
                    .filter(|x| x.is_active && x.master == BOARD_MASTER && x.pump_type.is_relay())
                    .cloned()
                    .collect::<Vec<_>>(),
            )
        });

        let gw = self.gateway();
        let mut failures = Vec::new();
        for circuit in &circuits {
            let result = match gw.init_circuit(circuit).await {
                Ok(()) => gw.validate_circuit(circuit.id).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                failures.push(format!("circuit {} ({}): {}", circuit.id, circuit.name, e));
            }
        }
        for heater in &heaters {
            if let Err(e) = gw.init_heater(heater).await {
                failures.push(format!("heater {} ({}): {}", heater.id, heater.name, e));
            }
        }
        for pump in &pumps {
            if let Err(e) = gw.init_pump(pump).await {
                failures.push(format!("pump {} ({}): {}", pump.id, pump.name, e));
            }
        }

        if failures.is_empty() {
            return;
        }
        self.with_trees_mut(|t| {
            for msg in failures {
                warn!("Verify setup: {}", msg);
                t.state
                    .push_message(EQUIPMENT_MESSAGE_CODE, Severity::Warning, msg);
            }
            t.messages_changed();
        });
    }

    /// Drop state left over from the previous topology.
    fn cleanup_state(&self) {
        self.inner.light_sequences.borrow_mut().clear();
        self.with_trees_mut(|t| {
            t.cleanup();
            for g in t.state.light_groups.values_mut() {
                g.action = crate::equipment::LightAction::Idle;
            }
            let configured: Vec<u16> = t
                .config
                .chem_controllers
                .values()
                .filter(|c| c.is_fully_configured())
                .map(|c| c.id)
                .collect();
            self.inner
                .chem_polling
                .borrow_mut()
                .retain(|id| configured.contains(id));
        });
    }

    fn model_desc(&self) -> &'static str {
        self.model().map_or("Virtual", |m| m.desc)
    }
}

// ---------------------------------------------------------------------------
// Pure tree rebuild helpers
// ---------------------------------------------------------------------------

fn rebuild_bodies(trees: &mut Trees, model: &EquipmentModel, egg_timer: u16) {
    if model.bodies == 0 {
        for id in [POOL_BODY_ID, SPA_BODY_ID] {
            trees.remove::<Body>(id);
        }
        for id in [SPA_CIRCUIT_ID, POOL_CIRCUIT_ID] {
            trees.remove::<Circuit>(id);
        }
        return;
    }

    let pool_name = if model.dual { "Body 1" } else { "Pool" };
    ensure_body(
        trees,
        POOL_BODY_ID,
        POOL_CIRCUIT_ID,
        BodyType::Pool,
        CircuitFunction::Pool,
        pool_name,
        egg_timer,
    );

    if model.shared || model.dual {
        let (body_type, function, name) = if model.dual {
            (BodyType::Pool, CircuitFunction::Pool, "Body 2")
        } else {
            (BodyType::Spa, CircuitFunction::Spa, "Spa")
        };
        ensure_body(
            trees,
            SPA_BODY_ID,
            SPA_CIRCUIT_ID,
            body_type,
            function,
            name,
            egg_timer,
        );
    } else {
        trees.remove::<Body>(SPA_BODY_ID);
        let body_circuit = trees
            .config_of::<Circuit>(SPA_CIRCUIT_ID)
            .is_some_and(|c| c.function.has_heat_source());
        if body_circuit {
            trees.remove::<Circuit>(SPA_CIRCUIT_ID);
        }
    }
}

/// Create or refresh a body and its fixed circuit, keeping user-set fields.
fn ensure_body(
    trees: &mut Trees,
    body_id: u16,
    circuit_id: u16,
    body_type: BodyType,
    function: CircuitFunction,
    default_name: &str,
    egg_timer: u16,
) {
    let mut body = trees.config_of::<Body>(body_id).cloned().unwrap_or_else(|| Body {
        id: body_id,
        name: default_name.to_string(),
        ..Body::default()
    });
    body.body_type = body_type;
    body.circuit = circuit_id;
    body.is_active = true;
    body.master = BOARD_MASTER;
    let body_name = body.name.clone();
    trees.commit(body);

    let mut circuit = trees
        .config_of::<Circuit>(circuit_id)
        .cloned()
        .unwrap_or_else(|| Circuit {
            id: circuit_id,
            name: body_name,
            egg_timer,
            ..Circuit::default()
        });
    circuit.function = function;
    circuit.is_active = true;
    circuit.master = BOARD_MASTER;
    circuit.dont_stop = circuit.egg_timer == crate::equipment::DONT_STOP_MINUTES;
    trees.commit(circuit);
}

/// Intake/return valves exist only on shared-body boards, both bound to
/// the pool/spa virtual circuit.
fn init_valves(trees: &mut Trees, model: &EquipmentModel) {
    info!("Initializing Intake/Return valves");
    let intake = trees.config.valves.values().find(|v| v.is_intake).map(|v| v.id);
    let ret = trees.config.valves.values().find(|v| v.is_return).map(|v| v.id);

    if !model.shared {
        for id in intake.into_iter().chain(ret) {
            trees.remove::<Valve>(id);
        }
        return;
    }

    for (existing, is_intake, name) in [(intake, true, "Intake"), (ret, false, "Return")] {
        let id = existing.unwrap_or_else(|| next_above_floor(1, trees.config.valves.keys().copied()));
        trees.commit(Valve {
            id,
            name: name.into(),
            circuit: VirtualCircuit::POOL_SPA,
            is_intake,
            is_return: !is_intake,
            is_virtual: true,
            is_active: true,
            master: BOARD_MASTER,
        });
    }
}

/// Recompute which heat sources each body may select from the active
/// heaters.  A body whose heat mode is no longer eligible falls back to off.
pub(crate) fn update_heater_services(trees: &mut Trees) {
    let bodies: Vec<Body> = trees.config.bodies.values().cloned().collect();
    for mut body in bodies {
        let sources = HeatSource::eligible(
            trees
                .config
                .heaters
                .values()
                .filter(|h| h.is_active && h.serves(body.id))
                .map(|h| h.heater_type),
        );
        if !sources.contains(&body.heat_mode) {
            body.heat_mode = HeatSource::Off;
            trees.commit(body.clone());
        }
        if trees.state_of::<Body>(body.id).is_some_and(|s| s.heat_sources != sources) {
            trees.touch::<Body>(body.id, |s| s.heat_sources = sources);
        }
    }
}
