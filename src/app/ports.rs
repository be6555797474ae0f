//! Port traits — the hexagonal boundary between the board and the outside world.
//!
//! ```text
//!   Router ──▶ HardwareGateway ──▶ relays, valves, heaters, chem probes
//!   Board  ──▶ EventSink       ──▶ log, change feed, socket layer
//! ```
//!
//! The [`Board`](crate::board::Board) consumes the gateway via generics,
//! so the orchestration core never touches a bus directly.  Every gateway
//! call is async and may fail on its own; the routers convert failures to
//! [`BoardError::HardwareFailure`](crate::error::BoardError::HardwareFailure).

use crate::app::events::StateChange;
use crate::error::GatewayError;
use crate::tree::config::{ChemController, Circuit, ConfigTree, Heater, Pump, Valve};
use crate::tree::state::{ChemReadings, StateTree};

/// Gateway call result.
pub type GatewayResult<T = ()> = core::result::Result<T, GatewayError>;

// ───────────────────────────────────────────────────────────────
// Hardware gateway (driven adapter: board → equipment)
// ───────────────────────────────────────────────────────────────

/// Async bridge performing the actual actuation per equipment category.
///
/// Methods take `&self`; implementations hold their own interior state.
/// Futures are polled on a single-threaded executor and need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait HardwareGateway {
    /// Bring the whole subsystem up against the rebuilt configuration.
    async fn initialize(&self, config: &ConfigTree) -> GatewayResult;

    // -- circuits --
    async fn init_circuit(&self, circuit: &Circuit) -> GatewayResult;
    /// Confirm an initialised circuit is controllable.
    async fn validate_circuit(&self, id: u16) -> GatewayResult;
    async fn set_circuit_state(&self, id: u16, on: bool) -> GatewayResult;
    /// Forward circuit metadata (name, function, egg timer).
    async fn set_circuit(&self, circuit: &Circuit) -> GatewayResult;
    async fn remove_circuit(&self, id: u16) -> GatewayResult;

    // -- heaters --
    async fn init_heater(&self, heater: &Heater) -> GatewayResult;
    async fn set_heater(&self, heater: &Heater) -> GatewayResult;
    async fn remove_heater(&self, id: u16) -> GatewayResult;

    // -- pumps --
    async fn init_pump(&self, pump: &Pump) -> GatewayResult;
    /// Re-derive pump outputs from circuit state.  Fire-and-forget.
    fn sync_pump_states(&self, state: &StateTree);

    // -- valves --
    async fn set_valve(&self, valve: &Valve) -> GatewayResult;
    async fn set_valve_state(&self, id: u16, diverted: bool) -> GatewayResult;
    async fn remove_valve(&self, id: u16) -> GatewayResult;

    // -- chemistry --
    async fn set_chem_controller(&self, controller: &ChemController) -> GatewayResult;
    async fn poll_chem_controller(&self, id: u16) -> GatewayResult<ChemReadings>;
    async fn remove_chem_controller(&self, id: u16) -> GatewayResult;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: board → broadcast)
// ───────────────────────────────────────────────────────────────

/// The board emits every [`StateChange`] through this port.
pub trait EventSink {
    fn emit(&mut self, change: &StateChange);
}
