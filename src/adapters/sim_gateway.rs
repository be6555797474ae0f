//! Simulated hardware gateway.
//!
//! Keeps relay, valve and pump outputs in memory and logs every
//! actuation.  Chemistry polls echo the controller's set points back as
//! readings.  An optional per-command latency exercises the board's
//! suspension points the way a real bus would.

use core::cell::RefCell;
use core::time::Duration;
use std::collections::BTreeMap;

use log::{debug, info};

use crate::app::ports::{GatewayResult, HardwareGateway};
use crate::error::GatewayError;
use crate::tree::config::{ChemController, Circuit, ConfigTree, Heater, Pump, Valve};
use crate::tree::state::{ChemReadings, StateTree};

#[derive(Debug, Default)]
struct SimOutputs {
    relays: BTreeMap<u16, bool>,
    valves: BTreeMap<u16, bool>,
    pumps: BTreeMap<u16, bool>,
    chem: BTreeMap<u16, ChemReadings>,
}

/// In-memory [`HardwareGateway`].
#[derive(Debug, Default)]
pub struct SimGateway {
    outputs: RefCell<SimOutputs>,
    latency: Duration,
}

impl SimGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every actuation by `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn relay(&self, id: u16) -> Option<bool> {
        self.outputs.borrow().relays.get(&id).copied()
    }

    pub fn valve(&self, id: u16) -> Option<bool> {
        self.outputs.borrow().valves.get(&id).copied()
    }

    pub fn pump(&self, id: u16) -> Option<bool> {
        self.outputs.borrow().pumps.get(&id).copied()
    }

    async fn settle(&self) {
        if !self.latency.is_zero() {
            async_io_mini::Timer::after(self.latency).await;
        }
    }

    fn known_relay(&self, id: u16) -> GatewayResult {
        if self.outputs.borrow().relays.contains_key(&id) {
            Ok(())
        } else {
            Err(GatewayError::Init(format!("no relay for circuit {id}")))
        }
    }
}

impl HardwareGateway for SimGateway {
    async fn initialize(&self, config: &ConfigTree) -> GatewayResult {
        info!(
            "SIM | initialize: {} circuits, {} valves, {} heaters",
            config.circuits.len(),
            config.valves.len(),
            config.heaters.len()
        );
        let mut out = self.outputs.borrow_mut();
        out.relays.retain(|id, _| config.circuits.contains_key(id));
        out.valves.retain(|id, _| config.valves.contains_key(id));
        Ok(())
    }

    async fn init_circuit(&self, circuit: &Circuit) -> GatewayResult {
        debug!("SIM | init circuit {} ({})", circuit.id, circuit.name);
        self.outputs.borrow_mut().relays.entry(circuit.id).or_insert(false);
        Ok(())
    }

    async fn validate_circuit(&self, id: u16) -> GatewayResult {
        self.known_relay(id)
    }

    async fn set_circuit_state(&self, id: u16, on: bool) -> GatewayResult {
        self.settle().await;
        info!("SIM | relay {} -> {}", id, if on { "ON" } else { "OFF" });
        self.outputs.borrow_mut().relays.insert(id, on);
        Ok(())
    }

    async fn set_circuit(&self, circuit: &Circuit) -> GatewayResult {
        debug!("SIM | circuit {} config: {:?}", circuit.id, circuit.function);
        self.outputs.borrow_mut().relays.entry(circuit.id).or_insert(false);
        Ok(())
    }

    async fn remove_circuit(&self, id: u16) -> GatewayResult {
        info!("SIM | remove relay {}", id);
        self.outputs.borrow_mut().relays.remove(&id);
        Ok(())
    }

    async fn init_heater(&self, heater: &Heater) -> GatewayResult {
        debug!("SIM | init heater {} ({:?})", heater.id, heater.heater_type);
        Ok(())
    }

    async fn set_heater(&self, heater: &Heater) -> GatewayResult {
        info!("SIM | heater {} serves body {}", heater.id, heater.body);
        Ok(())
    }

    async fn remove_heater(&self, id: u16) -> GatewayResult {
        info!("SIM | remove heater {}", id);
        Ok(())
    }

    async fn init_pump(&self, pump: &Pump) -> GatewayResult {
        debug!("SIM | init pump {} on circuit {}", pump.id, pump.circuit);
        self.outputs.borrow_mut().pumps.entry(pump.id).or_insert(false);
        Ok(())
    }

    fn sync_pump_states(&self, state: &StateTree) {
        let mut out = self.outputs.borrow_mut();
        for pump in state.pumps.values() {
            let prev = out.pumps.insert(pump.id, pump.is_on);
            if prev != Some(pump.is_on) {
                info!("SIM | pump {} -> {}", pump.id, if pump.is_on { "ON" } else { "OFF" });
            }
        }
    }

    async fn set_valve(&self, valve: &Valve) -> GatewayResult {
        debug!("SIM | valve {} bound to circuit {}", valve.id, valve.circuit);
        self.outputs.borrow_mut().valves.entry(valve.id).or_insert(false);
        Ok(())
    }

    async fn set_valve_state(&self, id: u16, diverted: bool) -> GatewayResult {
        self.settle().await;
        info!("SIM | valve {} -> {}", id, if diverted { "DIVERTED" } else { "HOME" });
        self.outputs.borrow_mut().valves.insert(id, diverted);
        Ok(())
    }

    async fn remove_valve(&self, id: u16) -> GatewayResult {
        self.outputs.borrow_mut().valves.remove(&id);
        Ok(())
    }

    async fn set_chem_controller(&self, controller: &ChemController) -> GatewayResult {
        let readings = ChemReadings {
            ph_level: Some(controller.ph_set_point),
            orp_level: Some(controller.orp_set_point),
            temperature: None,
        };
        self.outputs.borrow_mut().chem.insert(controller.id, readings);
        Ok(())
    }

    async fn poll_chem_controller(&self, id: u16) -> GatewayResult<ChemReadings> {
        self.outputs
            .borrow()
            .chem
            .get(&id)
            .copied()
            .ok_or_else(|| GatewayError::Command(format!("chem controller {id} not responding")))
    }

    async fn remove_chem_controller(&self, id: u16) -> GatewayResult {
        self.outputs.borrow_mut().chem.remove(&id);
        Ok(())
    }
}
