//! The virtual board: shared context for every router.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────────┐
//!  │  Board<G>  (Rc, cloned into spawned tasks)                   │
//!  │                                                              │
//!  │   Trees ◀── routers (circuits, features, groups, valves,     │
//!  │     │         heaters, bodies, chem)                         │
//!  │     │                    │                                   │
//!  │     ▼                    ▼                                   │
//!  │   EventSinks        HardwareGateway G                        │
//!  │                                                              │
//!  │   Lifecycle · status loop · light sequences · chem polling   │
//!  └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one `edge_executor::LocalExecutor`.  Tree borrows
//! are scoped to synchronous blocks and never held across an `.await`,
//! so each mutation runs to its next suspension point in isolation.

pub mod lifecycle;
pub mod orchestrator;
pub mod status;

use core::cell::{Cell, RefCell};
use core::future::Future;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use edge_executor::{LocalExecutor, Task};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;

use crate::app::ports::{EventSink, HardwareGateway};
use crate::commands::bodies::BodyCommands;
use crate::commands::chem::ChemCommands;
use crate::commands::circuits::CircuitCommands;
use crate::commands::features::FeatureCommands;
use crate::commands::groups::{self, GroupCommands};
use crate::commands::heaters::HeaterCommands;
use crate::commands::valves::ValveCommands;
use crate::config::BoardConfig;
use crate::equipment::EquipmentModel;
use crate::tree::Trees;
use crate::tree::config::ConfigTree;
use crate::tree::state::StateTree;

use lifecycle::{BoardState, Lifecycle};

/// Executor every board task runs on.
pub type Executor = LocalExecutor<'static, 64>;

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Handle to the virtual board.  Cheap to clone; all clones share state.
pub struct Board<G: HardwareGateway + 'static> {
    pub(crate) inner: Rc<BoardInner<G>>,
}

impl<G: HardwareGateway + 'static> Clone for Board<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

pub(crate) struct BoardInner<G> {
    pub(crate) config: BoardConfig,
    pub(crate) gateway: G,
    pub(crate) executor: Rc<Executor>,
    pub(crate) trees: RefCell<Trees>,
    pub(crate) lifecycle: RefCell<Lifecycle>,
    pub(crate) sinks: RefCell<Vec<Box<dyn EventSink>>>,
    /// Nesting depth of status suspensions; polling runs only at zero.
    pub(crate) suspended: Cell<u32>,
    pub(crate) status_task: RefCell<Option<Task<()>>>,
    pub(crate) health_task: RefCell<Option<Task<()>>>,
    /// In-flight light sequence per light group.  Replacing an entry
    /// drops (cancels) the previous task.
    pub(crate) light_sequences: RefCell<BTreeMap<u16, Task<()>>>,
    pub(crate) chem_polling: RefCell<BTreeSet<u16>>,
    /// Held across "opposite body off, requested body on" on shared-body
    /// boards so concurrent body commands take turns.
    pub(crate) body_switch: Mutex<NoopRawMutex, ()>,
}

impl<G: HardwareGateway + 'static> Board<G> {
    pub fn new(config: BoardConfig, gateway: G, executor: Rc<Executor>) -> Self {
        Self {
            inner: Rc::new(BoardInner {
                config,
                gateway,
                executor,
                trees: RefCell::new(Trees::default()),
                lifecycle: RefCell::new(Lifecycle::new()),
                sinks: RefCell::new(Vec::new()),
                suspended: Cell::new(0),
                status_task: RefCell::new(None),
                health_task: RefCell::new(None),
                light_sequences: RefCell::new(BTreeMap::new()),
                chem_polling: RefCell::new(BTreeSet::new()),
                body_switch: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.inner.config
    }

    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    /// Register a broadcast subscriber.
    pub fn subscribe(&self, sink: impl EventSink + 'static) {
        self.inner.sinks.borrow_mut().push(Box::new(sink));
    }

    pub fn board_state(&self) -> BoardState {
        self.inner.lifecycle.borrow().current()
    }

    pub fn is_status_suspended(&self) -> bool {
        self.inner.suspended.get() > 0
    }

    /// Read access to both trees.
    pub fn with_trees<R>(&self, f: impl FnOnce(&Trees) -> R) -> R {
        f(&self.inner.trees.borrow())
    }

    pub fn config_snapshot(&self) -> ConfigTree {
        self.inner.trees.borrow().config.clone()
    }

    pub fn state_snapshot(&self) -> StateTree {
        self.inner.trees.borrow().state.clone()
    }

    /// Model the trees were last built for.
    pub fn model(&self) -> Option<&'static EquipmentModel> {
        self.with_trees(|t| t.config.model).and_then(EquipmentModel::by_code)
    }

    /// Ids currently registered for chemistry polling.
    pub fn polled_chem_controllers(&self) -> Vec<u16> {
        self.inner.chem_polling.borrow().iter().copied().collect()
    }

    // -- routers --

    pub fn circuits(&self) -> CircuitCommands<'_, G> {
        CircuitCommands::new(self)
    }

    pub fn features(&self) -> FeatureCommands<'_, G> {
        FeatureCommands::new(self)
    }

    pub fn groups(&self) -> GroupCommands<'_, G> {
        GroupCommands::new(self)
    }

    pub fn valves(&self) -> ValveCommands<'_, G> {
        ValveCommands::new(self)
    }

    pub fn heaters(&self) -> HeaterCommands<'_, G> {
        HeaterCommands::new(self)
    }

    pub fn bodies(&self) -> BodyCommands<'_, G> {
        BodyCommands::new(self)
    }

    pub fn chem_controllers(&self) -> ChemCommands<'_, G> {
        ChemCommands::new(self)
    }

    // -----------------------------------------------------------------------
    // Crate-internal plumbing
    // -----------------------------------------------------------------------

    pub(crate) fn with_trees_mut<R>(&self, f: impl FnOnce(&mut Trees) -> R) -> R {
        f(&mut self.inner.trees.borrow_mut())
    }

    /// Suspend status polling until the returned guard drops.
    pub(crate) fn suspend_status(&self) -> StatusSuspension<'_, G> {
        self.inner.suspended.set(self.inner.suspended.get() + 1);
        StatusSuspension { board: self }
    }

    /// Broadcast every queued and dirty change to all sinks.
    pub(crate) fn emit_changes(&self) {
        let changes = self.inner.trees.borrow_mut().take_changes();
        if changes.is_empty() {
            return;
        }
        let mut sinks = self.inner.sinks.borrow_mut();
        for change in &changes {
            for sink in sinks.iter_mut() {
                sink.emit(change);
            }
        }
    }

    pub(crate) fn spawn(&self, fut: impl Future<Output = ()> + 'static) -> Task<()> {
        self.inner.executor.spawn(fut)
    }

    pub(crate) fn transition(&self, next: BoardState) -> bool {
        let moved = self.inner.lifecycle.borrow_mut().transition(next);
        if moved {
            self.with_trees_mut(|t| t.set_status(next.status()));
        }
        moved
    }
}

// ---------------------------------------------------------------------------
// Status suspension
// ---------------------------------------------------------------------------

/// Finalizer for state-mutating commands.
///
/// Dropping it resumes polling, resyncs pump outputs, recomputes group
/// aggregates and broadcasts, on every exit path.
pub(crate) struct StatusSuspension<'a, G: HardwareGateway + 'static> {
    board: &'a Board<G>,
}

impl<G: HardwareGateway + 'static> Drop for StatusSuspension<'_, G> {
    fn drop(&mut self) {
        let inner = &self.board.inner;
        inner.suspended.set(inner.suspended.get().saturating_sub(1));
        if let Ok(mut trees) = inner.trees.try_borrow_mut() {
            groups::recompute_group_states(&mut trees);
            status::derive_pump_states(&mut trees);
            inner.gateway.sync_pump_states(&trees.state);
        }
        self.board.emit_changes();
    }
}
