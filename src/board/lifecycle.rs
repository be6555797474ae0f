//! Topology lifecycle state machine.
//!
//! ```text
//!  UNINITIALIZED ──▶ INITIALIZING ──▶ VERIFYING ──▶ READY
//!                        ▲                            │
//!                        └──────[model change]────────┘
//!
//!  Any state ──[unrecoverable]──▶ FAILED ──[retry]──▶ INITIALIZING
//! ```
//!
//! Each state maps to the controller status code clients already know
//! (`0` initializing, `1` ready, `2` verifying, `3` uninitialized,
//! `255` failed).

use log::{info, warn};

use crate::tree::state::ControllerStatus;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BoardState {
    Uninitialized = 0,
    Initializing = 1,
    Verifying = 2,
    Ready = 3,
    Failed = 4,
}

impl BoardState {
    pub const COUNT: usize = 5;

    pub fn descriptor(self) -> &'static StateDescriptor {
        &STATE_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn status(self) -> ControllerStatus {
        let d = self.descriptor();
        ControllerStatus {
            val: d.status_code,
            name: d.name,
            percent: d.percent,
        }
    }
}

// ---------------------------------------------------------------------------
// State table
// ---------------------------------------------------------------------------

/// One row of the lifecycle table.
pub struct StateDescriptor {
    pub id: BoardState,
    pub name: &'static str,
    pub status_code: u8,
    pub percent: u8,
    /// States reachable from here.  `Failed` is always reachable.
    pub next: &'static [BoardState],
}

static STATE_TABLE: [StateDescriptor; BoardState::COUNT] = [
    StateDescriptor {
        id: BoardState::Uninitialized,
        name: "uninitialized",
        status_code: 3,
        percent: 0,
        next: &[BoardState::Initializing],
    },
    StateDescriptor {
        id: BoardState::Initializing,
        name: "initializing",
        status_code: 0,
        percent: 0,
        next: &[BoardState::Verifying],
    },
    StateDescriptor {
        id: BoardState::Verifying,
        name: "verifying",
        status_code: 2,
        percent: 50,
        next: &[BoardState::Ready],
    },
    StateDescriptor {
        id: BoardState::Ready,
        name: "ready",
        status_code: 1,
        percent: 100,
        next: &[BoardState::Initializing],
    },
    StateDescriptor {
        id: BoardState::Failed,
        name: "failed",
        status_code: 255,
        percent: 0,
        next: &[BoardState::Initializing],
    },
];

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Lifecycle {
    current: BoardState,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            current: BoardState::Uninitialized,
        }
    }

    pub fn current(&self) -> BoardState {
        self.current
    }

    pub fn can_transition(&self, next: BoardState) -> bool {
        next == BoardState::Failed || self.current.descriptor().next.contains(&next)
    }

    /// Move to `next`.  Re-entering `Initializing` from any in-progress
    /// state is allowed so a model change can interrupt a rebuild.
    pub fn transition(&mut self, next: BoardState) -> bool {
        let restart = next == BoardState::Initializing
            && matches!(
                self.current,
                BoardState::Initializing | BoardState::Verifying
            );
        if !restart && !self.can_transition(next) {
            warn!(
                "Board transition refused: {} -> {}",
                self.current.name(),
                next.name()
            );
            return false;
        }
        info!("Board transition: {} -> {}", self.current.name(), next.name());
        self.current = next;
        true
    }
}
