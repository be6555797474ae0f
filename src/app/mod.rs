//! Application boundary — events out, ports to the outside world.
//!
//! The board core in [`crate::board`] and [`crate::commands`] talks to
//! hardware and observers only through the traits in [`ports`], keeping
//! the orchestration rules testable against mock adapters.

pub mod events;
pub mod ports;
