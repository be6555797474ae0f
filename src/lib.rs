//! PoolBoard library.
//!
//! A virtual control board for pool/spa equipment that has no native
//! controller.  The [`board::Board`] owns the configuration and live state
//! trees, applies the coordination rules (shared-body exclusion, group
//! aggregation, timed light sequences) and drives a
//! [`app::ports::HardwareGateway`] to actuate equipment.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod board;
pub mod commands;
pub mod config;
pub mod equipment;
pub mod error;
pub mod ids;
pub mod tree;
