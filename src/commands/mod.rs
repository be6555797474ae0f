//! Command routers, one per equipment category.
//!
//! Routers are short-lived borrows of the [`Board`](crate::board::Board)
//! obtained through `board.circuits()`, `board.groups()` and friends.

pub mod bodies;
pub mod chem;
pub mod circuits;
pub mod features;
pub mod groups;
pub mod heaters;
pub mod valves;
