//! Integration test driver for `tests/integration/`.
//!
//! Each `mod` below maps to a file that drives the board end to end
//! against the recording [`mock_gateway::MockGateway`].  Everything runs
//! on a host `LocalExecutor`; no hardware is involved.

mod board_init_tests;
mod circuit_tests;
mod equipment_tests;
mod group_tests;
