//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter       | Implements      | Connects to                    |
//! |---------------|-----------------|--------------------------------|
//! | `change_feed` | EventSink       | embassy-sync channel consumer  |
//! | `log_sink`    | EventSink       | `log` output                   |
//! | `sim_gateway` | HardwareGateway | In-memory relay/valve map      |

pub mod change_feed;
pub mod log_sink;
pub mod sim_gateway;
