//! Log-based event sink adapter.
//!
//! Writes one line per [`StateChange`].  A socket layer would implement
//! the same trait.

use log::info;

use crate::app::events::StateChange;
use crate::app::ports::EventSink;

/// Adapter that logs every [`StateChange`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, change: &StateChange) {
        match change {
            StateChange::Updated {
                category,
                id,
                state,
            } => {
                info!("STATE | {} {} | {}", category, id, state);
            }
            StateChange::Removed { category, id } => {
                info!("REMOVE | {} {}", category, id);
            }
            StateChange::Status(status) => {
                info!("STATUS | {} ({}) {}%", status.name, status.val, status.percent);
            }
            StateChange::Messages { messages } => {
                info!("MSGS | {} active", messages.len());
                for m in messages {
                    info!("MSGS | [{}] {:?}: {}", m.code, m.severity, m.message);
                }
            }
        }
    }
}
