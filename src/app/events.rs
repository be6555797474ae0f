//! Outbound state-change events.
//!
//! The board emits these through the [`EventSink`](super::ports::EventSink)
//! port after every mutation.  Adapters on the other side decide what to
//! do with them: log them, queue them for a socket layer, etc.

use serde::Serialize;
use serde_json::Value;

use crate::equipment::Category;
use crate::tree::state::{ControllerStatus, EquipmentMessage};

/// One entry of the state broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StateChange {
    /// A state entity was created or one of its attributes changed.
    /// `state` is the full serialised state entity.
    Updated {
        category: Category,
        id: u16,
        state: Value,
    },

    /// The entity left both trees.
    Removed { category: Category, id: u16 },

    /// The controller status code or percent moved.
    Status(ControllerStatus),

    /// The equipment message list was rewritten.
    Messages { messages: Vec<EquipmentMessage> },
}

impl StateChange {
    /// `(category, id)` for equipment changes.
    pub fn target(&self) -> Option<(Category, u16)> {
        match self {
            Self::Updated { category, id, .. } | Self::Removed { category, id } => {
                Some((*category, *id))
            }
            Self::Status(_) | Self::Messages { .. } => None,
        }
    }
}
