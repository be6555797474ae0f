//! Unified error types for the virtual control board.
//!
//! Every router and the orchestrator funnel failures into [`BoardError`],
//! keeping the API layer's error handling uniform.  Hardware Gateway
//! failures arrive as [`GatewayError`] and are converted at the router
//! boundary.

use thiserror::Error;

use crate::equipment::Category;

// ---------------------------------------------------------------------------
// Top-level board error
// ---------------------------------------------------------------------------

/// Every fallible board operation funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// The id failed to parse or lies outside the category's current range.
    /// Raised before any mutation.
    #[error("invalid {category} id: {id}")]
    InvalidId { category: Category, id: String },

    /// The operation targets an entity that is not configured.
    #[error("{category} {id} not found")]
    NotFound { category: Category, id: u16 },

    /// No free id remains in the category's range.
    #[error("no {0} ids available")]
    RangeExhausted(Category),

    /// A field value is outside its accepted domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The Hardware Gateway rejected a call.  Configuration changes made
    /// before the call are kept.
    #[error("hardware failure: {0}")]
    HardwareFailure(#[from] GatewayError),

    /// The requested board model is not in the catalog.
    #[error("unknown board model: {0}")]
    UnknownModel(String),

    /// Topology rebuild failed; the board is left in the failed status.
    #[error("initialization failed: {0}")]
    InitializationFailure(String),
}

impl BoardError {
    pub fn invalid_id(category: Category, id: impl ToString) -> Self {
        Self::InvalidId {
            category,
            id: id.to_string(),
        }
    }

    pub fn not_found(category: Category, id: u16) -> Self {
        Self::NotFound { category, id }
    }
}

// ---------------------------------------------------------------------------
// Hardware Gateway errors
// ---------------------------------------------------------------------------

/// Failures reported by the Hardware Gateway.  Each variant carries a
/// human-readable message from the driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Equipment could not be initialised or validated.
    #[error("init: {0}")]
    Init(String),
    /// An actuation command (relay, valve) failed.
    #[error("command: {0}")]
    Command(String),
    /// Pushing configuration to the driver failed.
    #[error("config: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Board-wide `Result` alias.
pub type Result<T> = core::result::Result<T, BoardError>;
