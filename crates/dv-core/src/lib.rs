//! Core functionality for the data visualization platform
//!
//! This crate provides the table-independent building blocks shared by the
//! data engine: listener registries, exclusive access for recomputation and
//! engine settings.

pub mod events;
pub mod settings;
pub mod sync;

use thiserror::Error;

// Re-export commonly used types
pub use events::{Subscribers, SubscriptionId};
pub use settings::TableSettings;
pub use sync::ExclusiveCell;

/// Errors raised by the core infrastructure
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Value is already being mutated on this thread")]
    Reentrant,
}

impl From<serde_json::Error> for CoreError {
    fn from(error: serde_json::Error) -> Self {
        CoreError::Settings(error.to_string())
    }
}
