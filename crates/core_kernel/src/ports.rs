//! Port error and marker trait
//!
//! The balance engine reads postings, rates and master data only through
//! port traits owned by the crate that consumes them. Adapters over a real
//! store or over in-memory fixtures report failures with [`PortError`].
//!
//! ```text
//!   TrialBalanceBuilder
//!          │
//!          ▼
//!   PostingRepository / ExchangeRateSource / AccountHierarchy / SectorHierarchy
//!          ▲                              ▲
//!   store adapter                  in-memory adapter
//! ```

use std::fmt;
use thiserror::Error;

/// Failure reported by a port adapter
#[derive(Debug, Error)]
pub enum PortError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The adapter refused the request or the data handed to it
    #[error("Rejected: {message}")]
    Rejected {
        message: String,
        field: Option<&'static str>,
    },

    /// The backing store could not be reached
    #[error("{store} unavailable: {message}")]
    Unavailable {
        store: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        PortError::Rejected {
            message: message.into(),
            field: None,
        }
    }

    /// Rejection tied to one field of the request
    pub fn rejected_field(message: impl Into<String>, field: &'static str) -> Self {
        PortError::Rejected {
            message: message.into(),
            field: Some(field),
        }
    }

    pub fn unavailable(store: impl Into<String>, message: impl Into<String>) -> Self {
        PortError::Unavailable {
            store: store.into(),
            message: message.into(),
            source: None,
        }
    }

    /// A retry of the same build may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Unavailable { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Marker for port traits; builds share ports across threads
pub trait DomainPort: Send + Sync + 'static {}
