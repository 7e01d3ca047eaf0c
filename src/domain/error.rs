//! Error taxonomy for allocation and derivation
//!
//! Every path through the core returns either a value or one of these
//! variants. The HTTP layer owns the mapping to status codes and JSON bodies.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackingError {
    /// Missing or malformed user input.
    #[error("{0}")]
    Validation(String),

    /// The tracking number does not parse into any known format.
    #[error("{0}")]
    NotFound(String),

    /// A stored shipment already uses this tracking number.
    #[error("{0}")]
    Conflict(String),

    /// Unexpected fault while building mock data.
    #[error("{0}")]
    Internal(String),
}

impl TrackingError {
    /// `"<field> is required"`
    pub fn missing_field(field: &str) -> Self {
        TrackingError::Validation(format!("{field} is required"))
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            TrackingError::Validation(_) => "validation",
            TrackingError::NotFound(_) => "not_found",
            TrackingError::Conflict(_) => "conflict",
            TrackingError::Internal(_) => "internal",
        }
    }

    /// Message safe to return to a caller. Internal details stay in the logs.
    pub fn public_message(&self) -> &str {
        match self {
            TrackingError::Internal(_) => "An error occurred while processing your request",
            TrackingError::Validation(msg)
            | TrackingError::NotFound(msg)
            | TrackingError::Conflict(msg) => msg,
        }
    }
}
