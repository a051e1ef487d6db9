//! # Fulfillment Errors
//!
//! ```text
//! FulfillmentError  - no order exists after the attempt
//! DeliveryError     - the confirmation mail was not accepted
//! ConfigError       - market.toml / environment could not be used
//! ```
//!
//! Partial successes (order committed, document or mail missing) are not
//! errors; they come back as a [`crate::FulfillmentOutcome`].

use std::time::Duration;

use thiserror::Error;

use crate::state::FulfillmentState;
use market_core::ValidationError;

// =============================================================================
// Fulfillment Error
// =============================================================================

/// Why a fulfillment attempt ended without an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FulfillmentError {
    /// The request never reached the ledger.
    #[error("Invalid order request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("Customer not found: {0}")]
    CustomerNotFound(i64),

    /// Unknown or inactive product.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    /// A store call failed or timed out before any stock was taken, or a
    /// late reservation was handed back.
    #[error("Storage error during {operation}: {reason}")]
    Persistence {
        operation: &'static str,
        reason: String,
    },

    /// Stock was reserved but the order row could not be written.
    ///
    /// `restocked` says whether the compensating release went through. When
    /// it is false the product is short by the reserved quantity and needs a
    /// manual stock correction.
    #[error("Order was not recorded: {reason} (stock restored: {restocked})")]
    PersistFailed { reason: String, restocked: bool },
}

impl FulfillmentError {
    pub fn persistence(operation: &'static str, reason: impl ToString) -> Self {
        FulfillmentError::Persistence {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Terminal state of the attempt that produced this error.
    pub fn state(&self) -> FulfillmentState {
        match self {
            FulfillmentError::InvalidRequest(_) => FulfillmentState::RejectedInvalidRequest,
            FulfillmentError::CustomerNotFound(_) | FulfillmentError::ProductNotFound(_) => {
                FulfillmentState::RejectedNotFound
            }
            FulfillmentError::InsufficientStock { .. } => {
                FulfillmentState::RejectedInsufficientStock
            }
            FulfillmentError::Persistence { .. } => FulfillmentState::StorageFailed,
            FulfillmentError::PersistFailed { .. } => FulfillmentState::PersistFailed,
        }
    }
}

/// Result type for fulfillment operations.
pub type FulfillmentResult<T> = Result<T, FulfillmentError>;

// =============================================================================
// Delivery Error
// =============================================================================

/// The notification dispatcher could not hand the message off.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Addresses or attachment could not be turned into a message.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The transport refused or dropped the message.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Delivery timed out after {0:?}")]
    TimedOut(Duration),
}

// =============================================================================
// Config Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_states() {
        assert_eq!(
            FulfillmentError::ProductNotFound(1).state(),
            FulfillmentState::RejectedNotFound
        );
        assert_eq!(
            FulfillmentError::CustomerNotFound(1).state(),
            FulfillmentState::RejectedNotFound
        );
        assert_eq!(
            FulfillmentError::InsufficientStock {
                product_id: 2,
                available: 2,
                requested: 5
            }
            .state(),
            FulfillmentState::RejectedInsufficientStock
        );
        assert_eq!(
            FulfillmentError::persistence("customer lookup", "disk I/O error").state(),
            FulfillmentState::StorageFailed
        );
        assert_eq!(
            FulfillmentError::PersistFailed {
                reason: "disk full".to_string(),
                restocked: true
            }
            .state(),
            FulfillmentState::PersistFailed
        );
    }

    #[test]
    fn test_persist_failed_message() {
        let err = FulfillmentError::PersistFailed {
            reason: "disk full".to_string(),
            restocked: true,
        };
        assert_eq!(
            err.to_string(),
            "Order was not recorded: disk full (stock restored: true)"
        );
    }
}
