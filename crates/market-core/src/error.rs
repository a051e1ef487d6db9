//! # Domain Errors
//!
//! Two kinds of refusal live here. The rest of the workspace builds on them.
//!
//! ```text
//! market-core          ValidationError   catalog input rejected before storage
//!                      RenderFault       confirmation inputs don't line up
//! market-db            DbError           wraps ValidationError as Invalid
//! market-fulfillment   FulfillmentError  why an order was not recorded
//!                      DeliveryError     why a confirmation did not go out
//! ```

use thiserror::Error;

// =============================================================================
// Validation
// =============================================================================

/// A field of a new product or customer that cannot be stored.
///
/// Each variant names the offending field so the message reads on its own,
/// e.g. `price_cents must not be negative`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Empty after trimming.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Present but shaped wrong, like an email with no `@`.
    #[error("{field} is malformed: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Render Fault
// =============================================================================

/// Inputs the confirmation renderer refuses to lay out.
///
/// A fault here never undoes an order. It only means no document exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderFault {
    #[error("order quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("order references product {order_product_id} but snapshot is for product {snapshot_product_id}")]
    ProductMismatch {
        order_product_id: i64,
        snapshot_product_id: i64,
    },

    #[error("order references customer {order_customer_id} but customer record is {customer_id}")]
    CustomerMismatch {
        order_customer_id: i64,
        customer_id: i64,
    },

    #[error("customer {0} has no email address")]
    MissingEmail(i64),
}
