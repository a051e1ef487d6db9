//! Fulfillment state machine.

use serde::{Deserialize, Serialize};

/// Where a fulfillment attempt is, or where it stopped.
///
/// ```text
/// Requested ──► StockReserved ──► OrderPersisted ──► DocumentRendered ──► Delivered
///     │               │                  │                   │
///     │               ▼                  ▼                   ▼
///     │         PersistFailed       RenderFailed        DeliveryFailed
///     │      (stock released)     (order kept)        (order + document kept)
///     ▼
/// RejectedNotFound / RejectedInsufficientStock / RejectedInvalidRequest
/// StorageFailed (a read or the reservation failed, stock untouched)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FulfillmentState {
    #[default]
    Requested,
    StockReserved,
    OrderPersisted,
    DocumentRendered,
    Delivered,

    RejectedInvalidRequest,
    RejectedNotFound,
    RejectedInsufficientStock,
    StorageFailed,
    PersistFailed,
    RenderFailed,
    DeliveryFailed,
}

impl FulfillmentState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            FulfillmentState::Requested
                | FulfillmentState::StockReserved
                | FulfillmentState::OrderPersisted
                | FulfillmentState::DocumentRendered
        )
    }

    /// Returns true if an order row exists in this state.
    pub fn has_order(&self) -> bool {
        matches!(
            self,
            FulfillmentState::OrderPersisted
                | FulfillmentState::DocumentRendered
                | FulfillmentState::Delivered
                | FulfillmentState::RenderFailed
                | FulfillmentState::DeliveryFailed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentState::Requested => "Requested",
            FulfillmentState::StockReserved => "StockReserved",
            FulfillmentState::OrderPersisted => "OrderPersisted",
            FulfillmentState::DocumentRendered => "DocumentRendered",
            FulfillmentState::Delivered => "Delivered",
            FulfillmentState::RejectedInvalidRequest => "RejectedInvalidRequest",
            FulfillmentState::RejectedNotFound => "RejectedNotFound",
            FulfillmentState::RejectedInsufficientStock => "RejectedInsufficientStock",
            FulfillmentState::StorageFailed => "StorageFailed",
            FulfillmentState::PersistFailed => "PersistFailed",
            FulfillmentState::RenderFailed => "RenderFailed",
            FulfillmentState::DeliveryFailed => "DeliveryFailed",
        }
    }
}

impl std::fmt::Display for FulfillmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
