//! # market-core: Pure Business Logic for the Market Back-Office
//!
//! Domain types, integer money, validation rules and the order confirmation
//! renderer. Nothing in here touches a database, a socket, a file or a clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Market Back-Office Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  `market` CLI (apps/backoffice)                 │   │
//! │  │         seed ─── order ─── resend ─── export                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           market-fulfillment (coordinator + adapters)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ market-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │confirmation│  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │  + pdf     │  │   rules   │  │   │
//! │  │   │  Order    │  │           │  │            │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    market-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Order, outbox entries)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`confirmation`] - Order confirmation document renderer
//! - [`export`] - CSV row shapes per entity
//!
//! ## Example Usage
//!
//! ```rust
//! use market_core::money::Money;
//!
//! let unit_price = Money::from_cents(999);
//! let total = unit_price.multiply_quantity(3);
//! assert_eq!(total.to_string(), "29.97");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod confirmation;
pub mod error;
pub mod export;
pub mod money;
mod pdf;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{RenderFault, ValidationError};
pub use export::CsvExportable;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity accepted for a single order line.
///
/// ## Business Reason
/// Catches typing mistakes (10000 instead of 10) before stock is touched.
pub const MAX_ORDER_QUANTITY: i64 = 9_999;

/// Longest accepted product title, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;
