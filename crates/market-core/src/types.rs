//! # Domain Types
//!
//! Core domain types used throughout the Market back-office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │      Order      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  title          │   │  first/last     │   │  customer_id    │       │
//! │  │  price_cents    │   │  email          │   │  product_id     │       │
//! │  │  quantity (≥0)  │   │  phone/address  │   │  quantity (>0)  │       │
//! │  └────────┬────────┘   └─────────────────┘   │  unit_price     │       │
//! │           │ reserve()                        │  purchase_date  │       │
//! │           ▼                                  └─────────────────┘       │
//! │  ┌─────────────────┐   ┌──────────────────────────┐                    │
//! │  │ ProductSnapshot │   │ ConfirmationOutboxEntry  │                    │
//! │  │ price at the    │   │ undelivered confirmation │                    │
//! │  │ reservation     │   │ waiting for resend       │                    │
//! │  └─────────────────┘   └──────────────────────────┘                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are SQLite `INTEGER PRIMARY KEY` values assigned by the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{
    validate_email, validate_non_negative, validate_person_name, validate_product_title,
    ValidationResult,
};

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,

    /// Display name printed on confirmations.
    pub title: String,

    pub description: String,

    /// Price in cents.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub quantity: i64,

    /// Inactive products cannot be reserved.
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether a reservation of `quantity` units would succeed.
    pub fn can_reserve(&self, quantity: i64) -> bool {
        self.active && quantity > 0 && self.quantity >= quantity
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub quantity: i64,
}

impl NewProduct {
    /// Checks title, price and opening stock.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_product_title(&self.title)?;
        validate_non_negative("price", self.price_cents)?;
        validate_non_negative("quantity", self.quantity)?;
        Ok(())
    }
}

/// What a successful reservation hands back: the product as it stood the
/// moment the units were taken.
///
/// `unit_price_cents` is the price the order is charged at, even if the
/// catalog price changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductSnapshot {
    pub product_id: i64,
    pub title: String,
    pub unit_price_cents: i64,
    /// Units left after the reservation.
    pub remaining_quantity: i64,
}

impl ProductSnapshot {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer who can place orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    /// Confirmation recipient.
    pub email: String,
}

impl Customer {
    /// First and last name joined with a space.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Input for creating a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub email: String,
}

impl NewCustomer {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_person_name("first_name", &self.first_name)?;
        validate_person_name("last_name", &self.last_name)?;
        validate_email(&self.email)?;
        Ok(())
    }
}

// =============================================================================
// Order
// =============================================================================

/// A recorded order. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Price captured at reservation time.
    pub unit_price_cents: i64,
    pub purchase_date: NaiveDate,
}

impl Order {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Unit price times quantity.
    #[inline]
    pub fn total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

/// An order that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub purchase_date: NaiveDate,
}

impl NewOrder {
    /// Builds the stored form once the repository has assigned an id.
    pub fn into_order(self, id: i64) -> Order {
        Order {
            id,
            customer_id: self.customer_id,
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            purchase_date: self.purchase_date,
        }
    }
}

/// A request to fulfil one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub customer_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

impl OrderRequest {
    pub fn new(customer_id: i64, product_id: i64, quantity: i64) -> Self {
        Self {
            customer_id,
            product_id,
            quantity,
        }
    }

    /// Rejects requests that must never reach the ledger.
    pub fn validate(&self) -> ValidationResult<()> {
        crate::validation::validate_quantity(self.quantity)?;
        if self.customer_id <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "customer_id".to_string(),
            });
        }
        if self.product_id <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "product_id".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Confirmation Outbox
// =============================================================================

/// A confirmation that was rendered but not delivered.
///
/// Works like an outbox: the entry stays pending until a resend succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ConfirmationOutboxEntry {
    pub id: i64,
    pub order_id: i64,
    pub recipient: String,
    /// Where the confirmation document was written.
    pub document_path: String,
    /// Delivery attempts so far, including the original one.
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl ConfirmationOutboxEntry {
    pub fn is_pending(&self) -> bool {
        self.delivered_at.is_none()
    }
}

/// Input for recording an undelivered confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOutboxEntry {
    pub order_id: i64,
    pub recipient: String,
    pub document_path: String,
    pub last_error: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
