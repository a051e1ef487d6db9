//! # Ports
//!
//! The collaborators the coordinator talks to. SQLite-backed implementations
//! live in [`crate::store`], SMTP in [`crate::mail`], files in [`crate::sink`]
//! and in-memory doubles in [`crate::memory`].

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::{DeliveryError, FulfillmentResult};
use market_core::{ConfirmationOutboxEntry, Customer, NewOrder, NewOutboxEntry, ProductSnapshot};

/// Fixed subject line of confirmation mails.
pub const CONFIRMATION_SUBJECT: &str = "Order Confirmation";

/// Fixed body of confirmation mails.
pub const CONFIRMATION_BODY: &str = "Thank you for your order. Please find the attached invoice.";

// =============================================================================
// Storage Ports
// =============================================================================

/// Read-only customer lookup.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// `FulfillmentError::CustomerNotFound` if there is no such customer.
    async fn get_customer(&self, customer_id: i64) -> FulfillmentResult<Customer>;
}

/// Stock on hand.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Atomically takes `quantity` units.
    ///
    /// Fails with `ProductNotFound` or `InsufficientStock` without changing
    /// anything.
    async fn reserve(&self, product_id: i64, quantity: i64) -> FulfillmentResult<ProductSnapshot>;

    /// Gives back units taken by [`InventoryLedger::reserve`].
    async fn release(&self, product_id: i64, quantity: i64) -> FulfillmentResult<()>;
}

/// Append-only order storage.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Writes the order and returns its id.
    async fn create(&self, order: &NewOrder) -> FulfillmentResult<i64>;
}

/// Confirmations waiting for a resend.
#[async_trait]
pub trait ConfirmationOutbox: Send + Sync {
    async fn record(&self, entry: &NewOutboxEntry) -> FulfillmentResult<i64>;

    async fn pending(&self, limit: u32) -> FulfillmentResult<Vec<ConfirmationOutboxEntry>>;

    async fn mark_delivered(&self, id: i64) -> FulfillmentResult<()>;

    async fn mark_failed(&self, id: i64, error: &str) -> FulfillmentResult<()>;
}

// =============================================================================
// Output Ports
// =============================================================================

/// Where rendered confirmation documents are kept.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Stores a document and returns where it went.
    async fn store(
        &self,
        generated_at: NaiveDateTime,
        order_id: i64,
        document: &[u8],
    ) -> io::Result<PathBuf>;

    /// Reads a stored document back for a resend.
    async fn load(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Sends a message to a customer.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

// =============================================================================
// Notification
// =============================================================================

/// One outgoing message with a single attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment: Attachment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Notification {
    /// The standard order confirmation with its PDF attached.
    pub fn order_confirmation(recipient: &str, document_path: &Path, document: Vec<u8>) -> Self {
        let file_name = document_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "order.pdf".to_string());

        Notification {
            recipient: recipient.trim().to_string(),
            subject: CONFIRMATION_SUBJECT.to_string(),
            body: CONFIRMATION_BODY.to_string(),
            attachment: Attachment {
                file_name,
                content_type: "application/pdf".to_string(),
                bytes: document,
            },
        }
    }
}
