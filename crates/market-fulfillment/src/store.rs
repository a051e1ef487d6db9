//! # SQLite Ports
//!
//! Binds the fulfillment ports to the `market-db` repositories.
//!
//! ```text
//! CustomerDirectory   ──► CustomerRepository::get_by_id
//! InventoryLedger     ──► ProductRepository::reserve / release
//! OrderRepository     ──► OrderRepository::create
//! ConfirmationOutbox  ──► ConfirmationOutboxRepository
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::coordinator::FulfillmentPorts;
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::ports::{
    ConfirmationOutbox, CustomerDirectory, DocumentSink, InventoryLedger, NotificationDispatcher,
    OrderRepository,
};
use market_core::{ConfirmationOutboxEntry, Customer, NewOrder, NewOutboxEntry, ProductSnapshot};
use market_db::{
    ConfirmationOutboxRepository, CustomerRepository, Database, DbError, ProductRepository,
};

impl FulfillmentPorts {
    /// Storage ports backed by one SQLite database.
    pub fn sqlite(
        db: &Database,
        documents: Arc<dyn DocumentSink>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        FulfillmentPorts {
            customers: Arc::new(db.customers()),
            ledger: Arc::new(db.products()),
            orders: Arc::new(db.orders()),
            outbox: Arc::new(db.confirmations()),
            documents,
            dispatcher,
        }
    }
}

/// Maps a storage failure that has no domain meaning.
fn storage(operation: &'static str) -> impl FnOnce(DbError) -> FulfillmentError {
    move |err| FulfillmentError::persistence(operation, err)
}

#[async_trait]
impl CustomerDirectory for CustomerRepository {
    async fn get_customer(&self, customer_id: i64) -> FulfillmentResult<Customer> {
        self.get_by_id(customer_id)
            .await
            .map_err(storage("customer lookup"))?
            .ok_or(FulfillmentError::CustomerNotFound(customer_id))
    }
}

#[async_trait]
impl InventoryLedger for ProductRepository {
    async fn reserve(&self, product_id: i64, quantity: i64) -> FulfillmentResult<ProductSnapshot> {
        ProductRepository::reserve(self, product_id, quantity)
            .await
            .map_err(|err| match err {
                DbError::NotFound { .. } => FulfillmentError::ProductNotFound(product_id),
                DbError::InsufficientStock {
                    product_id,
                    available,
                    requested,
                } => FulfillmentError::InsufficientStock {
                    product_id,
                    available,
                    requested,
                },
                DbError::Invalid(validation) => FulfillmentError::InvalidRequest(validation),
                other => FulfillmentError::persistence("stock reservation", other),
            })
    }

    async fn release(&self, product_id: i64, quantity: i64) -> FulfillmentResult<()> {
        ProductRepository::release(self, product_id, quantity)
            .await
            .map_err(storage("stock release"))
    }
}

#[async_trait]
impl OrderRepository for market_db::OrderRepository {
    async fn create(&self, order: &NewOrder) -> FulfillmentResult<i64> {
        market_db::OrderRepository::create(self, order)
            .await
            .map_err(storage("order insert"))
    }
}

#[async_trait]
impl ConfirmationOutbox for ConfirmationOutboxRepository {
    async fn record(&self, entry: &NewOutboxEntry) -> FulfillmentResult<i64> {
        self.enqueue(entry)
            .await
            .map(|stored| stored.id)
            .map_err(storage("outbox insert"))
    }

    async fn pending(&self, limit: u32) -> FulfillmentResult<Vec<ConfirmationOutboxEntry>> {
        self.get_pending(limit)
            .await
            .map_err(storage("outbox read"))
    }

    async fn mark_delivered(&self, id: i64) -> FulfillmentResult<()> {
        ConfirmationOutboxRepository::mark_delivered(self, id)
            .await
            .map_err(storage("outbox update"))
    }

    async fn mark_failed(&self, id: i64, error: &str) -> FulfillmentResult<()> {
        ConfirmationOutboxRepository::mark_failed(self, id, error)
            .await
            .map_err(storage("outbox update"))
    }
}
