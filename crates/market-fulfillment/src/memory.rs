//! # In-Memory Ports
//!
//! Process-local implementations of every port, with switches to inject
//! failures. Used by the coordinator tests and the scenario suite.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::Mutex;

use crate::error::{DeliveryError, FulfillmentError, FulfillmentResult};
use crate::ports::{
    ConfirmationOutbox, CustomerDirectory, DocumentSink, InventoryLedger, Notification,
    NotificationDispatcher, OrderRepository,
};
use market_core::confirmation::document_file_name;
use market_core::{
    ConfirmationOutboxEntry, Customer, NewOrder, NewOutboxEntry, Order, Product, ProductSnapshot,
};

// =============================================================================
// Store
// =============================================================================

#[derive(Default)]
struct StoreState {
    next_id: i64,
    customers: HashMap<i64, Customer>,
    products: HashMap<i64, Product>,
    orders: Vec<Order>,
    outbox: Vec<ConfirmationOutboxEntry>,
    fail_on_create: bool,
    fail_on_release: bool,
    reserve_stall: Option<Duration>,
    create_stall: Option<Duration>,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Customers, stock, orders and the outbox behind one lock.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_customer(&self, first_name: &str, last_name: &str, email: &str) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.customers.insert(
            id,
            Customer {
                id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                phone: String::new(),
                address: String::new(),
                email: email.to_string(),
            },
        );
        id
    }

    pub async fn add_product(&self, title: &str, price_cents: i64, quantity: i64) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let now = Utc::now();
        state.products.insert(
            id,
            Product {
                id,
                title: title.to_string(),
                description: String::new(),
                price_cents,
                quantity,
                active: true,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub async fn set_price(&self, product_id: i64, price_cents: i64) {
        if let Some(product) = self.state.lock().await.products.get_mut(&product_id) {
            product.price_cents = price_cents;
        }
    }

    pub async fn deactivate(&self, product_id: i64) {
        if let Some(product) = self.state.lock().await.products.get_mut(&product_id) {
            product.active = false;
        }
    }

    pub async fn product_quantity(&self, product_id: i64) -> Option<i64> {
        self.state
            .lock()
            .await
            .products
            .get(&product_id)
            .map(|p| p.quantity)
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.clone()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn pending_outbox(&self) -> Vec<ConfirmationOutboxEntry> {
        self.state
            .lock()
            .await
            .outbox
            .iter()
            .filter(|e| e.is_pending())
            .cloned()
            .collect()
    }

    /// Makes every order insert fail.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.lock().await.fail_on_create = fail;
    }

    /// Makes every stock release fail.
    pub async fn set_fail_on_release(&self, fail: bool) {
        self.state.lock().await.fail_on_release = fail;
    }

    /// Reservations commit, then hang for `stall` before returning.
    pub async fn set_reserve_stall(&self, stall: Option<Duration>) {
        self.state.lock().await.reserve_stall = stall;
    }

    /// Order inserts commit, then hang for `stall` before returning.
    pub async fn set_create_stall(&self, stall: Option<Duration>) {
        self.state.lock().await.create_stall = stall;
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryStore {
    async fn get_customer(&self, customer_id: i64) -> FulfillmentResult<Customer> {
        self.state
            .lock()
            .await
            .customers
            .get(&customer_id)
            .cloned()
            .ok_or(FulfillmentError::CustomerNotFound(customer_id))
    }
}

fn take_stock(
    state: &mut StoreState,
    product_id: i64,
    quantity: i64,
) -> FulfillmentResult<ProductSnapshot> {
    let product = state
        .products
        .get_mut(&product_id)
        .filter(|p| p.active)
        .ok_or(FulfillmentError::ProductNotFound(product_id))?;

    if product.quantity < quantity {
        return Err(FulfillmentError::InsufficientStock {
            product_id,
            available: product.quantity,
            requested: quantity,
        });
    }

    product.quantity -= quantity;
    Ok(ProductSnapshot {
        product_id,
        title: product.title.clone(),
        unit_price_cents: product.price_cents,
        remaining_quantity: product.quantity,
    })
}

#[async_trait]
impl InventoryLedger for InMemoryStore {
    async fn reserve(&self, product_id: i64, quantity: i64) -> FulfillmentResult<ProductSnapshot> {
        let (snapshot, stall) = {
            let mut state = self.state.lock().await;
            let stall = state.reserve_stall;
            (take_stock(&mut state, product_id, quantity)?, stall)
        };

        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
        Ok(snapshot)
    }

    async fn release(&self, product_id: i64, quantity: i64) -> FulfillmentResult<()> {
        let mut state = self.state.lock().await;
        if state.fail_on_release {
            return Err(FulfillmentError::persistence("stock release", "injected failure"));
        }

        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(FulfillmentError::ProductNotFound(product_id))?;
        product.quantity += quantity;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create(&self, order: &NewOrder) -> FulfillmentResult<i64> {
        let (id, stall) = {
            let mut state = self.state.lock().await;
            if state.fail_on_create {
                return Err(FulfillmentError::persistence("order insert", "injected failure"));
            }

            let id = state.next_id();
            state.orders.push(order.clone().into_order(id));
            (id, state.create_stall)
        };

        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
        Ok(id)
    }
}

#[async_trait]
impl ConfirmationOutbox for InMemoryStore {
    async fn record(&self, entry: &NewOutboxEntry) -> FulfillmentResult<i64> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.outbox.push(ConfirmationOutboxEntry {
            id,
            order_id: entry.order_id,
            recipient: entry.recipient.clone(),
            document_path: entry.document_path.clone(),
            attempts: 1,
            last_error: Some(entry.last_error.clone()),
            created_at: Utc::now(),
            delivered_at: None,
        });
        Ok(id)
    }

    async fn pending(&self, limit: u32) -> FulfillmentResult<Vec<ConfirmationOutboxEntry>> {
        Ok(self
            .pending_outbox()
            .await
            .into_iter()
            .take(limit as usize)
            .collect())
    }

    async fn mark_delivered(&self, id: i64) -> FulfillmentResult<()> {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.outbox.iter_mut().find(|e| e.id == id) {
            entry.attempts += 1;
            entry.delivered_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_failed(&self, id: i64, error: &str) -> FulfillmentResult<()> {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.outbox.iter_mut().find(|e| e.id == id) {
            entry.attempts += 1;
            entry.last_error = Some(error.to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Document Sink
// =============================================================================

#[derive(Default)]
struct SinkState {
    files: HashMap<PathBuf, Vec<u8>>,
    fail: bool,
}

/// Keeps documents in a map keyed by their would-be path.
#[derive(Clone, Default)]
pub struct InMemoryDocumentSink {
    state: Arc<Mutex<SinkState>>,
}

impl InMemoryDocumentSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.state.lock().await.files.get(path).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.files.len()
    }

    pub async fn set_fail(&self, fail: bool) {
        self.state.lock().await.fail = fail;
    }
}

#[async_trait]
impl DocumentSink for InMemoryDocumentSink {
    async fn store(
        &self,
        generated_at: NaiveDateTime,
        order_id: i64,
        document: &[u8],
    ) -> io::Result<PathBuf> {
        let mut state = self.state.lock().await;
        if state.fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "sink is read-only"));
        }

        let path = Path::new("memory").join(document_file_name(generated_at, order_id));
        state.files.insert(path.clone(), document.to_vec());
        Ok(path)
    }

    async fn load(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.get(path)
            .await
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

#[derive(Default)]
struct DispatcherState {
    sent: Vec<Notification>,
    fail: bool,
}

/// Records every accepted notification.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    state: Arc<Mutex<DispatcherState>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.state.lock().await.sent.clone()
    }

    /// While set, every delivery is refused as if the relay were down.
    pub async fn set_fail(&self, fail: bool) {
        self.state.lock().await.fail = fail;
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let mut state = self.state.lock().await;
        if state.fail {
            return Err(DeliveryError::Transport("connection refused".to_string()));
        }
        state.sent.push(notification.clone());
        Ok(())
    }
}
