//! End-to-end fulfillment scenarios over in-memory SQLite and real files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use market_core::{NewCustomer, NewOrder, NewProduct, OrderRequest, ProductSnapshot};
use market_db::{Database, DbConfig};
use market_fulfillment::config::MailSettings;
use market_fulfillment::memory::RecordingDispatcher;
use market_fulfillment::{
    FileDocumentSink, FixedClock, FulfillmentCoordinator, FulfillmentError, FulfillmentPorts,
    FulfillmentResult, FulfillmentState, InventoryLedger, NotificationDispatcher, OrderRepository,
    SmtpDispatcher,
};

// =============================================================================
// Fixtures
// =============================================================================

struct Shop {
    db: Database,
    export_dir: PathBuf,
    customer_id: i64,
    beans_id: i64,
    grinder_id: i64,
}

impl Shop {
    async fn open() -> Shop {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let export_dir =
            std::env::temp_dir().join(format!("market-scenarios-{}", uuid::Uuid::new_v4()));

        let customer = db
            .customers()
            .insert(&NewCustomer {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                phone: "555-0100".to_string(),
                address: "12 Analytical Row".to_string(),
                email: "ada@example.com".to_string(),
            })
            .await
            .unwrap();
        let beans = db
            .products()
            .insert(&NewProduct {
                title: "Espresso Beans".to_string(),
                description: "1kg bag".to_string(),
                price_cents: 999,
                quantity: 5,
            })
            .await
            .unwrap();
        let grinder = db
            .products()
            .insert(&NewProduct {
                title: "Burr Grinder".to_string(),
                description: String::new(),
                price_cents: 12_500,
                quantity: 2,
            })
            .await
            .unwrap();

        Shop {
            db,
            export_dir,
            customer_id: customer.id,
            beans_id: beans.id,
            grinder_id: grinder.id,
        }
    }

    fn coordinator(&self, dispatcher: Arc<dyn NotificationDispatcher>) -> FulfillmentCoordinator {
        let ports = FulfillmentPorts::sqlite(
            &self.db,
            Arc::new(FileDocumentSink::new(&self.export_dir)),
            dispatcher,
        );
        self.configure(ports)
    }

    fn configure(&self, ports: FulfillmentPorts) -> FulfillmentCoordinator {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        FulfillmentCoordinator::new(ports)
            .with_clock(Arc::new(FixedClock(now)))
            .with_step_timeout(Duration::from_secs(5))
    }

    async fn quantity(&self, product_id: i64) -> i64 {
        self.db
            .products()
            .get_by_id(product_id)
            .await
            .unwrap()
            .unwrap()
            .quantity
    }

    fn documents(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.export_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Drop for Shop {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.export_dir);
    }
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}

fn unreachable_relay() -> SmtpDispatcher {
    SmtpDispatcher::new(&MailSettings {
        smtp_host: "127.0.0.1".to_string(),
        smtp_port: 1,
        username: None,
        password: None,
        from_address: "orders@market.test".to_string(),
        timeout_secs: 2,
    })
    .unwrap()
}

/// Order storage that refuses every insert.
struct BrokenOrders;

#[async_trait]
impl OrderRepository for BrokenOrders {
    async fn create(&self, _order: &NewOrder) -> FulfillmentResult<i64> {
        Err(FulfillmentError::persistence("order insert", "database is locked"))
    }
}

/// SQLite ledger whose reservations commit, then hang.
struct StallingLedger {
    inner: market_db::ProductRepository,
    stall: Duration,
}

#[async_trait]
impl InventoryLedger for StallingLedger {
    async fn reserve(&self, product_id: i64, quantity: i64) -> FulfillmentResult<ProductSnapshot> {
        let snapshot = InventoryLedger::reserve(&self.inner, product_id, quantity).await?;
        tokio::time::sleep(self.stall).await;
        Ok(snapshot)
    }

    async fn release(&self, product_id: i64, quantity: i64) -> FulfillmentResult<()> {
        InventoryLedger::release(&self.inner, product_id, quantity).await
    }
}

/// SQLite order storage whose inserts commit, then hang.
struct StallingOrders {
    inner: market_db::OrderRepository,
    stall: Duration,
}

#[async_trait]
impl OrderRepository for StallingOrders {
    async fn create(&self, order: &NewOrder) -> FulfillmentResult<i64> {
        let id = <market_db::OrderRepository as OrderRepository>::create(&self.inner, order).await?;
        tokio::time::sleep(self.stall).await;
        Ok(id)
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn order_within_stock_is_delivered_with_document() {
    let shop = Shop::open().await;
    let dispatcher = RecordingDispatcher::new();
    let coordinator = shop.coordinator(Arc::new(dispatcher.clone()));

    let outcome = coordinator
        .fulfill(OrderRequest::new(shop.customer_id, shop.beans_id, 3))
        .await
        .unwrap();

    assert_eq!(outcome.state, FulfillmentState::Delivered);
    assert_eq!(shop.quantity(shop.beans_id).await, 2);

    let stored = shop
        .db
        .orders()
        .get_by_id(outcome.order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.quantity, 3);
    assert_eq!(stored.unit_price_cents, 999);
    assert_eq!(stored.total().to_string(), "29.97");

    let path = outcome.document_path.unwrap();
    assert_eq!(path.parent(), Some(shop.export_dir.as_path()));
    let pdf = std::fs::read(&path).unwrap();
    assert!(pdf.starts_with(b"%PDF-1.4"));
    assert!(contains(&pdf, "Quantity: 3"));
    assert!(contains(&pdf, "Total Price: 29.97"));

    let sent = dispatcher.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Order Confirmation");
    assert_eq!(sent[0].attachment.bytes, pdf);
}

#[tokio::test]
async fn order_for_entire_stock_leaves_zero() {
    let shop = Shop::open().await;
    let coordinator = shop.coordinator(Arc::new(RecordingDispatcher::new()));

    let outcome = coordinator
        .fulfill(OrderRequest::new(shop.customer_id, shop.grinder_id, 2))
        .await
        .unwrap();

    assert!(outcome.is_delivered());
    assert_eq!(shop.quantity(shop.grinder_id).await, 0);
}

#[tokio::test]
async fn order_above_stock_is_rejected_without_side_effects() {
    let shop = Shop::open().await;
    let dispatcher = RecordingDispatcher::new();
    let coordinator = shop.coordinator(Arc::new(dispatcher.clone()));

    let err = coordinator
        .fulfill(OrderRequest::new(shop.customer_id, shop.grinder_id, 5))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        FulfillmentError::InsufficientStock {
            product_id: shop.grinder_id,
            available: 2,
            requested: 5
        }
    );
    assert_eq!(err.state(), FulfillmentState::RejectedInsufficientStock);
    assert_eq!(shop.quantity(shop.grinder_id).await, 2);
    assert_eq!(shop.db.orders().count().await.unwrap(), 0);
    assert!(shop.documents().is_empty());
    assert!(dispatcher.sent().await.is_empty());
}

#[tokio::test]
async fn unknown_and_inactive_products_are_not_found() {
    let shop = Shop::open().await;
    let coordinator = shop.coordinator(Arc::new(RecordingDispatcher::new()));

    let err = coordinator
        .fulfill(OrderRequest::new(shop.customer_id, 9_999, 1))
        .await
        .unwrap_err();
    assert_eq!(err, FulfillmentError::ProductNotFound(9_999));

    shop.db.products().deactivate(shop.beans_id).await.unwrap();
    let err = coordinator
        .fulfill(OrderRequest::new(shop.customer_id, shop.beans_id, 1))
        .await
        .unwrap_err();
    assert_eq!(err.state(), FulfillmentState::RejectedNotFound);
    assert_eq!(shop.quantity(shop.beans_id).await, 5);
}

#[tokio::test]
async fn unreachable_relay_keeps_order_and_document() {
    let shop = Shop::open().await;
    let coordinator = shop.coordinator(Arc::new(unreachable_relay()));

    let outcome = coordinator
        .fulfill(OrderRequest::new(shop.customer_id, shop.beans_id, 3))
        .await
        .unwrap();

    assert_eq!(outcome.state, FulfillmentState::DeliveryFailed);
    assert!(outcome.failure.is_some());

    let stored = shop
        .db
        .orders()
        .get_by_id(outcome.order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.product_id, shop.beans_id);
    assert_eq!(stored.quantity, 3);
    assert_eq!(shop.quantity(shop.beans_id).await, 2);

    let path = outcome.document_path.unwrap();
    assert!(path.exists());

    let pending = shop.db.confirmations().get_pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].order_id, outcome.order.id);
    assert_eq!(pending[0].recipient, "ada@example.com");
    assert_eq!(Path::new(&pending[0].document_path), path.as_path());
}

#[tokio::test]
async fn failed_insert_restores_stock() {
    let shop = Shop::open().await;
    let mut ports = FulfillmentPorts::sqlite(
        &shop.db,
        Arc::new(FileDocumentSink::new(&shop.export_dir)),
        Arc::new(RecordingDispatcher::new()),
    );
    ports.orders = Arc::new(BrokenOrders);
    let coordinator = shop.configure(ports);

    let err = coordinator
        .fulfill(OrderRequest::new(shop.customer_id, shop.beans_id, 4))
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::PersistFailed { restocked: true, .. }));
    assert_eq!(err.state(), FulfillmentState::PersistFailed);
    assert_eq!(shop.quantity(shop.beans_id).await, 5);
    assert!(shop.documents().is_empty());
}

#[tokio::test]
async fn insert_committed_after_timeout_keeps_order_and_stock() {
    let shop = Shop::open().await;
    let mut ports = FulfillmentPorts::sqlite(
        &shop.db,
        Arc::new(FileDocumentSink::new(&shop.export_dir)),
        Arc::new(RecordingDispatcher::new()),
    );
    ports.orders = Arc::new(StallingOrders {
        inner: shop.db.orders(),
        stall: Duration::from_millis(500),
    });
    let coordinator = shop
        .configure(ports)
        .with_step_timeout(Duration::from_millis(100));

    let outcome = coordinator
        .fulfill(OrderRequest::new(shop.customer_id, shop.beans_id, 3))
        .await
        .unwrap();

    assert_eq!(outcome.state, FulfillmentState::Delivered);
    assert_eq!(shop.db.orders().count().await.unwrap(), 1);
    assert_eq!(shop.quantity(shop.beans_id).await, 2);
}

#[tokio::test]
async fn reservation_committed_after_timeout_is_handed_back() {
    let shop = Shop::open().await;
    let mut ports = FulfillmentPorts::sqlite(
        &shop.db,
        Arc::new(FileDocumentSink::new(&shop.export_dir)),
        Arc::new(RecordingDispatcher::new()),
    );
    ports.ledger = Arc::new(StallingLedger {
        inner: shop.db.products(),
        stall: Duration::from_millis(500),
    });
    let coordinator = shop
        .configure(ports)
        .with_step_timeout(Duration::from_millis(100));

    let err = coordinator
        .fulfill(OrderRequest::new(shop.customer_id, shop.beans_id, 3))
        .await
        .unwrap_err();

    assert_eq!(err.state(), FulfillmentState::StorageFailed);
    assert_eq!(shop.quantity(shop.beans_id).await, 5);
    assert_eq!(shop.db.orders().count().await.unwrap(), 0);
    assert!(shop.documents().is_empty());
}

#[tokio::test]
async fn resend_delivers_queued_confirmation_without_touching_stock() {
    let shop = Shop::open().await;
    let dispatcher = RecordingDispatcher::new();
    dispatcher.set_fail(true).await;
    let coordinator = shop.coordinator(Arc::new(dispatcher.clone()));

    let outcome = coordinator
        .fulfill(OrderRequest::new(shop.customer_id, shop.beans_id, 1))
        .await
        .unwrap();
    assert_eq!(outcome.state, FulfillmentState::DeliveryFailed);
    assert_eq!(shop.db.confirmations().count_pending().await.unwrap(), 1);

    dispatcher.set_fail(false).await;
    let summary = coordinator.resend_pending(10).await.unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.delivered, 1);
    assert_eq!(shop.db.confirmations().count_pending().await.unwrap(), 0);
    assert_eq!(shop.quantity(shop.beans_id).await, 4);
    assert_eq!(shop.db.orders().count().await.unwrap(), 1);

    let sent = dispatcher.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].attachment.file_name,
        format!("order_20240301_100000_{}.pdf", outcome.order.id)
    );
}

#[tokio::test]
async fn order_keeps_price_from_reservation() {
    let shop = Shop::open().await;
    let coordinator = shop.coordinator(Arc::new(RecordingDispatcher::new()));

    let outcome = coordinator
        .fulfill(OrderRequest::new(shop.customer_id, shop.beans_id, 2))
        .await
        .unwrap();
    shop.db.products().update_price(shop.beans_id, 1_499).await.unwrap();

    let stored = shop
        .db
        .orders()
        .get_by_id(outcome.order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.unit_price_cents, 999);
    assert_eq!(stored.total().cents(), 1_998);
}

#[tokio::test]
async fn concurrent_orders_cannot_oversell() {
    let shop = Shop::open().await;
    let coordinator = shop.coordinator(Arc::new(RecordingDispatcher::new()));

    let (first, second) = tokio::join!(
        coordinator.fulfill(OrderRequest::new(shop.customer_id, shop.beans_id, 3)),
        coordinator.fulfill(OrderRequest::new(shop.customer_id, shop.beans_id, 3)),
    );

    let succeeded = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(shop.quantity(shop.beans_id).await, 2);
    assert_eq!(shop.db.orders().count().await.unwrap(), 1);
}
