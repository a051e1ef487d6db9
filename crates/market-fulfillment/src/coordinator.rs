//! # Fulfillment Coordinator
//!
//! Runs one order from stock reservation to a delivered confirmation.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fulfill(customer, product, qty)                                        │
//! │       │                                                                 │
//! │       ├── validate request ─────────────── ✗ RejectedInvalidRequest    │
//! │       ├── CustomerDirectory.get_customer ─ ✗ RejectedNotFound          │
//! │       ▼                                                                 │
//! │  InventoryLedger.reserve ───────────────── ✗ RejectedNotFound /        │
//! │       │                                      RejectedInsufficientStock/│
//! │       │                                      StorageFailed             │
//! │       ▼  StockReserved                                                  │
//! │  OrderRepository.create ────────────────── ✗ PersistFailed             │
//! │       │                                      (Ledger.release first)    │
//! │       ▼  OrderPersisted            ── order is committed from here ──   │
//! │  confirmation::render + DocumentSink.store ✗ RenderFailed              │
//! │       │                                                                 │
//! │       ▼  DocumentRendered                                               │
//! │  NotificationDispatcher.deliver ────────── ✗ DeliveryFailed            │
//! │       │                                      (outbox entry recorded)   │
//! │       ▼                                                                 │
//! │  Delivered                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Step Timeouts
//! ```text
//! reads (customer, outbox)   dropped at the timeout      → Persistence
//! dispatcher                 dropped at the timeout      → DeliveryFailed
//! reserve / insert / release run on their own task and always settle
//!     reserve settled late   units released again        → Persistence
//!     insert settled late    order kept, workflow goes on
//! ```
//!
//! A stock or order write is never dropped mid-flight: SQLite may have
//! committed it already, and the caller would be told the opposite.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{DeliveryError, FulfillmentError, FulfillmentResult};
use crate::ports::{
    ConfirmationOutbox, CustomerDirectory, DocumentSink, InventoryLedger, Notification,
    NotificationDispatcher, OrderRepository,
};
use crate::state::FulfillmentState;
use market_core::{confirmation, NewOrder, NewOutboxEntry, Order, OrderRequest};

/// Default bound on each storage or mail call.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Collaborators
// =============================================================================

/// Everything the coordinator talks to.
#[derive(Clone)]
pub struct FulfillmentPorts {
    pub customers: Arc<dyn CustomerDirectory>,
    pub ledger: Arc<dyn InventoryLedger>,
    pub orders: Arc<dyn OrderRepository>,
    pub outbox: Arc<dyn ConfirmationOutbox>,
    pub documents: Arc<dyn DocumentSink>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of an attempt that committed an order.
///
/// `state` is one of `Delivered`, `RenderFailed` or `DeliveryFailed`.
#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentOutcome {
    pub attempt_id: Uuid,
    pub state: FulfillmentState,
    pub order: Order,
    /// Set once the document is on disk.
    pub document_path: Option<PathBuf>,
    /// What went wrong for a partial success.
    pub failure: Option<String>,
}

impl FulfillmentOutcome {
    pub fn is_delivered(&self) -> bool {
        self.state == FulfillmentState::Delivered
    }
}

/// Counts from one resend pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResendSummary {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Final result of a storage write, and whether it outlived the step timeout.
struct Settled<T> {
    result: FulfillmentResult<T>,
    late: bool,
}

// =============================================================================
// Coordinator
// =============================================================================

/// Orchestrates order fulfillment over the configured ports.
///
/// ## Example
/// ```rust,ignore
/// let coordinator = FulfillmentCoordinator::new(ports)
///     .with_step_timeout(Duration::from_secs(5));
///
/// match coordinator.fulfill(OrderRequest::new(1, 1, 3)).await {
///     Ok(outcome) => println!("order {} is {}", outcome.order.id, outcome.state),
///     Err(err) => println!("no order: {err} ({})", err.state()),
/// }
/// ```
#[derive(Clone)]
pub struct FulfillmentCoordinator {
    ports: FulfillmentPorts,
    clock: Arc<dyn Clock>,
    step_timeout: Duration,
}

impl FulfillmentCoordinator {
    pub fn new(ports: FulfillmentPorts) -> Self {
        Self {
            ports,
            clock: Arc::new(SystemClock),
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    /// Fulfils one order request.
    ///
    /// ## Returns
    /// * `Ok(FulfillmentOutcome)` - an order was committed; check `state` for
    ///   whether the confirmation went out
    /// * `Err(FulfillmentError)` - no order exists and stock is back where it was
    ///   (unless `PersistFailed { restocked: false }`)
    pub async fn fulfill(&self, request: OrderRequest) -> FulfillmentResult<FulfillmentOutcome> {
        let attempt_id = Uuid::new_v4();
        let span = info_span!(
            "fulfill",
            %attempt_id,
            customer_id = request.customer_id,
            product_id = request.product_id,
            quantity = request.quantity
        );

        let result = self.run(attempt_id, request).instrument(span.clone()).await;

        span.in_scope(|| match &result {
            Ok(outcome) => info!(state = %outcome.state, order_id = outcome.order.id, "Fulfillment finished"),
            Err(err) => warn!(state = %err.state(), error = %err, "Fulfillment stopped without an order"),
        });

        result
    }

    async fn run(
        &self,
        attempt_id: Uuid,
        request: OrderRequest,
    ) -> FulfillmentResult<FulfillmentOutcome> {
        info!(state = %FulfillmentState::Requested, "Fulfillment requested");
        request.validate()?;

        // Read-only: a missing customer stops us before stock moves.
        let customer = self
            .bounded(
                "customer lookup",
                self.ports.customers.get_customer(request.customer_id),
            )
            .await?;

        // Requested -> StockReserved
        let ledger = Arc::clone(&self.ports.ledger);
        let (product_id, quantity) = (request.product_id, request.quantity);
        let reservation = self
            .settle("stock reservation", async move {
                ledger.reserve(product_id, quantity).await
            })
            .await;
        let snapshot = match reservation {
            Settled {
                result: Ok(snapshot),
                late: false,
            } => snapshot,
            Settled {
                result: Ok(_),
                late: true,
            } => {
                warn!("Reservation settled after the step timeout, releasing it");
                let reason = format!("stock reservation timed out after {:?}", self.step_timeout);
                return Err(if self.restock(product_id, quantity).await {
                    FulfillmentError::persistence("stock reservation", reason)
                } else {
                    FulfillmentError::PersistFailed {
                        reason,
                        restocked: false,
                    }
                });
            }
            Settled { result: Err(err), .. } => return Err(err),
        };
        info!(
            state = %FulfillmentState::StockReserved,
            remaining = snapshot.remaining_quantity,
            unit_price_cents = snapshot.unit_price_cents,
            "Stock reserved"
        );

        // StockReserved -> OrderPersisted
        let generated_at = self.clock.now();
        let draft = NewOrder {
            customer_id: customer.id,
            product_id: snapshot.product_id,
            quantity: request.quantity,
            unit_price_cents: snapshot.unit_price_cents,
            purchase_date: generated_at.date(),
        };

        let orders = Arc::clone(&self.ports.orders);
        let pending = draft.clone();
        let insert = self
            .settle("order insert", async move { orders.create(&pending).await })
            .await;

        let order = match insert.result {
            Ok(order_id) => {
                if insert.late {
                    warn!(order_id, "Order insert settled after the step timeout, keeping it");
                }
                draft.into_order(order_id)
            }
            Err(err) => {
                error!(error = %err, "Order insert failed after reservation, releasing stock");
                let restocked = self.restock(request.product_id, request.quantity).await;
                return Err(FulfillmentError::PersistFailed {
                    reason: err.to_string(),
                    restocked,
                });
            }
        };
        info!(state = %FulfillmentState::OrderPersisted, order_id = order.id, "Order recorded");

        // OrderPersisted -> DocumentRendered
        let document = match confirmation::render(&order, &customer, &snapshot) {
            Ok(bytes) => bytes,
            Err(fault) => {
                warn!(order_id = order.id, error = %fault, "Confirmation could not be rendered");
                return Ok(FulfillmentOutcome {
                    attempt_id,
                    state: FulfillmentState::RenderFailed,
                    order,
                    document_path: None,
                    failure: Some(fault.to_string()),
                });
            }
        };

        let document_path = match self
            .ports
            .documents
            .store(generated_at, order.id, &document)
            .await
        {
            Ok(path) => path,
            Err(err) => {
                warn!(order_id = order.id, error = %err, "Confirmation document could not be written");
                return Ok(FulfillmentOutcome {
                    attempt_id,
                    state: FulfillmentState::RenderFailed,
                    order,
                    document_path: None,
                    failure: Some(format!("document sink: {err}")),
                });
            }
        };
        info!(
            state = %FulfillmentState::DocumentRendered,
            path = %document_path.display(),
            "Confirmation document written"
        );

        // DocumentRendered -> Delivered
        let notification = Notification::order_confirmation(&customer.email, &document_path, document);
        if let Err(err) = self.deliver(&notification).await {
            warn!(order_id = order.id, error = %err, "Confirmation delivery failed");
            self.record_undelivered(&order, &notification.recipient, &document_path, &err)
                .await;
            return Ok(FulfillmentOutcome {
                attempt_id,
                state: FulfillmentState::DeliveryFailed,
                order,
                document_path: Some(document_path),
                failure: Some(err.to_string()),
            });
        }

        Ok(FulfillmentOutcome {
            attempt_id,
            state: FulfillmentState::Delivered,
            order,
            document_path: Some(document_path),
            failure: None,
        })
    }

    /// Retries delivery for up to `limit` undelivered confirmations.
    ///
    /// Uses the stored documents; stock and orders are never touched.
    pub async fn resend_pending(&self, limit: u32) -> FulfillmentResult<ResendSummary> {
        let pending = self
            .bounded("outbox read", self.ports.outbox.pending(limit))
            .await?;
        let mut summary = ResendSummary::default();

        for entry in pending {
            summary.attempted += 1;
            let path = PathBuf::from(&entry.document_path);

            let outcome = match self.ports.documents.load(&path).await {
                Ok(document) => {
                    let notification =
                        Notification::order_confirmation(&entry.recipient, &path, document);
                    self.deliver(&notification).await.map_err(|e| e.to_string())
                }
                Err(err) => Err(format!("document unavailable: {err}")),
            };

            match outcome {
                Ok(()) => {
                    info!(order_id = entry.order_id, outbox_id = entry.id, "Confirmation resent");
                    self.bounded("outbox update", self.ports.outbox.mark_delivered(entry.id))
                        .await?;
                    summary.delivered += 1;
                }
                Err(reason) => {
                    warn!(order_id = entry.order_id, outbox_id = entry.id, error = %reason, "Resend failed");
                    self.bounded("outbox update", self.ports.outbox.mark_failed(entry.id, &reason))
                        .await?;
                    summary.failed += 1;
                }
            }
        }

        info!(
            attempted = summary.attempted,
            delivered = summary.delivered,
            failed = summary.failed,
            "Resend pass complete"
        );
        Ok(summary)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> FulfillmentResult<T>
    where
        F: Future<Output = FulfillmentResult<T>>,
    {
        match timeout(self.step_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(FulfillmentError::persistence(
                operation,
                format!("timed out after {:?}", self.step_timeout),
            )),
        }
    }

    /// Runs a stock or order write on its own task and waits for its result.
    ///
    /// Past the step timeout the write keeps running; `late` records that it
    /// outlived the bound. The task survives even if `fulfill` is dropped.
    async fn settle<T, F>(&self, operation: &'static str, call: F) -> Settled<T>
    where
        T: Send + 'static,
        F: Future<Output = FulfillmentResult<T>> + Send + 'static,
    {
        let mut task = tokio::spawn(call);

        let (joined, late) = match timeout(self.step_timeout, &mut task).await {
            Ok(joined) => (joined, false),
            Err(_) => {
                warn!(
                    operation,
                    timeout = ?self.step_timeout,
                    "Storage write is slow, waiting for it to settle"
                );
                (task.await, true)
            }
        };

        let result = joined.unwrap_or_else(|err| {
            Err(FulfillmentError::persistence(operation, format!("task failed: {err}")))
        });
        Settled { result, late }
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        match timeout(self.step_timeout, self.ports.dispatcher.deliver(notification)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::TimedOut(self.step_timeout)),
        }
    }

    /// Compensating release. Returns whether the stock is back.
    async fn restock(&self, product_id: i64, quantity: i64) -> bool {
        let ledger = Arc::clone(&self.ports.ledger);
        let release = self
            .settle("stock release", async move {
                ledger.release(product_id, quantity).await
            })
            .await;

        match release.result {
            Ok(()) => {
                info!(product_id, quantity, "Reserved stock released");
                true
            }
            Err(err) => {
                error!(
                    product_id,
                    quantity,
                    error = %err,
                    "Stock release failed, product is short until corrected"
                );
                false
            }
        }
    }

    async fn record_undelivered(
        &self,
        order: &Order,
        recipient: &str,
        document_path: &std::path::Path,
        err: &DeliveryError,
    ) {
        let entry = NewOutboxEntry {
            order_id: order.id,
            recipient: recipient.to_string(),
            document_path: document_path.to_string_lossy().into_owned(),
            last_error: err.to_string(),
        };

        match self.bounded("outbox insert", self.ports.outbox.record(&entry)).await {
            Ok(outbox_id) => info!(order_id = order.id, outbox_id, "Queued confirmation for resend"),
            Err(outbox_err) => error!(
                order_id = order.id,
                error = %outbox_err,
                "Could not queue confirmation for resend"
            ),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
