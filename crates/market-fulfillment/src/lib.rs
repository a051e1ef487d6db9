//! # market-fulfillment: Order Fulfillment for the Market Back-Office
//!
//! Takes an order request from reservation through to an emailed PDF
//! confirmation, keeping stock and order records consistent when a step
//! fails.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Fulfillment Architecture                            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │              FulfillmentCoordinator (state machine)              │  │
//! │  │                                                                  │  │
//! │  │  fulfill(request)      one attempt, one tracing span             │  │
//! │  │  resend_pending(n)     retry undelivered confirmations           │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ ports (async traits)                   │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ store          │  │ sink           │  │ mail                   │    │
//! │  │                │  │                │  │                        │    │
//! │  │ market-db      │  │ PDF files in   │  │ lettre SMTP with the   │    │
//! │  │ repositories   │  │ export_dir     │  │ PDF attached           │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  memory: in-process doubles of every port, with failure switches       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`coordinator`] - `FulfillmentCoordinator` and its outcomes
//! - [`state`] - The fulfillment state machine
//! - [`ports`] - Collaborator traits and `Notification`
//! - [`store`] - Ports over SQLite repositories
//! - [`sink`] - Confirmation files on disk
//! - [`mail`] - SMTP dispatcher
//! - [`config`] - `market.toml` and `MARKET_*` overrides
//! - [`clock`] - Injectable wall clock
//! - [`memory`] - In-memory ports
//!
//! ## Usage
//!
//! ```rust,ignore
//! use market_fulfillment::{FulfillmentCoordinator, FulfillmentPorts, MarketConfig};
//!
//! let config = MarketConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let ports = FulfillmentPorts::sqlite(
//!     &db,
//!     Arc::new(FileDocumentSink::new(&config.fulfillment.export_dir)),
//!     Arc::new(SmtpDispatcher::new(&config.mail)?),
//! );
//!
//! let outcome = FulfillmentCoordinator::new(ports)
//!     .fulfill(OrderRequest::new(1, 1, 3))
//!     .await?;
//! println!("order {} -> {}", outcome.order.id, outcome.state);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod mail;
pub mod memory;
pub mod ports;
pub mod sink;
pub mod state;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{DatabaseSettings, FulfillmentSettings, MailSettings, MarketConfig};
pub use coordinator::{
    FulfillmentCoordinator, FulfillmentOutcome, FulfillmentPorts, ResendSummary,
    DEFAULT_STEP_TIMEOUT,
};
pub use error::{ConfigError, DeliveryError, FulfillmentError, FulfillmentResult};
pub use mail::SmtpDispatcher;
pub use ports::{
    Attachment, ConfirmationOutbox, CustomerDirectory, DocumentSink, InventoryLedger,
    Notification, NotificationDispatcher, OrderRepository,
};
pub use sink::FileDocumentSink;
pub use state::FulfillmentState;
