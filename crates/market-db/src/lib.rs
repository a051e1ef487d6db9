//! # market-db: Database Layer for the Market Back-Office
//!
//! SQLite storage for products, customers, orders and the confirmation
//! outbox, plus CSV export and demo seeding.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           market-db                                     │
//! │                                                                         │
//! │   ┌──────────┐    ┌──────────────────────────────────────────────┐     │
//! │   │  pool    │───►│ repository                                   │     │
//! │   │ Database │    │  product · customer · order · confirmation   │     │
//! │   └────┬─────┘    └──────────────────────────────────────────────┘     │
//! │        │                                                                │
//! │        ├──► migrations  (embedded, run on connect)                     │
//! │        ├──► export      (CSV via CsvExportable)                        │
//! │        └──► seed        (demo catalog)                                 │
//! │                                                                         │
//! │   SQLite: WAL for files, foreign keys on, CHECK (quantity >= 0)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("./market.db")).await?;
//! let snapshot = db.products().reserve(1, 3).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod export;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use export::ExportKind;
pub use pool::{Database, DbConfig};

pub use repository::confirmation::ConfirmationOutboxRepository;
pub use repository::customer::CustomerRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
