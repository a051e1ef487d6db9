//! # Repository Module
//!
//! Database repository implementations for the Market back-office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller                                                                 │
//! │       │  db.products().reserve(id, 3)                                   │
//! │       ▼                                                                 │
//! │  ProductRepository                                                      │
//! │  ├── insert / get_by_id / list / update_price / deactivate             │
//! │  └── reserve / release                                                 │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog and inventory ledger
//! - [`customer::CustomerRepository`] - Customer records
//! - [`order::OrderRepository`] - Append-only orders
//! - [`confirmation::ConfirmationOutboxRepository`] - Undelivered confirmations

pub mod confirmation;
pub mod customer;
pub mod order;
pub mod product;
