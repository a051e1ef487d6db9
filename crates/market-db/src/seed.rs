//! # Demo Data
//!
//! Fills an empty database with a small catalog and a handful of customers
//! so the `market` commands have something to work on.
//!
//! Generated data is deterministic: the same `product_count` always yields
//! the same titles, prices and stock levels.

use tracing::{info, warn};

use crate::error::DbResult;
use crate::pool::Database;
use market_core::{NewCustomer, NewProduct};

/// Product families and base prices in cents.
const CATALOG: &[(&str, i64)] = &[
    ("Espresso Beans", 999),
    ("Filter Coffee", 799),
    ("Green Tea", 450),
    ("Earl Grey", 520),
    ("Hot Chocolate", 650),
    ("Oat Milk", 299),
    ("Paper Filters", 250),
    ("Travel Mug", 1299),
    ("Hand Grinder", 4999),
    ("Milk Frother", 2499),
];

const SIZES: &[(&str, i64)] = &[("250g", 0), ("500g", 450), ("1kg", 1100)];

const CUSTOMERS: &[(&str, &str, &str, &str, &str)] = &[
    ("Ada", "Lovelace", "555-0100", "12 Analytical Row", "ada@example.com"),
    ("Grace", "Hopper", "555-0101", "7 Compiler Court", "grace@example.com"),
    ("Alan", "Turing", "555-0102", "1 Bletchley Lane", "alan@example.com"),
    ("Katherine", "Johnson", "555-0103", "3 Orbit Avenue", "katherine@example.com"),
];

/// What a seed run inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub products: usize,
    pub customers: usize,
    /// True when the database already had products and nothing was written.
    pub skipped: bool,
}

/// Inserts up to `product_count` products and the demo customers.
///
/// Does nothing if the catalog is not empty.
pub async fn seed_demo_data(db: &Database, product_count: usize) -> DbResult<SeedReport> {
    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(SeedReport {
            skipped: true,
            ..SeedReport::default()
        });
    }

    let mut report = SeedReport::default();

    for (index, product) in demo_products().take(product_count).enumerate() {
        db.products().insert(&product).await?;
        report.products = index + 1;
    }

    for (first_name, last_name, phone, address, email) in CUSTOMERS {
        db.customers()
            .insert(&NewCustomer {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                phone: phone.to_string(),
                address: address.to_string(),
                email: email.to_string(),
            })
            .await?;
        report.customers += 1;
    }

    info!(
        products = report.products,
        customers = report.customers,
        "Seed complete"
    );
    Ok(report)
}

fn demo_products() -> impl Iterator<Item = NewProduct> {
    CATALOG.iter().enumerate().flat_map(|(family, (name, base_price))| {
        SIZES.iter().enumerate().map(move |(size, (label, addon))| {
            let seed = family * SIZES.len() + size;
            NewProduct {
                title: format!("{name} {label}"),
                description: format!("{name}, {label} pack"),
                price_cents: base_price + addon,
                quantity: ((seed * 7) % 40) as i64 + 2,
            }
        })
    })
}
