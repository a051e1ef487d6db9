//! # Product Repository
//!
//! Catalog maintenance plus the inventory ledger operations.
//!
//! ## Reservation
//! ```text
//! reserve(id, n)
//!      │
//!      ▼
//! UPDATE products SET quantity = quantity - n
//!  WHERE id = ? AND active = 1 AND quantity >= n
//!  RETURNING ...
//!      │
//!      ├── row returned  → Ok(ProductSnapshot)        (stock decremented)
//!      │
//!      └── no row        → read-only lookup decides:
//!                            missing / inactive → DbError::NotFound
//!                            too few units      → DbError::InsufficientStock
//! ```
//!
//! The check and the decrement are a single statement, so two reservations
//! whose sum exceeds the stock cannot both succeed.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use market_core::validation::{validate_non_negative, validate_quantity};
use market_core::{NewProduct, Product, ProductSnapshot};

const PRODUCT_COLUMNS: &str =
    "id, title, description, price_cents, quantity, active, created_at, updated_at";

/// Repository for product operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Adds a product to the catalog.
    ///
    /// ## Returns
    /// The stored product with its assigned id.
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        product.validate()?;

        debug!(title = %product.title, quantity = product.quantity, "Inserting product");

        let now = Utc::now();
        let stored = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (title, description, price_cents, quantity, active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.title.trim())
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.quantity)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    /// Gets a product by id, active or not.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products ordered by id.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Product>> {
        let sql = if include_inactive {
            format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id")
        } else {
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE active = 1 ORDER BY id")
        };

        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Changes the catalog price. Existing orders keep their captured price.
    pub async fn update_price(&self, id: i64, price_cents: i64) -> DbResult<()> {
        validate_non_negative("price", price_cents)?;
        debug!(id, price_cents, "Updating price");

        let result = sqlx::query("UPDATE products SET price_cents = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(price_cents)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Sets the on-hand quantity after a stock count.
    pub async fn set_quantity(&self, id: i64, quantity: i64) -> DbResult<()> {
        validate_non_negative("quantity", quantity)?;
        debug!(id, quantity, "Setting stock level");

        let result = sqlx::query("UPDATE products SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(quantity)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Soft-deletes a product. Orders still reference the row.
    pub async fn deactivate(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Inventory Ledger
    // =========================================================================

    /// Takes `quantity` units of an active product off the shelf.
    ///
    /// ## Returns
    /// * `Ok(ProductSnapshot)` - title, price and remaining units after the decrement
    /// * `Err(DbError::NotFound)` - no such product, or it is inactive
    /// * `Err(DbError::InsufficientStock)` - fewer than `quantity` on hand; nothing changed
    ///
    /// ## Example
    /// ```rust,ignore
    /// let snapshot = db.products().reserve(product_id, 3).await?;
    /// assert_eq!(snapshot.remaining_quantity, before - 3);
    /// ```
    pub async fn reserve(&self, id: i64, quantity: i64) -> DbResult<ProductSnapshot> {
        validate_quantity(quantity)?;
        debug!(id, quantity, "Reserving stock");

        let reserved = sqlx::query_as::<_, ProductSnapshot>(
            r#"
            UPDATE products
            SET
                quantity = quantity - ?2,
                updated_at = ?3
            WHERE id = ?1 AND active = 1 AND quantity >= ?2
            RETURNING
                id AS product_id,
                title,
                price_cents AS unit_price_cents,
                quantity AS remaining_quantity
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(snapshot) = reserved {
            return Ok(snapshot);
        }

        let current: Option<(i64, bool)> =
            sqlx::query_as("SELECT quantity, active FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match current {
            Some((available, true)) => {
                debug!(id, available, requested = quantity, "Reservation refused");
                Err(DbError::InsufficientStock {
                    product_id: id,
                    available,
                    requested: quantity,
                })
            }
            _ => Err(DbError::not_found("Product", id)),
        }
    }

    /// Puts `quantity` units back after a reservation could not be used.
    pub async fn release(&self, id: i64, quantity: i64) -> DbResult<()> {
        validate_quantity(quantity)?;
        debug!(id, quantity, "Releasing reserved stock");

        let result = sqlx::query(
            "UPDATE products SET quantity = quantity + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(id, quantity, "Release targeted a missing product");
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
