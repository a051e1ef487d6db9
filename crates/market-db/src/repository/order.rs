//! # Order Repository
//!
//! Append-only order records. The price on each row is whatever the
//! reservation snapshot said; nothing here looks at the catalog.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use market_core::{NewOrder, Order};

const ORDER_COLUMNS: &str = "id, customer_id, product_id, quantity, unit_price_cents, purchase_date";

/// Repository for order operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts one order row.
    ///
    /// No business validation happens here. Storage faults (including
    /// foreign key and CHECK violations) come back as `DbError`.
    ///
    /// ## Returns
    /// The id SQLite assigned.
    pub async fn create(&self, order: &NewOrder) -> DbResult<i64> {
        debug!(
            customer_id = order.customer_id,
            product_id = order.product_id,
            quantity = order.quantity,
            "Recording order"
        );

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (customer_id, product_id, quantity, unit_price_cents, purchase_date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(order.customer_id)
        .bind(order.product_id)
        .bind(order.quantity)
        .bind(order.unit_price_cents)
        .bind(order.purchase_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Lists all orders, oldest first.
    pub async fn list(&self) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    pub async fn list_for_customer(&self, customer_id: i64) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ?1 ORDER BY id"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use market_core::{NewCustomer, NewProduct};

    async fn seeded() -> (Database, i64, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db
            .customers()
            .insert(&NewCustomer {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                phone: String::new(),
                address: String::new(),
                email: "ada@example.com".to_string(),
            })
            .await
            .unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                title: "Espresso Beans".to_string(),
                description: String::new(),
                price_cents: 999,
                quantity: 5,
            })
            .await
            .unwrap();
        (db, customer.id, product.id)
    }

    fn new_order(customer_id: i64, product_id: i64, unit_price_cents: i64) -> NewOrder {
        NewOrder {
            customer_id,
            product_id,
            quantity: 3,
            unit_price_cents,
            purchase_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let (db, customer_id, product_id) = seeded().await;

        let draft = new_order(customer_id, product_id, 999);
        let id = db.orders().create(&draft).await.unwrap();

        let stored = db.orders().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored, draft.into_order(id));
        assert_eq!(db.orders().count().await.unwrap(), 1);
        assert_eq!(db.orders().list_for_customer(customer_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_order_keeps_captured_price() {
        let (db, customer_id, product_id) = seeded().await;

        let snapshot = db.products().reserve(product_id, 3).await.unwrap();
        let id = db
            .orders()
            .create(&new_order(customer_id, product_id, snapshot.unit_price_cents))
            .await
            .unwrap();

        db.products().update_price(product_id, 1299).await.unwrap();

        let stored = db.orders().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.unit_price_cents, 999);
    }

    #[tokio::test]
    async fn test_unknown_customer_is_storage_fault() {
        let (db, _, product_id) = seeded().await;

        let err = db
            .orders()
            .create(&new_order(404, product_id, 999))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert_eq!(db.orders().count().await.unwrap(), 0);
    }
}
