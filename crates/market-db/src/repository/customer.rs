//! # Customer Repository
//!
//! Customer records and the point lookup the fulfillment flow runs before
//! touching stock.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use market_core::validation::validate_email;
use market_core::{Customer, NewCustomer};

const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, phone, address, email";

/// Repository for customer operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Adds a customer.
    pub async fn insert(&self, customer: &NewCustomer) -> DbResult<Customer> {
        customer.validate()?;

        debug!(email = %customer.email, "Inserting customer");

        let stored = sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customers (first_name, last_name, phone, address, email)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(customer.first_name.trim())
        .bind(customer.last_name.trim())
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.email.trim())
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    /// Gets a customer by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists all customers ordered by id.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Replaces phone, address and email.
    pub async fn update_contact(
        &self,
        id: i64,
        phone: &str,
        address: &str,
        email: &str,
    ) -> DbResult<()> {
        validate_email(email)?;
        debug!(id, "Updating customer contact details");

        let result = sqlx::query(
            "UPDATE customers SET phone = ?2, address = ?3, email = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(phone)
        .bind(address)
        .bind(email.trim())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn ada() -> NewCustomer {
        NewCustomer {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: "555-0100".to_string(),
            address: "12 Analytical Row".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_get_update() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db.customers().insert(&ada()).await.unwrap();

        let fetched = db.customers().get_by_id(customer.id).await.unwrap().unwrap();
        assert_eq!(fetched, customer);

        db.customers()
            .update_contact(customer.id, "555-0199", "1 New Street", "ada@lovelace.org")
            .await
            .unwrap();
        let fetched = db.customers().get_by_id(customer.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "ada@lovelace.org");
        assert_eq!(fetched.address, "1 New Street");

        assert_eq!(db.customers().count().await.unwrap(), 1);
        assert_eq!(db.customers().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.customers().get_by_id(5).await.unwrap().is_none());
        assert!(db
            .customers()
            .update_contact(5, "", "", "x@example.com")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_bad_email() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut customer = ada();
        customer.email = "nobody".to_string();
        assert!(matches!(
            db.customers().insert(&customer).await,
            Err(DbError::Invalid(_))
        ));
    }
}
