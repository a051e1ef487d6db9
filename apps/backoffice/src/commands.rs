//! # Back-Office Commands
//!
//! Each command returns a JSON report that `run` prints on stdout.
//!
//! ```text
//! seed    ──► market_db::seed::seed_demo_data
//! order   ──► FulfillmentCoordinator::fulfill
//! resend  ──► FulfillmentCoordinator::resend_pending
//! export  ──► Database::export (CSV)
//! product ──► ProductRepository (add / list / update / deactivate)
//! customer──► CustomerRepository (add / list / update)
//! ```

use std::path::Path;

use serde_json::{json, Value};
use tracing::info;

use market_core::OrderRequest;
use market_db::seed::seed_demo_data;
use market_db::{Database, DbError, DbResult, ExportKind};
use market_fulfillment::{FulfillmentCoordinator, FulfillmentResult};

use crate::cli::{CustomerCommand, ProductCommand};

pub async fn seed(db: &Database, count: usize) -> DbResult<Value> {
    let report = seed_demo_data(db, count).await?;
    info!(
        products = report.products,
        customers = report.customers,
        skipped = report.skipped,
        "Seed finished"
    );

    Ok(json!({
        "products": report.products,
        "customers": report.customers,
        "skipped": report.skipped,
    }))
}

/// Runs one fulfillment. Rejections are reported, not raised.
pub async fn order(coordinator: &FulfillmentCoordinator, request: OrderRequest) -> Value {
    match coordinator.fulfill(request).await {
        Ok(outcome) => json!({
            "attempt_id": outcome.attempt_id,
            "state": outcome.state,
            "order": outcome.order,
            "total": outcome.order.total().to_string(),
            "document_path": outcome.document_path,
            "failure": outcome.failure,
        }),
        Err(err) => json!({
            "state": err.state(),
            "error": err.to_string(),
        }),
    }
}

pub async fn resend(coordinator: &FulfillmentCoordinator, limit: u32) -> FulfillmentResult<Value> {
    let summary = coordinator.resend_pending(limit).await?;
    Ok(json!(summary))
}

pub async fn export(db: &Database, kind: ExportKind, path: &Path) -> DbResult<Value> {
    let rows = db.export(kind, path).await?;
    info!(%kind, rows, path = %path.display(), "Export written");

    Ok(json!({
        "kind": kind.as_str(),
        "rows": rows,
        "path": path,
    }))
}

pub async fn product(db: &Database, command: ProductCommand) -> DbResult<Value> {
    let products = db.products();

    match command {
        ProductCommand::Add(new) => {
            let product = products.insert(&new).await?;
            info!(id = product.id, title = %product.title, "Product added");
            Ok(json!(product))
        }
        ProductCommand::List { include_inactive } => {
            Ok(json!(products.list(include_inactive).await?))
        }
        ProductCommand::Update {
            id,
            price_cents,
            quantity,
        } => {
            if let Some(price_cents) = price_cents {
                products.update_price(id, price_cents).await?;
            }
            if let Some(quantity) = quantity {
                products.set_quantity(id, quantity).await?;
            }
            let product = products
                .get_by_id(id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", id))?;
            info!(id, "Product updated");
            Ok(json!(product))
        }
        ProductCommand::Deactivate { id } => {
            products.deactivate(id).await?;
            info!(id, "Product deactivated");
            Ok(json!({ "id": id, "active": false }))
        }
    }
}

pub async fn customer(db: &Database, command: CustomerCommand) -> DbResult<Value> {
    let customers = db.customers();

    match command {
        CustomerCommand::Add(new) => {
            let customer = customers.insert(&new).await?;
            info!(id = customer.id, "Customer added");
            Ok(json!(customer))
        }
        CustomerCommand::List => Ok(json!(customers.list().await?)),
        CustomerCommand::Update {
            id,
            phone,
            address,
            email,
        } => {
            let mut customer = customers
                .get_by_id(id)
                .await?
                .ok_or_else(|| DbError::not_found("Customer", id))?;

            if let Some(phone) = phone {
                customer.phone = phone;
            }
            if let Some(address) = address {
                customer.address = address;
            }
            if let Some(email) = email {
                customer.email = email;
            }

            customers
                .update_contact(id, &customer.phone, &customer.address, &customer.email)
                .await?;
            info!(id, "Customer contact updated");
            Ok(json!(customer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use market_core::{NewCustomer, NewProduct};
    use market_db::DbConfig;
    use market_fulfillment::memory::{InMemoryDocumentSink, RecordingDispatcher};
    use market_fulfillment::FulfillmentPorts;

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db, 3).await.unwrap();
        db
    }

    fn coordinator(db: &Database) -> FulfillmentCoordinator {
        FulfillmentCoordinator::new(FulfillmentPorts::sqlite(
            db,
            Arc::new(InMemoryDocumentSink::new()),
            Arc::new(RecordingDispatcher::new()),
        ))
    }

    #[tokio::test]
    async fn test_seed_twice_skips() {
        let db = seeded().await;
        let report = seed(&db, 3).await.unwrap();
        assert_eq!(report["skipped"], true);
        assert_eq!(report["products"], 0);
    }

    #[tokio::test]
    async fn test_order_reports_state() {
        let db = seeded().await;
        let product = db.products().list(false).await.unwrap().remove(0);
        let customer = db.customers().list().await.unwrap().remove(0);
        let coordinator = coordinator(&db);

        let report = order(
            &coordinator,
            OrderRequest::new(customer.id, product.id, 1),
        )
        .await;
        assert_eq!(report["state"], "Delivered");
        assert_eq!(report["order"]["quantity"], 1);

        let report = order(
            &coordinator,
            OrderRequest::new(customer.id, product.id, product.quantity + 1),
        )
        .await;
        assert_eq!(report["state"], "RejectedInsufficientStock");
        assert!(report["error"].as_str().unwrap().contains("Insufficient stock"));
    }

    #[tokio::test]
    async fn test_resend_with_empty_outbox() {
        let db = seeded().await;
        let report = resend(&coordinator(&db), 10).await.unwrap();
        assert_eq!(report["attempted"], 0);
    }

    #[tokio::test]
    async fn test_export_products() {
        let db = seeded().await;
        let path = std::env::temp_dir()
            .join(format!("market-export-{}", uuid::Uuid::new_v4()))
            .join("products.csv");

        let report = export(&db, ExportKind::Products, &path).await.unwrap();
        assert_eq!(report["rows"], 3);

        let csv = std::fs::read_to_string(&path).unwrap();
        assert!(csv.starts_with("Id,Title,Description,Quantity,Price,Active"));

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[tokio::test]
    async fn test_product_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let added = product(
            &db,
            ProductCommand::Add(NewProduct {
                title: "Espresso Beans".to_string(),
                description: "1kg bag".to_string(),
                price_cents: 999,
                quantity: 5,
            }),
        )
        .await
        .unwrap();
        let id = added["id"].as_i64().unwrap();
        assert_eq!(added["price_cents"], 999);

        let updated = product(
            &db,
            ProductCommand::Update {
                id,
                price_cents: Some(1_250),
                quantity: Some(8),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated["price_cents"], 1_250);
        assert_eq!(updated["quantity"], 8);

        product(&db, ProductCommand::Deactivate { id }).await.unwrap();

        let active = product(&db, ProductCommand::List { include_inactive: false })
            .await
            .unwrap();
        assert_eq!(active.as_array().unwrap().len(), 0);
        let all = product(&db, ProductCommand::List { include_inactive: true })
            .await
            .unwrap();
        assert_eq!(all.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_product_update_unknown_id() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = product(
            &db,
            ProductCommand::Update {
                id: 404,
                price_cents: None,
                quantity: Some(1),
            },
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_customer_update_keeps_unset_fields() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let added = customer(
            &db,
            CustomerCommand::Add(NewCustomer {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                phone: "555-0100".to_string(),
                address: "12 Analytical Row".to_string(),
                email: "ada@example.com".to_string(),
            }),
        )
        .await
        .unwrap();
        let id = added["id"].as_i64().unwrap();

        customer(
            &db,
            CustomerCommand::Update {
                id,
                phone: None,
                address: None,
                email: Some("ada@engine.example".to_string()),
            },
        )
        .await
        .unwrap();

        let stored = db.customers().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.email, "ada@engine.example");
        assert_eq!(stored.phone, "555-0100");
        assert_eq!(stored.address, "12 Analytical Row");

        let listed = customer(&db, CustomerCommand::List).await.unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_customer_update_rejects_bad_email() {
        let db = seeded().await;
        let existing = db.customers().list().await.unwrap().remove(0);

        let err = customer(
            &db,
            CustomerCommand::Update {
                id: existing.id,
                phone: None,
                address: None,
                email: Some("not-an-address".to_string()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));
    }
}
