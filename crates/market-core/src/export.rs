//! # CSV Row Shapes
//!
//! Each exportable entity says what its CSV header is and how one value
//! becomes a record. The writer in market-db only ever sees this trait.

use crate::money::Money;
use crate::types::{Customer, Order, Product};

/// An entity that can be written as one CSV row.
pub trait CsvExportable {
    /// Name used in log lines and default file names.
    const ENTITY: &'static str;

    /// Column names, in record order.
    fn headers() -> &'static [&'static str];

    /// The record for this value. Same length as [`CsvExportable::headers`].
    fn record(&self) -> Vec<String>;
}

impl CsvExportable for Product {
    const ENTITY: &'static str = "products";

    fn headers() -> &'static [&'static str] {
        &["Id", "Title", "Description", "Quantity", "Price", "Active"]
    }

    fn record(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.description.clone(),
            self.quantity.to_string(),
            self.price().to_string(),
            self.active.to_string(),
        ]
    }
}

impl CsvExportable for Customer {
    const ENTITY: &'static str = "customers";

    fn headers() -> &'static [&'static str] {
        &["Id", "FirstName", "LastName", "Phone", "Address", "Email"]
    }

    fn record(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.phone.clone(),
            self.address.clone(),
            self.email.clone(),
        ]
    }
}

impl CsvExportable for Order {
    const ENTITY: &'static str = "orders";

    fn headers() -> &'static [&'static str] {
        &["OrderId", "CustomerId", "ProductId", "Quantity", "OrderDate", "Price"]
    }

    fn record(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.customer_id.to_string(),
            self.product_id.to_string(),
            self.quantity.to_string(),
            self.purchase_date.format("%Y-%m-%d").to_string(),
            Money::from_cents(self.unit_price_cents).to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_records_match_headers() {
        let product = Product {
            id: 3,
            title: "Tea".to_string(),
            description: "Green, loose leaf".to_string(),
            price_cents: 450,
            quantity: 12,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(product.record().len(), Product::headers().len());
        assert_eq!(
            product.record(),
            vec!["3", "Tea", "Green, loose leaf", "12", "4.50", "true"]
        );

        let order = Order {
            id: 8,
            customer_id: 2,
            product_id: 3,
            quantity: 4,
            unit_price_cents: 450,
            purchase_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        };
        assert_eq!(order.record().len(), Order::headers().len());
        assert_eq!(order.record()[4], "2024-03-01");
        assert_eq!(order.record()[5], "4.50");
    }
}
