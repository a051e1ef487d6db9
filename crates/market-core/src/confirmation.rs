//! # Order Confirmation Renderer
//!
//! Turns a committed order into the PDF attached to the confirmation mail.
//!
//! ## Document Layout
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Customer Details:                    │
//! │ First Name: Ada                      │
//! │ Last Name: Lovelace                  │
//! │ Email: ada@example.com               │
//! │ Order Details:                       │
//! │ Product Name: Espresso Beans         │
//! │ Product ID: 1                        │
//! │ Quantity: 3                          │
//! │ Price: 9.99                          │
//! │ Total Price: 29.97                   │
//! │ Purchase Date: 2024-03-01            │
//! └──────────────────────────────────────┘
//! ```
//!
//! Rendering is pure: the same order, customer and snapshot always produce
//! the same bytes. The generation timestamp only appears in the file name,
//! see [`document_file_name`].

use chrono::NaiveDateTime;

use crate::error::RenderFault;
use crate::pdf::{write_document, TextLine};
use crate::types::{Customer, Order, ProductSnapshot};

/// Renders the confirmation document for `order`.
///
/// ## Arguments
/// * `order` - The persisted order (its price is the reservation snapshot)
/// * `customer` - The customer the order belongs to
/// * `product` - The snapshot returned by the reservation
///
/// ## Returns
/// PDF bytes, or a [`RenderFault`] when the inputs do not describe one order.
///
/// ## Example
/// ```rust,ignore
/// let pdf = confirmation::render(&order, &customer, &snapshot)?;
/// sink.store(generated_at, order.id, &pdf).await?;
/// ```
pub fn render(
    order: &Order,
    customer: &Customer,
    product: &ProductSnapshot,
) -> Result<Vec<u8>, RenderFault> {
    let lines = confirmation_lines(order, customer, product)?;
    Ok(write_document(&lines))
}

/// Plain text of the document, one entry per printed line.
pub fn confirmation_text(
    order: &Order,
    customer: &Customer,
    product: &ProductSnapshot,
) -> Result<Vec<String>, RenderFault> {
    Ok(confirmation_lines(order, customer, product)?
        .into_iter()
        .map(|line| line.text)
        .collect())
}

/// File name for a confirmation generated at `generated_at`.
///
/// The order id keeps two confirmations generated in the same second apart.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use market_core::confirmation::document_file_name;
///
/// let at = NaiveDate::from_ymd_opt(2024, 3, 1)
///     .and_then(|d| d.and_hms_opt(14, 5, 9))
///     .unwrap();
/// assert_eq!(document_file_name(at, 17), "order_20240301_140509_17.pdf");
/// ```
pub fn document_file_name(generated_at: NaiveDateTime, order_id: i64) -> String {
    format!("order_{}_{}.pdf", generated_at.format("%Y%m%d_%H%M%S"), order_id)
}

fn confirmation_lines(
    order: &Order,
    customer: &Customer,
    product: &ProductSnapshot,
) -> Result<Vec<TextLine>, RenderFault> {
    check_inputs(order, customer, product)?;

    Ok(vec![
        TextLine::heading("Customer Details:"),
        TextLine::body(format!("First Name: {}", customer.first_name)),
        TextLine::body(format!("Last Name: {}", customer.last_name)),
        TextLine::body(format!("Email: {}", customer.email.trim())),
        TextLine::heading("Order Details:"),
        TextLine::body(format!("Product Name: {}", product.title)),
        TextLine::body(format!("Product ID: {}", order.product_id)),
        TextLine::body(format!("Quantity: {}", order.quantity)),
        TextLine::body(format!("Price: {}", order.unit_price())),
        TextLine::body(format!("Total Price: {}", order.total())),
        TextLine::body(format!(
            "Purchase Date: {}",
            order.purchase_date.format("%Y-%m-%d")
        )),
    ])
}

fn check_inputs(
    order: &Order,
    customer: &Customer,
    product: &ProductSnapshot,
) -> Result<(), RenderFault> {
    if order.quantity <= 0 {
        return Err(RenderFault::InvalidQuantity(order.quantity));
    }
    if order.product_id != product.product_id {
        return Err(RenderFault::ProductMismatch {
            order_product_id: order.product_id,
            snapshot_product_id: product.product_id,
        });
    }
    if order.customer_id != customer.id {
        return Err(RenderFault::CustomerMismatch {
            order_customer_id: order.customer_id,
            customer_id: customer.id,
        });
    }
    if customer.email.trim().is_empty() {
        return Err(RenderFault::MissingEmail(customer.id));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
