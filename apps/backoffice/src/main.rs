//! # Market Back-Office Entry Point
//!
//! ```text
//! market [--config <path>] seed [count]
//! market [--config <path>] order <customer_id> <product_id> <quantity>
//! market [--config <path>] resend [limit]
//! market [--config <path>] export <products|customers|orders> <path>
//! ```
//!
//! The actual setup is in lib.rs so commands can be tested in-process.

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    market_backoffice::run(args).await
}
