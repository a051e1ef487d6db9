//! # market-backoffice
//!
//! Command line for the shop back-office: catalog and customer maintenance,
//! seeding, order fulfillment, confirmation resends and CSV export.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Application Startup                               │
//! │                                                                         │
//! │  1. Parse Arguments ──────────────────────────────────────────────────► │
//! │     • --config <path>, then one command                                 │
//! │                                                                         │
//! │  2. Initialize Logging ───────────────────────────────────────────────► │
//! │     • tracing-subscriber with env filter, written to stderr             │
//! │     • Default: info,market=debug,sqlx=warn (override with RUST_LOG)     │
//! │                                                                         │
//! │  3. Load Configuration ───────────────────────────────────────────────► │
//! │     • defaults → market.toml → MARKET_* environment                     │
//! │                                                                         │
//! │  4. Connect to Database ──────────────────────────────────────────────► │
//! │     • SQLite with WAL mode, pending migrations applied                  │
//! │                                                                         │
//! │  5. Run Command ──────────────────────────────────────────────────────► │
//! │     • JSON report on stdout                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod commands;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, Invocation, USAGE};
use market_core::OrderRequest;
use market_db::Database;
use market_fulfillment::{
    FileDocumentSink, FulfillmentCoordinator, FulfillmentPorts, MarketConfig, SmtpDispatcher,
};

/// Runs one back-office command.
pub async fn run(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let cli = match Cli::parse(&args) {
        Ok(Invocation::Run(cli)) => cli,
        Ok(Invocation::Help) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(err) => {
            eprintln!("error: {err}\n\n{USAGE}");
            return Err(err.into());
        }
    };

    init_tracing();

    let config = MarketConfig::load(cli.config)?;
    info!(
        database = %config.database.path.display(),
        smtp = %format!("{}:{}", config.mail.smtp_host, config.mail.smtp_port),
        "Configuration loaded"
    );

    let db = Database::new(config.db_config()).await?;

    let report = match cli.command {
        Command::Seed { count } => commands::seed(&db, count).await?,
        Command::Order {
            customer_id,
            product_id,
            quantity,
        } => {
            let coordinator = build_coordinator(&db, &config)?;
            commands::order(
                &coordinator,
                OrderRequest::new(customer_id, product_id, quantity),
            )
            .await
        }
        Command::Resend { limit } => {
            let coordinator = build_coordinator(&db, &config)?;
            let limit = limit.unwrap_or(config.fulfillment.resend_batch_size);
            commands::resend(&coordinator, limit).await?
        }
        Command::Export { kind, path } => commands::export(&db, kind, &path).await?,
        Command::Product(command) => commands::product(&db, command).await?,
        Command::Customer(command) => commands::customer(&db, command).await?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    db.close().await;
    Ok(())
}

fn build_coordinator(
    db: &Database,
    config: &MarketConfig,
) -> Result<FulfillmentCoordinator, Box<dyn std::error::Error>> {
    let ports = FulfillmentPorts::sqlite(
        db,
        Arc::new(FileDocumentSink::new(&config.fulfillment.export_dir)),
        Arc::new(SmtpDispatcher::new(&config.mail)?),
    );

    Ok(FulfillmentCoordinator::new(ports).with_step_timeout(config.step_timeout()))
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=market_fulfillment=trace` - Trace the workflow only
/// - Default: `info,market=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,market=debug,sqlx=warn"));

    // stdout carries the JSON report
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
