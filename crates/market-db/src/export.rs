//! # CSV Export
//!
//! Writes products, customers or orders to a CSV file. The row shape comes
//! from each entity's [`CsvExportable`] impl, so this module never needs to
//! know which entity it is writing.

use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use market_core::{CsvExportable, ValidationError};

/// Which table to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Products,
    Customers,
    Orders,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Products => "products",
            ExportKind::Customers => "customers",
            ExportKind::Orders => "orders",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "products" | "product" => Ok(ExportKind::Products),
            "customers" | "customer" => Ok(ExportKind::Customers),
            "orders" | "order" => Ok(ExportKind::Orders),
            other => Err(DbError::Invalid(ValidationError::InvalidFormat {
                field: "export kind".to_string(),
                reason: format!("'{other}' is not one of products, customers, orders"),
            })),
        }
    }
}

/// Writes a header row followed by one record per item.
pub fn write_csv<T: CsvExportable, W: Write>(rows: &[T], writer: W) -> DbResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(T::headers())?;
    for row in rows {
        csv_writer.write_record(row.record())?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes `rows` to `path`, creating parent directories as needed.
///
/// ## Returns
/// Number of data rows written.
pub fn export_to_file<T: CsvExportable>(rows: &[T], path: &Path) -> DbResult<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    write_csv(rows, file)?;

    info!(
        entity = T::ENTITY,
        rows = rows.len(),
        path = %path.display(),
        "CSV export written"
    );
    Ok(rows.len())
}

impl Database {
    /// Exports one table to a CSV file.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let rows = db.export(ExportKind::Orders, Path::new("orders.csv")).await?;
    /// ```
    pub async fn export(&self, kind: ExportKind, path: &Path) -> DbResult<usize> {
        match kind {
            ExportKind::Products => export_to_file(&self.products().list(true).await?, path),
            ExportKind::Customers => export_to_file(&self.customers().list().await?, path),
            ExportKind::Orders => export_to_file(&self.orders().list().await?, path),
        }
    }
}
