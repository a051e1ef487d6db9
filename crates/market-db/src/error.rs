//! # Storage Errors
//!
//! sqlx failures are sorted by what the caller can do about them.
//!
//! ```text
//! sqlx::Error::Database, kind() ForeignKeyViolation → DbError::ForeignKeyViolation
//!                         kind() CheckViolation      → DbError::CheckViolation
//!                         kind() NotNullViolation    → DbError::CheckViolation
//!                         anything else              → DbError::QueryFailed
//! sqlx::Error::RowNotFound                           → DbError::NotFound
//! sqlx::Error::PoolTimedOut / PoolClosed             → DbError::Unavailable
//! other sqlx errors                                  → DbError::Internal
//! ```

use thiserror::Error;

use market_core::ValidationError;
use sqlx::error::ErrorKind;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row with that id (or, for products, no active row).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A reservation asked for more units than are on hand.
    ///
    /// Nothing was written when this is returned.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    /// An order referenced a customer or product that does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The schema refused a value (negative stock, non-positive quantity).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// Input rejected before reaching SQLite.
    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Could not open database: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// No connection could be had in time, or the pool is closed.
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Writing an export file failed.
    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("Database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::CheckViolation { message }
                    }
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::RowNotFound => DbError::not_found("Row", "?"),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DbError::Unavailable(err.to_string())
            }
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<csv::Error> for DbError {
    fn from(err: csv::Error) -> Self {
        DbError::ExportFailed(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::ExportFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
