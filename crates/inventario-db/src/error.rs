//! # Storage Errors
//!
//! ```text
//! sqlx::Error ──From──► DbError ──► ApiError (status + {"error", "code"})
//! CoreError ───From──► DbError::Domain (rule broken inside a transaction)
//! ```
//!
//! `Busy` and `PoolExhausted` are the two faces of write-lock contention;
//! only the movement log retries on them.

use inventario_core::CoreError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row for the id (sale, ticket, product, event item).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A `UNIQUE` index rejected the write.
    ///
    /// ## When This Occurs
    /// - Staging the same item twice is handled with `INSERT OR IGNORE`,
    ///   so in practice only `ubicaciones_catalogo (nivel, nombre)`
    #[error("{field} already holds '{value}'")]
    UniqueViolation { field: String, value: String },

    /// The database file is locked by another writer.
    ///
    /// ## When This Occurs
    /// - A write outlived `busy_timeout` while another connection (or
    ///   another process on the same file) held the write lock
    ///
    /// The movement log retries on this; checkout does not.
    #[error("Database is busy: {0}")]
    Busy(String),

    /// The file could not be opened or the pool is closed.
    #[error("Cannot open inventory database: {0}")]
    ConnectionFailed(String),

    /// Schema reconciliation failed at startup.
    #[error("Schema reconciliation failed: {0}")]
    SchemaFailed(String),

    /// SQLite rejected a statement.
    #[error("SQL error: {0}")]
    QueryFailed(String),

    /// Commit or rollback did not complete.
    #[error("Could not commit: {0}")]
    TransactionFailed(String),

    /// Every connection stayed busy past the acquire timeout.
    #[error("No free database connection")]
    PoolExhausted,

    /// A domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error("Storage failure: {0}")]
    Internal(String),
}

impl DbError {
    /// `NotFound` for `entity` with `id`.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Returns true when the failure is write-lock contention.
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, DbError::Busy(_) | DbError::PoolExhausted)
    }
}

fn is_lock_message(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("locked") || msg.contains("busy")
}

/// SQLite only reports constraint and lock failures through the message
/// text, so classification reads it.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("row", "?"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: columns.to_string(),
                        value: String::from("?"),
                    }
                } else if is_lock_message(msg) {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed(String::from("pool closed")),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
