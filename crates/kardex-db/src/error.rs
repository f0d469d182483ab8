//! # Database & Ledger Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← categorized: not found, constraint, busy, ...               │
//! │       │                                                                 │
//! │       ▼                         CoreError / ValidationError            │
//! │  LedgerError ◄──────────────────────────┘                              │
//! │       │   InsufficientStock | InvalidTransition | InvalidInput         │
//! │       │   ConcurrencyBusy (retryable) | StorageFailure                 │
//! │       ▼                                                                 │
//! │  HTTP layer maps `code()` to a status                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use kardex_core::{CoreError, GuideStatus, ValidationError};
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// DbError
// =============================================================================

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate product code
    /// - Duplicate guide code
    /// - Two writers racing for the same ledger sequence number
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed (includes CHECK constraint failures).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Another connection holds the write lock past the busy timeout.
    ///
    /// ## When This Occurs
    /// - SQLITE_BUSY / SQLITE_LOCKED after `lock_timeout`
    /// - A deferred transaction lost the race to upgrade its snapshot
    #[error("Database is busy: {0}")]
    Busy(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Input the schema would reject, caught before the statement runs.
    #[error("Invalid data: {0}")]
    Invalid(#[from] ValidationError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Lock contention that goes away if the caller tries again.
    pub fn is_busy(&self) -> bool {
        matches!(self, DbError::Busy(_) | DbError::PoolExhausted)
    }
}

/// SQLite primary result codes (and extended variants) for lock contention.
fn is_busy_code(code: &str) -> bool {
    // 5 SQLITE_BUSY, 6 SQLITE_LOCKED, 261 BUSY_RECOVERY, 517 BUSY_SNAPSHOT,
    // 773 BUSY_TIMEOUT, 262 LOCKED_SHAREDCACHE
    matches!(code, "5" | "6" | "261" | "262" | "517" | "773")
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → busy code? → Busy
///                               message    → Unique / ForeignKey / QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if db_err.code().as_deref().is_some_and(is_busy_code)
                    || msg.contains("database is locked")
                {
                    DbError::Busy(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// LedgerError
// =============================================================================

/// Errors returned by the stock reconciler, the guide coordinator and the
/// adjustment service.
///
/// Every failure leaves stock, ledger and guide status exactly as they were.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An exit or downward adjustment would take the balance below zero.
    #[error("Insufficient stock for {product_code}: available {available}, requested {requested}")]
    InsufficientStock {
        product_code: String,
        available: i64,
        requested: i64,
    },

    /// The guide lifecycle does not allow this move.
    #[error("Guide {guide_code} cannot move from {from} to {to}")]
    InvalidTransition {
        guide_code: String,
        from: GuideStatus,
        to: GuideStatus,
    },

    /// Rejected before any lock was taken (or the target does not exist).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Lock not acquired within the bounded wait. Safe to retry.
    #[error("Stock is locked by another writer (gave up after {attempts} attempt(s))")]
    ConcurrencyBusy { attempts: u32 },

    /// Persistence failed; the transaction was rolled back.
    #[error("Storage failure: {0}")]
    StorageFailure(#[source] DbError),
}

/// Machine-readable error codes for the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// 409
    InsufficientStock,
    /// 409
    InvalidTransition,
    /// 400 / 404
    InvalidInput,
    /// 503, retry
    ConcurrencyBusy,
    /// 500
    StorageFailure,
}

impl LedgerError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        LedgerError::InvalidInput(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrencyBusy { .. })
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            LedgerError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            LedgerError::InvalidInput(_) => ErrorCode::InvalidInput,
            LedgerError::ConcurrencyBusy { .. } => ErrorCode::ConcurrencyBusy,
            LedgerError::StorageFailure(_) => ErrorCode::StorageFailure,
        }
    }
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            e if e.is_busy() => LedgerError::ConcurrencyBusy { attempts: 1 },
            DbError::NotFound { entity, id } => {
                LedgerError::InvalidInput(format!("{entity} not found: {id}"))
            }
            DbError::UniqueViolation { field, value } => {
                LedgerError::InvalidInput(format!("{field} '{value}' already exists"))
            }
            DbError::ForeignKeyViolation { message } => {
                LedgerError::InvalidInput(format!("Invalid reference: {message}"))
            }
            DbError::Invalid(e) => LedgerError::InvalidInput(e.to_string()),
            other => LedgerError::StorageFailure(other),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                product_code,
                available,
                requested,
            } => LedgerError::InsufficientStock {
                product_code,
                available,
                requested,
            },
            CoreError::InvalidTransition {
                guide_code,
                from,
                to,
            } => LedgerError::InvalidTransition {
                guide_code,
                from,
                to,
            },
            CoreError::Validation(e) => LedgerError::InvalidInput(e.to_string()),
            other => LedgerError::InvalidInput(other.to_string()),
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::InvalidInput(err.to_string())
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_and_pool_timeouts_are_retryable() {
        let err: LedgerError = DbError::Busy("database is locked".to_string()).into();
        assert!(err.is_retryable());
        assert_eq!(err.code(), ErrorCode::ConcurrencyBusy);

        let err: LedgerError = DbError::PoolExhausted.into();
        assert!(err.is_retryable());
    }

    #[test]
    fn missing_rows_are_invalid_input() {
        let err: LedgerError = DbError::not_found("Product", "p-404").into();
        assert!(matches!(err, LedgerError::InvalidInput(ref m) if m == "Product not found: p-404"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn storage_failures_keep_their_source() {
        let err: LedgerError = DbError::QueryFailed("CHECK constraint failed".to_string()).into();
        assert_eq!(err.code(), ErrorCode::StorageFailure);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn core_errors_keep_their_category() {
        let err: LedgerError = CoreError::InsufficientStock {
            product_code: "CEM-42".to_string(),
            available: 5,
            requested: 10,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);

        let err: LedgerError = CoreError::InactiveProduct("CEM-42".to_string()).into();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[test]
    fn error_codes_serialize_screaming() {
        let json = serde_json::to_string(&ErrorCode::ConcurrencyBusy).unwrap();
        assert_eq!(json, "\"CONCURRENCY_BUSY\"");
    }
}
