//! # Error Types
//!
//! Domain-specific error types for kardex-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kardex-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kardex-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - What callers of the engine see                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → LedgerError → HTTP      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::GuideStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the pure ledger logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product was deactivated and no longer accepts movements.
    #[error("Product {0} is inactive")]
    InactiveProduct(String),

    /// Not enough stock to cover an exit or a downward adjustment.
    ///
    /// ## When This Occurs
    /// - Manual exit larger than the current balance
    /// - Negative adjustment past zero
    /// - Completing an outgoing guide whose line outruns the shelf
    ///
    /// ## User Workflow
    /// ```text
    /// Complete guide GR-0012 (line: 10 × CEM-42)
    ///      │
    ///      ▼
    /// Lock CEM-42, balance = 5
    ///      │
    ///      ▼
    /// InsufficientStock { product_code: "CEM-42", available: 5, requested: 10 }
    ///      │
    ///      ▼
    /// Whole guide rolled back, status stays in_transit
    /// ```
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

    /// Line items are frozen once the guide leaves draft/pending.
    #[error("Guide {guide_code} is {status}, its items can no longer change")]
    GuideNotEditable {
        guide_code: String,
        status: GuideStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any database lock is taken.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, bad characters in a code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
