//! # kardex-core: Pure Inventory Ledger Logic
//!
//! Everything the Kardex engine decides without touching storage: how a
//! movement changes a balance, how weighted-average cost evolves, which guide
//! transitions are legal and what they do to stock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        GDE Kardex Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 HTTP API (guides, products, kardex)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            kardex-db services (reconciler, coordinator)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ pure calls                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kardex-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  costing  │  │  ledger   │  │   guide   │  │   │
//! │  │   │  Product  │  │ weighted  │  │ movement  │  │  status   │  │   │
//! │  │   │  Entry    │  │  average  │  │   plans   │  │  machine  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, LedgerEntry, Guide, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`costing`] - Weighted-average cost
//! - [`ledger`] - Movement planning and ledger chain verification
//! - [`guide`] - Guide lifecycle transitions
//! - [`error`] - Domain error types
//! - [`validation`] - Input rules checked before any lock is taken
//!
//! ## Example Usage
//!
//! ```rust
//! use kardex_core::costing::weighted_average_cost;
//! use kardex_core::money::Money;
//!
//! // 10 units at 1.00 already on hand, 10 more arrive at 2.00
//! let avg = weighted_average_cost(10, Money::from_cents(100), 10, Money::from_cents(200));
//! assert_eq!(avg.cents(), 150);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod costing;
pub mod error;
pub mod guide;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Document reference written on every manual stock adjustment.
pub const ADJUSTMENT_DOCUMENT_REF: &str = "AJUSTE";

/// Document reference of the opening entry written when a product is
/// created with stock already on hand.
pub const CREATION_DOCUMENT_REF: &str = "CREACION";

/// Document reference of manual transfers out to another location.
pub const TRANSFER_DOCUMENT_REF: &str = "TRANSFERENCIA";

/// Largest quantity a single movement may carry.
///
/// ## Business Reason
/// Catches typos on the scanner/keyboard (an extra zero or two) before they
/// become a ledger entry nobody can delete.
pub const MAX_MOVEMENT_QUANTITY: i64 = 1_000_000;

/// Largest cost or price, in cents, accepted on any input.
///
/// Chosen so that `MAX_MOVEMENT_QUANTITY × MAX_UNIT_COST_CENTS` still fits
/// in an `i64` ledger column.
pub const MAX_UNIT_COST_CENTS: i64 = 100_000_000_000;

/// Reorder threshold given to products created without one.
pub const DEFAULT_MIN_STOCK: i64 = 10;

/// Unit of measure given to products created without one.
pub const DEFAULT_UNIT_OF_MEASURE: &str = "UNIDAD";
