//! # Repository Module
//!
//! Database repositories for the Kardex engine.
//!
//! ## Reads vs. Stock Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Callers ──► db.products() / db.ledger() / db.guides()                 │
//! │              plain reads, non-stock edits, guide drafts                 │
//! │                                                                         │
//! │  Callers ──► db.reconciler() / db.coordinator() / db.adjustments()     │
//! │                    │                                                    │
//! │                    │  open ONE transaction, then call the               │
//! │                    ▼  pub(crate) helpers with `&mut *tx`                │
//! │              ProductRepository::lock / write_balance                    │
//! │              LedgerRepository::next_sequence / append                   │
//! │              GuideRepository::update_status / mark_completed            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog reads and non-stock edits
//! - [`LedgerRepository`](ledger::LedgerRepository) - Kardex queries and audit
//! - [`GuideRepository`](guide::GuideRepository) - Guide drafts, lines and history

use uuid::Uuid;

pub mod guide;
pub mod ledger;
pub mod product;

/// New primary key for any Kardex row.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
