//! # kardex-db: Storage and Stock Services for the GDE Kardex
//!
//! SQLite persistence (sqlx) plus the services that are allowed to change
//! stock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        GDE Kardex Data Flow                             │
//! │                                                                         │
//! │  HTTP handler (POST /guides/{id}/complete)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kardex-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐   │   │
//! │  │   │ Coordinator  │──►│  Reconciler  │◄──│ AdjustmentService│   │   │
//! │  │   │ guide status │   │ one movement │   │ physical counts  │   │   │
//! │  │   └──────────────┘   └──────┬───────┘   └──────────────────┘   │   │
//! │  │                             │                                   │   │
//! │  │   ┌──────────────┐   ┌──────▼───────┐   ┌──────────────────┐   │   │
//! │  │   │   Database   │   │ Repositories │   │    Migrations    │   │   │
//! │  │   │   (pool.rs)  │   │ product      │   │    (embedded)    │   │   │
//! │  │   │  SqlitePool  │◄──│ ledger/guide │   │ 001_initial.sql  │   │   │
//! │  │   └──────────────┘   └──────────────┘   └──────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)   ~/.local/share/kardex/kardex.db                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - `DbError` and the public `LedgerError`
//! - [`repository`] - Product, ledger and guide repositories
//! - [`reconciler`] - Stock movements
//! - [`coordinator`] - Guide lifecycle and completion batches
//! - [`adjustment`] - Manual corrections
//! - [`retry`] - Busy retry with exponential backoff
//! - [`config`] - TOML + environment configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kardex_db::{Database, KardexConfig};
//!
//! let config = KardexConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let entry = db.reconciler().apply_movement(request).await?;
//! let guide = db.coordinator().complete(&guide_id, "almacen@gde").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod adjustment;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod reconciler;
pub mod repository;
pub mod retry;

// =============================================================================
// Re-exports
// =============================================================================

pub use adjustment::AdjustmentService;
pub use config::{init_tracing, ConfigError, KardexConfig};
pub use coordinator::GuideCoordinator;
pub use error::{DbError, DbResult, ErrorCode, LedgerError, LedgerResult};
pub use pool::{Database, DbConfig};
pub use reconciler::{CreatedProduct, StockReconciler};
pub use retry::RetryPolicy;

// Repository re-exports for convenience
pub use repository::guide::GuideRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::product::ProductRepository;
