//! # Stock Reconciler
//!
//! The only code path that changes a product's stock.
//!
//! ## One Movement, One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_movement(req)                                                    │
//! │                                                                         │
//! │  validate(req) ──► product exists & active?        (no lock yet)        │
//! │       │                                                                 │
//! │  BEGIN ─────────────────────────────────────────────────────────┐       │
//! │  │ 1. lock product row          UPDATE ... (bounded wait)       │       │
//! │  │ 2. re-read stock + average   the values the plan is based on │       │
//! │  │ 3. plan_movement()           InsufficientStock? → rollback   │       │
//! │  │ 4. append ledger entry       sequence = last + 1             │       │
//! │  │ 5. write balance             WHERE stock = balance_before    │       │
//! │  COMMIT ◄───────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Any error drops the transaction: nothing from steps 1-5 survives.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guide coordinator and the adjustment service reuse
//! [`StockReconciler::apply_in_transaction`] so that several movements can
//! share one transaction.

use chrono::Utc;
use kardex_core::ledger::plan_movement;
use kardex_core::validation::{validate_actor, validate_movement, validate_new_product};
use kardex_core::{
    CoreError, LedgerEntry, LedgerFilter, Money, MovementKind, MovementRequest, NewProduct,
    Product, StockBalance, CREATION_DOCUMENT_REF, DEFAULT_MIN_STOCK, DEFAULT_UNIT_OF_MEASURE,
};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, LedgerError, LedgerResult};
use crate::repository::generate_id;
use crate::repository::ledger::LedgerRepository;
use crate::repository::product::ProductRepository;

/// A newly created product and, if it arrived with stock, its opening entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedProduct {
    pub product: Product,
    pub opening_entry: Option<LedgerEntry>,
}

/// Applies stock movements atomically.
///
/// ## Usage
/// ```rust,ignore
/// let entry = db
///     .reconciler()
///     .apply_movement(
///         MovementRequest::new(&product_id, MovementKind::Entry, 10)
///             .unit_cost(2_50)
///             .document_ref("GR-0001")
///             .actor("almacen@gde"),
///     )
///     .await?;
///
/// assert_eq!(entry.balance_after, entry.balance_before + 10);
/// ```
#[derive(Debug, Clone)]
pub struct StockReconciler {
    pool: SqlitePool,
}

impl StockReconciler {
    pub fn new(pool: SqlitePool) -> Self {
        StockReconciler { pool }
    }

    /// Applies one movement and returns the ledger entry that records it.
    ///
    /// ## Errors
    /// - `InvalidInput`: bad request, unknown or inactive product
    /// - `InsufficientStock`: outbound quantity exceeds the balance
    /// - `ConcurrencyBusy`: the lock was not acquired within `lock_timeout`
    /// - `StorageFailure`: anything else from the database
    pub async fn apply_movement(&self, req: MovementRequest) -> LedgerResult<LedgerEntry> {
        validate_movement(&req)?;

        // Reject obviously bad targets before queueing for the lock.
        let product = ProductRepository::fetch(&self.pool, &req.product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &req.product_id))?;
        if !product.is_active {
            return Err(CoreError::InactiveProduct(product.code).into());
        }

        let mut tx = self.pool.begin().await?;
        let entry = Self::apply_in_transaction(&mut tx, &req).await?;
        tx.commit().await?;

        info!(
            product_id = %entry.product_id,
            sequence = entry.sequence,
            kind = %entry.kind,
            quantity = entry.quantity,
            balance_after = entry.balance_after,
            document_ref = %entry.document_ref,
            "Stock movement applied"
        );

        Ok(entry)
    }

    /// Applies one movement inside the caller's transaction.
    ///
    /// The request must already be validated. Nothing is committed here; on
    /// error the caller drops its transaction.
    pub(crate) async fn apply_in_transaction(
        conn: &mut SqliteConnection,
        req: &MovementRequest,
    ) -> LedgerResult<LedgerEntry> {
        if !ProductRepository::lock(conn, &req.product_id).await? {
            return Err(DbError::not_found("Product", &req.product_id).into());
        }

        let product = ProductRepository::fetch(&mut *conn, &req.product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &req.product_id))?;
        if !product.is_active {
            return Err(CoreError::InactiveProduct(product.code).into());
        }

        let plan = plan_movement(
            &product.code,
            product.stock,
            product.average_cost(),
            req.kind,
            req.quantity,
            req.unit_cost_cents.map(Money::from_cents),
        )
        .map_err(|e| {
            if let CoreError::InsufficientStock { available, requested, .. } = &e {
                warn!(
                    product_code = %product.code,
                    available = *available,
                    requested = *requested,
                    document_ref = %req.document_ref,
                    "Movement rejected: insufficient stock"
                );
            }
            LedgerError::from(e)
        })?;

        let sequence = LedgerRepository::next_sequence(conn, &product.id).await?;
        let now = Utc::now();
        let entry = plan.into_entry(generate_id(), sequence, req, now);

        LedgerRepository::append(conn, &entry).await?;

        let written = ProductRepository::write_balance(
            conn,
            &product.id,
            entry.balance_before,
            entry.balance_after,
            entry.average_cost_cents,
            now,
        )
        .await?;

        if !written {
            // Only reachable if stock was written outside the row lock.
            return Err(LedgerError::StorageFailure(DbError::TransactionFailed(format!(
                "stock of {} changed during movement",
                product.code
            ))));
        }

        debug!(
            product_code = %product.code,
            sequence = sequence,
            balance_before = entry.balance_before,
            balance_after = entry.balance_after,
            "Movement staged"
        );

        Ok(entry)
    }

    /// Creates a product, recording any opening stock as its first entry.
    ///
    /// The average cost starts at the purchase cost; opening stock is an
    /// `entry` under document "CREACION" valued at that cost.
    pub async fn create_product(
        &self,
        input: NewProduct,
        actor: &str,
    ) -> LedgerResult<CreatedProduct> {
        validate_new_product(&input)?;
        validate_actor(actor)?;

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            unit_of_measure: input
                .unit_of_measure
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .unwrap_or(DEFAULT_UNIT_OF_MEASURE)
                .to_string(),
            stock: 0,
            min_stock: input.min_stock.unwrap_or(DEFAULT_MIN_STOCK),
            max_stock: input.max_stock,
            purchase_cost_cents: input.purchase_cost_cents,
            average_cost_cents: input.purchase_cost_cents,
            sale_price_cents: input.sale_price_cents,
            is_active: true,
            created_by: Some(actor.trim().to_string()),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        ProductRepository::insert(&mut tx, &product).await?;

        let opening_entry = if input.initial_stock > 0 {
            let req = MovementRequest::new(&product.id, MovementKind::Entry, input.initial_stock)
                .unit_cost(input.purchase_cost_cents)
                .document_ref(CREATION_DOCUMENT_REF)
                .actor(actor)
                .note("Stock inicial");
            Some(Self::apply_in_transaction(&mut tx, &req).await?)
        } else {
            None
        };

        let product = ProductRepository::fetch(&mut *tx, &product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))?;

        tx.commit().await?;

        info!(
            code = %product.code,
            id = %product.id,
            opening_stock = product.stock,
            "Product created"
        );

        Ok(CreatedProduct {
            product,
            opening_entry,
        })
    }

    /// Current balance and valuation of one product.
    pub async fn get_balance(&self, product_id: &str) -> LedgerResult<StockBalance> {
        let product = ProductRepository::fetch(&self.pool, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        Ok(product.balance())
    }

    /// Ledger of one product, ordered by sequence.
    pub async fn get_ledger(
        &self,
        product_id: &str,
        filter: &LedgerFilter,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        if ProductRepository::fetch(&self.pool, product_id).await?.is_none() {
            return Err(DbError::not_found("Product", product_id).into());
        }

        let entries = LedgerRepository::new(self.pool.clone())
            .list(product_id, filter)
            .await?;

        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
