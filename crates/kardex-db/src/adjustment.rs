//! # Adjustment Service
//!
//! Manual stock corrections after a physical count, and manual transfers
//! out of the warehouse.
//!
//! ```text
//! adjust(+5)  ──► entry      5   valued at current average, average unchanged
//! adjust(-3)  ──► adjustment 3   valued at current average
//! adjust(0)   ──► InvalidInput
//!
//! set_stock(40) with stock 37 ──► adjust(+3) under the same lock
//!
//! transfer(8, "Obra Yanahuara") ──► exit 8, "TRANSFERENCIA", "Destino: Obra Yanahuara"
//! ```
//!
//! Every correction is an ordinary ledger entry under document "AJUSTE" with
//! the reason as its note.

use kardex_core::validation::{validate_actor, validate_adjustment, validate_transfer};
use kardex_core::{
    LedgerEntry, MovementKind, MovementRequest, ADJUSTMENT_DOCUMENT_REF, TRANSFER_DOCUMENT_REF,
};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, LedgerError, LedgerResult};
use crate::reconciler::StockReconciler;
use crate::repository::product::ProductRepository;

#[derive(Debug, Clone)]
pub struct AdjustmentService {
    pool: SqlitePool,
}

impl AdjustmentService {
    pub fn new(pool: SqlitePool) -> Self {
        AdjustmentService { pool }
    }

    /// Applies a signed correction to a product's stock.
    ///
    /// ## Errors
    /// - `InvalidInput`: zero delta, missing reason or actor, unknown product
    /// - `InsufficientStock`: a negative delta larger than the balance
    pub async fn adjust(
        &self,
        product_id: &str,
        delta: i64,
        reason: &str,
        actor: &str,
    ) -> LedgerResult<LedgerEntry> {
        validate_adjustment(delta, reason)?;
        validate_actor(actor)?;

        let entry = StockReconciler::new(self.pool.clone())
            .apply_movement(adjustment_request(product_id, delta, reason, actor))
            .await?;

        info!(
            product_id = %product_id,
            delta = delta,
            balance_after = entry.balance_after,
            reason = %reason,
            "Stock adjusted"
        );

        Ok(entry)
    }

    /// Brings a product's stock to `new_total`.
    ///
    /// The difference is computed under the product lock, so a movement
    /// landing in between cannot make the count wrong. Returns `None` when
    /// the stock already matches.
    pub async fn set_stock(
        &self,
        product_id: &str,
        new_total: i64,
        reason: &str,
        actor: &str,
    ) -> LedgerResult<Option<LedgerEntry>> {
        if new_total < 0 {
            return Err(LedgerError::invalid_input("new stock total cannot be negative"));
        }
        validate_actor(actor)?;

        let mut tx = self.pool.begin().await?;

        if !ProductRepository::lock(&mut tx, product_id).await? {
            return Err(DbError::not_found("Product", product_id).into());
        }
        let product = ProductRepository::fetch(&mut *tx, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let delta = new_total - product.stock;
        if delta == 0 {
            debug!(code = %product.code, stock = product.stock, "Stock already at counted total");
            return Ok(None);
        }
        validate_adjustment(delta, reason)?;

        let entry = StockReconciler::apply_in_transaction(
            &mut tx,
            &adjustment_request(product_id, delta, reason, actor),
        )
        .await?;

        tx.commit().await?;

        info!(
            code = %product.code,
            from = product.stock,
            to = new_total,
            reason = %reason,
            "Stock set to counted total"
        );

        Ok(Some(entry))
    }

    /// Moves `quantity` units out to another location.
    ///
    /// Recorded as an `exit` under document "TRANSFERENCIA" with the
    /// destination as its reference. The receiving side is not tracked here.
    ///
    /// ## Errors
    /// - `InvalidInput`: bad quantity, empty destination or actor, unknown product
    /// - `InsufficientStock`: more than the balance
    pub async fn transfer(
        &self,
        product_id: &str,
        quantity: i64,
        destination: &str,
        actor: &str,
        note: Option<&str>,
    ) -> LedgerResult<LedgerEntry> {
        validate_transfer(quantity, destination)?;
        validate_actor(actor)?;

        let mut req = MovementRequest::new(product_id, MovementKind::Exit, quantity)
            .document_ref(TRANSFER_DOCUMENT_REF)
            .reference(format!("Destino: {}", destination.trim()))
            .actor(actor);
        if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
            req = req.note(note);
        }

        let entry = StockReconciler::new(self.pool.clone()).apply_movement(req).await?;

        info!(
            product_id = %product_id,
            quantity = quantity,
            destination = %destination.trim(),
            balance_after = entry.balance_after,
            "Stock transferred out"
        );

        Ok(entry)
    }
}

fn adjustment_request(product_id: &str, delta: i64, reason: &str, actor: &str) -> MovementRequest {
    let kind = if delta > 0 {
        MovementKind::Entry
    } else {
        MovementKind::Adjustment
    };

    MovementRequest::new(product_id, kind, delta.abs())
        .document_ref(ADJUSTMENT_DOCUMENT_REF)
        .actor(actor)
        .note(reason.trim())
}

// =============================================================================
// Unit Tests
// =============================================================================
