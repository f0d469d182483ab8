//! # Ledger Repository
//!
//! The Kardex table: append-only storage plus the read queries built on it.
//!
//! ```text
//! kardex_entries (product CEM-42)
//! ┌─────┬────────┬─────┬────────┬───────┬──────┬──────┐
//! │ seq │ kind   │ qty │ before │ after │ unit │ avg  │
//! ├─────┼────────┼─────┼────────┼───────┼──────┼──────┤
//! │  1  │ entry  │ 10  │    0   │  10   │ 100  │ 100  │
//! │  2  │ entry  │ 10  │   10   │  20   │ 200  │ 150  │
//! │  3  │ exit   │  5  │   20   │  15   │ 150  │ 150  │
//! └─────┴────────┴─────┴────────┴───────┴──────┴──────┘
//!          after(n) == before(n+1), Σ signed qty == products.stock
//! ```
//!
//! Rows are only ever inserted, by the stock reconciler, inside its
//! transaction. Triggers in the schema reject UPDATE and DELETE.

use chrono::{Duration, Utc};
use kardex_core::ledger::{audit_entries, LedgerAudit};
use kardex_core::{
    LedgerEntry, LedgerFilter, LedgerOrder, LedgerSummary, MovementKind, MovementReport,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::product::ProductRepository;

/// Repository for Kardex reads.
///
/// ## Usage
/// ```rust,ignore
/// let ledger = db.ledger();
///
/// let exits = ledger.list(&product_id, &LedgerFilter::default().kind(MovementKind::Exit)).await?;
/// let audit = ledger.audit(&product_id).await?;
/// assert!(audit.is_consistent());
/// ```
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Entries of one product, filtered and ordered by sequence.
    pub async fn list(
        &self,
        product_id: &str,
        filter: &LedgerFilter,
    ) -> DbResult<Vec<LedgerEntry>> {
        debug!(product_id = %product_id, ?filter, "Listing ledger entries");

        let direction = match filter.order {
            LedgerOrder::OldestFirst => "ASC",
            LedgerOrder::NewestFirst => "DESC",
        };

        let sql = format!(
            r#"
            SELECT * FROM kardex_entries
            WHERE product_id = ?1
              AND (?2 IS NULL OR kind = ?2)
              AND (?3 IS NULL OR document_ref = ?3)
              AND (?4 IS NULL OR created_at >= ?4)
              AND (?5 IS NULL OR created_at <= ?5)
            ORDER BY sequence {direction}
            LIMIT ?6 OFFSET ?7
            "#
        );

        let entries = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(product_id)
            .bind(filter.kind)
            .bind(filter.document_ref.as_deref())
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.limit.map(i64::from).unwrap_or(-1))
            .bind(i64::from(filter.offset))
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Every entry written under one document (a guide code, "AJUSTE", ...),
    /// in write order.
    pub async fn entries_for_document(&self, document_ref: &str) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            "SELECT * FROM kardex_entries WHERE document_ref = ?1 ORDER BY rowid",
        )
        .bind(document_ref)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Movement totals. `product_id = None` covers the whole warehouse.
    ///
    /// Offset, limit and order in `filter` are ignored.
    pub async fn summary(
        &self,
        product_id: Option<&str>,
        filter: &LedgerFilter,
    ) -> DbResult<LedgerSummary> {
        let (total, entries, exits, adjustments): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN kind = 'entry' THEN quantity ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN kind = 'exit' THEN quantity ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN kind = 'adjustment' THEN quantity ELSE 0 END), 0)
            FROM kardex_entries
            WHERE (?1 IS NULL OR product_id = ?1)
              AND (?2 IS NULL OR kind = ?2)
              AND (?3 IS NULL OR document_ref = ?3)
              AND (?4 IS NULL OR created_at >= ?4)
              AND (?5 IS NULL OR created_at <= ?5)
            "#,
        )
        .bind(product_id)
        .bind(filter.kind)
        .bind(filter.document_ref.as_deref())
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await?;

        Ok(LedgerSummary {
            total_movements: total,
            total_entries: entries,
            total_exits: exits,
            total_adjustments: adjustments,
            net_change: entries - exits - adjustments,
        })
    }

    /// Movements of one product over the last `days` days.
    pub async fn movement_report(&self, product_id: &str, days: u32) -> DbResult<MovementReport> {
        let product = ProductRepository::fetch(&self.pool, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let filter = LedgerFilter::default().since(Utc::now() - Duration::days(i64::from(days)));
        let movements = self.list(product_id, &filter).await?;
        let summary = self.summary(Some(product_id), &filter).await?;

        Ok(MovementReport {
            product,
            period_days: days,
            summary,
            movements,
        })
    }

    /// Signed sum of a product's ledger quantities.
    pub async fn signed_total(&self, product_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(CASE WHEN kind = ?2 THEN quantity ELSE -quantity END), 0)
            FROM kardex_entries
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .bind(MovementKind::Entry)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Re-checks a product's chain and compares it with the stored stock.
    pub async fn audit(&self, product_id: &str) -> DbResult<LedgerAudit> {
        let product = ProductRepository::fetch(&self.pool, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let entries = self.list(product_id, &LedgerFilter::default()).await?;
        Ok(audit_entries(product_id, &entries, product.stock))
    }

    // =========================================================================
    // Transaction-scoped helpers (used by the reconciler)
    // =========================================================================

    /// Next sequence number for a product. Call only while holding the lock.
    pub(crate) async fn next_sequence(
        conn: &mut SqliteConnection,
        product_id: &str,
    ) -> DbResult<i64> {
        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence), 0) + 1 FROM kardex_entries WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(conn)
        .await?;

        Ok(next)
    }

    pub(crate) async fn append(conn: &mut SqliteConnection, entry: &LedgerEntry) -> DbResult<()> {
        debug!(
            product_id = %entry.product_id,
            sequence = entry.sequence,
            kind = %entry.kind,
            quantity = entry.quantity,
            "Appending ledger entry"
        );

        sqlx::query(
            r#"
            INSERT INTO kardex_entries (
                id, product_id, sequence, kind, document_ref, reference,
                quantity, balance_before, balance_after, unit_cost_cents,
                average_cost_cents, total_value_cents, actor, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.product_id)
        .bind(entry.sequence)
        .bind(entry.kind)
        .bind(&entry.document_ref)
        .bind(&entry.reference)
        .bind(entry.quantity)
        .bind(entry.balance_before)
        .bind(entry.balance_after)
        .bind(entry.unit_cost_cents)
        .bind(entry.average_cost_cents)
        .bind(entry.total_value_cents)
        .bind(&entry.actor)
        .bind(&entry.note)
        .bind(entry.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}
