//! # Guide Repository
//!
//! Dispatch guides, their lines and their history.
//!
//! ## Guide Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. create(NewGuide, actor)     → guide (draft) + lines + `created`     │
//! │  2. update_header()             → only while draft or pending           │
//! │     add/update/remove_item()                                            │
//! │  3. GuideCoordinator            → status changes, stock on completion   │
//! │  4. tracking(code)              → guide + lines + events                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This repository never changes stock. The status helpers at the bottom
//! exist for the coordinator, which calls them inside its own transaction.

use chrono::{DateTime, Utc};
use kardex_core::guide::line_subtotal;
use kardex_core::validation::{
    validate_actor, validate_guide_item, validate_guide_update, validate_new_guide,
};
use kardex_core::{
    CoreError, Guide, GuideAction, GuideEvent, GuideItem, GuideItemUpdate, GuideStatus,
    GuideTracking, GuideUpdate, Money, NewGuide, NewGuideItem, ValidationError,
};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult, LedgerResult};
use crate::repository::generate_id;
use crate::repository::product::ProductRepository;

/// Repository for guide database operations.
#[derive(Debug, Clone)]
pub struct GuideRepository {
    pool: SqlitePool,
}

impl GuideRepository {
    pub fn new(pool: SqlitePool) -> Self {
        GuideRepository { pool }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a draft guide with its lines in one transaction.
    ///
    /// ## Errors
    /// - `InvalidInput` for bad fields, unknown products or a duplicate code
    pub async fn create(&self, input: &NewGuide, actor: &str) -> LedgerResult<Guide> {
        validate_new_guide(input)?;
        validate_actor(actor)?;

        let now = Utc::now();
        let guide = Guide {
            id: generate_id(),
            code: input.code.trim().to_string(),
            kind: input.kind,
            status: GuideStatus::Draft,
            counterparty: input.counterparty.clone(),
            origin: input.origin.clone(),
            destination: input.destination.clone(),
            notes: input.notes.clone(),
            created_by: actor.trim().to_string(),
            created_at: now,
            updated_at: now,
            estimated_delivery_at: input.estimated_delivery_at,
            delivered_at: None,
            stock_applied_at: None,
        };

        debug!(
            code = %guide.code,
            kind = %guide.kind,
            lines = input.items.len(),
            "Creating guide"
        );

        let mut tx = self.pool.begin().await?;

        Self::insert_guide(&mut tx, &guide).await?;

        for (idx, item) in input.items.iter().enumerate() {
            Self::ensure_product(&mut tx, &item.product_id).await?;
            let line = build_item(&guide.id, idx as i64 + 1, item, now)?;
            Self::insert_item(&mut tx, &line).await?;
        }

        let event = guide_event(
            &guide.id,
            actor,
            GuideAction::Created,
            None,
            Some(GuideStatus::Draft),
            None,
            now,
        );
        Self::insert_event(&mut tx, &event).await?;

        tx.commit().await?;

        info!(code = %guide.code, id = %guide.id, "Guide created");
        Ok(guide)
    }

    /// Edits the header of a draft or pending guide.
    ///
    /// Fields left `None` keep their value. Code and kind never change.
    pub async fn update_header(
        &self,
        guide_id: &str,
        update: &GuideUpdate,
        actor: &str,
    ) -> LedgerResult<Guide> {
        validate_guide_update(update)?;
        validate_actor(actor)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        Self::claim_editable(&mut tx, guide_id, now).await?;

        sqlx::query(
            r#"
            UPDATE guides SET
                counterparty = COALESCE(?2, counterparty),
                origin = COALESCE(?3, origin),
                destination = COALESCE(?4, destination),
                notes = COALESCE(?5, notes),
                estimated_delivery_at = COALESCE(?6, estimated_delivery_at)
            WHERE id = ?1
            "#,
        )
        .bind(guide_id)
        .bind(update.counterparty.as_deref().map(str::trim))
        .bind(update.origin.as_deref().map(str::trim))
        .bind(update.destination.as_deref().map(str::trim))
        .bind(update.notes.as_deref())
        .bind(update.estimated_delivery_at)
        .execute(&mut *tx)
        .await?;

        let note = update.changed_fields().join(", ");
        let event = guide_event(guide_id, actor, GuideAction::Updated, None, None, Some(note), now);
        Self::insert_event(&mut tx, &event).await?;

        let guide = Self::fetch(&mut *tx, guide_id)
            .await?
            .ok_or_else(|| DbError::not_found("Guide", guide_id))?;

        tx.commit().await?;

        debug!(code = %guide.code, "Guide header updated");
        Ok(guide)
    }

    /// Appends a line to a draft or pending guide.
    ///
    /// Line numbers keep increasing; removed numbers are not reused.
    pub async fn add_item(
        &self,
        guide_id: &str,
        item: &NewGuideItem,
        actor: &str,
    ) -> LedgerResult<GuideItem> {
        validate_guide_item(item)?;
        validate_actor(actor)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let guide = Self::claim_editable(&mut tx, guide_id, now).await?;
        Self::ensure_product(&mut tx, &item.product_id).await?;

        let line_no: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(line_no), 0) + 1 FROM guide_items WHERE guide_id = ?1",
        )
        .bind(guide_id)
        .fetch_one(&mut *tx)
        .await?;

        let line = build_item(guide_id, line_no, item, now)?;
        Self::insert_item(&mut tx, &line).await?;

        let note = format!("line {}: {} x {}", line_no, line.product_id, line.quantity);
        let event =
            guide_event(guide_id, actor, GuideAction::ItemAdded, None, None, Some(note), now);
        Self::insert_event(&mut tx, &event).await?;

        tx.commit().await?;

        debug!(code = %guide.code, line_no = line_no, "Guide line added");
        Ok(line)
    }

    /// Changes quantity, price, discount or note of one line while the guide
    /// is draft or pending.
    pub async fn update_item(
        &self,
        guide_id: &str,
        line_no: i64,
        update: &GuideItemUpdate,
        actor: &str,
    ) -> LedgerResult<GuideItem> {
        validate_actor(actor)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let guide = Self::claim_editable(&mut tx, guide_id, now).await?;

        let current = sqlx::query_as::<_, GuideItem>(
            "SELECT * FROM guide_items WHERE guide_id = ?1 AND line_no = ?2",
        )
        .bind(guide_id)
        .bind(line_no)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Guide line", format!("{}#{}", guide.code, line_no)))?;

        let merged = NewGuideItem {
            product_id: current.product_id.clone(),
            quantity: update.quantity.unwrap_or(current.quantity),
            unit_price_cents: update.unit_price_cents.or(current.unit_price_cents),
            discount_cents: update.discount_cents.unwrap_or(current.discount_cents),
            note: update.note.clone().or_else(|| current.note.clone()),
        };
        validate_guide_item(&merged)?;
        let subtotal = subtotal_of(&merged)?;

        sqlx::query(
            r#"
            UPDATE guide_items SET
                quantity = ?2,
                unit_price_cents = ?3,
                discount_cents = ?4,
                subtotal_cents = ?5,
                note = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&current.id)
        .bind(merged.quantity)
        .bind(merged.unit_price_cents)
        .bind(merged.discount_cents)
        .bind(subtotal.cents())
        .bind(&merged.note)
        .execute(&mut *tx)
        .await?;

        let note = format!(
            "line {}: {} x {} (was {})",
            line_no, current.product_id, merged.quantity, current.quantity
        );
        let event =
            guide_event(guide_id, actor, GuideAction::ItemUpdated, None, None, Some(note), now);
        Self::insert_event(&mut tx, &event).await?;

        tx.commit().await?;

        debug!(code = %guide.code, line_no = line_no, "Guide line updated");
        Ok(GuideItem {
            quantity: merged.quantity,
            unit_price_cents: merged.unit_price_cents,
            discount_cents: merged.discount_cents,
            subtotal_cents: subtotal.cents(),
            note: merged.note,
            ..current
        })
    }

    /// Removes one line from a draft or pending guide.
    pub async fn remove_item(
        &self,
        guide_id: &str,
        line_no: i64,
        actor: &str,
    ) -> LedgerResult<()> {
        validate_actor(actor)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let guide = Self::claim_editable(&mut tx, guide_id, now).await?;

        let result = sqlx::query("DELETE FROM guide_items WHERE guide_id = ?1 AND line_no = ?2")
            .bind(guide_id)
            .bind(line_no)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            let line = format!("{}#{}", guide.code, line_no);
            return Err(DbError::not_found("Guide line", line).into());
        }

        let event = guide_event(
            guide_id,
            actor,
            GuideAction::ItemRemoved,
            None,
            None,
            Some(format!("line {line_no}")),
            now,
        );
        Self::insert_event(&mut tx, &event).await?;

        tx.commit().await?;

        debug!(code = %guide.code, line_no = line_no, "Guide line removed");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Guide>> {
        Self::fetch(&self.pool, id).await
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Guide>> {
        let guide = sqlx::query_as::<_, Guide>("SELECT * FROM guides WHERE code = ?1")
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(guide)
    }

    /// Guides, newest first, optionally in one status.
    pub async fn list(
        &self,
        status: Option<GuideStatus>,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<Guide>> {
        let guides = sqlx::query_as::<_, Guide>(
            r#"
            SELECT * FROM guides
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, code
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(status)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(guides)
    }

    /// Lines of a guide in line order.
    pub async fn items(&self, guide_id: &str) -> DbResult<Vec<GuideItem>> {
        let mut conn = self.pool.acquire().await?;
        Self::items_in(&mut conn, guide_id).await
    }

    /// Status history, oldest first.
    pub async fn history(&self, guide_id: &str) -> DbResult<Vec<GuideEvent>> {
        let events = sqlx::query_as::<_, GuideEvent>(
            "SELECT * FROM guide_events WHERE guide_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(guide_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Guide, lines and history by guide code.
    pub async fn tracking(&self, code: &str) -> DbResult<Option<GuideTracking>> {
        let Some(guide) = self.get_by_code(code).await? else {
            return Ok(None);
        };

        let items = self.items(&guide.id).await?;
        let events = self.history(&guide.id).await?;

        Ok(Some(GuideTracking { guide, items, events }))
    }

    // =========================================================================
    // Transaction-scoped helpers (used by the coordinator)
    // =========================================================================

    pub(crate) async fn fetch<'e, E>(executor: E, id: &str) -> DbResult<Option<Guide>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let guide = sqlx::query_as::<_, Guide>("SELECT * FROM guides WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(guide)
    }

    pub(crate) async fn items_in(
        conn: &mut SqliteConnection,
        guide_id: &str,
    ) -> DbResult<Vec<GuideItem>> {
        let items = sqlx::query_as::<_, GuideItem>(
            "SELECT * FROM guide_items WHERE guide_id = ?1 ORDER BY line_no",
        )
        .bind(guide_id)
        .fetch_all(conn)
        .await?;

        Ok(items)
    }

    /// Moves a guide from `from` to `to`.
    ///
    /// Returns `false` if the guide is no longer in `from`. As the first
    /// write of the transaction this also takes the write lock.
    pub(crate) async fn update_status(
        conn: &mut SqliteConnection,
        id: &str,
        from: GuideStatus,
        to: GuideStatus,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE guides SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Stamps delivery and stock application on a completed guide.
    pub(crate) async fn mark_completed(
        conn: &mut SqliteConnection,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query("UPDATE guides SET delivered_at = ?2, stock_applied_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(conn)
            .await?;

        Ok(())
    }

    pub(crate) async fn insert_event(
        conn: &mut SqliteConnection,
        event: &GuideEvent,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO guide_events (
                id, guide_id, actor, action, from_status, to_status, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&event.id)
        .bind(&event.guide_id)
        .bind(&event.actor)
        .bind(event.action)
        .bind(event.from_status)
        .bind(event.to_status)
        .bind(&event.note)
        .bind(event.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Private helpers
    // =========================================================================

    /// Touches the guide if it may still change; otherwise explains why not.
    async fn claim_editable(
        conn: &mut SqliteConnection,
        id: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<Guide> {
        let result = sqlx::query(
            "UPDATE guides SET updated_at = ?2 WHERE id = ?1 AND status IN ('draft', 'pending')",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let guide = Self::fetch(&mut *conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Guide", id))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::GuideNotEditable {
                guide_code: guide.code,
                status: guide.status,
            }
            .into());
        }

        Ok(guide)
    }

    async fn ensure_product(conn: &mut SqliteConnection, product_id: &str) -> DbResult<()> {
        ProductRepository::fetch(conn, product_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| DbError::not_found("Product", product_id))
    }

    async fn insert_guide(conn: &mut SqliteConnection, guide: &Guide) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO guides (
                id, code, kind, status, counterparty, origin, destination, notes,
                created_by, created_at, updated_at, estimated_delivery_at,
                delivered_at, stock_applied_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&guide.id)
        .bind(&guide.code)
        .bind(guide.kind)
        .bind(guide.status)
        .bind(&guide.counterparty)
        .bind(&guide.origin)
        .bind(&guide.destination)
        .bind(&guide.notes)
        .bind(&guide.created_by)
        .bind(guide.created_at)
        .bind(guide.updated_at)
        .bind(guide.estimated_delivery_at)
        .bind(guide.delivered_at)
        .bind(guide.stock_applied_at)
        .execute(conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("guide code", guide.code.clone())
            }
            other => other,
        })?;

        Ok(())
    }

    async fn insert_item(conn: &mut SqliteConnection, item: &GuideItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO guide_items (
                id, guide_id, line_no, product_id, quantity, unit_price_cents,
                discount_cents, subtotal_cents, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.guide_id)
        .bind(item.line_no)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.discount_cents)
        .bind(item.subtotal_cents)
        .bind(&item.note)
        .bind(item.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}

fn subtotal_of(item: &NewGuideItem) -> Result<Money, ValidationError> {
    line_subtotal(
        item.quantity,
        item.unit_price_cents.map(Money::from_cents),
        Money::from_cents(item.discount_cents),
    )
    .ok_or_else(|| ValidationError::OutOfRange {
        field: "subtotal".to_string(),
        min: 0,
        max: i64::MAX,
    })
}

fn build_item(
    guide_id: &str,
    line_no: i64,
    item: &NewGuideItem,
    now: DateTime<Utc>,
) -> Result<GuideItem, ValidationError> {
    let subtotal = subtotal_of(item)?;

    Ok(GuideItem {
        id: generate_id(),
        guide_id: guide_id.to_string(),
        line_no,
        product_id: item.product_id.trim().to_string(),
        quantity: item.quantity,
        unit_price_cents: item.unit_price_cents,
        discount_cents: item.discount_cents,
        subtotal_cents: subtotal.cents(),
        note: item.note.clone(),
        created_at: now,
    })
}

/// Builds a history row for `guide_id`.
pub(crate) fn guide_event(
    guide_id: &str,
    actor: &str,
    action: GuideAction,
    from_status: Option<GuideStatus>,
    to_status: Option<GuideStatus>,
    note: Option<String>,
    now: DateTime<Utc>,
) -> GuideEvent {
    GuideEvent {
        id: generate_id(),
        guide_id: guide_id.to_string(),
        actor: actor.trim().to_string(),
        action,
        from_status,
        to_status,
        note,
        created_at: now,
    }
}
