//! # Guide Fulfillment Coordinator
//!
//! Moves guides through their lifecycle and, on completion, turns every line
//! into a stock movement.
//!
//! ## Completion Batch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  complete(guide)                                                        │
//! │                                                                         │
//! │  plan_transition(in_transit → completed)        InvalidTransition?      │
//! │       │                                                                 │
//! │  BEGIN ───────────────────────────────────────────────────────────┐     │
//! │  │ UPDATE guides SET status = 'completed'                         │     │
//! │  │        WHERE id = ? AND status = 'in_transit'                  │     │
//! │  │   0 rows → someone else got there first → return their result │     │
//! │  │                                                                │     │
//! │  │ line 1 ──► apply_in_transaction (exit / entry)                 │     │
//! │  │ line 2 ──► apply_in_transaction         InsufficientStock?     │     │
//! │  │ ...                                      → whole batch undone  │     │
//! │  │ delivered_at, stock_applied_at, `status_changed` event         │     │
//! │  COMMIT ◄─────────────────────────────────────────────────────────┘     │
//! │                                                                         │
//! │  ConcurrencyBusy anywhere inside → retry the whole thing (backoff)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use kardex_core::guide::{plan_transition, TransitionPlan};
use kardex_core::validation::validate_actor;
use kardex_core::{Guide, GuideAction, GuideStatus, MovementKind, MovementRequest};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, LedgerError, LedgerResult};
use crate::reconciler::StockReconciler;
use crate::repository::guide::{guide_event, GuideRepository};
use crate::retry::RetryPolicy;

/// Drives guide status changes and their stock effects.
///
/// ## Usage
/// ```rust,ignore
/// let coordinator = db.coordinator();
///
/// coordinator.submit(&guide.id, "ventas@gde").await?;
/// coordinator.dispatch(&guide.id, "almacen@gde").await?;
/// let guide = coordinator.complete(&guide.id, "almacen@gde").await?;
/// assert_eq!(guide.status, GuideStatus::Completed);
/// ```
#[derive(Debug, Clone)]
pub struct GuideCoordinator {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl GuideCoordinator {
    pub fn new(pool: SqlitePool, retry: RetryPolicy) -> Self {
        GuideCoordinator { pool, retry }
    }

    /// Moves a guide to `target`.
    ///
    /// Requesting the status the guide already has returns it unchanged.
    ///
    /// ## Errors
    /// - `InvalidInput`: unknown guide, empty actor, inactive product on a line
    /// - `InvalidTransition`: the lifecycle does not allow `current → target`
    /// - `InsufficientStock`: a completion line cannot be served (nothing applied)
    /// - `ConcurrencyBusy`: still locked after every retry
    pub async fn transition_guide(
        &self,
        guide_id: &str,
        target: GuideStatus,
        actor: &str,
        note: Option<&str>,
    ) -> LedgerResult<Guide> {
        validate_actor(actor)?;

        self.retry
            .run("transition_guide", move || self.try_transition(guide_id, target, actor, note))
            .await
    }

    /// `draft → pending`
    pub async fn submit(&self, guide_id: &str, actor: &str) -> LedgerResult<Guide> {
        self.transition_guide(guide_id, GuideStatus::Pending, actor, None).await
    }

    /// `pending → in_transit`
    pub async fn dispatch(&self, guide_id: &str, actor: &str) -> LedgerResult<Guide> {
        self.transition_guide(guide_id, GuideStatus::InTransit, actor, None).await
    }

    /// `in_transit → completed`, applying stock.
    pub async fn complete(&self, guide_id: &str, actor: &str) -> LedgerResult<Guide> {
        self.transition_guide(guide_id, GuideStatus::Completed, actor, None).await
    }

    pub async fn cancel(&self, guide_id: &str, actor: &str, reason: &str) -> LedgerResult<Guide> {
        self.transition_guide(guide_id, GuideStatus::Cancelled, actor, Some(reason)).await
    }

    /// `in_transit → returned`. Stock is untouched; returned goods come back
    /// on a new incoming guide.
    pub async fn mark_returned(
        &self,
        guide_id: &str,
        actor: &str,
        reason: &str,
    ) -> LedgerResult<Guide> {
        self.transition_guide(guide_id, GuideStatus::Returned, actor, Some(reason)).await
    }

    /// One attempt: a single transaction, committed or fully rolled back.
    async fn try_transition(
        &self,
        guide_id: &str,
        target: GuideStatus,
        actor: &str,
        note: Option<&str>,
    ) -> LedgerResult<Guide> {
        let guide = GuideRepository::fetch(&self.pool, guide_id)
            .await?
            .ok_or_else(|| DbError::not_found("Guide", guide_id))?;

        let stock = match plan_transition(&guide.code, guide.kind, guide.status, target)? {
            TransitionPlan::AlreadyThere => {
                debug!(code = %guide.code, status = %target, "Guide already in requested status");
                return Ok(guide);
            }
            TransitionPlan::Move { stock } => stock,
        };

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if !GuideRepository::update_status(&mut tx, guide_id, guide.status, target, now).await? {
            // Lost the race. Release the lock before looking at the winner's result.
            drop(tx);
            return self.resolve_lost_race(guide_id, target).await;
        }

        let mut movements = 0usize;
        if let Some(kind) = stock {
            let items = GuideRepository::items_in(&mut tx, guide_id).await?;

            for item in &items {
                let mut req = MovementRequest::new(&item.product_id, kind, item.quantity)
                    .document_ref(&guide.code)
                    .reference(format!("line {}", item.line_no))
                    .actor(actor);

                if kind == MovementKind::Entry {
                    req.unit_cost_cents = item.unit_price_cents;
                }
                if let Some(note) = &item.note {
                    req = req.note(note.clone());
                }

                StockReconciler::apply_in_transaction(&mut tx, &req).await?;
                movements += 1;
            }

            GuideRepository::mark_completed(&mut tx, guide_id, now).await?;
        }

        let event = guide_event(
            guide_id,
            actor,
            GuideAction::StatusChanged,
            Some(guide.status),
            Some(target),
            note.map(str::to_string),
            now,
        );
        GuideRepository::insert_event(&mut tx, &event).await?;

        tx.commit().await?;

        info!(
            code = %guide.code,
            from = %guide.status,
            to = %target,
            movements = movements,
            "Guide transitioned"
        );

        GuideRepository::fetch(&self.pool, guide_id)
            .await?
            .ok_or_else(|| DbError::not_found("Guide", guide_id).into())
    }

    /// Another writer changed the guide between our read and our update.
    async fn resolve_lost_race(&self, guide_id: &str, target: GuideStatus) -> LedgerResult<Guide> {
        let current = GuideRepository::fetch(&self.pool, guide_id)
            .await?
            .ok_or_else(|| DbError::not_found("Guide", guide_id))?;

        if current.status == target {
            debug!(code = %current.code, status = %target, "Concurrent transition already applied");
            return Ok(current);
        }

        Err(LedgerError::InvalidTransition {
            guide_code: current.code,
            from: current.status,
            to: target,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
