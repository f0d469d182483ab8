//! # Guide Lifecycle
//!
//! Transition rules for dispatch guides and the stock effect of each move.
//!
//! ```text
//!   draft ──► pending ──► in_transit ──┬──► completed   (stock moves here)
//!     │          │                     └──► returned
//!     └──────────┴──► cancelled
//! ```
//!
//! Transitions are one-way. Only entering `completed` touches stock:
//! outgoing and transfer guides issue one exit per line, incoming guides one
//! entry per line. Returned goods come back on a new incoming guide.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{GuideKind, GuideStatus, MovementKind};

impl GuideStatus {
    /// States reachable from this one in a single step.
    pub const fn next_states(self) -> &'static [GuideStatus] {
        match self {
            GuideStatus::Draft => &[GuideStatus::Pending, GuideStatus::Cancelled],
            GuideStatus::Pending => &[GuideStatus::InTransit, GuideStatus::Cancelled],
            GuideStatus::InTransit => &[GuideStatus::Completed, GuideStatus::Returned],
            GuideStatus::Completed | GuideStatus::Cancelled | GuideStatus::Returned => &[],
        }
    }

    pub fn can_transition_to(self, target: GuideStatus) -> bool {
        self.next_states().contains(&target)
    }

    /// No way out.
    pub fn is_terminal(self) -> bool {
        self.next_states().is_empty()
    }

    /// Line items may still be added or removed.
    pub const fn is_editable(self) -> bool {
        matches!(self, GuideStatus::Draft | GuideStatus::Pending)
    }
}

impl GuideKind {
    /// Movement each line issues when a guide of this kind completes.
    pub const fn completion_movement(self) -> MovementKind {
        match self {
            GuideKind::Incoming => MovementKind::Entry,
            GuideKind::Outgoing | GuideKind::Transfer => MovementKind::Exit,
        }
    }
}

/// What a requested transition amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// The guide is already in the requested state.
    AlreadyThere,
    /// Status changes; `stock` says which movement each line issues, if any.
    Move { stock: Option<MovementKind> },
}

/// Decides whether `from → to` is allowed for a guide of `kind`.
///
/// Requesting the current state is not an error; it resolves to
/// [`TransitionPlan::AlreadyThere`] so repeated completions are harmless.
///
/// ## Example
/// ```rust
/// use kardex_core::guide::{plan_transition, TransitionPlan};
/// use kardex_core::types::{GuideKind, GuideStatus, MovementKind};
///
/// let plan = plan_transition(
///     "GS-1",
///     GuideKind::Outgoing,
///     GuideStatus::InTransit,
///     GuideStatus::Completed,
/// )
/// .unwrap();
/// assert_eq!(plan, TransitionPlan::Move { stock: Some(MovementKind::Exit) });
///
/// let back = plan_transition(
///     "GS-1",
///     GuideKind::Outgoing,
///     GuideStatus::Completed,
///     GuideStatus::Pending,
/// );
/// assert!(back.is_err());
/// ```
pub fn plan_transition(
    guide_code: &str,
    kind: GuideKind,
    from: GuideStatus,
    to: GuideStatus,
) -> CoreResult<TransitionPlan> {
    if from == to {
        return Ok(TransitionPlan::AlreadyThere);
    }

    if !from.can_transition_to(to) {
        return Err(CoreError::InvalidTransition {
            guide_code: guide_code.to_string(),
            from,
            to,
        });
    }

    let stock = (to == GuideStatus::Completed).then(|| kind.completion_movement());
    Ok(TransitionPlan::Move { stock })
}

/// Line subtotal: `unit_price × quantity − discount`, zero for unpriced lines.
///
/// Returns `None` when the gross amount or the discounted total overflows.
pub fn line_subtotal(quantity: i64, unit_price: Option<Money>, discount: Money) -> Option<Money> {
    match unit_price {
        Some(price) => price.multiply_quantity(quantity)?.checked_sub(discount),
        None => Some(Money::zero()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
