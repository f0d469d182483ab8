//! # Ledger Arithmetic
//!
//! Pure side of the stock reconciler: given the locked balance and average
//! cost of a product, work out what one movement does to them, and check
//! that a stored ledger still adds up.
//!
//! ```text
//!  locked product row            plan_movement()              ledger row
//! ┌──────────────────┐     ┌──────────────────────────┐     ┌──────────────┐
//! │ stock      = 20  │────►│ exit 5                   │────►│ before  20   │
//! │ avg cost   = 150 │     │ 5 ≤ 20 ✓                 │     │ after   15   │
//! └──────────────────┘     │ unit cost = avg = 150    │     │ unit    150  │
//!                          │ avg after = 150          │     │ avg     150  │
//!                          └──────────────────────────┘     └──────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::costing::{movement_value, weighted_average_cost};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{LedgerEntry, MovementKind, MovementRequest};

// =============================================================================
// Movement Planning
// =============================================================================

/// The outcome of one movement, computed before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementPlan {
    pub kind: MovementKind,
    pub quantity: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    /// Cost the movement is valued at.
    pub unit_cost: Money,
    /// Product average cost once the movement lands.
    pub average_cost_after: Money,
    pub total_value: Money,
}

impl MovementPlan {
    /// Turns the plan into the ledger row that records it.
    pub fn into_entry(
        self,
        id: String,
        sequence: i64,
        req: &MovementRequest,
        created_at: DateTime<Utc>,
    ) -> LedgerEntry {
        LedgerEntry {
            id,
            product_id: req.product_id.clone(),
            sequence,
            kind: self.kind,
            document_ref: req.document_ref.trim().to_string(),
            reference: req.reference.clone(),
            quantity: self.quantity,
            balance_before: self.balance_before,
            balance_after: self.balance_after,
            unit_cost_cents: self.unit_cost.cents(),
            average_cost_cents: self.average_cost_after.cents(),
            total_value_cents: self.total_value.cents(),
            actor: req.actor.trim().to_string(),
            note: req.note.clone(),
            created_at,
        }
    }
}

/// Plans one movement against a locked balance.
///
/// ## Rules
/// - `entry`: balance grows, average cost is recomputed with the incoming
///   cost (or stays put when no cost is given)
/// - `exit` / `adjustment`: balance shrinks, never below zero; valued at the
///   current average, which does not change
///
/// ## Errors
/// - [`CoreError::InsufficientStock`] when an outbound quantity exceeds the
///   balance
/// - [`CoreError::Validation`] when the resulting balance or the movement's
///   value would overflow
///
/// ## Example
/// ```rust
/// use kardex_core::ledger::plan_movement;
/// use kardex_core::money::Money;
/// use kardex_core::types::MovementKind;
///
/// let plan = plan_movement(
///     "CEM-42",
///     20,
///     Money::from_cents(150),
///     MovementKind::Exit,
///     5,
///     None,
/// )
/// .unwrap();
/// assert_eq!(plan.balance_after, 15);
/// assert_eq!(plan.unit_cost.cents(), 150);
///
/// let err = plan_movement("CEM-42", 5, Money::zero(), MovementKind::Exit, 10, None);
/// assert!(err.is_err());
/// ```
pub fn plan_movement(
    product_code: &str,
    balance: i64,
    average_cost: Money,
    kind: MovementKind,
    quantity: i64,
    unit_cost: Option<Money>,
) -> CoreResult<MovementPlan> {
    let plan = match kind {
        MovementKind::Entry => {
            let unit_cost = unit_cost.unwrap_or(average_cost);
            let balance_after = balance
                .checked_add(quantity)
                .ok_or_else(|| out_of_range("stock"))?;

            MovementPlan {
                kind,
                quantity,
                balance_before: balance,
                balance_after,
                unit_cost,
                average_cost_after: weighted_average_cost(
                    balance,
                    average_cost,
                    quantity,
                    unit_cost,
                ),
                total_value: movement_value(quantity, unit_cost)
                    .ok_or_else(|| out_of_range("total_value"))?,
            }
        }
        MovementKind::Exit | MovementKind::Adjustment => {
            if quantity > balance {
                return Err(CoreError::InsufficientStock {
                    product_code: product_code.to_string(),
                    available: balance,
                    requested: quantity,
                });
            }

            MovementPlan {
                kind,
                quantity,
                balance_before: balance,
                balance_after: balance - quantity,
                unit_cost: average_cost,
                average_cost_after: average_cost,
                total_value: movement_value(quantity, average_cost)
                    .ok_or_else(|| out_of_range("total_value"))?,
            }
        }
    };

    Ok(plan)
}

fn out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
}

// =============================================================================
// Chain Verification
// =============================================================================

/// What went wrong at one ledger position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ChainBreakKind {
    /// Sequence numbers skip or repeat.
    SequenceGap,
    /// `balance_before` differs from the previous `balance_after`.
    BalanceGap,
    /// `balance_after` is not `balance_before ± quantity`.
    ArithmeticMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChainBreak {
    pub sequence: i64,
    pub kind: ChainBreakKind,
    pub expected: i64,
    pub found: i64,
}

/// Result of checking one product's ledger against its stored balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerAudit {
    pub product_id: String,
    pub entry_count: usize,
    /// Signed sum of every ledger quantity.
    pub ledger_balance: i64,
    /// `balance_after` of the last entry (0 for an empty ledger).
    pub closing_balance: i64,
    /// Stock column of the product row.
    pub product_balance: i64,
    pub chain_breaks: Vec<ChainBreak>,
}

impl LedgerAudit {
    /// Chain intact and both balances agree with the product row.
    pub fn is_consistent(&self) -> bool {
        self.chain_breaks.is_empty()
            && self.ledger_balance == self.product_balance
            && self.closing_balance == self.product_balance
    }
}

/// Walks `entries` (ordered by sequence) and reports every break.
pub fn audit_entries(
    product_id: &str,
    entries: &[LedgerEntry],
    product_balance: i64,
) -> LedgerAudit {
    let mut chain_breaks = Vec::new();
    let mut previous_after = 0;
    let mut ledger_balance = 0i64;

    for (idx, entry) in entries.iter().enumerate() {
        let expected_sequence = idx as i64 + 1;
        if entry.sequence != expected_sequence {
            chain_breaks.push(ChainBreak {
                sequence: entry.sequence,
                kind: ChainBreakKind::SequenceGap,
                expected: expected_sequence,
                found: entry.sequence,
            });
        }

        if entry.balance_before != previous_after {
            chain_breaks.push(ChainBreak {
                sequence: entry.sequence,
                kind: ChainBreakKind::BalanceGap,
                expected: previous_after,
                found: entry.balance_before,
            });
        }

        let expected_after = entry.balance_before + entry.signed_quantity();
        if entry.balance_after != expected_after {
            chain_breaks.push(ChainBreak {
                sequence: entry.sequence,
                kind: ChainBreakKind::ArithmeticMismatch,
                expected: expected_after,
                found: entry.balance_after,
            });
        }

        ledger_balance += entry.signed_quantity();
        previous_after = entry.balance_after;
    }

    LedgerAudit {
        product_id: product_id.to_string(),
        entry_count: entries.len(),
        ledger_balance,
        closing_balance: previous_after,
        product_balance,
        chain_breaks,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
