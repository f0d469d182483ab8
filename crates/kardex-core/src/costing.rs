//! # Costing Engine
//!
//! Weighted-average unit cost, recomputed on every incoming movement.
//!
//! ```text
//!              b · avg  +  q · c
//!   new_avg = ───────────────────        (b = 0  ⇒  new_avg = c)
//!                   b  +  q
//!
//!   b   balance before the entry      q  units received
//!   avg average before the entry      c  unit cost of the receipt
//! ```
//!
//! Exits and adjustments never call into this module: they leave the average
//! where it is and are valued at it.

use crate::money::Money;

/// Average unit cost after receiving `incoming_qty` units at `incoming_cost`.
///
/// The product is computed in `i128` and rounded once to the nearest cent,
/// half away from zero.
///
/// ## Example
/// ```rust
/// use kardex_core::costing::weighted_average_cost;
/// use kardex_core::money::Money;
///
/// // Empty shelf: the receipt sets the average
/// let avg = weighted_average_cost(0, Money::zero(), 10, Money::from_cents(100));
/// assert_eq!(avg.cents(), 100);
///
/// // 10 @ 1.00 on hand, 10 more @ 2.00
/// let avg = weighted_average_cost(10, avg, 10, Money::from_cents(200));
/// assert_eq!(avg.cents(), 150);
/// ```
pub fn weighted_average_cost(
    prior_balance: i64,
    prior_average: Money,
    incoming_qty: i64,
    incoming_cost: Money,
) -> Money {
    if prior_balance <= 0 {
        return incoming_cost;
    }
    if incoming_qty <= 0 {
        return prior_average;
    }

    let numerator = i128::from(prior_balance) * i128::from(prior_average.cents())
        + i128::from(incoming_qty) * i128::from(incoming_cost.cents());
    let denominator = i128::from(prior_balance) + i128::from(incoming_qty);

    // A weighted mean lies between its inputs, so the quotient fits in i64.
    Money::div_round(numerator, denominator).unwrap_or(incoming_cost)
}

/// Value of a movement: `quantity × unit_cost`, or `None` on overflow.
#[inline]
pub fn movement_value(quantity: i64, unit_cost: Money) -> Option<Money> {
    unit_cost.multiply_quantity(quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_receipt_sets_average() {
        let avg = weighted_average_cost(0, Money::from_cents(999), 10, Money::from_cents(100));
        assert_eq!(avg, Money::from_cents(100));
    }

    #[test]
    fn equal_quantities_average_midpoint() {
        let avg = weighted_average_cost(10, Money::from_cents(100), 10, Money::from_cents(200));
        assert_eq!(avg, Money::from_cents(150));
    }

    #[test]
    fn uneven_weights_round_to_nearest_cent() {
        // (10·100 + 3·200) / 13 = 123.07…
        let avg = weighted_average_cost(10, Money::from_cents(100), 3, Money::from_cents(200));
        assert_eq!(avg, Money::from_cents(123));

        // (1·100 + 1·101) / 2 = 100.5 → 101
        let avg = weighted_average_cost(1, Money::from_cents(100), 1, Money::from_cents(101));
        assert_eq!(avg, Money::from_cents(101));
    }

    #[test]
    fn receipt_at_current_average_keeps_it() {
        let avg = weighted_average_cost(37, Money::from_cents(412), 5, Money::from_cents(412));
        assert_eq!(avg, Money::from_cents(412));
    }

    #[test]
    fn huge_balances_do_not_overflow() {
        let avg = weighted_average_cost(
            i64::MAX / 2,
            Money::from_cents(1_000_000),
            i64::MAX / 2,
            Money::from_cents(3_000_000),
        );
        assert_eq!(avg, Money::from_cents(2_000_000));
    }

    #[test]
    fn movement_value_multiplies() {
        assert_eq!(movement_value(5, Money::from_cents(150)), Some(Money::from_cents(750)));
        assert_eq!(movement_value(1_000_000, Money::from_cents(10_000_000_000_000)), None);
    }

    proptest! {
        /// The new average always lies between the old average and the
        /// receipt cost.
        #[test]
        fn average_stays_between_inputs(
            balance in 0i64..100_000,
            avg in 0i64..1_000_000,
            qty in 1i64..100_000,
            cost in 0i64..1_000_000,
        ) {
            let new_avg = weighted_average_cost(
                balance,
                Money::from_cents(avg),
                qty,
                Money::from_cents(cost),
            )
            .cents();

            let (lo, hi) = if balance == 0 { (cost, cost) } else { (avg.min(cost), avg.max(cost)) };
            prop_assert!(new_avg >= lo && new_avg <= hi);
        }
    }
}
