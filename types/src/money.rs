//! Monetary rounding rules shared by payouts and archival.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to 2 decimal places, half-up (midpoints round away from zero).
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Payout for a winning bet: stake times cash-out multiplier, at 2 decimal
/// places.
pub fn win_payout(amount: Decimal, multiplier: Decimal) -> Decimal {
    round2(amount * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_up() {
        assert_eq!(round2(dec!(0.125)), dec!(0.13));
        assert_eq!(round2(dec!(0.124)), dec!(0.12));
        assert_eq!(round2(dec!(33.335)), dec!(33.34));
        assert_eq!(round2(dec!(2.00)), dec!(2.00));
    }

    #[test]
    fn payout_is_stake_times_multiplier() {
        assert_eq!(win_payout(dec!(1000), dec!(2.0)), dec!(2000.00));
        assert_eq!(win_payout(dec!(500), dec!(1.79)), dec!(895.00));
        // 33.33 * 1.15 = 38.3295 -> half-up at the cent
        assert_eq!(win_payout(dec!(33.33), dec!(1.15)), dec!(38.33));
        assert_eq!(win_payout(dec!(0.10), dec!(1.45)), dec!(0.15));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;
        use rust_decimal::Decimal;

        proptest! {
            #[test]
            fn round2_moves_at_most_half_a_cent(units in -1_000_000i64..1_000_000, scale in 0u32..6) {
                let value = Decimal::new(units, scale);
                let rounded = round2(value);
                prop_assert!(rounded.scale() <= 2);
                prop_assert!((rounded - value).abs() <= Decimal::new(5, 3));
            }
        }
    }
}
