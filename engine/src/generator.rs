//! Crash multiplier generation: weighted range sampling with a single-use
//! admin override slot.

use aviator_types::{round2, CrashRangeConfig};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Mutex;

/// Smallest crash value the generator will ever emit. A round that crashed
/// at or below 1.00 could never pay anyone.
const MIN_CRASH: Decimal = dec!(1.01);

pub struct CrashSource {
    ranges: CrashRangeConfig,
    override_slot: Mutex<Option<Decimal>>,
}

impl CrashSource {
    pub fn new(ranges: CrashRangeConfig) -> Self {
        Self {
            ranges,
            override_slot: Mutex::new(None),
        }
    }

    pub fn ranges(&self) -> &CrashRangeConfig {
        &self.ranges
    }

    /// Stages a single-use override for the next round. Returns the value
    /// it replaced, if one was still pending.
    pub fn stage_override(&self, value: Decimal) -> Option<Decimal> {
        let mut slot = self.override_slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.replace(round2(value))
    }

    pub fn override_pending(&self) -> bool {
        self.override_slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// The crash value for a new round. Claims the override slot atomically
    /// if one is staged; otherwise samples a range by weight and a value
    /// uniformly within `[min, max)` at cent granularity. Never returns a
    /// value at or below 1.00.
    pub fn next_value(&self) -> Decimal {
        self.next_value_with(&mut rand::thread_rng())
    }

    pub fn next_value_with<R: Rng>(&self, rng: &mut R) -> Decimal {
        let claimed = self
            .override_slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(value) = claimed {
            tracing::info!("using staged crash override for next round");
            return value.max(MIN_CRASH);
        }

        let ranges = self.ranges.ranges();
        let total = self.ranges.total_weight();
        let mut pick = rng.gen_range(0..total);
        let mut selected = &ranges[ranges.len() - 1];
        for range in ranges {
            let weight = range.weight as u64;
            if pick < weight {
                selected = range;
                break;
            }
            pick -= weight;
        }

        let min_cents = to_cents(selected.min);
        let max_cents = to_cents(selected.max);
        // A band narrower than one cent collapses to its lower bound.
        let cents = if max_cents > min_cents {
            rng.gen_range(min_cents..max_cents)
        } else {
            min_cents
        };
        Decimal::new(cents, 2).max(MIN_CRASH)
    }
}

fn to_cents(value: Decimal) -> i64 {
    (value * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .unwrap_or(i64::MAX)
}
