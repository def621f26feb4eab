//! Proptest strategies for limits and thresholds.

use proptest::prelude::*;

/// A valid `(warning, critical)` percent pair
pub fn threshold_pair_strategy() -> impl Strategy<Value = (u8, u8)> {
    (1u8..=100).prop_flat_map(|critical| (1u8..=critical, Just(critical)))
}

/// A positive ceiling small enough to keep counts cheap
pub fn ceiling_strategy() -> impl Strategy<Value = u64> {
    1u64..=200
}

/// Non-negative instance values
pub fn instance_values_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..=1_000, 0..20)
}
