#![allow(dead_code)]

use std::collections::BTreeSet;

use proptest::prelude::*;

/// Strategy for sparse, unique, positive record ids
pub fn record_ids_strategy() -> impl Strategy<Value = BTreeSet<i64>> {
    prop::collection::btree_set(1i64..2_000, 0..250)
}

/// Strategy for page sizes, including the degenerate page of one
pub fn batch_size_strategy() -> impl Strategy<Value = u32> {
    1u32..64
}

/// Strategy for worker pool capacities
pub fn concurrency_strategy() -> impl Strategy<Value = usize> {
    1usize..12
}
