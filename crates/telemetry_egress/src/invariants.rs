//! Debug assertion macros for pipeline invariants.
//!
//! Only active in debug builds (`debug_assert!`), so there is zero overhead in
//! release builds.

// =============================================================================
// Centroid count conservation
// =============================================================================

/// Assert that reconstructed centroids carry every positive bucket count.
///
/// **Invariant**: `Σ centroid.count == Σ max(bucket_count, 0)`
///
/// Used in: `reconstruct_centroids()` before returning
macro_rules! debug_assert_centroid_total {
    ($centroids:expr, $positive_total:expr) => {
        debug_assert_eq!(
            $centroids.iter().map(|c| c.count).sum::<u64>(),
            $positive_total as u64,
            "centroid counts do not add up to the positive bucket counts"
        )
    };
}

// =============================================================================
// Capacity bound
// =============================================================================

/// Assert that outstanding commands never exceed capacity.
///
/// **Invariant**: `0 ≤ outstanding ≤ capacity`
///
/// Used in: `WorkerQueue::try_dispatch()` after reserving a slot
macro_rules! debug_assert_within_capacity {
    ($outstanding:expr, $capacity:expr) => {
        debug_assert!(
            $outstanding <= $capacity,
            "outstanding commands {} exceed capacity {}",
            $outstanding,
            $capacity
        )
    };
}

// =============================================================================
// Completion accounting
// =============================================================================

/// Assert that a completion had a matching acceptance.
///
/// **Invariant**: `completed ≤ accepted`, i.e. the outstanding count never
/// underflows.
///
/// Used in: `WorkerQueue::complete_one()`
macro_rules! debug_assert_had_outstanding {
    ($previous:expr) => {
        debug_assert!(
            $previous > 0,
            "command completed with no outstanding commands recorded"
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_centroid_total;
pub(crate) use debug_assert_had_outstanding;
pub(crate) use debug_assert_within_capacity;
