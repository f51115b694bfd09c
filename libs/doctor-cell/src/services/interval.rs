//! Half-open interval predicates. `[start, end)` throughout.

/// True when `[a_start, a_end)` and `[b_start, b_end)` share any instant.
/// Touching intervals do not overlap.
pub fn overlaps<T: Ord>(a_start: &T, a_end: &T, b_start: &T, b_end: &T) -> bool {
    a_start < b_end && b_start < a_end
}

/// True when `[inner_start, inner_end)` lies entirely within `[outer_start, outer_end)`.
pub fn contains<T: Ord>(outer_start: &T, outer_end: &T, inner_start: &T, inner_end: &T) -> bool {
    outer_start <= inner_start && inner_end <= outer_end
}
