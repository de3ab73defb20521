//! Splits repeated battles into contiguous batches, one per worker, so each
//! batch can run on its own generator stream.

/// Split `total` runs into up to `num_batches` ranges `[start, end)`.
/// Earlier batches take the remainder, one extra run each.
///
/// # Example
/// ```
/// # use fleetforge::parallel::batch_ranges;
/// let ranges = batch_ranges(10, 3);
/// assert_eq!(ranges, vec![(0, 4), (4, 7), (7, 10)]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut start = 0;
    (0..num_batches)
        .map(|i| {
            let end = start + base + usize::from(i < remainder);
            let range = (start, end);
            start = end;
            range
        })
        .collect()
}
