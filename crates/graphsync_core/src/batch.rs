use std::ops::Range;

/// Largest number of accounts the remote relationship lookup accepts per request.
pub const MAX_LOOKUP_BATCH: usize = 100;

/// Splits `len` items into consecutive index ranges of at most `batch_size`.
///
/// `batch_size` is clamped to `1..=MAX_LOOKUP_BATCH`.
pub fn plan_batches(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    let size = batch_size.clamp(1, MAX_LOOKUP_BATCH);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}
