//! Buffer reallocation policy

/// New capacity for a buffer of `capacity` bytes receiving `needed` bytes.
///
/// `None` means the data fits and the buffer is updated in place. Larger
/// data recreates the buffer at exactly the new size.
pub fn buffer_capacity(capacity: u32, needed: u32) -> Option<u32> {
    (needed > capacity).then_some(needed)
}
