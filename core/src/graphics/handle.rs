//! Resource handles
//!
//! A [`ResourceId`] names a render-device-owned object before the render
//! thread has created it. The logic thread allocates ids up front and refers
//! to them in later commands, so it never waits for the device.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier of a render-device-owned object.
///
/// Always non-zero; "not yet created" is expressed as `Option<ResourceId>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(NonZeroU64);

impl ResourceId {
    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Builds an id from a raw value, `None` for zero.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-device handle allocator.
///
/// Ids start at 1, increase monotonically and are never reused while the
/// allocator lives. The counter is its own synchronization point, separate
/// from the command queue lock.
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU64,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn allocate(&self) -> ResourceId {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        // Counter starts at 1 and a u64 does not wrap in practice
        ResourceId(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MAX))
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_first_handle_is_one() {
        let allocator = HandleAllocator::new();
        assert_eq!(allocator.allocate().get(), 1);
        assert_eq!(allocator.allocate().get(), 2);
        assert_eq!(allocator.allocated(), 2);
    }

    #[test]
    fn test_zero_is_not_a_handle() {
        assert!(ResourceId::from_raw(0).is_none());
        assert_eq!(ResourceId::from_raw(5).map(ResourceId::get), Some(5));
    }

    #[test]
    fn test_handles_unique_across_threads() {
        let allocator = Arc::new(HandleAllocator::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                thread::spawn(move || (0..1000).map(|_| allocator.allocate()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for worker in workers {
            for id in worker.join().unwrap() {
                assert!(seen.insert(id), "duplicate handle {id}");
            }
        }
        assert_eq!(seen.len(), 4000);
    }

    #[test]
    fn test_allocators_are_independent() {
        let a = HandleAllocator::new();
        let b = HandleAllocator::new();
        a.allocate();
        a.allocate();
        assert_eq!(b.allocate().get(), 1);
    }
}
