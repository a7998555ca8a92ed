use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Coalescing set of closed `u32` intervals.
///
/// Pending invalidation requests are usually few and adjacent (a consumer
/// patching consecutive words), so ranges are merged on insert.
#[derive(Debug, Default, Clone)]
pub(crate) struct IntervalSet {
    /// start -> inclusive end; disjoint and non-adjacent.
    map: BTreeMap<u32, u32>,
}

impl IntervalSet {
    pub fn add(&mut self, start: u32, end: u32) {
        debug_assert!(start <= end);
        let mut new_start = start;
        let mut new_end = end;
        let mut absorbed = Vec::new();
        for (&s, &e) in &self.map {
            let touches = s <= new_end.saturating_add(1) && e.saturating_add(1) >= new_start;
            if touches {
                new_start = new_start.min(s);
                new_end = new_end.max(e);
                absorbed.push(s);
            } else if s > new_end.saturating_add(1) {
                break;
            }
        }
        for s in absorbed {
            self.map.remove(&s);
        }
        self.map.insert(new_start, new_end);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn ranges(&self) -> Vec<(u32, u32)> {
        self.map.iter().map(|(&s, &e)| (s, e)).collect()
    }
}

/// Invalidation work queued for the next safe point.
#[derive(Debug, Default)]
pub(crate) struct PendingInvalidation {
    pub ranges: IntervalSet,
    pub full_flush: bool,
}

impl PendingInvalidation {
    pub fn is_empty(&self) -> bool {
        !self.full_flush && self.ranges.is_empty()
    }
}

/// State shared between the `Jit` and its cross-thread handles. Everything
/// here only *requests* work; the owner thread mutates the cache at safe
/// points.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub halt_requested: AtomicBool,
    pub pending: Mutex<PendingInvalidation>,
}

/// Cloneable handle that can stop execution from another thread or from a
/// callback invoked by executing code.
#[derive(Clone)]
pub struct HaltHandle {
    pub(crate) shared: Arc<Shared>,
}

impl HaltHandle {
    pub fn halt(&self) {
        self.shared.halt_requested.store(true, Ordering::Release);
    }
}

/// Cloneable handle that queues cache invalidation from another thread.
///
/// Requests are serviced at the next safe point: immediately if the owner
/// is outside `run`, otherwise after the current block execution returns.
#[derive(Clone)]
pub struct InvalidationHandle {
    pub(crate) shared: Arc<Shared>,
}

impl InvalidationHandle {
    pub fn invalidate_range(&self, start: u32, length: usize) {
        if length == 0 {
            return;
        }
        let end = u32::try_from(u64::from(start) + (length as u64 - 1)).unwrap_or(u32::MAX);
        {
            let mut pending = self.shared.pending.lock().unwrap();
            pending.ranges.add(start, end);
        }
        self.shared.halt_requested.store(true, Ordering::Release);
    }

    pub fn clear_cache(&self) {
        self.shared.pending.lock().unwrap().full_flush = true;
        self.shared.halt_requested.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_coalesce_overlapping_and_adjacent() {
        let mut set = IntervalSet::default();
        set.add(0x10, 0x1F);
        set.add(0x30, 0x3F);
        assert_eq!(set.ranges(), vec![(0x10, 0x1F), (0x30, 0x3F)]);

        // Adjacent on the left, overlapping on the right.
        set.add(0x20, 0x32);
        assert_eq!(set.ranges(), vec![(0x10, 0x3F)]);

        set.add(0x00, 0x01);
        assert_eq!(set.ranges(), vec![(0x00, 0x01), (0x10, 0x3F)]);
    }

    #[test]
    fn interval_end_saturates() {
        let mut set = IntervalSet::default();
        set.add(u32::MAX - 1, u32::MAX);
        set.add(0, 0);
        assert_eq!(set.ranges(), vec![(0, 0), (u32::MAX - 1, u32::MAX)]);
    }
}
