use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free min/avg/max accounting in nanoseconds. Written from one hot
/// thread, read from anywhere; readers may observe stale but never torn
/// values.
pub struct LatencyTracker {
    count: AtomicU64,
    sum: AtomicU64,
    min: AtomicU64,
    max: AtomicU64,
}

impl LatencyTracker {
    pub const fn new() -> Self {
        LatencyTracker {
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            min: AtomicU64::new(u64::MAX),
            max: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    pub fn record(&self, nanos: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(nanos, Ordering::Relaxed);

        let mut current_min = self.min.load(Ordering::Relaxed);
        while nanos < current_min {
            match self.min.compare_exchange_weak(
                current_min,
                nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => current_min = x,
            }
        }

        let mut current_max = self.max.load(Ordering::Relaxed);
        while nanos > current_max {
            match self.max.compare_exchange_weak(
                current_max,
                nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => current_max = x,
            }
        }
    }

    pub fn stats(&self) -> LatencyStats {
        let count = self.count.load(Ordering::Relaxed);
        let sum = self.sum.load(Ordering::Relaxed);
        let min = self.min.load(Ordering::Relaxed);
        let max = self.max.load(Ordering::Relaxed);

        LatencyStats {
            count,
            min_ns: if min == u64::MAX { 0 } else { min },
            max_ns: max,
            avg_ns: if count > 0 { sum / count } else { 0 },
        }
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.sum.store(0, Ordering::Relaxed);
        self.min.store(u64::MAX, Ordering::Relaxed);
        self.max.store(0, Ordering::Relaxed);
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub avg_ns: u64,
}

impl std::fmt::Display for LatencyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "count={} min={}ns avg={}ns max={}ns",
            self.count, self.min_ns, self.avg_ns, self.max_ns
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_tracker() {
        let tracker = LatencyTracker::new();

        tracker.record(100);
        tracker.record(200);
        tracker.record(50);

        let stats = tracker.stats();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min_ns, 50);
        assert_eq!(stats.max_ns, 200);
        assert_eq!(stats.avg_ns, 116);
    }

    #[test]
    fn test_latency_tracker_empty() {
        let stats = LatencyTracker::new().stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.min_ns, 0);
        assert_eq!(stats.max_ns, 0);
        assert_eq!(stats.avg_ns, 0);
    }

    #[test]
    fn test_latency_tracker_reset() {
        let tracker = LatencyTracker::new();

        tracker.record(100);
        tracker.reset();

        let stats = tracker.stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.min_ns, 0);
        assert_eq!(stats.max_ns, 0);
    }
}
