use crate::core::types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// The one process-wide dependency of the pipeline. Behind a trait so tests
/// can inject a deterministic source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    #[inline]
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Monotonic nanosecond clock anchored to wall time at construction.
///
/// `Instant` provides monotonicity; the `SystemTime` offset makes the raw
/// values meaningful across processes. Readings are strictly positive.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
    offset_ns: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        let offset_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1);

        MonotonicClock {
            origin: Instant::now(),
            offset_ns,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.offset_ns + self.origin.elapsed().as_nanos() as u64)
    }
}

/// Hand-cranked clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: AtomicU64,
}

impl ManualClock {
    pub fn new(now_ns: u64) -> Self {
        ManualClock {
            now_ns: AtomicU64::new(now_ns),
        }
    }

    pub fn set(&self, now_ns: u64) {
        self.now_ns.store(now_ns, Ordering::Relaxed);
    }

    pub fn advance(&self, delta_ns: u64) {
        self.now_ns.fetch_add(delta_ns, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.now_ns.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();

        let t1 = clock.now();
        let t2 = clock.now();

        assert!(t1.nanos() > 0);
        assert!(t2 >= t1);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1000);
        assert_eq!(clock.now(), Timestamp::from_nanos(1000));

        clock.advance(500);
        assert_eq!(clock.now(), Timestamp::from_nanos(1500));

        clock.set(42);
        assert_eq!(clock.now(), Timestamp::from_nanos(42));
    }
}
