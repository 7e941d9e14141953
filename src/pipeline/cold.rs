use crate::core::ring::RingBuffer;
use crate::messages::BookSnapshot;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

/// Consumer of the snapshot ring. Failures stay inside the implementation;
/// nothing the sink does may propagate back into the hot loops.
pub trait SnapshotSink: Send {
    fn publish(&mut self, snapshot: &BookSnapshot);
}

/// Cold loop: RB₂ → external sink.
///
/// Runs at default priority and sleeps when idle, so it can never starve a
/// hot worker sharing its core. Loss is acceptable here; the book ring
/// already dropped what this loop never sees.
pub(crate) fn run_cold(
    snapshot_ring: Arc<RingBuffer<BookSnapshot>>,
    mut sink: Box<dyn SnapshotSink>,
    shutdown: Arc<AtomicBool>,
) {
    const IDLE_SLEEP: Duration = Duration::from_millis(1);

    let mut delivered = 0u64;

    info!("cold worker started");

    loop {
        match snapshot_ring.pop() {
            Some(snapshot) => {
                sink.publish(&snapshot);
                delivered += 1;
            }
            None => {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                std::thread::sleep(IDLE_SLEEP);
            }
        }
    }

    info!(delivered, "cold worker stopped");
}
