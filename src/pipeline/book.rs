use crate::core::ring::RingBuffer;
use crate::core::thread::{pin_to_cpu, promote_to_realtime};
use crate::messages::{BookSnapshot, WireMessage};
use crate::order_book::OrderBook;
use crate::pipeline::Counters;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Hot loop: RB₁ → book → RB₂.
///
/// Owns the dense book array exclusively. A snapshot is taken after every
/// message and offered to the cold ring; the cold path is lossy by design,
/// so a full ring drops the snapshot and counts it.
pub(crate) fn run_book_builder(
    message_ring: Arc<RingBuffer<WireMessage>>,
    snapshot_ring: Arc<RingBuffer<BookSnapshot>>,
    counters: Arc<Counters>,
    shutdown: Arc<AtomicBool>,
    max_symbols: usize,
    cpu: Option<usize>,
    realtime: bool,
) {
    if let Some(core) = cpu {
        if let Err(e) = pin_to_cpu(core) {
            warn!(core, error = %e, "book builder: CPU pin failed");
        }
    }
    if realtime {
        if let Err(e) = promote_to_realtime() {
            warn!(error = %e, "book builder: realtime priority unavailable, continuing at default");
        }
    }

    let mut books: Vec<OrderBook> = (0..max_symbols)
        .map(|i| OrderBook::new(i as u32))
        .collect();

    let mut updates = 0u64;
    let mut skipped = 0u64;

    info!(max_symbols, "book builder worker started");

    loop {
        match message_ring.pop() {
            Some(msg) => {
                let idx = msg.symbol_index as usize;
                if idx >= books.len() {
                    counters.inc_unknown_symbol();
                    skipped += 1;
                    continue;
                }

                books[idx].apply(&msg);
                counters.inc_book_update();
                updates += 1;

                match snapshot_ring.push(books[idx].snapshot()) {
                    Ok(()) => counters.inc_snapshot_published(),
                    Err(_) => counters.inc_snapshot_dropped(),
                }
            }
            None => {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                std::hint::spin_loop();
            }
        }
    }

    let dropped_levels: u64 = books.iter().map(|b| b.dropped_levels()).sum();
    let dropped_orders: u64 = books.iter().map(|b| b.dropped_orders()).sum();
    info!(
        updates,
        skipped, dropped_levels, dropped_orders, "book builder worker stopped"
    );
}
