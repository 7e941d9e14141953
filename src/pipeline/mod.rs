pub mod book;
pub mod cold;
pub mod decode;
pub mod pool;

pub use cold::SnapshotSink;
pub use pool::BufferPool;

use crate::core::clock::{Clock, MonotonicClock};
use crate::core::metrics::{LatencyStats, LatencyTracker};
use crate::core::ring::{InvalidCapacity, RingBuffer};
use crate::messages::{BookSnapshot, MAX_SYMBOLS, RawPacket, WireMessage};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, warn};

/// Shared pipeline counters. Relaxed everywhere: readers tolerate staleness,
/// never tearing.
#[derive(Default)]
pub(crate) struct Counters {
    packets_total: AtomicU64,
    packets_rejected: AtomicU64,
    messages_decoded: AtomicU64,
    decode_errors: AtomicU64,
    messages_injected: AtomicU64,
    book_updates: AtomicU64,
    unknown_symbol: AtomicU64,
    snapshots_published: AtomicU64,
    snapshots_dropped: AtomicU64,
}

impl Counters {
    #[inline]
    fn inc_packet(&self) {
        self.packets_total.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    fn inc_packet_rejected(&self) {
        self.packets_rejected.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub(crate) fn inc_decoded(&self) {
        self.messages_decoded.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub(crate) fn inc_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    fn inc_injected(&self) {
        self.messages_injected.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub(crate) fn inc_book_update(&self) {
        self.book_updates.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub(crate) fn inc_unknown_symbol(&self) {
        self.unknown_symbol.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub(crate) fn inc_snapshot_published(&self) {
        self.snapshots_published.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub(crate) fn inc_snapshot_dropped(&self) {
        self.snapshots_dropped.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub raw_ring_capacity: usize,
    pub message_ring_capacity: usize,
    pub snapshot_ring_capacity: usize,
    pub buffer_count: usize,
    pub buffer_size: usize,
    pub max_symbols: usize,
    pub decoder_cpu: Option<usize>,
    pub book_cpu: Option<usize>,
    /// Request the platform real-time class for the two hot workers.
    pub realtime_workers: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            raw_ring_capacity: 1 << 16,
            message_ring_capacity: 1 << 16,
            snapshot_ring_capacity: 1 << 15,
            buffer_count: 1024,
            buffer_size: 2048,
            max_symbols: MAX_SYMBOLS,
            decoder_cpu: None,
            book_cpu: None,
            realtime_workers: true,
        }
    }
}

/// Point-in-time counter view; see [`Pipeline::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStats {
    pub packets_total: u64,
    pub packets_rejected: u64,
    pub messages_decoded: u64,
    pub decode_errors: u64,
    pub messages_injected: u64,
    pub book_updates: u64,
    pub unknown_symbol: u64,
    pub snapshots_published: u64,
    pub snapshots_dropped: u64,
    pub raw_backlog: usize,
    pub message_backlog: usize,
    pub snapshot_backlog: usize,
    pub decode_latency: LatencyStats,
}

struct Worker {
    name: &'static str,
    handle: JoinHandle<()>,
    join_timeout: Duration,
    shutdown: Arc<AtomicBool>,
}

/// The three-stage pipeline: ingress → RB₀ → decode → RB₁ → book → RB₂ →
/// cold.
///
/// SPSC discipline per ring: one ingress thread calls
/// [`publish_raw`](Self::publish_raw); the decode and book workers own the
/// interior; RB₂ has exactly one consumer — the cold worker when a sink is
/// installed, otherwise whoever polls
/// [`try_read_snapshot`](Self::try_read_snapshot). Do not mix the two.
/// [`inject_message`](Self::inject_message) shares the decoder's producer
/// seat on RB₁ and must not race live raw traffic.
pub struct Pipeline {
    config: PipelineConfig,
    raw_ring: Arc<RingBuffer<RawPacket>>,
    message_ring: Arc<RingBuffer<WireMessage>>,
    snapshot_ring: Arc<RingBuffer<BookSnapshot>>,
    pool: Arc<BufferPool>,
    counters: Arc<Counters>,
    decode_latency: Arc<LatencyTracker>,
    clock: Arc<MonotonicClock>,
    sink: Option<Box<dyn SnapshotSink>>,
    workers: Vec<Worker>,
    started: bool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, InvalidCapacity> {
        let raw_ring = Arc::new(RingBuffer::new(config.raw_ring_capacity)?);
        let message_ring = Arc::new(RingBuffer::new(config.message_ring_capacity)?);
        let snapshot_ring = Arc::new(RingBuffer::new(config.snapshot_ring_capacity)?);
        let pool = Arc::new(BufferPool::new(config.buffer_count, config.buffer_size));

        Ok(Pipeline {
            config,
            raw_ring,
            message_ring,
            snapshot_ring,
            pool,
            counters: Arc::new(Counters::default()),
            decode_latency: Arc::new(LatencyTracker::new()),
            clock: Arc::new(MonotonicClock::new()),
            sink: None,
            workers: Vec::new(),
            started: false,
        })
    }

    /// Install the cold-path consumer. With a sink, the cold worker becomes
    /// RB₂'s single reader and `try_read_snapshot` must not be used.
    pub fn with_sink(mut self, sink: Box<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Spawn the workers. Idempotent after the first call.
    pub fn start(&mut self) -> io::Result<()> {
        if self.started {
            return Ok(());
        }

        let decoder_shutdown = Arc::new(AtomicBool::new(false));
        let decoder = {
            let raw_ring = self.raw_ring.clone();
            let message_ring = self.message_ring.clone();
            let pool = self.pool.clone();
            let counters = self.counters.clone();
            let latency = self.decode_latency.clone();
            let clock = self.clock.clone();
            let shutdown = decoder_shutdown.clone();
            let cpu = self.config.decoder_cpu;
            let realtime = self.config.realtime_workers;

            std::thread::Builder::new()
                .name("feed-decoder".into())
                .spawn(move || {
                    decode::run_decoder(
                        raw_ring,
                        message_ring,
                        pool,
                        counters,
                        latency,
                        clock,
                        shutdown,
                        cpu,
                        realtime,
                    )
                })?
        };
        self.workers.push(Worker {
            name: "feed-decoder",
            handle: decoder,
            join_timeout: Duration::from_secs(5),
            shutdown: decoder_shutdown,
        });

        let book_shutdown = Arc::new(AtomicBool::new(false));
        let book = {
            let message_ring = self.message_ring.clone();
            let snapshot_ring = self.snapshot_ring.clone();
            let counters = self.counters.clone();
            let shutdown = book_shutdown.clone();
            let max_symbols = self.config.max_symbols;
            let cpu = self.config.book_cpu;
            let realtime = self.config.realtime_workers;

            std::thread::Builder::new()
                .name("feed-book".into())
                .spawn(move || {
                    book::run_book_builder(
                        message_ring,
                        snapshot_ring,
                        counters,
                        shutdown,
                        max_symbols,
                        cpu,
                        realtime,
                    )
                })?
        };
        self.workers.push(Worker {
            name: "feed-book",
            handle: book,
            join_timeout: Duration::from_secs(5),
            shutdown: book_shutdown,
        });

        if let Some(sink) = self.sink.take() {
            let cold_shutdown = Arc::new(AtomicBool::new(false));
            let snapshot_ring = self.snapshot_ring.clone();
            let shutdown = cold_shutdown.clone();

            let handle = std::thread::Builder::new()
                .name("feed-cold".into())
                .spawn(move || cold::run_cold(snapshot_ring, sink, shutdown))?;
            self.workers.push(Worker {
                name: "feed-cold",
                handle,
                join_timeout: Duration::from_secs(2),
                shutdown: cold_shutdown,
            });
        }

        self.started = true;
        Ok(())
    }

    /// Ingress entry point: copy the payload into its pool slot and enqueue
    /// the descriptor. Returns false when the raw ring is full; the caller
    /// chooses whether to drop, spin, or throttle.
    ///
    /// One ingress thread at a time — this is RB₀'s single producer seat.
    pub fn publish_raw(&self, bytes: &[u8], seq_num: u64, channel_id: u32) -> bool {
        let slot = self.pool.slot_for(seq_num);
        let copied = unsafe { self.pool.write(slot, bytes) };

        let mut flags = 0;
        if copied < bytes.len() {
            flags |= RawPacket::FLAG_TRUNCATED;
        }

        let packet = RawPacket {
            receive_ts: self.clock.now(),
            seq_num,
            channel_id,
            buffer_id: slot,
            offset: 0,
            length: copied as u32,
            flags,
        };

        match self.raw_ring.push(packet) {
            Ok(()) => {
                self.counters.inc_packet();
                true
            }
            Err(_) => {
                self.counters.inc_packet_rejected();
                false
            }
        }
    }

    /// Publish a pre-decoded message straight onto RB₁, bypassing the
    /// decoder. Synthetic feeds and tests only; shares the decoder's
    /// producer seat, so never call it while raw traffic is flowing.
    pub fn inject_message(&self, msg: WireMessage) -> bool {
        match self.message_ring.push(msg) {
            Ok(()) => {
                self.counters.inc_injected();
                true
            }
            Err(_) => false,
        }
    }

    /// Pop one snapshot from RB₂. Only valid without an installed sink.
    pub fn try_read_snapshot(&self) -> Option<BookSnapshot> {
        self.snapshot_ring.pop()
    }

    pub fn pending_snapshot_count(&self) -> usize {
        self.snapshot_ring.available_to_read()
    }

    pub fn stats(&self) -> PipelineStats {
        let c = &self.counters;
        PipelineStats {
            packets_total: c.packets_total.load(Ordering::Relaxed),
            packets_rejected: c.packets_rejected.load(Ordering::Relaxed),
            messages_decoded: c.messages_decoded.load(Ordering::Relaxed),
            decode_errors: c.decode_errors.load(Ordering::Relaxed),
            messages_injected: c.messages_injected.load(Ordering::Relaxed),
            book_updates: c.book_updates.load(Ordering::Relaxed),
            unknown_symbol: c.unknown_symbol.load(Ordering::Relaxed),
            snapshots_published: c.snapshots_published.load(Ordering::Relaxed),
            snapshots_dropped: c.snapshots_dropped.load(Ordering::Relaxed),
            raw_backlog: self.raw_ring.available_to_read(),
            message_backlog: self.message_ring.available_to_read(),
            snapshot_backlog: self.snapshot_ring.available_to_read(),
            decode_latency: self.decode_latency.stats(),
        }
    }

    /// Stop the workers stage by stage in flow order: each worker is
    /// signalled and joined before its downstream neighbor, so every ring is
    /// drained before its consumer goes away. A worker that misses its
    /// deadline is logged and abandoned so resource release can proceed.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }

        for worker in self.workers.drain(..) {
            worker.shutdown.store(true, Ordering::Relaxed);
            join_with_timeout(worker.name, worker.handle, worker.join_timeout);
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn join_with_timeout(name: &str, handle: JoinHandle<()>, timeout: Duration) {
    let deadline = Instant::now() + timeout;

    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!(worker = name, ?timeout, "worker missed shutdown deadline, abandoning");
            return;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    if handle.join().is_err() {
        error!(worker = name, "worker panicked");
    }
}
