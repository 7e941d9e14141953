use crate::core::clock::MonotonicClock;
use crate::core::metrics::LatencyTracker;
use crate::core::ring::RingBuffer;
use crate::core::thread::{pin_to_cpu, promote_to_realtime};
use crate::decoder::WireDecoder;
use crate::messages::{RawPacket, WireMessage};
use crate::pipeline::pool::BufferPool;
use crate::pipeline::Counters;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Hot loop: RB₀ → decode → RB₁.
///
/// Drains the raw ring after the shutdown flag is set; a publish into a full
/// message ring spins until the book worker (which drains symmetrically)
/// makes room.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_decoder(
    raw_ring: Arc<RingBuffer<RawPacket>>,
    message_ring: Arc<RingBuffer<WireMessage>>,
    pool: Arc<BufferPool>,
    counters: Arc<Counters>,
    latency: Arc<LatencyTracker>,
    clock: Arc<MonotonicClock>,
    shutdown: Arc<AtomicBool>,
    cpu: Option<usize>,
    realtime: bool,
) {
    if let Some(core) = cpu {
        if let Err(e) = pin_to_cpu(core) {
            warn!(core, error = %e, "decoder: CPU pin failed");
        }
    }
    if realtime {
        if let Err(e) = promote_to_realtime() {
            warn!(error = %e, "decoder: realtime priority unavailable, continuing at default");
        }
    }

    let decoder = WireDecoder::with_clock(clock);
    let mut decoded = 0u64;
    let mut rejected = 0u64;

    info!("decoder worker started");

    loop {
        match raw_ring.pop() {
            Some(packet) => {
                if packet.is_truncated() {
                    counters.inc_decode_error();
                    rejected += 1;
                    continue;
                }

                let bytes = unsafe { pool.bytes(packet.buffer_id, packet.offset, packet.length) };

                match decoder.try_decode(bytes, packet.receive_ts, packet.channel_id) {
                    Some(msg) => {
                        latency.record(msg.decode_ts.elapsed_since(packet.receive_ts));

                        let mut pending = msg;
                        loop {
                            match message_ring.push(pending) {
                                Ok(()) => break,
                                Err(back) => {
                                    pending = back;
                                    std::hint::spin_loop();
                                }
                            }
                        }

                        counters.inc_decoded();
                        decoded += 1;
                    }
                    None => {
                        counters.inc_decode_error();
                        rejected += 1;
                    }
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

    info!(decoded, rejected, "decoder worker stopped");
}
