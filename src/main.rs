use anyhow::Result;
use clap::Parser;
use feed_engine::pipeline::{Pipeline, PipelineConfig};
use std::time::{Duration, Instant};
use tracing::info;

/// Synthetic feed demo: stop-bit encoded packets driven through the full
/// ingress → decode → book → snapshot path.
#[derive(Parser, Debug)]
#[command(name = "feed-engine", version)]
struct Cli {
    /// Packets to publish.
    #[arg(long, default_value_t = 100_000)]
    packets: u64,

    /// Distinct instruments to spread the feed across.
    #[arg(long, default_value_t = 16)]
    symbols: u64,

    /// Pin the decode / book workers to cores 0 and 1.
    #[arg(long, default_value_t = false)]
    pin: bool,
}

fn push_stop_bit(out: &mut Vec<u8>, value: u64) {
    if value == 0 {
        out.push(0x80);
        return;
    }

    let mut groups = [0u8; 10];
    let mut n = 0;
    let mut v = value;
    while v > 0 {
        groups[n] = (v & 0x7F) as u8;
        v >>= 7;
        n += 1;
    }
    for i in (0..n).rev() {
        let stop = if i == 0 { 0x80 } else { 0 };
        out.push(groups[i] | stop);
    }
}

fn encode_new_order(
    seq: u64,
    security_id: u64,
    price_units: u64,
    qty: u64,
    side: u8,
    order_id: u64,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    out.push(0x1F); // security id, price, qty, side, order id
    push_stop_bit(&mut out, 1); // template id
    push_stop_bit(&mut out, seq);
    out.push(b'D');
    push_stop_bit(&mut out, seq); // sending time
    push_stop_bit(&mut out, security_id);
    push_stop_bit(&mut out, 0); // price exponent: whole units
    push_stop_bit(&mut out, price_units);
    push_stop_bit(&mut out, qty);
    out.push(side);
    push_stop_bit(&mut out, order_id);
    while out.len() < 16 {
        out.push(0x80);
    }
    out
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = PipelineConfig {
        decoder_cpu: cli.pin.then_some(0),
        book_cpu: cli.pin.then_some(1),
        realtime_workers: cli.pin,
        ..PipelineConfig::default()
    };

    let mut pipeline = Pipeline::new(config)?;
    pipeline.start()?;

    info!(packets = cli.packets, symbols = cli.symbols, "publishing synthetic feed");

    let started = Instant::now();
    let mut published = 0u64;
    let mut snapshots = 0u64;
    let mut last_for_symbol_zero = None;

    for seq in 0..cli.packets {
        let security_id = seq % cli.symbols;
        let side = if seq % 2 == 0 { b'1' } else { b'2' };
        let price = 10_000 + (seq % 100) * (u64::from(side == b'2') + 1);
        let packet = encode_new_order(seq, security_id, price, 10 + seq % 50, side, seq + 1);

        while !pipeline.publish_raw(&packet, seq, 0) {
            std::hint::spin_loop();
        }
        published += 1;

        while let Some(snap) = pipeline.try_read_snapshot() {
            if snap.symbol_index == 0 {
                last_for_symbol_zero = Some(snap);
            }
            snapshots += 1;
        }
    }

    // Let the workers drain, collecting the tail of the snapshot stream.
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        while let Some(snap) = pipeline.try_read_snapshot() {
            if snap.symbol_index == 0 {
                last_for_symbol_zero = Some(snap);
            }
            snapshots += 1;
        }

        let stats = pipeline.stats();
        if stats.raw_backlog == 0 && stats.message_backlog == 0 {
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    pipeline.stop();

    while let Some(snap) = pipeline.try_read_snapshot() {
        if snap.symbol_index == 0 {
            last_for_symbol_zero = Some(snap);
        }
        snapshots += 1;
    }

    let elapsed = started.elapsed();
    let stats = pipeline.stats();

    println!("published {published} packets in {elapsed:.2?}");
    println!(
        "decoded {} ({} errors), {} book updates, {} snapshots seen ({} dropped cold)",
        stats.messages_decoded,
        stats.decode_errors,
        stats.book_updates,
        snapshots,
        stats.snapshots_dropped
    );
    println!("decode latency: {}", stats.decode_latency);

    if let Some(snap) = last_for_symbol_zero {
        println!(
            "symbol 0 top of book: bid {} x {}, ask {} x {}, {} updates",
            snap.bid_price, snap.bid_qty, snap.ask_price, snap.ask_qty, snap.update_count
        );
    }

    Ok(())
}
