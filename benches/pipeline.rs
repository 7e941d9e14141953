use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use feed_engine::core::types::Timestamp;
use feed_engine::decoder::WireDecoder;
use feed_engine::messages::{MsgKind, Side, WireMessage};
use feed_engine::order_book::OrderBook;
use feed_engine::pipeline::{Pipeline, PipelineConfig};

fn push_stop_bit(out: &mut Vec<u8>, value: u64) {
    if value == 0 {
        out.push(0x80);
        return;
    }

    let mut groups = Vec::new();
    let mut v = value;
    while v > 0 {
        groups.push((v & 0x7F) as u8);
        v >>= 7;
    }
    groups.reverse();
    *groups.last_mut().unwrap() |= 0x80;
    out.extend_from_slice(&groups);
}

fn encode_new_order(seq: u64, security_id: u64, price_units: u64, qty: u64, side: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    out.push(0x1F);
    push_stop_bit(&mut out, 1);
    push_stop_bit(&mut out, seq);
    out.push(b'D');
    push_stop_bit(&mut out, seq);
    push_stop_bit(&mut out, security_id);
    push_stop_bit(&mut out, 0);
    push_stop_bit(&mut out, price_units);
    push_stop_bit(&mut out, qty);
    out.push(side);
    push_stop_bit(&mut out, seq + 1);
    while out.len() < 16 {
        out.push(0x80);
    }
    out
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("new_order_packet", |b| {
        let decoder = WireDecoder::new();
        let packet = encode_new_order(42, 7, 12345, 50, b'1');

        b.iter(|| {
            black_box(decoder.try_decode(
                black_box(&packet),
                Timestamp::from_nanos(1),
                0,
            ))
        });
    });

    group.finish();
}

fn bench_decode_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_apply");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("thousand_packets", |b| {
        let decoder = WireDecoder::new();
        let packets: Vec<Vec<u8>> = (0..1000u64)
            .map(|i| {
                let side = if i % 2 == 0 { b'1' } else { b'2' };
                encode_new_order(i, 7, 10_000 + i % 100, 10, side)
            })
            .collect();

        b.iter(|| {
            let mut book = OrderBook::new(7);

            for (i, packet) in packets.iter().enumerate() {
                let msg = decoder
                    .try_decode(packet, Timestamp::from_nanos(i as u64 + 1), 0)
                    .unwrap();
                book.apply(&msg);
            }

            black_box(book.snapshot());
        });
    });

    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_end_to_end");
    group.throughput(Throughput::Elements(10_000));
    group.sample_size(20);

    group.bench_function("inject_10k", |b| {
        b.iter(|| {
            let config = PipelineConfig {
                raw_ring_capacity: 1 << 12,
                message_ring_capacity: 1 << 12,
                snapshot_ring_capacity: 1 << 12,
                buffer_count: 1 << 13,
                buffer_size: 64,
                max_symbols: 16,
                decoder_cpu: None,
                book_cpu: None,
                realtime_workers: false,
            };

            let mut pipeline = Pipeline::new(config).unwrap();
            pipeline.start().unwrap();

            let msg = WireMessage {
                kind: MsgKind::NewOrder,
                side: Side::Buy,
                symbol_index: 3,
                price: feed_engine::core::types::Price::new(100, 0),
                quantity: feed_engine::core::types::Quantity::from_raw(10),
                order_id: 1,
                ..WireMessage::default()
            };

            for i in 0..10_000u64 {
                let m = WireMessage {
                    order_id: i + 1,
                    ..msg
                };
                while !pipeline.inject_message(m) {
                    std::hint::spin_loop();
                }

                while pipeline.try_read_snapshot().is_some() {}
            }

            pipeline.stop();
            while pipeline.try_read_snapshot().is_some() {}
        });
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_decode_apply, bench_full_pipeline);
criterion_main!(benches);
