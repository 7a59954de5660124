//! Throughput benchmarks

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use spectrolink_core::{
    ChunkSource, DecoderSession, PacketDecoder, PacketEmitter, SessionConfig, SyntheticSignal,
};
use std::hint::black_box;

fn stream(packets: u64) -> Vec<u8> {
    let signal = SyntheticSignal::default();
    (0..packets)
        .flat_map(|i| signal.render(i).into_bytes())
        .collect()
}

fn decoder_benchmark(c: &mut Criterion) {
    let data = stream(4);

    let mut group = c.benchmark_group("decoder");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk in [64usize, 1024, 16 * 1024] {
        group.bench_function(format!("feed_chunk_{}", chunk), |b| {
            b.iter(|| {
                let mut decoder = PacketDecoder::default();
                let mut packets = 0;
                for piece in black_box(&data).chunks(chunk) {
                    packets += decoder.feed_packets(piece).len();
                }
                black_box(packets)
            })
        });
    }

    group.finish();
}

fn simulator_benchmark(c: &mut Criterion) {
    let signal = SyntheticSignal::default();

    c.bench_function("simulator_render", |b| {
        b.iter(|| black_box(signal.render(black_box(0))))
    });
}

fn session_benchmark(c: &mut Criterion) {
    let data = stream(8);
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(_) => return,
    };

    let mut group = c.benchmark_group("session");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("replay_to_empty_emitter", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut source = ChunkSource::chunked(&data, 4096);
            let mut decoder = PacketDecoder::default();
            let config = SessionConfig {
                poll_interval_ms: 1,
                ..Default::default()
            };
            let summary = DecoderSession::new(config)
                .run(&mut source, &mut decoder, PacketEmitter::new())
                .await;
            black_box(summary.map(|s| s.packets_emitted).unwrap_or_default())
        })
    });
    group.finish();
}

criterion_group!(benches, decoder_benchmark, simulator_benchmark, session_benchmark);
criterion_main!(benches);
