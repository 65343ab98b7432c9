use confab::core::decoder::StreamDecoder;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn make_payload(target_len: usize) -> Vec<u8> {
    // Mixed ASCII and multibyte text so chunk boundaries regularly split
    // characters.
    let base = "Streaming café naïveté, överlägsen prose, and the crab 🦀. ";
    let mut payload = String::new();
    while payload.len() < target_len {
        payload.push_str(base);
    }
    payload.into_bytes()
}

fn decode_in_chunks(payload: &[u8], chunk_size: usize) -> usize {
    let mut decoder = StreamDecoder::new();
    let mut total = 0;
    for chunk in payload.chunks(chunk_size) {
        total += decoder.feed(chunk).unwrap().len();
    }
    decoder.finish().unwrap();
    total
}

fn bench_feed(c: &mut Criterion) {
    let payload = make_payload(64 * 1024);

    let mut group = c.benchmark_group("decoder_feed");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for &chunk_size in &[16usize, 256, 4096] {
        group.bench_function(BenchmarkId::new("multibyte", chunk_size), |b| {
            b.iter(|| decode_in_chunks(&payload, chunk_size))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_feed);
criterion_main!(benches);
