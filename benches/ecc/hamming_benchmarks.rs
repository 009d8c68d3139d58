use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use linkcode::bits::Bits;
use linkcode::ecc::StreamCodec;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_stream_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("hamming_encode");
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let data = Bits::random(1024, &mut rng);

    for k in [4, 11, 26, 57] {
        let codec = StreamCodec::new(k).unwrap();
        group.throughput(Throughput::Elements(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(k), &codec, |b, codec| {
            b.iter(|| codec.encode(black_box(&data)).unwrap())
        });
    }
    group.finish();
}

fn bench_stream_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("hamming_decode");
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let data = Bits::random(1024, &mut rng);

    for k in [4, 11, 26, 57] {
        let codec = StreamCodec::new(k).unwrap();
        let encoded = codec.encode(&data).unwrap();
        let n = codec.code().total_bits();
        let mut noisy = encoded.frame.clone();
        for block in (0..noisy.len() / n).step_by(2) {
            noisy.flip(block * n);
        }

        group.throughput(Throughput::Elements(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("clean", k), &encoded, |b, encoded| {
            b.iter(|| codec.decode(black_box(&encoded.frame), encoded.pad).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("noisy", k), &noisy, |b, noisy| {
            b.iter(|| codec.decode(black_box(noisy), encoded.pad).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_stream_encode, bench_stream_decode);
criterion_main!(benches);
