use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use linkcode::bits::Bits;
use linkcode::ecc::crc::{append_crc, crc32, verify_frame, Crc32};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_crc32(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32");
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for len in [64, 256, 1024, 8192] {
        let data = Bits::random(len, &mut rng);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("table", len), &data, |b, data| {
            b.iter(|| crc32(black_box(data)))
        });
        group.bench_with_input(BenchmarkId::new("bitwise", len), &data, |b, data| {
            b.iter(|| {
                let mut crc = Crc32::new();
                for bit in black_box(data).iter().by_vals() {
                    crc.update_bit(bit);
                }
                crc.finalize()
            })
        });
    }
    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let frame = append_crc(&Bits::random(1024, &mut rng));
    c.bench_function("crc32_verify_frame_1024", |b| {
        b.iter(|| verify_frame(black_box(&frame)).unwrap().is_valid())
    });
}

criterion_group!(benches, bench_crc32, bench_verify);
criterion_main!(benches);
