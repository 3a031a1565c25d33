use criterion::{criterion_group, criterion_main, Criterion};
use subtagger_core::chunk::chunk_text;
use subtagger_core::tokenizer::normalize;

fn sample_text() -> String {
    "The library catalog assigns controlled vocabulary subjects to documents. \
     Cats purr and dogs bark while librarians index monographs and serials. "
        .repeat(200)
}

fn bench_normalize(c: &mut Criterion) {
    let text = sample_text();
    c.bench_function("normalize_long_text", |b| b.iter(|| normalize(&text)));
}

fn bench_chunk(c: &mut Criterion) {
    let text = sample_text();
    c.bench_function("chunk_long_text", |b| b.iter(|| chunk_text(&text, 100)));
}

criterion_group!(benches, bench_normalize, bench_chunk);
criterion_main!(benches);
