use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndjview::record::LogRecord;
use ndjview::search::SearchIndex;
use ndjview::stream::{parse_chunk, NdjsonDecoder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

fn generate_ndjson(lines: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    let levels = ["debug", "info", "warn", "error"];
    let services = ["auth", "database", "cache", "payment", "notification"];

    let mut out = String::with_capacity(lines * 160);
    for i in 0..lines {
        let level = levels[rng.gen_range(0..levels.len())];
        let service = services[i % services.len()];
        out.push_str(&format!(
            "{{\"_time\":{},\"level\":\"{}\",\"service\":\"{}\",\"msg\":\"request {} took {}ms\",\"user\":\"user_{}\"}}\n",
            1_724_323_612_000u64 + i as u64 * 37,
            level,
            service,
            i,
            rng.gen_range(1..5_000),
            rng.gen_range(0..1_000)
        ));
        if i % 500 == 0 {
            out.push_str("malformed line without json\n");
        }
    }
    out.into_bytes()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_chunk");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(3));

    let data = generate_ndjson(20_000);
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("single_chunk", |b| {
        b.iter(|| {
            let parsed = parse_chunk::<LogRecord>(black_box(&data), &[]);
            black_box(parsed.records.len())
        })
    });

    for chunk_size in [1_024usize, 16 * 1_024, 64 * 1_024] {
        group.bench_with_input(
            BenchmarkId::new("decoder", chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut decoder = NdjsonDecoder::<LogRecord>::new();
                    let mut count = 0;
                    for chunk in data.chunks(chunk_size) {
                        count += decoder.push(black_box(chunk)).len();
                    }
                    count += decoder.finish().len();
                    black_box(count)
                })
            },
        );
    }

    group.finish();
}

fn bench_search_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_index");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(3));

    let records: Vec<Arc<LogRecord>> = parse_chunk::<LogRecord>(&generate_ndjson(20_000), &[])
        .records
        .into_iter()
        .map(Arc::new)
        .collect();

    group.bench_function("build", |b| {
        b.iter(|| black_box(SearchIndex::build(1, records.clone()).len()))
    });

    let index = SearchIndex::build(1, records);
    for query in ["error", "PAYMENT", "took [0-9]{4}ms"] {
        group.bench_with_input(BenchmarkId::new("query", query), &query, |b, query| {
            b.iter(|| black_box(index.search(black_box(query)).len()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_search_index);
criterion_main!(benches);
