use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use tickx_rs::engine::collector::Collector;
use tickx_rs::engine::types::Record;

const SYMBOLS: [&str; 8] = ["AAPL", "AMZN", "GOOG", "IBM", "META", "MSFT", "NVDA", "TSLA"];

fn ticks(n: u64) -> Vec<Record> {
    (0..n)
        .map(|i| {
            // spread across symbols with plenty of price ties
            let symbol = SYMBOLS[(i * 7 % SYMBOLS.len() as u64) as usize];
            let price = (i % 50) as f64 * 0.25;
            Record::new(symbol, price, i % 1000, n - i)
        })
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let input = ticks(100_000);
    c.bench_function("collector_insert_100k", |b| {
        b.iter_batched(
            || input.clone(),
            |records| {
                let mut collector = Collector::new();
                for r in records {
                    collector.insert(r);
                }
                black_box(collector.len())
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_export(c: &mut Criterion) {
    let input = ticks(100_000);
    c.bench_function("collector_into_groups_100k", |b| {
        b.iter_batched(
            || {
                let mut collector = Collector::new();
                for r in input.iter().cloned() {
                    collector.insert(r);
                }
                collector
            },
            |collector| black_box(collector.into_groups().len()),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_insert, bench_export);
criterion_main!(benches);
