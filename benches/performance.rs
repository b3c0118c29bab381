//! Performance benchmarks for the event relay.

use ci_relay::{
    DeliveryEngine, EventKind, EventLog, Filter, Filters, JobId, Payload, RepositoryId, Sequence,
    SubscriptionId, TestIdentifier,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

fn fill(log: &EventLog, count: usize) {
    let test = TestIdentifier::new("tests/checkout.spec.ts", ["cart", "checkout"], "pays");
    for i in 0..count {
        log.append(
            EventKind::TestBegin,
            RepositoryId((i % 8) as i64),
            Some(JobId((i % 32) as i64)),
            Payload::Test(test.clone()),
        );
    }
}

/// Benchmark appends once the log is full and every append evicts
fn bench_publish_at_capacity(c: &mut Criterion) {
    let log = EventLog::new(10_000);
    fill(&log, 10_000);

    c.bench_function("publish_at_capacity", |b| {
        b.iter(|| {
            black_box(log.append(
                EventKind::Begin,
                RepositoryId(1),
                Some(JobId(1)),
                Payload::None,
            ))
        })
    });
}

/// Benchmark snapshot reads at varying distances from the tail
fn bench_snapshot_from(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_from");
    let log = EventLog::new(10_000);
    fill(&log, 10_000);
    let tail = log.current_tail().0;

    for behind in [1u64, 100, 10_000] {
        group.bench_with_input(BenchmarkId::new("behind", behind), &behind, |b, &behind| {
            let cursor = Sequence(tail.saturating_sub(behind));
            b.iter(|| black_box(log.snapshot_from(cursor)))
        });
    }

    group.finish();
}

/// Benchmark one tick across many subscriptions after a burst of publishes
fn bench_tick_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_fan_out");

    for subscribers in [1usize, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &subscribers| {
                let log = Arc::new(EventLog::new(10_000));
                let mut receivers = Vec::with_capacity(subscribers);
                let mut engines: Vec<DeliveryEngine> = (0..subscribers)
                    .map(|i| {
                        let (tx, rx) = crossbeam_channel::unbounded();
                        receivers.push(rx);
                        let filters = Filters::new().with(
                            EventKind::TestBegin,
                            Filter::repository(RepositoryId((i % 8) as i64))
                                .with_jobs([JobId((i % 32) as i64)]),
                        );
                        let mut engine =
                            DeliveryEngine::new(SubscriptionId(i as u64), Arc::clone(&log), filters, tx);
                        engine.open();
                        engine
                    })
                    .collect();

                b.iter(|| {
                    fill(&log, 100);
                    for engine in engines.iter_mut() {
                        black_box(engine.tick());
                    }
                    for rx in &receivers {
                        rx.try_iter().for_each(drop);
                    }
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_publish_at_capacity,
    bench_snapshot_from,
    bench_tick_fan_out
);
criterion_main!(benches);
