use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use herald_event::{Callback, CustomEvent, Signature, args, value};
use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Benchmark: Fire Pass by Signature
// ============================================================================

fn event_with_subscribers(signature: Signature, count: usize) -> (CustomEvent, Arc<AtomicU64>) {
    let event = CustomEvent::builder()
        .event_type("bench")
        .signature(signature)
        .silent(true)
        .build()
        .unwrap();
    let hits = Arc::new(AtomicU64::new(0));
    for _ in 0..count {
        let hits = Arc::clone(&hits);
        event
            .subscribe(Callback::new(move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            }))
            .unwrap();
    }
    (event, hits)
}

fn bench_fire(c: &mut Criterion) {
    let mut group = c.benchmark_group("fire");

    for count in [1usize, 10, 100, 1000] {
        group.throughput(Throughput::Elements(u64::try_from(count).unwrap_or(u64::MAX)));

        for (name, signature) in [("flat", Signature::Flat), ("list", Signature::List)] {
            let (event, _hits) = event_with_subscribers(signature, count);
            group.bench_with_input(BenchmarkId::new(name, count), &event, |b, event| {
                b.iter(|| black_box(event.fire(args![1_u64, "payload"]).unwrap()));
            });
        }
    }

    group.finish();
}

// ============================================================================
// Benchmark: Subscribe / Unsubscribe Churn
// ============================================================================

fn bench_subscription_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscription");

    let event = CustomEvent::builder().event_type("churn").silent(true).build().unwrap();

    group.bench_function("subscribe_detach", |b| {
        b.iter(|| {
            let handle = event.subscribe(Callback::new(|_| ())).unwrap();
            black_box(handle.detach());
        });
    });

    let callback = Callback::new(|_| ());
    let companion = value(7_u32);
    group.bench_function("subscribe_unsubscribe_by_companion", |b| {
        b.iter(|| {
            event
                .subscriber()
                .callback(callback.clone())
                .companion(Arc::clone(&companion))
                .subscribe()
                .unwrap();
            black_box(event.unsubscribe((&callback, &companion)));
        });
    });

    group.finish();
}

// ============================================================================
// Benchmark: Fire-Once Replay
// ============================================================================

fn bench_fire_once_replay(c: &mut Criterion) {
    let event = CustomEvent::builder().event_type("ready").fire_once(true).silent(true).build().unwrap();
    event.fire(args!["booted"]).unwrap();

    c.bench_function("fire_once_replay", |b| {
        b.iter(|| {
            let handle = event.subscribe(Callback::new(|inv| black_box(inv.args().len()) > 0)).unwrap();
            handle.detach();
        });
    });
}

criterion_group!(benches, bench_fire, bench_subscription_churn, bench_fire_once_replay);
criterion_main!(benches);
