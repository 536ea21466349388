//! Benchmarks for controller propagation.
//!
//! Run with: cargo bench -p scopecast-core

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use scopecast_core::{Controller, Observable, Scope, Subscription};
use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;

fn counting_subscribers(c: &Controller<u64>, n: usize, sink: &Rc<Cell<u64>>) -> Vec<Subscription> {
    (0..n)
        .map(|_| {
            let sink = Rc::clone(sink);
            c.subscribe(move |v: &u64| {
                sink.set(sink.get().wrapping_add(*v));
                let sink = Rc::clone(&sink);
                Scope::new(move || sink.set(sink.get().wrapping_sub(1)))
            })
        })
        .collect()
}

// ============================================================================
// Controller set / reset
// ============================================================================

fn bench_set_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller/set");

    for n in [1usize, 16, 256] {
        let controller: Controller<u64> = Controller::new();
        let sink = Rc::new(Cell::new(0));
        let _subs = counting_subscribers(&controller, n, &sink);

        group.bench_with_input(BenchmarkId::new("replace", n), &n, |b, _| {
            let mut v = 0u64;
            b.iter(|| {
                v = v.wrapping_add(1);
                controller.set(black_box(v));
            })
        });

        group.bench_with_input(BenchmarkId::new("set_reset", n), &n, |b, _| {
            b.iter(|| {
                controller.set(black_box(7));
                controller.reset();
            })
        });
        black_box(sink.get());
    }

    group.finish();
}

// ============================================================================
// Combinators
// ============================================================================

fn bench_and_not(c: &mut Criterion) {
    let mut group = c.benchmark_group("combinators");

    let a: Controller<u64> = Controller::new();
    let b: Controller<u64> = Controller::new();
    let hits = Rc::new(Cell::new(0u64));
    let h = Rc::clone(&hits);
    let _and = a.and(&b).subscribe(move |_| {
        h.set(h.get() + 1);
        Scope::none()
    });
    let h = Rc::clone(&hits);
    let _not = a.not().subscribe(move |_| {
        h.set(h.get() + 1);
        Scope::none()
    });
    b.set(1);

    group.bench_function("and_not_toggle", |bench| {
        bench.iter(|| {
            a.set(black_box(2));
            a.reset();
        })
    });

    group.finish();
    black_box(hits.get());
}

criterion_group!(benches, bench_set_replace, bench_and_not);
criterion_main!(benches);
