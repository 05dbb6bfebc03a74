//! Benchmarks for invalidation and refresh sweeps.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis_core::reactive::{Derived, Graph, Input};

/// A linear chain of `len` derived nodes on top of one input.
fn chain(len: usize) -> (Input<u64>, Derived<u64>) {
    let graph = Graph::new();
    let input = Input::new(&graph, 0u64).unwrap();

    let first = input.clone();
    let mut last = Derived::new(&graph, &[input.id()], move || first.get() + 1).unwrap();
    for _ in 1..len {
        let prev = last.clone();
        last = Derived::new(&graph, &[prev.id()], move || prev.get() + 1).unwrap();
    }
    (input, last)
}

/// One input fanned out to `width` derived nodes, summed by a single sink.
fn fan(width: usize) -> (Input<u64>, Derived<u64>) {
    let graph = Graph::new();
    let input = Input::new(&graph, 0u64).unwrap();

    let branches: Vec<Derived<u64>> = (0..width as u64)
        .map(|k| {
            let input = input.clone();
            Derived::new(&graph, &[input.id()], move || input.get() * k).unwrap()
        })
        .collect();

    let ids: Vec<_> = branches.iter().map(Derived::id).collect();
    let sink = Derived::new(&graph, &ids, move || branches.iter().map(Derived::get).sum::<u64>()).unwrap();
    (input, sink)
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    for len in [10usize, 100, 1_000] {
        let (input, last) = chain(len);
        let mut next = 0u64;
        group.bench_with_input(BenchmarkId::new("set_then_get", len), &len, |b, _| {
            b.iter(|| {
                next += 1;
                input.set(next);
                black_box(last.get())
            })
        });
        group.bench_with_input(BenchmarkId::new("cached_get", len), &len, |b, _| {
            b.iter(|| black_box(last.get()))
        });
    }
    group.finish();
}

fn bench_fan(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan");
    for width in [10usize, 100, 1_000] {
        let (input, sink) = fan(width);
        let mut next = 0u64;
        group.bench_with_input(BenchmarkId::new("set_then_get", width), &width, |b, _| {
            b.iter(|| {
                next += 1;
                input.set(next);
                black_box(sink.get())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_chain, bench_fan);
criterion_main!(benches);
