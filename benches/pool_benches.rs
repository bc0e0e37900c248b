//! Benchmarks for the builder's node pool: cost of a fresh allocation run
//! versus a `reset` reuse run, across a few expression sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use expr_ast_builder::{BinaryOp, Eab, EabConfig, LineCounter, SymbolTable};

fn build_chain(eab: &mut Eab, symbols: &mut SymbolTable, depth: usize) {
    let a = symbols.intern("a");
    eab.push_sym(a).unwrap();
    for _ in 0..depth {
        eab.push_binary_op(BinaryOp::Add).unwrap();
        eab.push_sym(a).unwrap();
    }
}

fn bench_fresh_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("fresh pool per expression");
    for depth in [8usize, 64, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut symbols = SymbolTable::new();
            b.iter(|| {
                let mut eab = Eab::new(EabConfig::default(), LineCounter::new(1));
                build_chain(&mut eab, &mut symbols, depth);
                black_box(eab.root());
            });
        });
    }
    group.finish();
}

fn bench_reset_reuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("reset and reuse pool");
    for depth in [8usize, 64, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut symbols = SymbolTable::new();
            let mut eab = Eab::new(EabConfig::default(), LineCounter::new(1));
            // Warm the pool once so steady-state runs never grow it.
            build_chain(&mut eab, &mut symbols, depth);
            eab.reset();
            b.iter(|| {
                build_chain(&mut eab, &mut symbols, depth);
                black_box(eab.root());
                eab.reset();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fresh_pool, bench_reset_reuse);
criterion_main!(benches);
