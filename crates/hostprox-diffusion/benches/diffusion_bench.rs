//! Criterion benchmarks for hostprox-diffusion.
//!
//! Run with:
//! ```bash
//! cargo bench -p hostprox-diffusion
//! ```
//!
//! Compares the dense Cholesky and conjugate-gradient backends on ring graphs
//! with chords, plus single-step Google propagation.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hostprox_diffusion::{
    make_seed_vector, rank, DiffusionOperator, EdgeWeighting, GoogleMatrix, GooglePropagator,
    PreparedDiffusion, Propagation, SeedSet, SolverConfig, SolverStrategy,
};
use hostprox_graph::{
    BuildConfig, GraphBuilder, IdResolver, MergePolicy, NamespaceSpec, Organism, PpiGraph,
    ProteinId, SourceTag,
};

// ── helpers ─────────────────────────────────────────────────────────────────

/// Ring over `n` proteins with a chord every 10 nodes.
fn ring_graph(n: usize) -> PpiGraph {
    let resolver = IdResolver::builder()
        .canonical(NamespaceSpec::new("uniprot", Organism::Host))
        .unwrap()
        .build();
    let ns = resolver.namespace("uniprot").unwrap();
    let tag = SourceTag::from("bench");
    let mut builder = GraphBuilder::new(&resolver, BuildConfig::new(MergePolicy::Max)).unwrap();
    for i in 0..n {
        let a = format!("P{i:06}");
        builder.add_edge(&a, &format!("P{:06}", (i + 1) % n), ns, ns, 0.9, &tag);
        if i % 10 == 0 {
            builder.add_edge(&a, &format!("P{:06}", (i + n / 2) % n), ns, ns, 0.7, &tag);
        }
    }
    builder.finish().0
}

fn seeds() -> SeedSet {
    SeedSet::new("bench", (0..5).map(|i| ProteinId::new(format!("P{:06}", i * 17))))
}

fn prepared(g: &PpiGraph, strategy: SolverStrategy) -> PreparedDiffusion {
    let op = DiffusionOperator::build(g, EdgeWeighting::Confidence, 0.1).unwrap();
    PreparedDiffusion::prepare(op, SolverConfig { strategy, ..SolverConfig::default() }).unwrap()
}

// ── laplacian ────────────────────────────────────────────────────────────────

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("laplacian/prepare");
    group.sample_size(10);
    for &n in &[200usize, 1_000] {
        let g = ring_graph(n);
        group.bench_with_input(BenchmarkId::new("direct", n), &n, |b, _| {
            b.iter(|| prepared(&g, SolverStrategy::Direct))
        });
    }
    group.finish();
}

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("laplacian/solve");
    for &n in &[200usize, 1_000, 20_000] {
        let g = ring_graph(n);
        let v = make_seed_vector(g.order(), &seeds());

        if n <= 1_000 {
            let direct = prepared(&g, SolverStrategy::Direct);
            group.bench_with_input(BenchmarkId::new("direct", n), &n, |b, _| {
                b.iter(|| rank(&direct, &v).unwrap())
            });
        }
        let cg = prepared(&g, SolverStrategy::ConjugateGradient);
        group.bench_with_input(BenchmarkId::new("cg", n), &n, |b, _| {
            b.iter(|| rank(&cg, &v).unwrap())
        });
    }
    group.finish();
}

// ── google ───────────────────────────────────────────────────────────────────

fn bench_google(c: &mut Criterion) {
    let g = ring_graph(20_000);
    let v = make_seed_vector(g.order(), &seeds());
    let m = GoogleMatrix::build(&g, EdgeWeighting::Unit, 0.85).unwrap();

    let single = GooglePropagator::new(m.clone(), Propagation::SingleStep).unwrap();
    c.bench_function("google/single_step_20k", |b| b.iter(|| rank(&single, &v).unwrap()));

    let ppr = GooglePropagator::new(m, Propagation::personalized()).unwrap();
    c.bench_function("google/personalized_20k", |b| b.iter(|| rank(&ppr, &v).unwrap()));
}

// ── criterion wiring ─────────────────────────────────────────────────────────

criterion_group!(benches, bench_prepare, bench_solve, bench_google);
criterion_main!(benches);
