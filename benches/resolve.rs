use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use schemaflow::{core::graph::resolve, types::Version};

/// Single steps `v -> v+1` plus combined steps `v -> v+span` every `span` versions.
fn layered_edges(versions: Version, span: Version) -> Vec<(Version, Version)> {
    let mut edges = Vec::new();
    for v in 0..versions {
        edges.push((v, v + 1));
        if v % span == 0 && v.checked_add(span).is_some_and(|end| end <= versions) {
            edges.push((v, v + span));
        }
    }
    edges
}

fn bench_linear_chain(c: &mut Criterion) {
    let edges = layered_edges(1_000, Version::MAX);
    c.bench_function("resolve_chain_1k", |b| {
        b.iter(|| {
            let _ = resolve(&edges, Some(0), None).expect("resolve");
        });
    });
}

fn bench_combined_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_combined");
    for span in [2u64, 8, 32] {
        let edges = layered_edges(2_048, span);
        group.bench_with_input(BenchmarkId::from_parameter(span), &edges, |b, edges| {
            b.iter(|| {
                let _ = resolve(edges, Some(0), None).expect("resolve");
            });
        });
    }
    group.finish();
}

fn bench_resume_mid_chain(c: &mut Criterion) {
    let edges = layered_edges(10_000, 16);
    c.bench_function("resolve_resume_10k", |b| {
        b.iter(|| {
            let _ = resolve(&edges, Some(9_000), None).expect("resolve");
        });
    });
}

criterion_group!(benches, bench_linear_chain, bench_combined_steps, bench_resume_mid_chain);
criterion_main!(benches);
