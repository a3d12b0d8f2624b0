use criterion::{black_box, criterion_group, criterion_main, Criterion};
use grafene_core::graph::symmetrize_max;
use grafene_core::normalize::AugNormAdj;
use grafene_core::{precompute, AdjacencyNormalizer, CsrMatrix};
use ndarray::Array2;

fn bench_precompute(c: &mut Criterion) {
    // Ring of 10k nodes with a chord every 7 nodes.
    let n = 10_000;
    let mut triplets = Vec::with_capacity(2 * n);
    for i in 0..n {
        triplets.push((i, (i + 1) % n, 1.0));
        triplets.push((i, (i + 7) % n, 1.0));
    }
    let raw = CsrMatrix::from_triplets((n, n), &triplets).unwrap();
    let op = AugNormAdj.normalize(&symmetrize_max(&raw).unwrap()).unwrap();
    let features = Array2::<f32>::ones((n, 64));

    c.bench_function("sgc_precompute_10k_nodes_degree_2", |b| {
        b.iter(|| precompute(black_box(features.clone()), black_box(&op), 2).unwrap())
    });

    c.bench_function("aug_norm_adj_10k_nodes", |b| {
        b.iter(|| AugNormAdj.normalize(black_box(&raw)).unwrap())
    });
}

criterion_group!(benches, bench_precompute);
criterion_main!(benches);
