/// Benchmarks for the numeric core: scaling, PCA, K-Means, and the
/// hashing embedder over a synthetic feature matrix.
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ndarray::Array2;
use typology_worker::embedding::{Embedder, HashEmbedder};
use typology_worker::util::kmeans::KMeans;
use typology_worker::util::pca::Pca;
use typology_worker::util::scale::StandardScaler;

fn synthetic_matrix(rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        let base = (i % 7) as f64;
        base.mul_add(0.5, (j as f64).sin())
    })
}

fn bench_scaling_and_pca(c: &mut Criterion) {
    let matrix = synthetic_matrix(2048, 19);

    c.bench_function("standard_scaler_2k_rows", |b| {
        b.iter(|| {
            let scaler = StandardScaler::fit(&matrix);
            black_box(scaler.transform(&matrix));
        });
    });

    let scaled = StandardScaler::fit(&matrix).transform(&matrix);
    c.bench_function("pca_full_rebasis_2k_rows", |b| {
        b.iter(|| {
            let pca = Pca::fit(&scaled, 19);
            black_box(pca.transform(&scaled));
        });
    });
}

fn bench_kmeans(c: &mut Criterion) {
    let matrix = synthetic_matrix(2048, 12);
    let points: Vec<Vec<f64>> = matrix.rows().into_iter().map(|r| r.to_vec()).collect();

    c.bench_function("kmeans_k5_2k_points", |b| {
        b.iter(|| {
            let model = KMeans::fit(&points, 5, 300, 42);
            black_box(model.assignments.len());
        });
    });
}

fn bench_hash_embedder(c: &mut Criterion) {
    let embedder = HashEmbedder::default();
    let texts: Vec<String> = (0..512)
        .map(|i| format!("ingredient number {i} with some descriptive words"))
        .collect();

    c.bench_function("hash_embed_512_texts", |b| {
        b.iter(|| {
            let vectors = embedder.encode(&texts).expect("encode");
            black_box(vectors.len());
        });
    });
}

criterion_group!(
    benches,
    bench_scaling_and_pca,
    bench_kmeans,
    bench_hash_embedder
);
criterion_main!(benches);
