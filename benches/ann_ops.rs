//! Benchmarks for ANN index build, search and artifact reload.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};

use trirag::config::IndexConfig;
use trirag::graph::{GraphStore, Literal, Triple};
use trirag::index::artifacts;
use trirag::index::{AnnIndex, AnnParams, IndexBuilder};
use trirag::store::MemBlobStore;

const DIM: usize = 384;

fn random_vectors(n: usize) -> Vec<Vec<f32>> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    (0..n)
        .map(|_| (0..DIM).map(|_| rng.r#gen::<f32>() - 0.5).collect())
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("ann_build");
    group.sample_size(10);
    for n in [1_000, 5_000] {
        let vectors = random_vectors(n);
        let params = AnnParams::for_elements(&IndexConfig::default(), n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &vectors, |bench, v| {
            bench.iter(|| black_box(AnnIndex::build(v, params)))
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let vectors = random_vectors(5_000);
    let index = AnnIndex::build(
        &vectors,
        AnnParams::for_elements(&IndexConfig::default(), vectors.len()),
    );
    let query = &vectors[1234];

    c.bench_function("ann_search_k15_5k", |bench| {
        bench.iter(|| black_box(index.search(query, 15)))
    });
}

fn bench_reload(c: &mut Criterion) {
    let n = 2_000;
    let vectors = random_vectors(n);
    let triples: Vec<Triple> = (0..n)
        .map(|i| {
            Triple::literal(
                format!("http://example.org/bigquery/t/{i}"),
                "http://example.org/ontology/n",
                Literal::Integer(i as i64),
            )
        })
        .collect();
    let graph: GraphStore = triples.iter().cloned().collect();
    let store = MemBlobStore::new();
    IndexBuilder::default()
        .build(&triples, vectors.into_iter().map(Ok).collect())
        .expect("build")
        .persist(&graph, &store)
        .expect("persist");

    let mut group = c.benchmark_group("artifact_reload");
    group.sample_size(10);
    group.bench_function("load_2k", |bench| {
        bench.iter(|| black_box(artifacts::load(&store).expect("load").triples.len()))
    });
    group.finish();
}

criterion_group!(benches, bench_build, bench_search, bench_reload);
criterion_main!(benches);
