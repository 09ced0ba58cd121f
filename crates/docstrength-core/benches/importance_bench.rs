//! Criterion benchmarks for docstrength-core: importance evaluation per update method.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use docstrength_core::{
    BinarizedFeatures, Ensemble, ImportanceConfig, ObliviousTree, Pool, TreeSplit,
    TreeStatistics, UpdateMethod,
};

fn make_model(
    n_trees: usize,
    depth: usize,
    n_train: usize,
    n_features: usize,
    seed: u64,
) -> (Ensemble, Vec<TreeStatistics>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let leaf_count = 1 << depth;
    let mut trees = Vec::with_capacity(n_trees);
    let mut statistics = Vec::with_capacity(n_trees);
    for _ in 0..n_trees {
        let splits = (0..depth)
            .map(|_| TreeSplit::new(rng.gen_range(0..n_features), rng.gen_range(1..16)))
            .collect();
        let leaf_values = vec![(0..leaf_count).map(|_| rng.r#gen::<f64>() - 0.5).collect()];
        trees.push(ObliviousTree::new(splits, leaf_values).unwrap());

        let leaf_indices = (0..n_train).map(|_| rng.gen_range(0..leaf_count)).collect();
        let multiplier = vec![(0..n_train).map(|_| 0.5 + rng.r#gen::<f64>()).collect()];
        let adding = vec![(0..n_train).map(|_| rng.r#gen::<f64>() - 0.5).collect()];
        let denominators = vec![(0..leaf_count).map(|_| 1.0 + rng.r#gen::<f64>()).collect()];
        statistics.push(
            TreeStatistics::new(leaf_count, leaf_indices, multiplier, adding, denominators)
                .unwrap(),
        );
    }
    (Ensemble::new(trees).unwrap(), statistics)
}

fn make_pool(n_docs: usize, n_features: usize, seed: u64) -> Pool {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let columns = (0..n_features)
        .map(|_| (0..n_docs).map(|_| rng.gen_range(0..16u8)).collect())
        .collect();
    let targets = (0..n_docs).map(|_| rng.r#gen::<f64>()).collect();
    Pool::new(targets, BinarizedFeatures::from_columns(columns).unwrap()).unwrap()
}

fn bench_update_methods(c: &mut Criterion) {
    let (ensemble, statistics) = make_model(50, 6, 500, 10, 42);
    let pool = make_pool(200, 10, 43);
    let methods = [
        UpdateMethod::SinglePoint,
        UpdateMethod::TopKLeaves { top_size: 4 },
        UpdateMethod::AllPoints,
    ];

    let mut group = c.benchmark_group("importances_500x200_50trees_d6");
    for method in methods {
        let config = ImportanceConfig::new(0.1, 1)
            .unwrap()
            .with_update_method(method)
            .with_thread_count(4);
        group.bench_with_input(BenchmarkId::from_parameter(method), &config, |b, config| {
            b.iter(|| config.evaluate(&ensemble, &statistics, &pool).unwrap());
        });
    }
    group.finish();
}

fn bench_thread_scaling(c: &mut Criterion) {
    let (ensemble, statistics) = make_model(50, 6, 500, 10, 42);
    let pool = make_pool(200, 10, 43);

    let mut group = c.benchmark_group("importances_threads");
    for threads in [1usize, 2, 4, 8] {
        let config = ImportanceConfig::new(0.1, 1)
            .unwrap()
            .with_thread_count(threads);
        group.bench_with_input(BenchmarkId::from_parameter(threads), &config, |b, config| {
            b.iter(|| config.evaluate(&ensemble, &statistics, &pool).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_update_methods, bench_thread_scaling);
criterion_main!(benches);
