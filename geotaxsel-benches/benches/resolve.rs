//! Component resolution benchmarks.
//!
//! Measures the exact-cover search on a single synthetic component, with and
//! without greedy pruning and root-level parallelism.
#![expect(
    missing_docs,
    reason = "Criterion macros generate items without doc comments"
)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use geotaxsel_benches::{
    error::BenchSetupError,
    params::ResolveBenchParams,
    source::{SyntheticConfig, synthetic_tally},
};
use geotaxsel_core::{ResolverConfig, partition_into_components, resolve_component_with};

const SEED: u64 = 42;

const TREE_COUNT: usize = 200;

const BLOCK_SIZES: &[usize] = &[8, 12, 16];

const GREEDY_STEPS: &[usize] = &[0, 2];

fn resolve_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("resolve_component");
    group.sample_size(20);

    for &block_size in BLOCK_SIZES {
        let tally = synthetic_tally(&SyntheticConfig {
            block_count: 1,
            block_size,
            tree_count: TREE_COUNT,
            cut_probability: 0.35,
            seed: SEED,
        })?;
        let components = partition_into_components(&tally.weighted_subsets());

        for &greedy_steps in GREEDY_STEPS {
            for parallel in [false, true] {
                let params = ResolveBenchParams {
                    block_size,
                    greedy_steps,
                    parallel,
                };
                let config = ResolverConfig::new()
                    .with_greedy_steps(greedy_steps)
                    .with_parallel(parallel);
                group.bench_with_input(
                    BenchmarkId::from_parameter(&params),
                    &(&components, config),
                    |b, (components, config)| {
                        b.iter(|| {
                            for component in *components {
                                if let Err(err) = resolve_component_with(component, config) {
                                    panic!("resolve_component_with failed during benchmark: {err}");
                                }
                            }
                        });
                    },
                );
            }
        }
    }

    group.finish();
    Ok(())
}

fn resolve(c: &mut Criterion) {
    if let Err(err) = resolve_impl(c) {
        panic!("resolve benchmark setup failed: {err}");
    }
}

criterion_group!(benches, resolve);
criterion_main!(benches);
