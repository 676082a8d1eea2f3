//! Property suites checking the resolver against plain enumeration.

use proptest::prelude::*;
use rand::{SeedableRng, rngs::SmallRng};

use super::{ResolveError, ResolverConfig, resolve_component, resolve_component_with};
use crate::{
    component::partition_into_components,
    test_utils::{
        Instance, InstanceShape, brute_force_table, cover_score, generate_instance,
        instance_strategy, suite_proptest_config,
    },
};

fn run_oracle_equivalence(instance: &Instance) -> Result<(), TestCaseError> {
    for component in partition_into_components(&instance.subsets) {
        let expected = brute_force_table(&component);
        match resolve_component(&component) {
            Ok(table) => {
                let found: Vec<(usize, f64)> =
                    table.iter().map(|r| (r.size(), r.score())).collect();
                let wanted: Vec<(usize, f64)> = expected.into_iter().collect();
                prop_assert_eq!(found, wanted);
                for resolution in table.iter() {
                    let score = cover_score(&component, resolution.subsets())?;
                    prop_assert_eq!(score, resolution.score());
                }
            }
            Err(ResolveError::InvalidComponent { .. }) => {
                prop_assert!(expected.is_empty(), "missed covers {expected:?}");
            }
            Err(other) => return Err(TestCaseError::fail(format!("unexpected {other}"))),
        }
    }
    Ok(())
}

fn run_parallel_equivalence(instance: &Instance) -> Result<(), TestCaseError> {
    for component in partition_into_components(&instance.subsets) {
        for greedy_steps in [0, 1] {
            let config = ResolverConfig::new().with_greedy_steps(greedy_steps);
            let sequential = resolve_component_with(&component, &config);
            let parallel = resolve_component_with(&component, &config.with_parallel(true));
            prop_assert_eq!(sequential, parallel);
        }
    }
    Ok(())
}

fn run_greedy_soundness(instance: &Instance, greedy_steps: usize) -> Result<(), TestCaseError> {
    for component in partition_into_components(&instance.subsets) {
        let exact = brute_force_table(&component);
        let config = ResolverConfig::new().with_greedy_steps(greedy_steps);
        let Ok(table) = resolve_component_with(&component, &config) else {
            continue;
        };
        for resolution in table.iter() {
            let score = cover_score(&component, resolution.subsets())?;
            prop_assert_eq!(score, resolution.score());
            let best = exact.get(&resolution.size()).copied();
            prop_assert!(
                best.is_some_and(|best| score <= best),
                "greedy size {} beat or missed the exact table {exact:?}",
                resolution.size()
            );
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(suite_proptest_config(128))]

    #[test]
    fn resolver_matches_enumeration(instance in instance_strategy()) {
        run_oracle_equivalence(&instance)?;
    }

    #[test]
    fn parallel_search_matches_sequential(instance in instance_strategy()) {
        run_parallel_equivalence(&instance)?;
    }

    #[test]
    fn greedy_search_returns_valid_covers(
        instance in instance_strategy(),
        greedy_steps in 1_usize..4,
    ) {
        run_greedy_soundness(&instance, greedy_steps)?;
    }
}

#[rstest::rstest]
#[case::coverable_7(InstanceShape::Coverable, 7)]
#[case::coverable_42(InstanceShape::Coverable, 42)]
#[case::sparse_42(InstanceShape::Sparse, 42)]
#[case::sparse_999(InstanceShape::Sparse, 999)]
#[case::chained_42(InstanceShape::Chained, 42)]
#[case::chained_999(InstanceShape::Chained, 999)]
fn seeded_instances_match_enumeration(#[case] shape: InstanceShape, #[case] seed: u64) {
    let instance = generate_instance(shape, &mut SmallRng::seed_from_u64(seed), 8);
    assert_eq!(instance.shape, shape);
    run_oracle_equivalence(&instance).expect("resolver agrees with enumeration");
    run_parallel_equivalence(&instance).expect("parallel agrees with sequential");
}
