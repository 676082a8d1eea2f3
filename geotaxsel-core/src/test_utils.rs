//! Shared test utilities for `geotaxsel-core`.

use std::collections::BTreeMap;

use geotaxsel_test_support::ci::property_test_profile::ProptestRunProfile;
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use rand::{Rng, SeedableRng, rngs::SmallRng};
use test_strategy::Arbitrary;

use crate::{
    component::Component,
    label::{Label, LabelSet},
    subset::WeightedSubset,
};

/// Builds a proptest configuration from the shared CI profile.
#[must_use]
pub(crate) fn suite_proptest_config(default_cases: u32) -> ProptestConfig {
    let profile = ProptestRunProfile::load(default_cases, false);
    ProptestConfig {
        cases: profile.cases(),
        fork: profile.fork(),
        ..ProptestConfig::default()
    }
}

fn max_labels() -> usize {
    ProptestRunProfile::load(1, false).max_labels()
}

/// How a generated instance picks its candidate subsets.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Arbitrary)]
pub(crate) enum InstanceShape {
    /// Every singleton plus a few random wider subsets; always coverable.
    #[weight(3)]
    Coverable,
    /// Random subsets only; components may have no exact cover.
    #[weight(1)]
    Sparse,
    /// Overlapping neighbour pairs with some singletons.
    #[weight(1)]
    Chained,
}

/// A generated reconciliation instance.
#[derive(Clone, Debug)]
pub(crate) struct Instance {
    pub(crate) shape: InstanceShape,
    pub(crate) subsets: Vec<WeightedSubset>,
}

fn label(index: usize) -> Label {
    Label::from(format!("T{index}"))
}

fn integral_weight(rng: &mut SmallRng) -> f64 {
    f64::from(rng.gen_range(1_u8..=5))
}

fn random_members(rng: &mut SmallRng, labels: usize) -> LabelSet {
    let mask: u32 = rng.gen_range(1..(1_u32 << labels));
    (0..labels)
        .filter(|bit| mask & (1 << bit) != 0)
        .map(label)
        .collect()
}

/// Generates subsets over at most `max_labels` labels. Weights are small
/// integers so sums are exact regardless of addition order.
pub(crate) fn generate_instance(
    shape: InstanceShape,
    rng: &mut SmallRng,
    max_labels: usize,
) -> Instance {
    let labels = rng.gen_range(1..=max_labels.max(1));
    let mut subsets = Vec::new();
    let mut push = |members: LabelSet, rng: &mut SmallRng| {
        let weight = integral_weight(rng);
        subsets.push(WeightedSubset::new(members, weight).expect("generated subsets are valid"));
    };
    match shape {
        InstanceShape::Coverable => {
            for index in 0..labels {
                push(LabelSet::singleton(label(index)), rng);
            }
            for _ in 0..rng.gen_range(0..=6) {
                let members = random_members(rng, labels);
                push(members, rng);
            }
        }
        InstanceShape::Sparse => {
            for _ in 0..rng.gen_range(1..=8) {
                let members = random_members(rng, labels);
                push(members, rng);
            }
        }
        InstanceShape::Chained => {
            for index in 0..labels {
                if index + 1 < labels {
                    push([label(index), label(index + 1)].into_iter().collect(), rng);
                }
                if labels == 1 || rng.gen_bool(0.5) {
                    push(LabelSet::singleton(label(index)), rng);
                }
            }
        }
    }
    Instance { shape, subsets }
}

/// Strategy yielding instances sized by the CI profile.
pub(crate) fn instance_strategy() -> impl Strategy<Value = Instance> {
    let bound = max_labels();
    (any::<InstanceShape>(), any::<u64>()).prop_map(move |(shape, seed)| {
        generate_instance(shape, &mut SmallRng::seed_from_u64(seed), bound)
    })
}

/// Best score for every partition size, found by plain enumeration.
pub(crate) fn brute_force_table(component: &Component) -> BTreeMap<usize, f64> {
    let candidates: Vec<(&LabelSet, f64)> = component.subsets().collect();
    let mut best = BTreeMap::new();
    enumerate_covers(
        &candidates,
        component.leaves().len(),
        &LabelSet::default(),
        (0, 0.0),
        &mut best,
    );
    best
}

fn enumerate_covers(
    candidates: &[(&LabelSet, f64)],
    leaves: usize,
    covered: &LabelSet,
    (count, score): (usize, f64),
    best: &mut BTreeMap<usize, f64>,
) {
    if covered.len() == leaves {
        let entry = best.entry(count).or_insert(score);
        *entry = entry.max(score);
        return;
    }
    let Some(((members, weight), rest)) = candidates.split_first() else {
        return;
    };
    if covered.is_disjoint(members) {
        enumerate_covers(
            rest,
            leaves,
            &covered.union(members),
            (count + 1, score + weight),
            best,
        );
    }
    enumerate_covers(rest, leaves, covered, (count, score), best);
}

/// Asserts that `groups` cover `leaves` exactly once using subsets of
/// `component`, and returns their summed weight.
pub(crate) fn cover_score(
    component: &Component,
    groups: &[LabelSet],
) -> Result<f64, TestCaseError> {
    let mut covered = LabelSet::default();
    let mut score = 0.0;
    for group in groups {
        prop_assert!(covered.is_disjoint(group), "{group} overlaps {covered}");
        let weight = component.weight_of(group);
        prop_assert!(weight.is_some(), "{group} is not a candidate");
        score += weight.unwrap_or_default();
        covered = covered.union(group);
    }
    prop_assert_eq!(&covered, component.leaves());
    Ok(score)
}
