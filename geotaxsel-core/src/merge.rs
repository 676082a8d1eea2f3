//! Knapsack merge of per-component solution tables.
//!
//! Each component contributes a curve of best score per partition size. The
//! merger picks one size per component so the sizes sum to the requested
//! target and the summed score is maximal.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::{error::define_error_codes, label::LabelSet, resolver::SolutionTable};

/// Errors raised while merging component tables.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// The target lies outside the range of achievable totals.
    #[error("target size {requested} is outside the achievable range {min}..={max}")]
    UnsatisfiableTarget {
        /// Requested total number of groups.
        requested: usize,
        /// Smallest achievable total.
        min: usize,
        /// Largest achievable total.
        max: usize,
    },
    /// The target is in range but no combination of sizes reaches it.
    #[error("no combination of component sizes sums to {requested} (range {min}..={max})")]
    TargetInGap {
        /// Requested total number of groups.
        requested: usize,
        /// Smallest achievable total.
        min: usize,
        /// Largest achievable total.
        max: usize,
    },
    /// A component table had no resolution at all.
    #[error("component #{component} has an empty solution table")]
    EmptyTable {
        /// Index of the offending table in the input.
        component: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`MergeError`] variants.
    enum MergeErrorCode for MergeError {
        /// The target lies outside the range of achievable totals.
        UnsatisfiableTarget => UnsatisfiableTarget { .. } => "MERGE_UNSATISFIABLE_TARGET",
        /// The target is in range but no combination of sizes reaches it.
        TargetInGap => TargetInGap { .. } => "MERGE_TARGET_IN_GAP",
        /// A component table had no resolution at all.
        EmptyTable => EmptyTable { .. } => "MERGE_EMPTY_TABLE",
    }
}

/// The best global partition for a target size.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MergedSelection {
    score: f64,
    sizes: Vec<usize>,
    subsets: Vec<LabelSet>,
}

impl MergedSelection {
    /// Summed score of every chosen resolution.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Chosen size per input table, in input order.
    #[must_use]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// The chosen groups, component by component in input order.
    #[must_use]
    pub fn subsets(&self) -> &[LabelSet] {
        &self.subsets
    }

    /// Splits the selection into its score and groups.
    #[must_use]
    pub fn into_parts(self) -> (f64, Vec<LabelSet>) {
        (self.score, self.subsets)
    }
}

/// Best `(score, previous total, size)` reaching each accumulated total.
type Stage = BTreeMap<usize, (f64, usize, usize)>;

/// Chooses one resolution per table so the sizes sum to `target` with the
/// highest total score.
///
/// Tables are folded narrowest size range first; at each fold only totals
/// that can still reach `target` are kept. Equal scores keep the pairing with
/// the smallest accumulated total.
///
/// # Errors
/// - [`MergeError::EmptyTable`] if any table is empty.
/// - [`MergeError::UnsatisfiableTarget`] if `target` lies outside the summed
///   size range.
/// - [`MergeError::TargetInGap`] if no combination of sizes sums to `target`.
///
/// # Examples
/// ```
/// use geotaxsel_core::{Label, LabelSet, Resolution, SolutionTable, merge_components};
///
/// let group = |name: &str| LabelSet::singleton(Label::from(name));
/// let first: SolutionTable = [Resolution::new(10.0, vec![group("A")])].into_iter().collect();
/// let second: SolutionTable = [
///     Resolution::new(4.0, vec![group("B")]),
///     Resolution::new(9.0, vec![group("C"), group("D")]),
/// ]
/// .into_iter()
/// .collect();
///
/// let merged = merge_components(&[first, second], 3).expect("target is reachable");
/// assert_eq!(merged.score(), 19.0);
/// assert_eq!(merged.sizes(), &[1, 2]);
/// ```
#[instrument(
    name = "core.merge",
    err,
    skip(tables),
    fields(components = tables.len(), target = target),
)]
pub fn merge_components(
    tables: &[SolutionTable],
    target: usize,
) -> Result<MergedSelection, MergeError> {
    let mut ranges = Vec::with_capacity(tables.len());
    for (component, table) in tables.iter().enumerate() {
        match (table.min_size(), table.max_size()) {
            (Some(min), Some(max)) => ranges.push((min, max)),
            _ => {
                warn!(component, "cannot merge an empty solution table");
                return Err(MergeError::EmptyTable { component });
            }
        }
    }
    let min: usize = ranges.iter().map(|&(lo, _)| lo).sum();
    let max: usize = ranges.iter().map(|&(_, hi)| hi).sum();
    if target < min || target > max {
        warn!(min, max, "target size is not achievable");
        return Err(MergeError::UnsatisfiableTarget {
            requested: target,
            min,
            max,
        });
    }
    let in_gap = || MergeError::TargetInGap {
        requested: target,
        min,
        max,
    };

    if let [table] = tables {
        let resolution = table.get(target).ok_or_else(in_gap)?;
        return Ok(MergedSelection {
            score: resolution.score(),
            sizes: vec![target],
            subsets: resolution.subsets().to_vec(),
        });
    }

    let mut order: Vec<usize> = (0..tables.len()).collect();
    order.sort_by_key(|&index| ranges[index].1 - ranges[index].0);

    let mut min_after = vec![0; order.len() + 1];
    let mut max_after = vec![0; order.len() + 1];
    for (position, &index) in order.iter().enumerate().rev() {
        min_after[position] = min_after[position + 1] + ranges[index].0;
        max_after[position] = max_after[position + 1] + ranges[index].1;
    }

    let mut stages: Vec<Stage> = Vec::with_capacity(order.len());
    let mut frontier: BTreeMap<usize, f64> = BTreeMap::from([(0, 0.0)]);
    for (position, &index) in order.iter().enumerate() {
        let bounds = (frontier.keys().next(), frontier.keys().next_back());
        let (Some(&acc_min), Some(&acc_max)) = bounds else {
            return Err(in_gap());
        };
        let (table_min, table_max) = ranges[index];
        let lo = (acc_min + table_min).max(target.saturating_sub(max_after[position + 1]));
        let hi = (acc_max + table_max).min(target.saturating_sub(min_after[position + 1]));

        let mut stage = Stage::new();
        for (&previous, &acc_score) in &frontier {
            for resolution in tables[index].iter() {
                let total = previous + resolution.size();
                if total < lo || total > hi {
                    continue;
                }
                let score = acc_score + resolution.score();
                match stage.get(&total) {
                    Some(&(best, _, _)) if best >= score => {}
                    _ => {
                        stage.insert(total, (score, previous, resolution.size()));
                    }
                }
            }
        }
        debug!(
            component = index,
            totals = stage.len(),
            lo,
            hi,
            "folded component table"
        );
        frontier = stage
            .iter()
            .map(|(&total, &(score, _, _))| (total, score))
            .collect();
        stages.push(stage);
    }

    let score = frontier.get(&target).copied().ok_or_else(in_gap)?;
    let mut sizes = vec![0; tables.len()];
    let mut total = target;
    for (position, stage) in stages.iter().enumerate().rev() {
        let &(_, previous, size) = stage.get(&total).ok_or_else(in_gap)?;
        sizes[order[position]] = size;
        total = previous;
    }

    let mut subsets = Vec::with_capacity(target);
    for (table, &size) in tables.iter().zip(&sizes) {
        let resolution = table.get(size).ok_or_else(in_gap)?;
        subsets.extend_from_slice(resolution.subsets());
    }
    debug!(score, ?sizes, "merged component tables");
    Ok(MergedSelection {
        score,
        sizes,
        subsets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{label::Label, resolver::Resolution};
    use rstest::rstest;

    /// Builds a table whose resolution of size `n` uses `n` singleton groups
    /// named after `prefix`.
    fn table(prefix: &str, entries: &[(usize, f64)]) -> SolutionTable {
        entries
            .iter()
            .map(|&(size, score)| {
                let groups = (0..size)
                    .map(|i| LabelSet::singleton(Label::from(format!("{prefix}{i}"))))
                    .collect();
                Resolution::new(score, groups)
            })
            .collect()
    }

    #[test]
    fn picks_best_combination_for_target() {
        let merged = merge_components(
            &[table("a", &[(1, 10.0)]), table("b", &[(1, 4.0), (2, 9.0)])],
            3,
        )
        .expect("target 3 is reachable");
        assert_eq!(merged.score(), 19.0);
        assert_eq!(merged.sizes(), &[1, 2]);
        assert_eq!(merged.subsets().len(), 3);
    }

    #[rstest]
    #[case(5)]
    #[case(1)]
    fn rejects_targets_outside_the_range(#[case] target: usize) {
        let err = merge_components(
            &[table("a", &[(1, 1.0), (2, 1.0)]), table("b", &[(2, 1.0)])],
            target,
        )
        .expect_err("target is out of range");
        assert_eq!(
            err,
            MergeError::UnsatisfiableTarget {
                requested: target,
                min: 3,
                max: 4,
            }
        );
    }

    #[test]
    fn reports_targets_landing_in_a_gap() {
        let err = merge_components(
            &[table("a", &[(1, 1.0), (4, 1.0)]), table("b", &[(1, 1.0)])],
            3,
        )
        .expect_err("no sizes sum to 3");
        assert_eq!(err.code(), MergeErrorCode::TargetInGap);
    }

    #[test]
    fn single_table_returns_its_own_entry() {
        let merged = merge_components(&[table("a", &[(1, 2.0), (3, 7.0)])], 3)
            .expect("size 3 exists");
        assert_eq!(merged.score(), 7.0);
        let err = merge_components(&[table("a", &[(1, 2.0), (3, 7.0)])], 2)
            .expect_err("size 2 is a gap");
        assert_eq!(err.code(), MergeErrorCode::TargetInGap);
    }

    #[test]
    fn empty_table_is_rejected() {
        let err = merge_components(&[table("a", &[(1, 1.0)]), SolutionTable::new()], 1)
            .expect_err("second table is empty");
        assert_eq!(err, MergeError::EmptyTable { component: 1 });
    }

    #[test]
    fn no_tables_and_zero_target_is_empty() {
        let merged = merge_components(&[], 0).expect("nothing to merge");
        assert_eq!(merged.score(), 0.0);
        assert!(merged.subsets().is_empty());
    }

    #[test]
    fn equal_scores_keep_the_smaller_accumulated_total() {
        let tables = [
            table("a", &[(1, 1.0)]),
            table("b", &[(1, 5.0), (2, 5.0)]),
            table("c", &[(1, 5.0), (2, 5.0)]),
        ];
        let merged = merge_components(&tables, 4).expect("target 4 is reachable");
        assert_eq!(merged.score(), 11.0);
        assert_eq!(merged.sizes(), &[1, 1, 2]);
    }

    mod property {
        use proptest::prelude::*;
        use rand::{SeedableRng, rngs::SmallRng};

        use super::*;
        use crate::{
            component::partition_into_components,
            resolver::resolve_component,
            test_utils::{InstanceShape, generate_instance, suite_proptest_config},
        };

        /// Best summed score over every combination of table sizes totalling
        /// `target`.
        fn brute_force_merge(tables: &[SolutionTable], target: usize) -> Option<f64> {
            let Some((first, rest)) = tables.split_first() else {
                return (target == 0).then_some(0.0);
            };
            first
                .iter()
                .filter(|resolution| resolution.size() <= target)
                .filter_map(|resolution| {
                    brute_force_merge(rest, target - resolution.size())
                        .map(|score| score + resolution.score())
                })
                .reduce(f64::max)
        }

        fn coverable_tables(seed: u64) -> Vec<SolutionTable> {
            let mut rng = SmallRng::seed_from_u64(seed);
            let instance = generate_instance(InstanceShape::Coverable, &mut rng, 8);
            partition_into_components(&instance.subsets)
                .iter()
                .map(|component| resolve_component(component).expect("singletons always cover"))
                .collect()
        }

        proptest! {
            #![proptest_config(suite_proptest_config(128))]

            #[test]
            fn merge_matches_enumeration(seed in any::<u64>(), target in 1_usize..=8) {
                let tables = coverable_tables(seed);
                let expected = brute_force_merge(&tables, target);
                match merge_components(&tables, target) {
                    Ok(merged) => {
                        prop_assert_eq!(Some(merged.score()), expected);
                        prop_assert_eq!(merged.sizes().iter().sum::<usize>(), target);
                        prop_assert_eq!(merged.subsets().len(), target);
                        for (table, &size) in tables.iter().zip(merged.sizes()) {
                            prop_assert!(table.get(size).is_some());
                        }
                    }
                    Err(_) => prop_assert_eq!(expected, None),
                }
            }
        }
    }
}
