//! Connected-component decomposition of weighted subsets.
//!
//! Two subsets belong to the same [`Component`] when a chain of pairwise
//! overlapping subsets links them. Components never share a label, so each
//! can be resolved independently and the results combined afterwards.

mod union_find;

use std::collections::{BTreeMap, HashMap, hash_map::Entry};

use tracing::{debug, instrument};

use self::union_find::DisjointSet;
use crate::{
    label::{Label, LabelSet},
    subset::WeightedSubset,
};

/// A maximal cluster of weighted subsets connected by shared labels.
///
/// # Examples
/// ```
/// use geotaxsel_core::{Component, Label, LabelSet, WeightedSubset};
///
/// let set = |names: &[&str]| names.iter().copied().map(Label::from).collect::<LabelSet>();
/// let component = Component::from_subsets([
///     WeightedSubset::new(set(&["A", "B"]), 2.0).expect("valid"),
///     WeightedSubset::new(set(&["B"]), 1.0).expect("valid"),
///     WeightedSubset::new(set(&["A", "B"]), 1.0).expect("valid"),
/// ]);
/// assert_eq!(component.leaves(), &set(&["A", "B"]));
/// assert_eq!(component.subset_count(), 2);
/// assert_eq!(component.weight_of(&set(&["A", "B"])), Some(3.0));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Component {
    leaves: LabelSet,
    subsets: BTreeMap<LabelSet, f64>,
}

impl Component {
    /// Builds a component from its subsets, summing duplicate member sets.
    ///
    /// The leaves are the union of all members. Connectivity is not checked;
    /// [`partition_into_components`] is the way to obtain connected ones.
    #[must_use]
    pub fn from_subsets(subsets: impl IntoIterator<Item = WeightedSubset>) -> Self {
        let mut table = BTreeMap::new();
        for subset in subsets {
            let (members, weight) = subset.into_parts();
            *table.entry(members).or_insert(0.0) += weight;
        }
        Self::from_table(table)
    }

    fn from_table(subsets: BTreeMap<LabelSet, f64>) -> Self {
        let leaves = subsets
            .keys()
            .flat_map(|members| members.iter().cloned())
            .collect();
        Self { leaves, subsets }
    }

    /// Returns every label covered by the component.
    #[must_use]
    pub fn leaves(&self) -> &LabelSet {
        &self.leaves
    }

    /// Iterates over `(members, weight)` pairs in ascending member order.
    pub fn subsets(&self) -> impl ExactSizeIterator<Item = (&LabelSet, f64)> + '_ {
        self.subsets
            .iter()
            .map(|(members, &weight)| (members, weight))
    }

    /// Number of distinct candidate subsets.
    #[must_use]
    pub fn subset_count(&self) -> usize {
        self.subsets.len()
    }

    /// Weight of `members`, if it is a candidate of this component.
    #[must_use]
    pub fn weight_of(&self, members: &LabelSet) -> Option<f64> {
        self.subsets.get(members).copied()
    }

    fn sort_key(&self) -> (usize, usize, &LabelSet) {
        (self.leaves.len(), self.subsets.len(), &self.leaves)
    }
}

/// Incrementally groups weighted subsets into connected components.
///
/// Subsets may be streamed in any order; [`Self::finish`] yields the same
/// components regardless.
#[derive(Debug, Default)]
pub struct ComponentPartitioner {
    members: Vec<LabelSet>,
    weights: Vec<f64>,
    by_members: HashMap<LabelSet, usize>,
    owner: HashMap<Label, usize>,
    sets: DisjointSet,
}

impl ComponentPartitioner {
    /// Creates an empty partitioner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one subset, merging it with every group it shares a label with.
    pub fn add(&mut self, subset: WeightedSubset) {
        let (members, weight) = subset.into_parts();
        let index = match self.by_members.entry(members.clone()) {
            Entry::Occupied(entry) => {
                self.weights[*entry.get()] += weight;
                return;
            }
            Entry::Vacant(entry) => *entry.insert(self.sets.push()),
        };
        for label in &members {
            match self.owner.entry(label.clone()) {
                Entry::Occupied(entry) => {
                    self.sets.union(index, *entry.get());
                }
                Entry::Vacant(entry) => {
                    entry.insert(index);
                }
            }
        }
        self.members.push(members);
        self.weights.push(weight);
    }

    /// Number of distinct member sets seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns whether no subset has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.len() == 0
    }

    /// Consumes the partitioner and returns the components ordered by
    /// `(leaf count, subset count, leaves)`.
    #[must_use]
    pub fn finish(mut self) -> Vec<Component> {
        let mut groups: HashMap<usize, BTreeMap<LabelSet, f64>> = HashMap::new();
        for (index, (members, weight)) in self.members.into_iter().zip(self.weights).enumerate() {
            let root = self.sets.find(index);
            groups.entry(root).or_default().insert(members, weight);
        }
        let mut components: Vec<Component> =
            groups.into_values().map(Component::from_table).collect();
        components.sort_by(|left, right| left.sort_key().cmp(&right.sort_key()));
        components
    }
}

impl Extend<WeightedSubset> for ComponentPartitioner {
    fn extend<I: IntoIterator<Item = WeightedSubset>>(&mut self, iter: I) {
        for subset in iter {
            self.add(subset);
        }
    }
}

/// Splits weighted subsets into label-disjoint connected components.
///
/// Identical member sets have their weights summed. The output order is
/// deterministic and independent of the input order.
///
/// # Examples
/// ```
/// use geotaxsel_core::{Label, LabelSet, WeightedSubset, partition_into_components};
///
/// let subset = |names: &[&str], weight: f64| {
///     let members = names.iter().copied().map(Label::from).collect::<LabelSet>();
///     WeightedSubset::new(members, weight).expect("valid subset")
/// };
/// let components = partition_into_components(&[
///     subset(&["A", "B"], 2.0),
///     subset(&["C"], 1.0),
///     subset(&["B", "C"], 1.0),
///     subset(&["D"], 4.0),
/// ]);
/// assert_eq!(components.len(), 2);
/// assert_eq!(components[0].leaves().len(), 1);
/// assert_eq!(components[1].leaves().len(), 3);
/// ```
#[instrument(name = "core.partition", skip(subsets), fields(subsets = subsets.len()))]
pub fn partition_into_components(subsets: &[WeightedSubset]) -> Vec<Component> {
    let mut partitioner = ComponentPartitioner::new();
    partitioner.extend(subsets.iter().cloned());
    let components = partitioner.finish();
    debug!(components = components.len(), "partitioned subsets");
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn set(names: &[&str]) -> LabelSet {
        names.iter().copied().map(Label::from).collect()
    }

    fn subset(names: &[&str], weight: f64) -> WeightedSubset {
        WeightedSubset::new(set(names), weight).expect("test subsets are valid")
    }

    #[fixture]
    fn chained() -> Vec<WeightedSubset> {
        vec![
            subset(&["A", "B"], 1.0),
            subset(&["E"], 1.0),
            subset(&["C", "D"], 1.0),
            subset(&["B", "C"], 2.0),
            subset(&["F", "G"], 1.0),
        ]
    }

    #[rstest]
    fn chains_of_overlaps_join_one_component(chained: Vec<WeightedSubset>) {
        let components = partition_into_components(&chained);
        let leaves: Vec<&LabelSet> = components.iter().map(Component::leaves).collect();
        assert_eq!(
            leaves,
            vec![&set(&["E"]), &set(&["F", "G"]), &set(&["A", "B", "C", "D"])]
        );
        assert_eq!(components[2].subset_count(), 3);
    }

    #[rstest]
    fn reordering_input_does_not_change_output(chained: Vec<WeightedSubset>) {
        let forward = partition_into_components(&chained);
        let mut reversed = chained;
        reversed.reverse();
        assert_eq!(partition_into_components(&reversed), forward);
    }

    #[test]
    fn duplicate_member_sets_sum_their_weights() {
        let components =
            partition_into_components(&[subset(&["A", "B"], 2.0), subset(&["A", "B"], 0.5)]);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].weight_of(&set(&["A", "B"])), Some(2.5));
        assert_eq!(components[0].subset_count(), 1);
    }

    #[test]
    fn late_bridge_merges_existing_components() {
        let mut partitioner = ComponentPartitioner::new();
        partitioner.add(subset(&["A"], 1.0));
        partitioner.add(subset(&["B"], 1.0));
        partitioner.add(subset(&["A", "B"], 1.0));
        assert_eq!(partitioner.len(), 3);
        let components = partitioner.finish();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].leaves(), &set(&["A", "B"]));
    }

    #[test]
    fn no_subsets_yield_no_components() {
        assert!(partition_into_components(&[]).is_empty());
    }

    mod property {
        use proptest::prelude::*;

        use super::*;
        use crate::test_utils::{instance_strategy, suite_proptest_config};

        proptest! {
            #![proptest_config(suite_proptest_config(128))]

            #[test]
            fn partition_ignores_input_order(
                (original, shuffled) in instance_strategy().prop_flat_map(|instance| {
                    let subsets = instance.subsets;
                    (Just(subsets.clone()), Just(subsets).prop_shuffle())
                }),
            ) {
                let expected = partition_into_components(&original);
                prop_assert_eq!(partition_into_components(&shuffled), expected.clone());

                let leaves: usize = expected.iter().map(|c| c.leaves().len()).sum();
                let union = original
                    .iter()
                    .fold(LabelSet::default(), |acc, subset| acc.union(subset.members()));
                prop_assert_eq!(leaves, union.len());
                for (index, left) in expected.iter().enumerate() {
                    for right in expected.iter().skip(index + 1) {
                        prop_assert!(left.leaves().is_disjoint(right.leaves()));
                    }
                }
            }
        }
    }
}
