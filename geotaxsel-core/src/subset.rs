//! Weighted subsets and the per-tree selection tally that produces them.
//!
//! Every input tree contributes a set of disjoint label groups. Identical
//! groups seen in several trees accumulate into one [`WeightedSubset`] whose
//! weight is the number of trees that produced exactly that grouping.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::debug;

use crate::{
    error::define_error_codes,
    label::{Label, LabelSet},
};

/// Errors raised while building weighted subsets.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SubsetError {
    /// A subset had no members.
    #[error("weighted subsets must contain at least one label")]
    EmptySubset,
    /// A weight was zero, negative or not finite.
    #[error("subset weight must be finite and positive (got {weight})")]
    InvalidWeight {
        /// The rejected weight.
        weight: f64,
    },
    /// Two groups reported for the same tree shared a label.
    #[error("tree #{tree} places label `{label}` in more than one group")]
    OverlappingGroups {
        /// Zero-based index of the offending tree.
        tree: usize,
        /// The label that appeared twice.
        label: Label,
    },
}

define_error_codes! {
    /// Stable codes describing [`SubsetError`] variants.
    enum SubsetErrorCode for SubsetError {
        /// A subset had no members.
        EmptySubset => EmptySubset => "SUBSET_EMPTY",
        /// A weight was zero, negative or not finite.
        InvalidWeight => InvalidWeight { .. } => "SUBSET_INVALID_WEIGHT",
        /// Two groups reported for the same tree shared a label.
        OverlappingGroups => OverlappingGroups { .. } => "SUBSET_OVERLAPPING_GROUPS",
    }
}

/// A non-empty label set together with its supporting weight.
///
/// # Examples
/// ```
/// use geotaxsel_core::{Label, LabelSet, WeightedSubset};
///
/// let members = LabelSet::from_iter([Label::from("A"), Label::from("B")]);
/// let subset = WeightedSubset::new(members, 3.0).expect("subset is valid");
/// assert_eq!(subset.weight(), 3.0);
/// assert!(WeightedSubset::new(LabelSet::default(), 1.0).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedSubset {
    members: LabelSet,
    weight: f64,
}

impl WeightedSubset {
    /// Validates and builds a weighted subset.
    ///
    /// # Errors
    /// Returns [`SubsetError::EmptySubset`] for an empty member set and
    /// [`SubsetError::InvalidWeight`] unless the weight is finite and positive.
    pub fn new(members: LabelSet, weight: f64) -> Result<Self, SubsetError> {
        validate_weight(weight)?;
        if members.is_empty() {
            return Err(SubsetError::EmptySubset);
        }
        Ok(Self { members, weight })
    }

    /// Returns the members.
    #[must_use]
    pub fn members(&self) -> &LabelSet {
        &self.members
    }

    /// Returns the supporting weight.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Splits the subset into its members and weight.
    #[must_use]
    pub fn into_parts(self) -> (LabelSet, f64) {
        (self.members, self.weight)
    }
}

pub(crate) fn validate_weight(weight: f64) -> Result<(), SubsetError> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(SubsetError::InvalidWeight { weight })
    }
}

/// Accumulates the groupings produced by each input tree.
///
/// # Examples
/// ```
/// use geotaxsel_core::{Label, LabelSet, SelectionTally};
///
/// let group = |names: &[&str]| names.iter().copied().map(Label::from).collect::<LabelSet>();
/// let mut tally = SelectionTally::new();
/// tally.record_tree([group(&["A", "B"]), group(&["C"])]).expect("groups are disjoint");
/// tally.record_tree([group(&["A", "B"]), group(&["C"])]).expect("groups are disjoint");
/// tally.record_tree([group(&["A"]), group(&["B", "C"])]).expect("groups are disjoint");
///
/// assert_eq!(tally.trees(), 3);
/// assert_eq!(tally.weight_of(&group(&["A", "B"])), Some(2.0));
/// assert_eq!(tally.weighted_subsets().len(), 4);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SelectionTally {
    counts: BTreeMap<LabelSet, f64>,
    trees: usize,
}

impl SelectionTally {
    /// Creates an empty tally.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the disjoint groups selected from one tree.
    ///
    /// Each group gains one unit of weight. The tally is left unchanged when
    /// the groups are rejected.
    ///
    /// # Errors
    /// Returns [`SubsetError::EmptySubset`] when a group is empty and
    /// [`SubsetError::OverlappingGroups`] when two groups share a label.
    pub fn record_tree<I>(&mut self, groups: I) -> Result<(), SubsetError>
    where
        I: IntoIterator<Item = LabelSet>,
    {
        let tree = self.trees;
        let groups: Vec<LabelSet> = groups.into_iter().collect();
        let mut owner: HashMap<&Label, usize> = HashMap::new();
        for (index, group) in groups.iter().enumerate() {
            if group.is_empty() {
                return Err(SubsetError::EmptySubset);
            }
            for label in group {
                if owner.insert(label, index).is_some() {
                    return Err(SubsetError::OverlappingGroups {
                        tree,
                        label: label.clone(),
                    });
                }
            }
        }
        for group in groups {
            *self.counts.entry(group).or_insert(0.0) += 1.0;
        }
        self.trees += 1;
        debug!(
            tree,
            distinct = self.counts.len(),
            "recorded tree groupings"
        );
        Ok(())
    }

    /// Adds `weight` to a single grouping without counting a tree.
    ///
    /// # Errors
    /// Returns [`SubsetError`] for an empty group or an invalid weight.
    pub fn record(&mut self, group: LabelSet, weight: f64) -> Result<(), SubsetError> {
        validate_weight(weight)?;
        if group.is_empty() {
            return Err(SubsetError::EmptySubset);
        }
        *self.counts.entry(group).or_insert(0.0) += weight;
        Ok(())
    }

    /// Number of trees recorded through [`Self::record_tree`].
    #[must_use]
    pub fn trees(&self) -> usize {
        self.trees
    }

    /// Returns whether no grouping has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Accumulated weight of `group`, if it was ever recorded.
    #[must_use]
    pub fn weight_of(&self, group: &LabelSet) -> Option<f64> {
        self.counts.get(group).copied()
    }

    /// Returns the tally as weighted subsets in ascending member order.
    #[must_use]
    pub fn weighted_subsets(&self) -> Vec<WeightedSubset> {
        self.counts
            .iter()
            .map(|(members, &weight)| WeightedSubset {
                members: members.clone(),
                weight,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn group(names: &[&str]) -> LabelSet {
        names.iter().copied().map(Label::from).collect()
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn rejects_invalid_weights(#[case] weight: f64) {
        let err = WeightedSubset::new(group(&["A"]), weight).expect_err("weight must be rejected");
        assert_eq!(err.code(), SubsetErrorCode::InvalidWeight);
    }

    #[test]
    fn overlapping_groups_leave_tally_untouched() {
        let mut tally = SelectionTally::new();
        tally
            .record_tree([group(&["A"]), group(&["B"])])
            .expect("first tree is valid");
        let err = tally
            .record_tree([group(&["A", "B"]), group(&["B", "C"])])
            .expect_err("overlap must be rejected");
        assert_eq!(
            err,
            SubsetError::OverlappingGroups {
                tree: 1,
                label: Label::from("B"),
            }
        );
        assert_eq!(tally.trees(), 1);
        assert_eq!(tally.weighted_subsets().len(), 2);
    }

    #[test]
    fn record_accumulates_fractional_weights() {
        let mut tally = SelectionTally::new();
        tally.record(group(&["A"]), 0.5).expect("valid weight");
        tally.record(group(&["A"]), 0.25).expect("valid weight");
        assert_eq!(tally.weight_of(&group(&["A"])), Some(0.75));
        assert_eq!(tally.trees(), 0);
    }

    #[test]
    fn empty_group_is_rejected() {
        let mut tally = SelectionTally::new();
        let err = tally
            .record_tree([group(&["A"]), LabelSet::default()])
            .expect_err("empty groups are invalid");
        assert_eq!(err.code().as_str(), "SUBSET_EMPTY");
        assert!(tally.is_empty());
    }
}
