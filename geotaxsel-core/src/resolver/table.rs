//! Per-component solution tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::label::LabelSet;

/// One complete partition of a component's leaves.
///
/// # Examples
/// ```
/// use geotaxsel_core::{Label, LabelSet, Resolution};
///
/// let set = |names: &[&str]| names.iter().copied().map(Label::from).collect::<LabelSet>();
/// let resolution = Resolution::new(5.0, vec![set(&["A", "B"]), set(&["C"])]);
/// assert_eq!(resolution.size(), 2);
/// assert_eq!(resolution.score(), 5.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    size: usize,
    score: f64,
    subsets: Vec<LabelSet>,
}

impl Resolution {
    /// Builds a resolution; its size is the number of subsets used.
    #[must_use]
    pub fn new(score: f64, subsets: Vec<LabelSet>) -> Self {
        Self {
            size: subsets.len(),
            score,
            subsets,
        }
    }

    /// Number of subsets in the partition.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sum of the weights of the subsets used.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    /// The disjoint subsets making up the partition.
    #[must_use]
    pub fn subsets(&self) -> &[LabelSet] {
        &self.subsets
    }

    /// Returns whether the declared size matches the subsets carried.
    pub(crate) fn is_consistent(&self) -> bool {
        self.size == self.subsets.len()
    }
}

/// Best known [`Resolution`] for every achievable partition size.
///
/// Only strictly better scores replace an entry, so the first resolution
/// offered for a size wins ties. Sizes may have gaps.
///
/// # Examples
/// ```
/// use geotaxsel_core::{Label, LabelSet, Resolution, SolutionTable};
///
/// let set = |names: &[&str]| names.iter().copied().map(Label::from).collect::<LabelSet>();
/// let mut table = SolutionTable::new();
/// assert!(table.offer(Resolution::new(1.0, vec![set(&["A", "B"])])));
/// assert!(!table.offer(Resolution::new(1.0, vec![set(&["B", "A"])])));
/// assert!(table.offer(Resolution::new(3.0, vec![set(&["A"]), set(&["B"])])));
/// assert_eq!(table.min_size(), Some(1));
/// assert_eq!(table.max_size(), Some(2));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolutionTable {
    entries: BTreeMap<usize, Resolution>,
}

impl SolutionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `resolution` if it beats the current entry for its size.
    ///
    /// Returns whether the table changed.
    pub fn offer(&mut self, resolution: Resolution) -> bool {
        match self.entries.get(&resolution.size) {
            Some(current) if current.score >= resolution.score => false,
            _ => {
                self.entries.insert(resolution.size, resolution);
                true
            }
        }
    }

    /// Returns the resolution stored for `size`.
    #[must_use]
    pub fn get(&self, size: usize) -> Option<&Resolution> {
        self.entries.get(&size)
    }

    /// Smallest achievable size.
    #[must_use]
    pub fn min_size(&self) -> Option<usize> {
        self.entries.keys().next().copied()
    }

    /// Largest achievable size.
    #[must_use]
    pub fn max_size(&self) -> Option<usize> {
        self.entries.keys().next_back().copied()
    }

    /// Iterates over resolutions in ascending size order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Resolution> + '_ {
        self.entries.values()
    }

    /// Number of distinct sizes recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no resolution has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Resolution> for SolutionTable {
    fn from_iter<I: IntoIterator<Item = Resolution>>(iter: I) -> Self {
        let mut table = Self::new();
        for resolution in iter {
            table.offer(resolution);
        }
        table
    }
}

impl IntoIterator for SolutionTable {
    type Item = Resolution;
    type IntoIter = std::collections::btree_map::IntoValues<usize, Resolution>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}
