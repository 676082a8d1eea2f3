//! Label and label-set value types.
//!
//! Labels are opaque taxon identifiers. A [`LabelSet`] keeps its members
//! sorted and de-duplicated so equality, hashing and ordering are structural
//! and independent of insertion order.

use std::{borrow::Borrow, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// An immutable taxon identifier.
///
/// Labels compare lexicographically, which gives every tie-break in the
/// crate a stable order.
///
/// # Examples
/// ```
/// use geotaxsel_core::Label;
///
/// let label = Label::new("Microgale dobsoni");
/// assert_eq!(label.as_str(), "Microgale dobsoni");
/// assert!(Label::from("A") < Label::from("B"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(Arc<str>);

impl Label {
    /// Creates a label from any string-like value.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Returns the label text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for Label {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sorted, de-duplicated, immutable set of labels.
///
/// Cloning is cheap: members live behind an [`Arc`].
///
/// # Examples
/// ```
/// use geotaxsel_core::{Label, LabelSet};
///
/// let set = LabelSet::from_iter(["C", "A", "B", "A"].map(Label::from));
/// assert_eq!(set.len(), 3);
/// assert_eq!(set.first().map(Label::as_str), Some("A"));
/// assert!(set.contains(&Label::from("B")));
///
/// let other = LabelSet::from_iter([Label::from("D")]);
/// assert!(set.is_disjoint(&other));
/// assert_eq!(set.union(&other).len(), 4);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Vec<Label>", into = "Vec<Label>")]
pub struct LabelSet(Arc<[Label]>);

impl LabelSet {
    /// Builds a set from arbitrary labels, sorting and removing duplicates.
    #[must_use]
    pub fn new(labels: impl IntoIterator<Item = Label>) -> Self {
        let mut members: Vec<Label> = labels.into_iter().collect();
        members.sort_unstable();
        members.dedup();
        Self(members.into())
    }

    /// Builds a one-element set.
    #[must_use]
    pub fn singleton(label: Label) -> Self {
        Self(Arc::from(vec![label]))
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the smallest member, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Label> {
        self.0.first()
    }

    /// Iterates over members in ascending order.
    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.0.iter()
    }

    /// Returns the members as a sorted slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Label] {
        &self.0
    }

    /// Returns whether `label` is a member.
    #[must_use]
    pub fn contains(&self, label: &Label) -> bool {
        self.0.binary_search(label).is_ok()
    }

    /// Returns whether the two sets share no member.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        let (mut left, mut right) = (self.0.iter().peekable(), other.0.iter().peekable());
        while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
            match a.cmp(b) {
                std::cmp::Ordering::Less => {
                    left.next();
                }
                std::cmp::Ordering::Greater => {
                    right.next();
                }
                std::cmp::Ordering::Equal => return false,
            }
        }
        true
    }

    /// Returns whether every member of `self` is in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.0.iter().all(|label| other.contains(label))
    }

    /// Returns the union of both sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.0.iter().chain(other.0.iter()).cloned())
    }

    /// Returns the members of `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|label| !other.contains(label))
                .cloned()
                .collect(),
        )
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self(Arc::from(Vec::new()))
    }
}

impl FromIterator<Label> for LabelSet {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<Vec<Label>> for LabelSet {
    fn from(value: Vec<Label>) -> Self {
        Self::new(value)
    }
}

impl From<LabelSet> for Vec<Label> {
    fn from(value: LabelSet) -> Self {
        value.0.to_vec()
    }
}

impl fmt::Debug for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.0.iter().map(Label::as_str))
            .finish()
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, label) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(label.as_str())?;
        }
        f.write_str("}")
    }
}
