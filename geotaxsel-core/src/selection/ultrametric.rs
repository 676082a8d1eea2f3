//! Age-ordered top-down clade selection on an ultrametric tree.

use std::{cmp::Ordering, collections::BinaryHeap};

use thiserror::Error;
use tracing::{debug, info, instrument};

use super::SelectionError;
use crate::{
    error::define_error_codes,
    label::{Label, LabelSet},
};

/// Errors raised while assembling a [`CladeTree`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TreeError {
    /// A node id did not belong to the tree.
    #[error("node {node} does not exist")]
    UnknownNode {
        /// The unknown node index.
        node: usize,
    },
    /// A node was attached to a second parent.
    #[error("node {node} already has a parent")]
    AlreadyAttached {
        /// The node index.
        node: usize,
    },
    /// A clade was declared without children.
    #[error("clades must have at least one child")]
    EmptyClade,
    /// A clade was younger than one of its children.
    #[error("clade age {age} is younger than child {child}")]
    AgeInversion {
        /// Age given to the new clade.
        age: f64,
        /// The older child.
        child: usize,
    },
    /// The tree did not have exactly one parentless node.
    #[error("tree must have exactly one root (found {roots})")]
    RootCount {
        /// Number of parentless nodes.
        roots: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`TreeError`] variants.
    enum TreeErrorCode for TreeError {
        /// A node id did not belong to the tree.
        UnknownNode => UnknownNode { .. } => "TREE_UNKNOWN_NODE",
        /// A node was attached to a second parent.
        AlreadyAttached => AlreadyAttached { .. } => "TREE_ALREADY_ATTACHED",
        /// A clade was declared without children.
        EmptyClade => EmptyClade => "TREE_EMPTY_CLADE",
        /// A clade was younger than one of its children.
        AgeInversion => AgeInversion { .. } => "TREE_AGE_INVERSION",
        /// The tree did not have exactly one parentless node.
        RootCount => RootCount { .. } => "TREE_ROOT_COUNT",
    }
}

/// Index of a node inside a [`CladeTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
enum NodeKind {
    Leaf(Label),
    Clade(Vec<NodeId>),
}

#[derive(Clone, Debug)]
struct Node {
    age: f64,
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// An ultrametric tree stored as an index arena. Leaves have age zero.
///
/// # Examples
/// ```
/// use geotaxsel_core::{CladeTree, Label};
///
/// let mut tree = CladeTree::new();
/// let a = tree.push_leaf(Label::from("A"));
/// let b = tree.push_leaf(Label::from("B"));
/// let root = tree.push_clade(3.0, [a, b]).expect("children are free");
/// assert_eq!(tree.root().expect("single root"), root);
/// assert_eq!(tree.leaves_under(root).len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CladeTree {
    nodes: Vec<Node>,
}

impl CladeTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a leaf.
    pub fn push_leaf(&mut self, label: Label) -> NodeId {
        self.push(Node {
            age: 0.0,
            parent: None,
            kind: NodeKind::Leaf(label),
        })
    }

    /// Adds a clade of the given age above `children`.
    ///
    /// # Errors
    /// Returns [`TreeError`] when a child is unknown or already attached, the
    /// child list is empty, or a child is older than `age`.
    pub fn push_clade(
        &mut self,
        age: f64,
        children: impl IntoIterator<Item = NodeId>,
    ) -> Result<NodeId, TreeError> {
        let children: Vec<NodeId> = children.into_iter().collect();
        if children.is_empty() {
            return Err(TreeError::EmptyClade);
        }
        for (position, &child) in children.iter().enumerate() {
            let node = self.node(child)?;
            if node.parent.is_some() || children[..position].contains(&child) {
                return Err(TreeError::AlreadyAttached { node: child.0 });
            }
            if node.age > age || age.is_nan() {
                return Err(TreeError::AgeInversion {
                    age,
                    child: child.0,
                });
            }
        }
        let id = NodeId(self.nodes.len());
        for &child in &children {
            self.nodes[child.0].parent = Some(id);
        }
        Ok(self.push(Node {
            age,
            parent: None,
            kind: NodeKind::Clade(children),
        }))
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes
            .get(id.0)
            .ok_or(TreeError::UnknownNode { node: id.0 })
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The single parentless node.
    ///
    /// # Errors
    /// Returns [`TreeError::RootCount`] unless exactly one node lacks a parent.
    pub fn root(&self) -> Result<NodeId, TreeError> {
        let mut roots = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none());
        match (roots.next(), roots.count()) {
            (Some((index, _)), 0) => Ok(NodeId(index)),
            (first, rest) => Err(TreeError::RootCount {
                roots: usize::from(first.is_some()) + rest,
            }),
        }
    }

    /// Age of `node`; leaves are zero.
    ///
    /// # Errors
    /// Returns [`TreeError::UnknownNode`] for foreign ids.
    pub fn age(&self, node: NodeId) -> Result<f64, TreeError> {
        Ok(self.node(node)?.age)
    }

    /// Children of `node`; empty for leaves.
    ///
    /// # Errors
    /// Returns [`TreeError::UnknownNode`] for foreign ids.
    pub fn children(&self, node: NodeId) -> Result<&[NodeId], TreeError> {
        Ok(match &self.node(node)?.kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Clade(children) => children,
        })
    }

    /// Label of a leaf; `None` for clades.
    #[must_use]
    pub fn label(&self, node: NodeId) -> Option<&Label> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Leaf(label) => Some(label),
            NodeKind::Clade(_) => None,
        }
    }

    /// Every leaf label below `node`, or the empty set for foreign ids.
    #[must_use]
    pub fn leaves_under(&self, node: NodeId) -> LabelSet {
        let mut stack = vec![node];
        let mut labels = Vec::new();
        while let Some(current) = stack.pop() {
            match self.nodes.get(current.0).map(|n| &n.kind) {
                Some(NodeKind::Leaf(label)) => labels.push(label.clone()),
                Some(NodeKind::Clade(children)) => stack.extend(children.iter().copied()),
                None => {}
            }
        }
        LabelSet::new(labels)
    }

    /// Display name for `node`: a leaf's label, or `MRCA(x + y)` where `x`
    /// and `y` stand in for the first two children. `None` for foreign ids.
    #[must_use]
    pub fn clade_name(&self, node: NodeId) -> Option<String> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Leaf(label) => Some(label.to_string()),
            NodeKind::Clade(children) => match children.as_slice() {
                [first, second, ..] => Some(format!(
                    "MRCA({} + {})",
                    self.first_leaf(*first)?,
                    self.first_leaf(*second)?
                )),
                [only] => self.clade_name(*only),
                [] => None,
            },
        }
    }

    fn first_leaf(&self, mut node: NodeId) -> Option<&Label> {
        loop {
            match &self.nodes.get(node.0)?.kind {
                NodeKind::Leaf(label) => return Some(label),
                NodeKind::Clade(children) => node = *children.first()?,
            }
        }
    }

    fn is_leaf(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(node.0).map(|n| &n.kind),
            Some(NodeKind::Leaf(_))
        )
    }
}

/// A clade chosen by [`ultrametric_selection`].
#[derive(Clone, Debug, PartialEq)]
pub struct CladeCut {
    /// The selected node.
    pub node: NodeId,
    /// Age of the node.
    pub age: f64,
    /// Distance from the root to the node.
    pub depth_from_root: f64,
    /// Leaves below the node.
    pub labels: LabelSet,
    /// The leaf label, or an `MRCA(x + y)` name for an ancestral clade.
    pub name: String,
}

/// Clades selected from one tree.
#[derive(Clone, Debug, PartialEq)]
pub struct UltrametricSelection {
    cuts: Vec<CladeCut>,
    choices: Option<u128>,
}

impl UltrametricSelection {
    /// Selected clades ordered by their leaf sets.
    #[must_use]
    pub fn cuts(&self) -> &[CladeCut] {
        &self.cuts
    }

    /// Number of ways to pick one taxon per clade, or `None` on overflow.
    #[must_use]
    pub fn choices(&self) -> Option<u128> {
        self.choices
    }

    /// The leaf sets of the selected clades, ready for a
    /// [`crate::SelectionTally`].
    #[must_use]
    pub fn groups(&self) -> Vec<LabelSet> {
        self.cuts.iter().map(|cut| cut.labels.clone()).collect()
    }
}

/// Heap entry: oldest first, then lowest node id.
#[derive(Clone, Copy, Debug)]
struct ByAge {
    age: f64,
    node: NodeId,
}

impl PartialEq for ByAge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ByAge {}

impl PartialOrd for ByAge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByAge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.age
            .total_cmp(&other.age)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Cuts `tree` into `num_taxa` clades by repeatedly splitting the oldest
/// selected clade into its children, starting from the root.
///
/// # Errors
/// - [`SelectionError::InvalidTaxonCount`] when `num_taxa` is zero.
/// - [`SelectionError::TooManyTaxa`] when only leaves remain to split.
/// - [`SelectionError::PolytomyOvershoot`] when splitting a multifurcation
///   passes `num_taxa`.
/// - [`SelectionError::Tree`] when the tree has no single root.
///
/// # Examples
/// ```
/// use geotaxsel_core::{CladeTree, Label, ultrametric_selection};
///
/// let mut tree = CladeTree::new();
/// let [a, b, c] = ["A", "B", "C"].map(|name| tree.push_leaf(Label::from(name)));
/// let ab = tree.push_clade(1.0, [a, b]).expect("valid clade");
/// tree.push_clade(4.0, [ab, c]).expect("valid root");
///
/// let selection = ultrametric_selection(&tree, 2).expect("two clades exist");
/// assert_eq!(selection.cuts().len(), 2);
/// assert_eq!(selection.choices(), Some(2));
/// ```
#[instrument(
    name = "selection.ultrametric",
    err,
    skip(tree),
    fields(nodes = tree.len(), num_taxa = num_taxa),
)]
pub fn ultrametric_selection(
    tree: &CladeTree,
    num_taxa: usize,
) -> Result<UltrametricSelection, SelectionError> {
    if num_taxa == 0 {
        return Err(SelectionError::InvalidTaxonCount { requested: 0 });
    }
    let root = tree.root()?;
    let root_age = tree.age(root)?;
    let mut heap = BinaryHeap::from([ByAge {
        age: root_age,
        node: root,
    }]);
    while heap.len() < num_taxa {
        let Some(oldest) = heap.pop() else { break };
        if tree.is_leaf(oldest.node) {
            return Err(SelectionError::TooManyTaxa {
                requested: num_taxa,
                available: heap.len() + 1,
            });
        }
        for &child in tree.children(oldest.node)? {
            heap.push(ByAge {
                age: tree.age(child)?,
                node: child,
            });
        }
        debug!(
            node = oldest.node.index(),
            age = oldest.age,
            selected = heap.len(),
            "split clade"
        );
    }
    if heap.len() != num_taxa {
        return Err(SelectionError::PolytomyOvershoot {
            requested: num_taxa,
            selected: heap.len(),
        });
    }

    let mut cuts: Vec<CladeCut> = heap
        .into_iter()
        .map(|entry| CladeCut {
            node: entry.node,
            age: entry.age,
            depth_from_root: root_age - entry.age,
            labels: tree.leaves_under(entry.node),
            name: tree.clade_name(entry.node).unwrap_or_default(),
        })
        .collect();
    cuts.sort_by(|left, right| left.labels.cmp(&right.labels));
    let choices = cuts
        .iter()
        .try_fold(1_u128, |acc, cut| acc.checked_mul(cut.labels.len() as u128));
    info!(clades = cuts.len(), choices = ?choices, "selected clades");
    Ok(UltrametricSelection { cuts, choices })
}
