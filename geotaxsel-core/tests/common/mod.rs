use geotaxsel_core::{CladeTree, GeoPoint, Label, LabelSet, LocationIndex, NodeId};

#[must_use]
pub fn group(names: &[&str]) -> LabelSet {
    names.iter().copied().map(Label::from).collect()
}

/// Builds `(children):age` with leaves named by the strings in `leaves`.
pub fn clade(tree: &mut CladeTree, age: f64, leaves: &[&str], nested: &[NodeId]) -> NodeId {
    let mut children: Vec<NodeId> = leaves
        .iter()
        .map(|name| tree.push_leaf(Label::from(*name)))
        .collect();
    children.extend_from_slice(nested);
    tree.push_clade(age, children)
        .expect("test trees are well formed")
}

/// `((A,B):1,(C,D):2,(E,F):3):4`
#[must_use]
pub fn balanced_tree() -> CladeTree {
    let mut tree = CladeTree::new();
    let ab = clade(&mut tree, 1.0, &["A", "B"], &[]);
    let cd = clade(&mut tree, 2.0, &["C", "D"], &[]);
    let ef = clade(&mut tree, 3.0, &["E", "F"], &[]);
    clade(&mut tree, 4.0, &[], &[ab, cd, ef]);
    tree
}

/// `((A,B,C):2,(D,(E,F):1):3):5`
#[must_use]
pub fn lopsided_tree() -> CladeTree {
    let mut tree = CladeTree::new();
    let abc = clade(&mut tree, 2.0, &["A", "B", "C"], &[]);
    let ef = clade(&mut tree, 1.0, &["E", "F"], &[]);
    let def = clade(&mut tree, 3.0, &["D"], &[ef]);
    clade(&mut tree, 5.0, &[], &[abc, def]);
    tree
}

/// Every label sits on the equator, ten degrees apart in alphabetical order.
#[must_use]
pub fn equator_locations(names: &[&str]) -> LocationIndex {
    names
        .iter()
        .zip(0_u8..)
        .map(|(name, step)| {
            (
                Label::from(*name),
                vec![GeoPoint::new(0.0, 10.0 * f64::from(step))],
            )
        })
        .collect()
}
