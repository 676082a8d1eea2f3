//! Growable union-find used to merge subsets that share a label.

/// Disjoint sets over subset indices, with path halving on lookup and the
/// smaller tree hung below the larger on union.
#[derive(Clone, Debug, Default)]
pub(super) struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    /// Appends a fresh singleton and returns its index.
    pub(super) fn push(&mut self) -> usize {
        let index = self.parent.len();
        self.parent.push(index);
        self.size.push(1);
        index
    }

    pub(super) fn len(&self) -> usize {
        self.parent.len()
    }

    pub(super) fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            let grandparent = self.parent[self.parent[node]];
            self.parent[node] = grandparent;
            node = grandparent;
        }
        node
    }

    /// Merges the sets holding `left` and `right`, returning the new root.
    pub(super) fn union(&mut self, left: usize, right: usize) -> usize {
        let (left, right) = (self.find(left), self.find(right));
        if left == right {
            return left;
        }
        let (root, child) = if self.size[left] < self.size[right] {
            (right, left)
        } else {
            (left, right)
        };
        self.parent[child] = root;
        self.size[root] += self.size[child];
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_links_transitively() {
        let mut sets = DisjointSet::default();
        let [a, b, c, d] = [sets.push(), sets.push(), sets.push(), sets.push()];
        sets.union(a, b);
        sets.union(c, b);
        assert_eq!(sets.find(a), sets.find(c));
        assert_ne!(sets.find(a), sets.find(d));
        assert_eq!(sets.len(), 4);
    }

    #[test]
    fn larger_set_keeps_its_root() {
        let mut sets = DisjointSet::default();
        let [a, b, c, d] = [sets.push(), sets.push(), sets.push(), sets.push()];
        let pair = sets.union(a, b);
        let triple = sets.union(d, pair);
        assert_eq!(triple, pair);
        assert_eq!(sets.union(c, d), pair);
        assert_eq!(sets.size[pair], 4);
    }

    #[test]
    fn lookups_halve_long_chains() {
        let mut sets = DisjointSet::default();
        let nodes: Vec<usize> = (0..5).map(|_| sets.push()).collect();
        for pair in nodes.windows(2) {
            sets.parent[pair[0]] = pair[1];
        }
        assert_eq!(sets.find(nodes[0]), nodes[4]);
        assert_eq!(sets.parent[nodes[0]], nodes[2]);
        assert_eq!(sets.parent[nodes[2]], nodes[4]);
    }
}
