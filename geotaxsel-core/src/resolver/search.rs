//! Branch-and-bound exact-cover search over component-local bitsets.

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use bit_set::BitSet;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{
    cache::{CompatibilityCache, MemoCache, SubproblemKey, record_pruned},
    table::{Resolution, SolutionTable},
};
use crate::{component::Component, label::LabelSet};

/// A partial resolution in index form: the subsets picked and their score.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct Partial {
    score: f64,
    picks: Vec<usize>,
}

/// Best partial resolution per size for one sub-problem.
#[derive(Clone, Debug, Default, PartialEq)]
pub(super) struct PartialTable {
    best: BTreeMap<usize, Partial>,
}

impl PartialTable {
    fn offer(&mut self, size: usize, score: f64, picks: impl FnOnce() -> Vec<usize>) {
        match self.best.get(&size) {
            Some(current) if current.score >= score => {}
            _ => {
                self.best.insert(
                    size,
                    Partial {
                        score,
                        picks: picks(),
                    },
                );
            }
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.best.is_empty()
    }
}

struct IndexedSubset {
    members: LabelSet,
    bits: BitSet,
    weight: f64,
}

/// A component rewritten over dense label and subset indices.
pub(super) struct ComponentIndex {
    subsets: Vec<IndexedSubset>,
    /// For every label index, the subsets containing that label.
    containing: Vec<BitSet>,
    labels: usize,
}

impl ComponentIndex {
    pub(super) fn new(component: &Component) -> Self {
        let leaves = component.leaves().as_slice();
        let labels = leaves.len();
        let subset_count = component.subset_count();
        let mut containing = vec![BitSet::with_capacity(subset_count); labels];
        let subsets = component
            .subsets()
            .enumerate()
            .map(|(index, (members, weight))| {
                let mut bits = BitSet::with_capacity(labels);
                for label in members {
                    if let Ok(position) = leaves.binary_search(label) {
                        bits.insert(position);
                        containing[position].insert(index);
                    }
                }
                IndexedSubset {
                    members: members.clone(),
                    bits,
                    weight,
                }
            })
            .collect();
        Self {
            subsets,
            containing,
            labels,
        }
    }

    pub(super) fn all_labels(&self) -> BitSet {
        (0..self.labels).collect()
    }

    pub(super) fn all_subsets(&self) -> BitSet {
        (0..self.subsets.len()).collect()
    }

    /// Converts an index-form table into labelled resolutions.
    pub(super) fn to_solution_table(&self, table: &PartialTable) -> SolutionTable {
        table
            .best
            .values()
            .map(|partial| {
                let subsets = partial
                    .picks
                    .iter()
                    .map(|&index| self.subsets[index].members.clone())
                    .collect();
                Resolution::new(partial.score, subsets)
            })
            .collect()
    }
}

enum Branch {
    /// The alternative alone covers every needed label.
    Complete,
    /// The alternative leaves labels that the sub-table covers.
    Extended(Arc<PartialTable>),
    /// The remaining compatible subsets cannot cover the needed labels.
    Pruned,
}

/// Per-component search state. Dropped when the component completes.
pub(super) struct Search<'a> {
    index: &'a ComponentIndex,
    memo: MemoCache,
    compatible: CompatibilityCache,
    pruned: AtomicUsize,
    parallel: bool,
}

/// Counters gathered while resolving one component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct SearchStats {
    pub(super) memo_hits: usize,
    pub(super) memo_misses: usize,
    pub(super) pruned_branches: usize,
    pub(super) compatibility_sets: usize,
}

impl<'a> Search<'a> {
    pub(super) fn new(index: &'a ComponentIndex, parallel: bool) -> Self {
        Self {
            index,
            memo: MemoCache::default(),
            compatible: CompatibilityCache::default(),
            pruned: AtomicUsize::new(0),
            parallel,
        }
    }

    pub(super) fn stats(&self) -> SearchStats {
        SearchStats {
            memo_hits: self.memo.hits(),
            memo_misses: self.memo.misses(),
            pruned_branches: self.pruned.load(Ordering::Relaxed),
            compatibility_sets: self.compatible.len(),
        }
    }

    /// Solves the whole component.
    pub(super) fn run(&self, greedy_steps: usize) -> Arc<PartialTable> {
        let key = SubproblemKey {
            needed: self.index.all_labels(),
            candidates: self.index.all_subsets(),
            greedy_left: greedy_steps,
        };
        self.memo
            .get_or_compute(key, |key| self.expand(key, self.parallel))
    }

    fn solve(&self, key: SubproblemKey) -> Arc<PartialTable> {
        self.memo.get_or_compute(key, |key| self.expand(key, false))
    }

    fn expand(&self, key: &SubproblemKey, parallel: bool) -> PartialTable {
        let Some(pivot) = self.pivot(&key.needed, &key.candidates) else {
            return PartialTable::default();
        };
        let mut alternatives = self.index.containing[pivot].clone();
        alternatives.intersect_with(&key.candidates);
        let mut others = key.candidates.clone();
        others.difference_with(&alternatives);

        let mut chosen: Vec<usize> = alternatives.iter().collect();
        if key.greedy_left > 0
            && let Some(heaviest) = self.heaviest(&chosen)
        {
            chosen = vec![heaviest];
        }
        let greedy_left = key.greedy_left.saturating_sub(1);

        let branches = self.explore(&chosen, key, &others, greedy_left, parallel);
        let mut table = PartialTable::default();
        for (&alternative, branch) in chosen.iter().zip(branches) {
            let weight = self.index.subsets[alternative].weight;
            match branch {
                Branch::Complete => table.offer(1, weight, || vec![alternative]),
                Branch::Extended(sub) => {
                    for (&size, partial) in &sub.best {
                        table.offer(size + 1, weight + partial.score, || {
                            let mut picks = Vec::with_capacity(partial.picks.len() + 1);
                            picks.push(alternative);
                            picks.extend_from_slice(&partial.picks);
                            picks
                        });
                    }
                }
                Branch::Pruned => {}
            }
        }
        table
    }

    #[cfg(feature = "parallel")]
    fn explore(
        &self,
        chosen: &[usize],
        key: &SubproblemKey,
        others: &BitSet,
        greedy_left: usize,
        parallel: bool,
    ) -> Vec<Branch> {
        if parallel && chosen.len() > 1 {
            chosen
                .par_iter()
                .map(|&alternative| self.branch(alternative, key, others, greedy_left))
                .collect()
        } else {
            chosen
                .iter()
                .map(|&alternative| self.branch(alternative, key, others, greedy_left))
                .collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn explore(
        &self,
        chosen: &[usize],
        key: &SubproblemKey,
        others: &BitSet,
        greedy_left: usize,
        _parallel: bool,
    ) -> Vec<Branch> {
        chosen
            .iter()
            .map(|&alternative| self.branch(alternative, key, others, greedy_left))
            .collect()
    }

    fn branch(
        &self,
        alternative: usize,
        key: &SubproblemKey,
        others: &BitSet,
        greedy_left: usize,
    ) -> Branch {
        let mut remaining = key.needed.clone();
        remaining.difference_with(&self.index.subsets[alternative].bits);
        if remaining.is_empty() {
            return Branch::Complete;
        }
        let compatible = self.compatible_with(alternative);
        let mut candidates = others.clone();
        candidates.intersect_with(&compatible);
        if !self.covers(&candidates, &remaining) {
            self.pruned.fetch_add(1, Ordering::Relaxed);
            record_pruned();
            return Branch::Pruned;
        }
        let sub = self.solve(SubproblemKey {
            needed: remaining,
            candidates,
            greedy_left,
        });
        if sub.is_empty() {
            Branch::Pruned
        } else {
            Branch::Extended(sub)
        }
    }

    /// The needed label contained in the fewest candidates; ties take the
    /// lowest label. `None` when some needed label has no candidate left.
    fn pivot(&self, needed: &BitSet, candidates: &BitSet) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for label in needed {
            let count = self.index.containing[label].intersection(candidates).count();
            if count == 0 {
                return None;
            }
            if best.is_none_or(|(_, fewest)| count < fewest) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label)
    }

    /// Heaviest alternative; ties keep the lowest subset index.
    fn heaviest(&self, alternatives: &[usize]) -> Option<usize> {
        let weight = |subset: usize| self.index.subsets[subset].weight;
        let mut best: Option<usize> = None;
        for &candidate in alternatives {
            if best.is_none_or(|current| weight(candidate) > weight(current)) {
                best = Some(candidate);
            }
        }
        best
    }

    fn compatible_with(&self, subset: usize) -> Arc<BitSet> {
        self.compatible.get_or_insert_with(subset, || {
            let bits = &self.index.subsets[subset].bits;
            self.index
                .subsets
                .iter()
                .enumerate()
                .filter(|(_, other)| other.bits.is_disjoint(bits))
                .map(|(index, _)| index)
                .collect()
        })
    }

    fn covers(&self, candidates: &BitSet, needed: &BitSet) -> bool {
        let mut reachable = BitSet::with_capacity(self.index.labels);
        for candidate in candidates {
            reachable.union_with(&self.index.subsets[candidate].bits);
        }
        needed.is_subset(&reachable)
    }
}
