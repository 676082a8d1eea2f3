//! Caches owned by a single component resolution.
//!
//! The memo maps each sub-problem to a shared once-cell so concurrent
//! branches compute every sub-problem at most once; late arrivals block on
//! the in-flight computation instead of repeating it.

use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicUsize, Ordering},
};

use bit_set::BitSet;
use dashmap::DashMap;

use super::search::PartialTable;

/// Identifies a sub-problem: labels still to cover and subsets still usable.
///
/// `greedy_left` is part of the key because the same sets explored under a
/// remaining greedy budget yield a narrower table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(super) struct SubproblemKey {
    pub(super) needed: BitSet,
    pub(super) candidates: BitSet,
    pub(super) greedy_left: usize,
}

type MemoCell = Arc<OnceLock<Arc<PartialTable>>>;

#[derive(Debug, Default)]
pub(super) struct MemoCache {
    cells: DashMap<SubproblemKey, MemoCell>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl MemoCache {
    /// Returns the memoised table for `key`, computing it with `compute` on
    /// first use.
    pub(super) fn get_or_compute(
        &self,
        key: SubproblemKey,
        compute: impl FnOnce(&SubproblemKey) -> PartialTable,
    ) -> Arc<PartialTable> {
        let cell = Arc::clone(&self.cells.entry(key.clone()).or_default());
        let mut computed = false;
        let table = cell.get_or_init(|| {
            computed = true;
            Arc::new(compute(&key))
        });
        if computed {
            self.misses.fetch_add(1, Ordering::Relaxed);
            record_miss();
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            record_hit();
        }
        Arc::clone(table)
    }

    pub(super) fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub(super) fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Lazily computed sets of subsets disjoint from a given subset.
#[derive(Debug, Default)]
pub(super) struct CompatibilityCache {
    sets: DashMap<usize, Arc<BitSet>>,
}

impl CompatibilityCache {
    pub(super) fn get_or_insert_with(
        &self,
        subset: usize,
        compute: impl FnOnce() -> BitSet,
    ) -> Arc<BitSet> {
        let entry = self
            .sets
            .entry(subset)
            .or_insert_with(|| Arc::new(compute()));
        Arc::clone(entry.value())
    }

    pub(super) fn len(&self) -> usize {
        self.sets.len()
    }
}

#[cfg(feature = "metrics")]
fn record_hit() {
    metrics::counter!("resolver_memo_hits").increment(1);
}

#[cfg(not(feature = "metrics"))]
fn record_hit() {}

#[cfg(feature = "metrics")]
fn record_miss() {
    metrics::counter!("resolver_memo_misses").increment(1);
}

#[cfg(not(feature = "metrics"))]
fn record_miss() {}

#[cfg(feature = "metrics")]
pub(super) fn record_pruned() {
    metrics::counter!("resolver_pruned_branches").increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(super) fn record_pruned() {}
