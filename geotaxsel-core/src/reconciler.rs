//! Reconciliation orchestration.
//!
//! Provides the [`Reconciler`] entry point which partitions a selection tally
//! into components, resolves each one, merges the per-component tables for
//! the requested size and reports the support weight of every chosen group.

use std::num::NonZeroUsize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    Result,
    builder::ExecutionStrategy,
    component::{Component, partition_into_components},
    error::GeotaxselError,
    label::LabelSet,
    merge::{MergedSelection, merge_components},
    resolver::{ResolverConfig, SolutionTable, resolve_component_with},
    subset::{SelectionTally, WeightedSubset},
};

/// The best-supported partition for a target size.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reconciliation {
    score: f64,
    groups: Vec<LabelSet>,
    weights: Vec<f64>,
    sizes: Vec<usize>,
}

impl Reconciliation {
    /// Summed weight of the chosen groups.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    /// The chosen groups, component by component.
    #[must_use]
    pub fn groups(&self) -> &[LabelSet] {
        &self.groups
    }

    /// Support weight of each group, aligned with [`Self::groups`].
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of groups chosen from each component, in partition order.
    #[must_use]
    pub fn component_sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Number of connected components the tally split into.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.sizes.len()
    }
}

/// Entry point for reconciling per-tree selections.
///
/// # Examples
/// ```
/// use geotaxsel_core::{Label, LabelSet, ReconcilerBuilder, SelectionTally};
///
/// let group = |names: &[&str]| names.iter().copied().map(Label::from).collect::<LabelSet>();
/// let mut tally = SelectionTally::new();
/// for _ in 0..3 {
///     tally.record_tree([group(&["A", "B"]), group(&["C"])]).expect("disjoint");
/// }
/// tally.record_tree([group(&["A"]), group(&["B", "C"])]).expect("disjoint");
///
/// let reconciler = ReconcilerBuilder::new()
///     .with_target_size(2)
///     .build()
///     .expect("target is positive");
/// let result = reconciler.reconcile(&tally).expect("a 2-group cover exists");
/// assert_eq!(result.score(), 6.0);
/// assert_eq!(result.groups(), &[group(&["A", "B"]), group(&["C"])]);
/// ```
#[derive(Debug, Clone)]
pub struct Reconciler {
    target_size: NonZeroUsize,
    execution_strategy: ExecutionStrategy,
    greedy_steps: usize,
}

impl Reconciler {
    pub(crate) fn new(
        target_size: NonZeroUsize,
        execution_strategy: ExecutionStrategy,
        greedy_steps: usize,
    ) -> Self {
        Self {
            target_size,
            execution_strategy,
            greedy_steps,
        }
    }

    /// Returns the number of groups the final partition contains.
    #[must_use]
    pub fn target_size(&self) -> NonZeroUsize {
        self.target_size
    }

    /// Returns the execution strategy.
    #[must_use]
    pub fn execution_strategy(&self) -> ExecutionStrategy {
        self.execution_strategy
    }

    /// Returns the number of greedy search levels.
    #[must_use]
    pub fn greedy_steps(&self) -> usize {
        self.greedy_steps
    }

    /// Reconciles every grouping recorded in `tally`.
    ///
    /// # Errors
    /// Returns [`GeotaxselError::EmptySelection`] for an empty tally,
    /// [`GeotaxselError::Resolve`] when a component has no exact cover,
    /// [`GeotaxselError::Merge`] when the target cannot be reached and
    /// [`GeotaxselError::BackendUnavailable`] when parallel execution was
    /// requested from a build without it.
    pub fn reconcile(&self, tally: &SelectionTally) -> Result<Reconciliation> {
        self.reconcile_subsets(&tally.weighted_subsets())
    }

    /// Reconciles explicit weighted subsets.
    ///
    /// # Errors
    /// Same as [`Self::reconcile`].
    #[instrument(
        name = "core.reconcile",
        err,
        skip(self, subsets),
        fields(
            subsets = subsets.len(),
            target = self.target_size.get(),
            strategy = ?self.execution_strategy,
        ),
    )]
    pub fn reconcile_subsets(&self, subsets: &[WeightedSubset]) -> Result<Reconciliation> {
        if subsets.is_empty() {
            warn!("selection tally is empty, returning error");
            return Err(GeotaxselError::EmptySelection);
        }
        let components = partition_into_components(subsets);
        let tables = self.resolve_all(&components)?;
        let merged = merge_components(&tables, self.target_size.get())?;
        let sizes = merged.sizes().to_vec();
        let weights = support_weights(&components, &merged);
        let (score, groups) = merged.into_parts();
        info!(
            components = components.len(),
            score,
            groups = groups.len(),
            "reconciliation completed"
        );
        Ok(Reconciliation {
            score,
            groups,
            weights,
            sizes,
        })
    }

    /// Resolves every component with this reconciler's configuration.
    ///
    /// # Errors
    /// Returns [`GeotaxselError::Resolve`] for the first component, in
    /// partition order, that fails, and
    /// [`GeotaxselError::BackendUnavailable`] when parallel execution is
    /// unavailable.
    pub fn resolve_all(&self, components: &[Component]) -> Result<Vec<SolutionTable>> {
        match self.execution_strategy {
            ExecutionStrategy::Sequential => self.resolve_in_sequence(components),
            #[cfg(feature = "parallel")]
            ExecutionStrategy::Auto | ExecutionStrategy::Parallel => {
                self.resolve_in_parallel(components)
            }
            #[cfg(not(feature = "parallel"))]
            ExecutionStrategy::Auto => self.resolve_in_sequence(components),
            #[cfg(not(feature = "parallel"))]
            ExecutionStrategy::Parallel => Err(GeotaxselError::BackendUnavailable {
                requested: ExecutionStrategy::Parallel,
            }),
        }
    }

    fn resolve_one(
        &self,
        index: usize,
        component: &Component,
        config: &ResolverConfig,
    ) -> Result<SolutionTable> {
        resolve_component_with(component, config).map_err(|error| GeotaxselError::Resolve {
            component: index,
            labels: component.leaves().len(),
            error,
        })
    }

    fn resolve_in_sequence(&self, components: &[Component]) -> Result<Vec<SolutionTable>> {
        let config = ResolverConfig::new().with_greedy_steps(self.greedy_steps);
        components
            .iter()
            .enumerate()
            .map(|(index, component)| self.resolve_one(index, component, &config))
            .collect()
    }

    #[cfg(feature = "parallel")]
    #[cfg_attr(docsrs, doc(cfg(feature = "parallel")))]
    fn resolve_in_parallel(&self, components: &[Component]) -> Result<Vec<SolutionTable>> {
        let config = ResolverConfig::new()
            .with_greedy_steps(self.greedy_steps)
            .with_parallel(true);
        let outcomes: Vec<Result<SolutionTable>> = components
            .par_iter()
            .enumerate()
            .map(|(index, component)| self.resolve_one(index, component, &config))
            .collect();
        outcomes.into_iter().collect()
    }
}

/// Looks up each merged group in the component it was resolved from.
fn support_weights(components: &[Component], merged: &MergedSelection) -> Vec<f64> {
    let mut groups = merged.subsets().iter();
    let mut weights = Vec::with_capacity(merged.subsets().len());
    for (component, &size) in components.iter().zip(merged.sizes()) {
        for group in groups.by_ref().take(size) {
            // Resolved groups are always candidates of their component.
            weights.push(component.weight_of(group).unwrap_or_default());
        }
    }
    weights
}
