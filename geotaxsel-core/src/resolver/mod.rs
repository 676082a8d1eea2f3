//! Exact-cover resolution of a single connected component.
//!
//! For every achievable partition size the resolver finds the highest-scoring
//! way to cover the component's leaves exactly once with its candidate
//! subsets. The search branches on the uncovered label with the fewest
//! remaining candidates, prunes branches whose compatible subsets cannot cover
//! what is left, and memoises sub-problems on `(needed labels, candidates)`.

mod cache;
mod search;
mod table;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use self::search::{ComponentIndex, Search};
pub use self::table::{Resolution, SolutionTable};
use crate::{component::Component, error::define_error_codes};

/// Errors raised while resolving a component.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The component has no candidate subsets.
    #[error("component has no candidate subsets")]
    EmptyComponent,
    /// No combination of candidates covers every leaf exactly once.
    #[error("no exact cover exists for {labels} labels over {subsets} subsets")]
    InvalidComponent {
        /// Number of leaves in the component.
        labels: usize,
        /// Number of candidate subsets in the component.
        subsets: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`ResolveError`] variants.
    enum ResolveErrorCode for ResolveError {
        /// The component has no candidate subsets.
        EmptyComponent => EmptyComponent => "RESOLVE_EMPTY_COMPONENT",
        /// No combination of candidates covers every leaf exactly once.
        InvalidComponent => InvalidComponent { .. } => "RESOLVE_INVALID_COMPONENT",
    }
}

/// Tuning knobs for [`resolve_component_with`].
///
/// # Examples
/// ```
/// use geotaxsel_core::ResolverConfig;
///
/// let config = ResolverConfig::new().with_greedy_steps(2);
/// assert_eq!(config.greedy_steps(), 2);
/// assert!(!config.parallel());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    greedy_steps: usize,
    parallel: bool,
}

impl ResolverConfig {
    /// Exact, sequential search.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            greedy_steps: 0,
            parallel: false,
        }
    }

    /// Explores only the heaviest alternative for the first `steps`
    /// recursion levels. Zero keeps the search exact.
    #[must_use]
    pub const fn with_greedy_steps(mut self, steps: usize) -> Self {
        self.greedy_steps = steps;
        self
    }

    /// Explores the first pivot's alternatives on the rayon pool. Ignored in
    /// builds without the `parallel` feature.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Number of leading greedy recursion levels.
    #[must_use]
    pub const fn greedy_steps(&self) -> usize {
        self.greedy_steps
    }

    /// Whether top-level alternatives are explored in parallel.
    #[must_use]
    pub const fn parallel(&self) -> bool {
        self.parallel
    }
}

/// Computes the best resolution for every achievable size using an exact,
/// sequential search.
///
/// # Errors
/// Returns [`ResolveError::EmptyComponent`] for a component without subsets
/// and [`ResolveError::InvalidComponent`] when no exact cover exists.
///
/// # Examples
/// ```
/// use geotaxsel_core::{Component, Label, LabelSet, WeightedSubset, resolve_component};
///
/// let subset = |names: &[&str], weight: f64| {
///     let members = names.iter().copied().map(Label::from).collect::<LabelSet>();
///     WeightedSubset::new(members, weight).expect("valid subset")
/// };
/// let component = Component::from_subsets([
///     subset(&["A", "B"], 5.0),
///     subset(&["A"], 2.0),
///     subset(&["B"], 2.0),
/// ]);
/// let table = resolve_component(&component).expect("component has a cover");
/// assert_eq!(table.get(1).map(|r| r.score()), Some(5.0));
/// assert_eq!(table.get(2).map(|r| r.score()), Some(4.0));
/// ```
pub fn resolve_component(component: &Component) -> Result<SolutionTable, ResolveError> {
    resolve_component_with(component, &ResolverConfig::new())
}

/// Resolves a component with explicit tuning.
///
/// Parallel and sequential searches return identical tables.
///
/// # Errors
/// Same as [`resolve_component`]. A positive `greedy_steps` may miss every
/// cover and report [`ResolveError::InvalidComponent`] for a solvable
/// component.
#[instrument(
    name = "core.resolve",
    err,
    skip(component, config),
    fields(
        labels = component.leaves().len(),
        subsets = component.subset_count(),
        greedy_steps = config.greedy_steps(),
    ),
)]
pub fn resolve_component_with(
    component: &Component,
    config: &ResolverConfig,
) -> Result<SolutionTable, ResolveError> {
    if component.subset_count() == 0 {
        warn!("refusing to resolve a component without subsets");
        return Err(ResolveError::EmptyComponent);
    }
    let index = ComponentIndex::new(component);
    let search = Search::new(&index, config.parallel());
    let partial = search.run(config.greedy_steps());
    let stats = search.stats();
    debug!(
        compatibility_sets = stats.compatibility_sets,
        "resolver caches released"
    );
    if partial.is_empty() {
        warn!(
            pruned = stats.pruned_branches,
            "component admits no exact cover"
        );
        return Err(ResolveError::InvalidComponent {
            labels: component.leaves().len(),
            subsets: component.subset_count(),
        });
    }
    let table = index.to_solution_table(&partial);
    info!(
        sizes = table.len(),
        min_size = table.min_size(),
        max_size = table.max_size(),
        memo_hits = stats.memo_hits,
        memo_misses = stats.memo_misses,
        pruned = stats.pruned_branches,
        "resolved component"
    );
    Ok(table)
}

#[cfg(test)]
mod property;
#[cfg(test)]
mod tests;
