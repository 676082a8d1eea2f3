//! Builder utilities for configuring reconciliation.
//!
//! Exposes the execution strategy surface and the validation performed before
//! constructing [`Reconciler`] instances.

use std::num::NonZeroUsize;

use crate::{Result, error::GeotaxselError, reconciler::Reconciler};

/// Indicates how [`Reconciler`] schedules component resolution.
///
/// `Auto` uses the rayon pool when the `parallel` feature is compiled in and
/// falls back to sequential resolution otherwise, so results are identical
/// across builds.
///
/// # Examples
/// ```
/// use geotaxsel_core::ExecutionStrategy;
///
/// let strategy = ExecutionStrategy::Auto;
/// assert!(matches!(strategy, ExecutionStrategy::Auto));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Let the library pick.
    Auto,
    /// Resolve components one after another on the calling thread.
    Sequential,
    /// Resolve components and top-level branches on the rayon pool.
    Parallel,
}

/// Configures and constructs [`Reconciler`] instances.
///
/// # Examples
/// ```
/// use geotaxsel_core::{ExecutionStrategy, ReconcilerBuilder};
///
/// let reconciler = ReconcilerBuilder::new()
///     .with_target_size(12)
///     .with_execution_strategy(ExecutionStrategy::Sequential)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(reconciler.target_size().get(), 12);
/// assert_eq!(reconciler.execution_strategy(), ExecutionStrategy::Sequential);
/// ```
#[derive(Debug, Clone)]
pub struct ReconcilerBuilder {
    target_size: usize,
    execution_strategy: ExecutionStrategy,
    greedy_steps: usize,
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self {
            target_size: 0,
            execution_strategy: ExecutionStrategy::Auto,
            greedy_steps: 0,
        }
    }
}

impl ReconcilerBuilder {
    /// Creates a builder with no target size, automatic scheduling and an
    /// exact search.
    ///
    /// # Examples
    /// ```
    /// use geotaxsel_core::{ExecutionStrategy, ReconcilerBuilder};
    ///
    /// let builder = ReconcilerBuilder::new();
    /// assert_eq!(builder.target_size(), 0);
    /// assert_eq!(builder.execution_strategy(), ExecutionStrategy::Auto);
    /// assert!(builder.build().is_err());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of groups the final partition must contain.
    #[must_use]
    pub fn with_target_size(mut self, size: usize) -> Self {
        self.target_size = size;
        self
    }

    /// Returns the configured target size.
    #[must_use]
    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Sets the execution strategy.
    ///
    /// # Examples
    /// ```
    /// use geotaxsel_core::{ExecutionStrategy, ReconcilerBuilder};
    ///
    /// let builder = ReconcilerBuilder::new().with_execution_strategy(ExecutionStrategy::Parallel);
    /// assert_eq!(builder.execution_strategy(), ExecutionStrategy::Parallel);
    /// ```
    #[must_use]
    pub fn with_execution_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.execution_strategy = strategy;
        self
    }

    /// Returns the configured execution strategy.
    #[must_use]
    pub fn execution_strategy(&self) -> ExecutionStrategy {
        self.execution_strategy
    }

    /// Explores only the heaviest alternative for the first `steps` levels
    /// of every component search.
    #[must_use]
    pub fn with_greedy_steps(mut self, steps: usize) -> Self {
        self.greedy_steps = steps;
        self
    }

    /// Returns the configured number of greedy levels.
    #[must_use]
    pub fn greedy_steps(&self) -> usize {
        self.greedy_steps
    }

    /// Validates the configuration and constructs a [`Reconciler`].
    ///
    /// # Errors
    /// Returns [`GeotaxselError::InvalidTargetSize`] when the target size is
    /// zero.
    pub fn build(self) -> Result<Reconciler> {
        let target_size = NonZeroUsize::new(self.target_size).ok_or(
            GeotaxselError::InvalidTargetSize {
                got: self.target_size,
            },
        )?;
        Ok(Reconciler::new(
            target_size,
            self.execution_strategy,
            self.greedy_steps,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ExecutionStrategy::Auto, 0)]
    #[case(ExecutionStrategy::Sequential, 2)]
    #[case(ExecutionStrategy::Parallel, 5)]
    fn build_carries_configuration(
        #[case] strategy: ExecutionStrategy,
        #[case] greedy_steps: usize,
    ) {
        let reconciler = ReconcilerBuilder::new()
            .with_target_size(3)
            .with_execution_strategy(strategy)
            .with_greedy_steps(greedy_steps)
            .build()
            .expect("configuration is valid");
        assert_eq!(reconciler.execution_strategy(), strategy);
        assert_eq!(reconciler.greedy_steps(), greedy_steps);
    }

    #[test]
    fn zero_target_is_rejected() {
        let err = ReconcilerBuilder::new()
            .build()
            .expect_err("zero target must fail");
        assert_eq!(err, GeotaxselError::InvalidTargetSize { got: 0 });
    }
}
