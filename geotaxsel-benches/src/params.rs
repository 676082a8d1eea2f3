//! Benchmark parameter types.

use std::fmt;

/// Parameters for a single-component resolution benchmark.
#[derive(Clone, Debug)]
pub struct ResolveBenchParams {
    /// Labels in the component.
    pub block_size: usize,
    /// Greedy levels applied at the top of the search.
    pub greedy_steps: usize,
    /// Whether the root alternatives fan out across threads.
    pub parallel: bool,
}

impl fmt::Display for ResolveBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.parallel { "par" } else { "seq" };
        write!(
            f,
            "n={},greedy={},{mode}",
            self.block_size, self.greedy_steps
        )
    }
}

/// Parameters for a knapsack merge benchmark.
#[derive(Clone, Debug)]
pub struct MergeBenchParams {
    /// Number of independent components.
    pub block_count: usize,
    /// Requested number of groups.
    pub target: usize,
}

impl fmt::Display for MergeBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "components={},target={}", self.block_count, self.target)
    }
}
