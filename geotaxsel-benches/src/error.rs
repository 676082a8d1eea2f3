//! Benchmark setup error type.
//!
//! Lets setup functions propagate failures with `?` instead of panicking
//! before Criterion starts measuring.

use crate::source::SyntheticError;
use geotaxsel_core::ResolveError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic tally generation failed.
    #[error("synthetic tally generation failed: {0}")]
    Synthetic(#[from] SyntheticError),
    /// A component could not be resolved.
    #[error("component resolution failed: {0}")]
    Resolve(#[from] ResolveError),
}
