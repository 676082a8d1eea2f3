//! Synthetic selection tallies for benchmarking.
//!
//! Labels are split into fixed blocks. Every simulated tree cuts each block
//! into contiguous runs, so each block becomes one coverable component whose
//! subset count grows with the number of distinct cut patterns.

use geotaxsel_core::{Label, LabelSet, SelectionTally, SubsetError};
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Errors that may occur during synthetic tally generation.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum SyntheticError {
    /// The requested block count was zero.
    #[error("block count must be greater than zero")]
    ZeroBlocks,
    /// The requested block size was zero.
    #[error("block size must be greater than zero")]
    ZeroBlockSize,
    /// The requested tree count was zero.
    #[error("tree count must be greater than zero")]
    ZeroTrees,
    /// A generated grouping was rejected by the tally.
    #[error("generated grouping was rejected: {0}")]
    Subset(#[from] SubsetError),
}

/// Configuration for synthetic tally generation.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    /// Number of independent label blocks.
    pub block_count: usize,
    /// Labels per block.
    pub block_size: usize,
    /// Number of simulated trees.
    pub tree_count: usize,
    /// Probability of cutting between two adjacent labels.
    pub cut_probability: f64,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

/// Generates a tally in which every block is an independent component.
///
/// # Errors
/// Returns [`SyntheticError`] when any count is zero.
///
/// # Examples
///
/// ```
/// use geotaxsel_benches::source::{SyntheticConfig, synthetic_tally};
///
/// let tally = synthetic_tally(&SyntheticConfig {
///     block_count: 2,
///     block_size: 4,
///     tree_count: 10,
///     cut_probability: 0.5,
///     seed: 7,
/// })
/// .expect("configuration is valid");
/// assert_eq!(tally.trees(), 10);
/// ```
pub fn synthetic_tally(config: &SyntheticConfig) -> Result<SelectionTally, SyntheticError> {
    if config.block_count == 0 {
        return Err(SyntheticError::ZeroBlocks);
    }
    if config.block_size == 0 {
        return Err(SyntheticError::ZeroBlockSize);
    }
    if config.tree_count == 0 {
        return Err(SyntheticError::ZeroTrees);
    }
    let cut = config.cut_probability.clamp(0.0, 1.0);
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let blocks: Vec<Vec<Label>> = (0..config.block_count)
        .map(|block| {
            (0..config.block_size)
                .map(|index| Label::new(format!("B{block:03}T{index:03}")))
                .collect()
        })
        .collect();

    let mut tally = SelectionTally::new();
    for _ in 0..config.tree_count {
        let mut groups = Vec::new();
        for block in &blocks {
            let mut run = Vec::new();
            for label in block {
                if !run.is_empty() && rng.gen_bool(cut) {
                    groups.push(LabelSet::from(std::mem::take(&mut run)));
                }
                run.push(label.clone());
            }
            groups.push(LabelSet::from(run));
        }
        tally.record_tree(groups)?;
    }
    Ok(tally)
}
