//! Benchmark support crate for geotaxsel.
//!
//! Provides seeded synthetic selection tallies and parameter types used by
//! the Criterion benchmarks for component resolution and knapsack merging.

pub mod error;
pub mod params;
pub mod source;
