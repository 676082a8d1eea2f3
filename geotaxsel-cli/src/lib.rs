//! Support library for the geotaxsel CLI binary.
//!
//! Exposes the command pipeline, logging setup and the external solver runner
//! so integration tests can drive them without spawning the binary.

pub mod cli;
pub mod logging;
