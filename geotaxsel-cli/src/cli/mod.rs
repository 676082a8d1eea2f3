//! Command-line interface orchestration for geotaxsel.
//!
//! `reconcile` runs the whole pipeline in process. `export`, `solve` and
//! `merge` split it across processes: components are written to disk, each
//! one is solved by an external program under a time budget, and the
//! solutions are merged for the requested size.

mod commands;
mod solver;

pub use commands::{
    Cli, CliError, Command, ExecutionSummary, ExportCommand, MANIFEST_FILE, MergeCommand,
    ReconcileCommand, SolveCommand, Strategy, render_summary, run_cli,
};
pub use solver::{SolveReport, SolverRunner, SolverRunnerConfig};
