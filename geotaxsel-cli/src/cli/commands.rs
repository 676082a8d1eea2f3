//! Command implementations and argument parsing for the geotaxsel CLI.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use geotaxsel_core::{
    ExecutionStrategy, GeotaxselError, Haversine, Label, LabelSet, LocationIndex, MergedSelection,
    ReconcilerBuilder, Reconciliation, ResolverConfig, SelectionTally, SolutionTable,
    choose_exemplars, merge_components, partition_into_components,
    persist::{self, Manifest, ManifestEntry, PersistError},
    rank_alternatives, resolve_component_with,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::solver::{SolverRunner, SolverRunnerConfig};

/// Name of the manifest written by `export` and read by `merge`.
pub const MANIFEST_FILE: &str = "problems.json";

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "geotaxsel",
    about = "Reconcile per-tree taxon selections into one best-supported partition."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Tally selections, reconcile them and optionally choose exemplars.
    Reconcile(ReconcileCommand),
    /// Write one problem file per component plus a manifest.
    Export(ExportCommand),
    /// Solve one problem file and print the solution JSON.
    Solve(SolveCommand),
    /// Solve every exported problem lacking a solution, then merge.
    Merge(MergeCommand),
}

/// Options accepted by the `reconcile` command.
#[derive(Debug, Args, Clone)]
pub struct ReconcileCommand {
    /// JSON array of trees, each an array of groups of labels.
    #[arg(long)]
    pub selections: PathBuf,

    /// Number of groups in the final partition.
    #[arg(long)]
    pub target: usize,

    /// JSON object mapping labels to `[latitude, longitude]` pairs.
    #[arg(long)]
    pub locations: Option<PathBuf>,

    /// Component scheduling.
    #[arg(long, value_enum, default_value_t = Strategy::Auto)]
    pub strategy: Strategy,

    /// Leading search levels that keep only the heaviest alternative.
    #[arg(long = "greedy-steps", default_value_t = 0)]
    pub greedy_steps: usize,
}

/// Options accepted by the `export` command.
#[derive(Debug, Args, Clone)]
pub struct ExportCommand {
    /// JSON array of trees, each an array of groups of labels.
    #[arg(long)]
    pub selections: PathBuf,

    /// Directory receiving the problem files and manifest.
    #[arg(long = "out-dir")]
    pub out_dir: PathBuf,
}

/// Options accepted by the `solve` command.
#[derive(Debug, Args, Clone)]
pub struct SolveCommand {
    /// Problem file written by `export`.
    pub problem: PathBuf,

    /// Leading search levels that keep only the heaviest alternative.
    #[arg(long = "greedy-steps", default_value_t = 0)]
    pub greedy_steps: usize,
}

/// Options accepted by the `merge` command.
#[derive(Debug, Args, Clone)]
pub struct MergeCommand {
    /// Directory previously populated by `export`.
    #[arg(long = "scratch-dir")]
    pub scratch_dir: PathBuf,

    /// Number of groups in the final partition.
    #[arg(long)]
    pub target: usize,

    /// Solver program; defaults to this binary's `solve` command.
    #[arg(long)]
    pub solver: Option<PathBuf>,

    /// Arguments passed to the solver before the problem path.
    #[arg(long = "solver-arg", allow_hyphen_values = true)]
    pub solver_args: Vec<String>,

    /// Wall-clock budget per solver attempt, in seconds.
    #[arg(long = "max-secs", default_value_t = 600)]
    pub max_secs: u64,

    /// Attempts per problem; each retry adds one greedy level.
    #[arg(long = "max-attempts", default_value_t = 3)]
    pub max_attempts: u32,
}

/// Execution strategies selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Parallel when available.
    Auto,
    /// One component at a time.
    Sequential,
    /// Always parallel.
    Parallel,
}

impl From<Strategy> for ExecutionStrategy {
    fn from(value: Strategy) -> Self {
        match value {
            Strategy::Auto => Self::Auto,
            Strategy::Sequential => Self::Sequential,
            Strategy::Parallel => Self::Parallel,
        }
    }
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// File I/O failed.
    #[error("failed to access `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// An input file was not valid JSON of the expected shape.
    #[error("failed to parse `{path}`: {source}")]
    Json {
        /// Offending file.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// A problem, solution or manifest file was rejected.
    #[error("invalid file `{path}`: {source}")]
    Persist {
        /// Offending file.
        path: PathBuf,
        /// Underlying persistence failure.
        #[source]
        source: PersistError,
    },
    /// The external solver exceeded its budget on every attempt.
    #[error("solver timed out on `{problem}` after {attempts} attempts of {budget:?}")]
    SolverTimeout {
        /// Problem file being solved.
        problem: PathBuf,
        /// Attempts made.
        attempts: u32,
        /// Budget per attempt.
        budget: Duration,
    },
    /// The external solver exited unsuccessfully.
    #[error("solver failed on `{problem}` with {status}; see `{stderr}`")]
    SolverFailed {
        /// Problem file being solved.
        problem: PathBuf,
        /// Exit status description.
        status: String,
        /// File holding the solver's stderr.
        stderr: PathBuf,
    },
    /// Core orchestration failed.
    #[error(transparent)]
    Core(#[from] GeotaxselError),
}

/// Result of executing a CLI command.
#[derive(Debug, Clone)]
pub enum ExecutionSummary {
    /// Output of `reconcile`.
    Reconciled {
        /// The reconciled partition.
        reconciliation: Reconciliation,
        /// Members of each group ranked for sampling, exemplar first, when
        /// locations were supplied.
        choices: Option<Vec<Vec<Label>>>,
    },
    /// Output of `export`.
    Exported {
        /// Path of the written manifest.
        manifest: PathBuf,
        /// Number of problem files written.
        components: usize,
    },
    /// Output of `solve`.
    Solved {
        /// Best resolution per size.
        table: SolutionTable,
    },
    /// Output of `merge`.
    Merged {
        /// Best selection for the target.
        selection: MergedSelection,
        /// Problems solved during this run.
        solved: usize,
    },
}

#[derive(Deserialize)]
#[serde(transparent)]
struct SelectionsFile {
    trees: Vec<Vec<LabelSet>>,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when reading inputs or executing the command fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use geotaxsel_cli::cli::{Cli, Command, ExecutionSummary, ReconcileCommand, Strategy, run_cli};
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let file = NamedTempFile::new()?;
/// let trees = r#"[[["A", "B"], ["C"]], [["A", "B"], ["C"]], [["A"], ["B", "C"]]]"#;
/// std::fs::write(file.path(), trees)?;
/// let cli = Cli {
///     command: Command::Reconcile(ReconcileCommand {
///         selections: file.path().to_path_buf(),
///         target: 2,
///         locations: None,
///         strategy: Strategy::Sequential,
///         greedy_steps: 0,
///     }),
/// };
/// let ExecutionSummary::Reconciled { reconciliation, .. } = run_cli(cli)? else {
///     unreachable!("reconcile yields a reconciliation");
/// };
/// assert_eq!(reconciliation.score(), 4.0);
/// # Ok(())
/// # }
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    let span = Span::current();
    match cli.command {
        Command::Reconcile(command) => {
            span.record("command", "reconcile");
            run_reconcile(command)
        }
        Command::Export(command) => {
            span.record("command", "export");
            run_export(&command)
        }
        Command::Solve(command) => {
            span.record("command", "solve");
            run_solve(&command)
        }
        Command::Merge(command) => {
            span.record("command", "merge");
            run_merge(command)
        }
    }
}

#[instrument(
    name = "cli.reconcile",
    err,
    skip(command),
    fields(target = command.target, strategy = ?command.strategy),
)]
pub(super) fn run_reconcile(command: ReconcileCommand) -> Result<ExecutionSummary, CliError> {
    let reconciler = ReconcilerBuilder::new()
        .with_target_size(command.target)
        .with_execution_strategy(command.strategy.into())
        .with_greedy_steps(command.greedy_steps)
        .build()?;
    let tally = load_tally(&command.selections)?;
    let reconciliation = reconciler.reconcile(&tally)?;
    let choices = match &command.locations {
        Some(path) => {
            let locations: LocationIndex = read_json(path)?;
            Some(ranked_choices(reconciliation.groups(), &locations)?)
        }
        None => None,
    };
    info!(
        trees = tally.trees(),
        score = reconciliation.score(),
        "reconcile completed"
    );
    Ok(ExecutionSummary::Reconciled {
        reconciliation,
        choices,
    })
}

/// Picks an exemplar per group, then orders the remaining members as backups.
fn ranked_choices(
    groups: &[LabelSet],
    locations: &LocationIndex,
) -> Result<Vec<Vec<Label>>, GeotaxselError> {
    let distance = Haversine::default();
    let exemplars = choose_exemplars(groups, locations, &distance)?;
    let choices = groups
        .iter()
        .zip(&exemplars)
        .map(|(group, exemplar)| rank_alternatives(group, exemplar, locations, &distance))
        .collect::<Result<_, _>>()?;
    Ok(choices)
}

#[instrument(name = "cli.export", err, skip(command), fields(out_dir = %command.out_dir.display()))]
pub(super) fn run_export(command: &ExportCommand) -> Result<ExecutionSummary, CliError> {
    let tally = load_tally(&command.selections)?;
    let components = partition_into_components(&tally.weighted_subsets());
    fs::create_dir_all(&command.out_dir).map_err(|source| io_error(&command.out_dir, source))?;

    let mut manifest = Manifest::default();
    for (index, component) in components.iter().enumerate() {
        let entry = ManifestEntry {
            problem: format!("component-{index:04}.json"),
            solution: format!("component-{index:04}.solution.json"),
            labels: component.leaves().len(),
        };
        let path = command.out_dir.join(&entry.problem);
        write_atomically(&path, |writer| persist::write_problem(component, writer))?;
        manifest.components.push(entry);
    }
    let manifest_path = command.out_dir.join(MANIFEST_FILE);
    write_atomically(&manifest_path, |writer| {
        persist::write_manifest(&manifest, writer)
    })?;
    info!(components = components.len(), "export completed");
    Ok(ExecutionSummary::Exported {
        manifest: manifest_path,
        components: components.len(),
    })
}

#[instrument(
    name = "cli.solve",
    err,
    skip(command),
    fields(problem = %command.problem.display(), greedy_steps = command.greedy_steps),
)]
pub(super) fn run_solve(command: &SolveCommand) -> Result<ExecutionSummary, CliError> {
    let component = persist::read_problem(open(&command.problem)?)
        .map_err(|source| persist_error(&command.problem, source))?;
    let config = ResolverConfig::new()
        .with_greedy_steps(command.greedy_steps)
        .with_parallel(true);
    let resolved = resolve_component_with(&component, &config);
    let table = resolved.map_err(|error| GeotaxselError::Resolve {
        component: 0,
        labels: component.leaves().len(),
        error,
    })?;
    Ok(ExecutionSummary::Solved { table })
}

#[instrument(
    name = "cli.merge",
    err,
    skip(command),
    fields(scratch_dir = %command.scratch_dir.display(), target = command.target),
)]
pub(super) fn run_merge(command: MergeCommand) -> Result<ExecutionSummary, CliError> {
    let manifest_path = command.scratch_dir.join(MANIFEST_FILE);
    let manifest = persist::read_manifest(open(&manifest_path)?)
        .map_err(|source| persist_error(&manifest_path, source))?;
    let config = match command.solver {
        Some(program) => SolverRunnerConfig::new(program),
        None => SolverRunnerConfig::current_exe()?,
    };
    let config = if command.solver_args.is_empty() {
        config
    } else {
        config.with_args(command.solver_args)
    };
    let runner = SolverRunner::new(
        config
            .with_max_duration(Duration::from_secs(command.max_secs))
            .with_max_attempts(command.max_attempts),
    );

    let mut solved = 0;
    let mut tables = Vec::with_capacity(manifest.components.len());
    for entry in &manifest.components {
        let solution = command.scratch_dir.join(&entry.solution);
        if !solution.exists() {
            runner.solve(&command.scratch_dir.join(&entry.problem), &solution, 0)?;
            solved += 1;
        }
        let table = persist::read_solution(open(&solution)?)
            .map_err(|source| persist_error(&solution, source))?;
        tables.push(table);
    }
    let selection = merge_components(&tables, command.target).map_err(GeotaxselError::from)?;
    info!(solved, score = selection.score(), "merge completed");
    Ok(ExecutionSummary::Merged { selection, solved })
}

pub(super) fn load_tally(path: &Path) -> Result<SelectionTally, CliError> {
    let file: SelectionsFile = read_json(path)?;
    let mut tally = SelectionTally::new();
    for groups in file.trees {
        tally.record_tree(groups).map_err(GeotaxselError::from)?;
    }
    Ok(tally)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    serde_json::from_reader(open(path)?).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn open(path: &Path) -> Result<BufReader<File>, CliError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: io::Error) -> CliError {
    CliError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn persist_error(path: &Path, source: PersistError) -> CliError {
    CliError::Persist {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes through `<path>.tmp` and renames, so readers never see a partial
/// file.
pub(super) fn write_atomically(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<(), PersistError>,
) -> Result<(), CliError> {
    let mut temporary = path.as_os_str().to_owned();
    temporary.push(".tmp");
    let temporary = PathBuf::from(temporary);
    let mut writer =
        BufWriter::new(File::create(&temporary).map_err(|source| io_error(&temporary, source))?);
    write(&mut writer).map_err(|source| persist_error(&temporary, source))?;
    writer
        .flush()
        .map_err(|source| io_error(&temporary, source))?;
    drop(writer);
    fs::rename(&temporary, path).map_err(|source| io_error(path, source))
}

/// Renders `summary` to `writer`.
///
/// `solve` output is the solution JSON itself; every other command prints a
/// short human-readable report.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use geotaxsel_cli::cli::{ExecutionSummary, render_summary};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let summary = ExecutionSummary::Exported {
///     manifest: "scratch/problems.json".into(),
///     components: 2,
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// assert_eq!(String::from_utf8(buffer)?, "manifest: scratch/problems.json\ncomponents: 2\n");
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    match summary {
        ExecutionSummary::Reconciled {
            reconciliation,
            choices,
        } => {
            writeln!(writer, "score: {}", reconciliation.score())?;
            writeln!(writer, "groups: {}", reconciliation.groups().len())?;
            let weights = reconciliation.weights();
            let rows = reconciliation.groups().iter().zip(weights);
            for (index, (group, weight)) in rows.enumerate() {
                write!(writer, "{index}\t{}\t{weight}\t{group}", group.len())?;
                let ranked = choices.as_ref().and_then(|all| all.get(index));
                for label in ranked.into_iter().flatten() {
                    write!(writer, "\t{label}")?;
                }
                writeln!(writer)?;
            }
        }
        ExecutionSummary::Exported {
            manifest,
            components,
        } => {
            writeln!(writer, "manifest: {}", manifest.display())?;
            writeln!(writer, "components: {components}")?;
        }
        ExecutionSummary::Solved { table } => {
            persist::write_solution(table, &mut writer).map_err(io::Error::other)?;
            writeln!(writer)?;
        }
        ExecutionSummary::Merged { selection, solved } => {
            writeln!(writer, "score: {}", selection.score())?;
            writeln!(writer, "solved: {solved}")?;
            writeln!(writer, "sizes: {:?}", selection.sizes())?;
            for (index, group) in selection.subsets().iter().enumerate() {
                writeln!(writer, "{index}\t{group}")?;
            }
        }
    }
    Ok(())
}
