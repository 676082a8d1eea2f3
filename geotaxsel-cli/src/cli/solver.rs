//! External solver runner.
//!
//! Each problem is solved by a child process that prints solution JSON on
//! stdout. A child that outlives its wall-clock budget is killed and
//! restarted with one more greedy level, trading exactness for speed, until
//! the attempt limit is reached.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{Span, debug, field, info, instrument, warn};

use super::commands::CliError;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Program, arguments and limits used to run the external solver.
///
/// The solver is invoked as `PROGRAM [ARGS..] PROBLEM --greedy-steps K`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverRunnerConfig {
    program: PathBuf,
    args: Vec<OsString>,
    max_duration: Duration,
    max_attempts: u32,
    poll_interval: Duration,
}

impl SolverRunnerConfig {
    /// Runs `program` with a ten-minute budget and three attempts.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use geotaxsel_cli::cli::SolverRunnerConfig;
    ///
    /// let config = SolverRunnerConfig::new("geotaxsel")
    ///     .with_args(["solve"])
    ///     .with_max_duration(Duration::from_secs(30))
    ///     .with_max_attempts(5);
    /// assert_eq!(config.max_attempts(), 5);
    /// assert_eq!(config.max_duration(), Duration::from_secs(30));
    /// ```
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            max_duration: Duration::from_secs(600),
            max_attempts: 3,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Uses the running binary's own `solve` command.
    ///
    /// # Errors
    /// Returns [`CliError::Io`] when the executable path cannot be resolved.
    pub fn current_exe() -> Result<Self, CliError> {
        let program = std::env::current_exe().map_err(|source| CliError::Io {
            path: PathBuf::from("<current executable>"),
            source,
        })?;
        Ok(Self::new(program).with_args(["solve"]))
    }

    /// Arguments passed before the problem path.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Wall-clock budget for each attempt.
    #[must_use]
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Number of attempts before giving up; at least one is always made.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// How often a running child is checked for completion.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Program to run.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Wall-clock budget for each attempt.
    #[must_use]
    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Number of attempts before giving up.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// How a problem was eventually solved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolveReport {
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Greedy levels used by the successful attempt.
    pub greedy_steps: usize,
}

enum Attempt {
    Finished(ExitStatus),
    TimedOut,
}

/// Runs the external solver with timeout and greedy escalation.
#[derive(Clone, Debug)]
pub struct SolverRunner {
    config: SolverRunnerConfig,
}

impl SolverRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(config: SolverRunnerConfig) -> Self {
        Self { config }
    }

    /// Returns the runner configuration.
    #[must_use]
    pub fn config(&self) -> &SolverRunnerConfig {
        &self.config
    }

    /// Solves `problem`, writing the solver's stdout to `solution`.
    ///
    /// Output is captured in `<solution>.partial` and renamed into place only
    /// after a successful exit; stderr goes to `<solution>-err.txt`.
    ///
    /// # Errors
    /// Returns [`CliError::SolverTimeout`] once every attempt has timed out,
    /// [`CliError::SolverFailed`] when the solver exits unsuccessfully and
    /// [`CliError::Io`] when spawning or file handling fails.
    #[instrument(
        name = "cli.solver",
        err,
        skip(self, problem, solution),
        fields(problem = %problem.display(), attempts = field::Empty),
    )]
    pub fn solve(
        &self,
        problem: &Path,
        solution: &Path,
        greedy_steps: usize,
    ) -> Result<SolveReport, CliError> {
        let partial = sibling(solution, ".partial");
        let stderr_path = sibling(solution, "-err.txt");
        let mut steps = greedy_steps;
        for attempt in 1..=self.config.max_attempts {
            Span::current().record("attempts", attempt);
            match self.attempt(problem, &partial, &stderr_path, steps)? {
                Attempt::Finished(status) if status.success() => {
                    fs::rename(&partial, solution).map_err(|source| CliError::Io {
                        path: solution.to_path_buf(),
                        source,
                    })?;
                    info!(attempt, greedy_steps = steps, "solver finished");
                    return Ok(SolveReport {
                        attempts: attempt,
                        greedy_steps: steps,
                    });
                }
                Attempt::Finished(status) => {
                    warn!(%status, stderr = %stderr_path.display(), "solver failed");
                    return Err(CliError::SolverFailed {
                        problem: problem.to_path_buf(),
                        status: status.to_string(),
                        stderr: stderr_path,
                    });
                }
                Attempt::TimedOut => {
                    warn!(
                        attempt,
                        greedy_steps = steps,
                        budget_ms = self.config.max_duration.as_millis(),
                        "solver timed out, escalating greedy steps"
                    );
                    steps += 1;
                }
            }
        }
        discard(&partial)?;
        Err(CliError::SolverTimeout {
            problem: problem.to_path_buf(),
            attempts: self.config.max_attempts,
            budget: self.config.max_duration,
        })
    }

    fn attempt(
        &self,
        problem: &Path,
        partial: &Path,
        stderr_path: &Path,
        greedy_steps: usize,
    ) -> Result<Attempt, CliError> {
        let stdout = create(partial)?;
        let stderr = create(stderr_path)?;
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(problem)
            .arg("--greedy-steps")
            .arg(greedy_steps.to_string())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| CliError::Io {
                path: self.config.program.clone(),
                source,
            })?;
        debug!(pid = child.id(), greedy_steps, "spawned solver");
        self.wait(&mut child)
            .map_err(|source| CliError::Io {
                path: self.config.program.clone(),
                source,
            })
    }

    fn wait(&self, child: &mut Child) -> std::io::Result<Attempt> {
        let deadline = Instant::now() + self.config.max_duration;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Attempt::Finished(status));
            }
            let now = Instant::now();
            if now >= deadline {
                child.kill()?;
                child.wait()?;
                return Ok(Attempt::TimedOut);
            }
            thread::sleep(self.config.poll_interval.min(deadline - now));
        }
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn create(path: &Path) -> Result<File, CliError> {
    File::create(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn discard(path: &Path) -> Result<(), CliError> {
    match fs::remove_file(path) {
        Err(source) if source.kind() != ErrorKind::NotFound => Err(CliError::Io {
            path: path.to_path_buf(),
            source,
        }),
        _ => Ok(()),
    }
}
