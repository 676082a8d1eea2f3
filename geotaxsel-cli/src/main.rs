//! CLI entry point for geotaxsel.
//!
//! Parses arguments with clap, runs the command, renders its summary to
//! stdout and maps failures to a non-zero exit code. Logging is initialised
//! first so every later step can emit structured diagnostics.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use geotaxsel_cli::{
    cli::{Cli, CliError, render_summary, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let summary = run_cli(cli).context("failed to execute command")?;
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    render_summary(&summary, &mut writer).context("failed to render summary")?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    let Err(err) = try_main() else {
        return ExitCode::SUCCESS;
    };
    let (code, stage_code) = match err.downcast_ref::<CliError>() {
        Some(CliError::Core(core)) => (Some(core.code().as_str()), core.stage_code()),
        Some(CliError::SolverTimeout { .. }) => (Some("CLI_SOLVER_TIMEOUT"), None),
        Some(CliError::SolverFailed { .. }) => (Some("CLI_SOLVER_FAILED"), None),
        _ => (None, None),
    };
    error!(
        error = %format!("{err:#}"),
        code = code.map(field::display),
        stage_code = stage_code.map(|code| field::display(code.as_str())),
        "command execution failed"
    );
    ExitCode::FAILURE
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
