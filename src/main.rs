/*
 * main.rs
 *
 * Parse args, load config, wire up the Task/Controller/solvers, print the
 * result. Boring on purpose -- the interesting stuff is in the library.
 *
 * Mirrors jsi/cli.py's main(): find available solvers, build one Command
 * per solver, construct a Task + Controller, install the signal bridge,
 * optionally spawn the watchdog once the portfolio is past STARTING, join,
 * exit 0 iff the result is SAT/UNSAT.
 */

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use smt_portfolio::classifier::TaskResult;
use smt_portfolio::command::{self, Command, Sink};
use smt_portfolio::config;
use smt_portfolio::controller::{Config as ControllerConfig, Controller, kill_portfolio};
use smt_portfolio::duration::parse_duration as parse_duration_str;
use smt_portfolio::error::exit_codes;
use smt_portfolio::output::{ResultRow, render_table, stderr_is_terminal, to_csv};
use smt_portfolio::task::Task;
use smt_portfolio::{signal_bridge, watchdog};

/// Race a portfolio of SMT solvers on one input and report the first
/// decisive answer.
#[derive(Parser, Debug)]
#[command(name = "smt-portfolio", version, about)]
struct Cli {
    /// SMT-LIB2 input file to solve.
    input: PathBuf,

    /// Per-solver deadline, e.g. "30s", "5m". Unset means no deadline.
    #[arg(long)]
    timeout: Option<String>,

    /// Delay between successive launches in --sequence mode, e.g. "500ms", "1s".
    #[arg(long, default_value = "0")]
    interval: String,

    /// Start solvers one at a time, `--interval` apart, instead of all at once.
    #[arg(long)]
    sequence: bool,

    /// Run every solver to completion instead of stopping at the first answer.
    #[arg(long)]
    full_run: bool,

    /// Directory to write each solver's stdout to; defaults to the input's
    /// parent directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Spawn a watchdog process that kills orphaned solvers if this process
    /// is killed outright (e.g. SIGKILL, OOM).
    #[arg(long)]
    supervisor: bool,

    /// Emit results as CSV instead of a table.
    #[arg(long)]
    csv: bool,

    /// Raise the log level to debug.
    #[arg(long)]
    debug: bool,

    /// Internal: re-exec entry point for the watchdog process. Not for
    /// direct use.
    #[arg(long, hide = true)]
    watchdog_internal: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.watchdog_internal {
        watchdog::run();
        return ExitCode::SUCCESS;
    }

    let level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(u8::try_from(exit_codes::NOT_DECISIVE).unwrap_or(1))
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    if !cli.input.is_file() {
        bail!("input file not found: {}", cli.input.display());
    }

    let state_dir = config::state_dir();
    let definitions = config::load_definitions(state_dir.as_deref())
        .context("loading solver definitions")?;
    let available = config::find_available_solvers(&definitions, state_dir.as_deref())
        .context("locating solvers on PATH")?;

    if available.is_empty() {
        bail!("no configured solvers were found on PATH");
    }

    let output_dir = cli
        .output
        .clone()
        .or_else(|| cli.input.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let timeout = cli
        .timeout
        .as_deref()
        .map(parse_duration_str)
        .transpose()
        .context("parsing --timeout")?
        .unwrap_or(Duration::ZERO);
    let interval = parse_duration_str(&cli.interval).context("parsing --interval")?;

    let task = Arc::new(Task::new(cli.input.display().to_string()));
    let commands: Vec<Arc<Command>> = available
        .iter()
        .filter_map(|(name, _path)| {
            let def = definitions.get(name)?;
            let stdout_path = output_dir.join(format!(
                "{}.{}.out",
                cli.input.file_name()?.to_string_lossy(),
                name
            ));
            Some(Arc::new(
                Command::new(name.clone(), def.executable.clone(), def.build_args(&cli.input))
                    .with_sink(Sink::File(stdout_path)),
            ))
        })
        .collect();

    if commands.is_empty() {
        bail!("no runnable solver commands were built");
    }

    let mut controller = Controller::new(
        task.clone(),
        commands.clone(),
        ControllerConfig {
            early_exit: !cli.full_run,
            timeout,
            interval,
            sequence: cli.sequence,
        },
    )?;

    let bridge_task = task.clone();
    let bridge_commands = commands.clone();
    let _signal_bridge = signal_bridge::install(move |_sig| {
        kill_portfolio(&bridge_task, &bridge_commands);
    });

    controller.start();

    if cli.supervisor {
        let pids: Vec<i32> = commands.iter().filter_map(|c| c.pid()).collect();
        if let Err(err) = watchdog::spawn(&pids) {
            tracing::debug!(error = %err, "failed to spawn watchdog");
        }
    }

    controller.join();

    let rows: Vec<ResultRow> = commands
        .iter()
        .map(|c| ResultRow {
            solver: c.name.clone(),
            result: if c.done() { c.result() } else { TaskResult::Unknown },
            elapsed: c.elapsed(),
        })
        .collect();

    if cli.csv {
        print!("{}", to_csv(&rows));
    } else {
        if let Some(winner) = commands.iter().find(|c| c.done() && c.ok())
            && let Some(path) = winner.stdout_path()
            && let Ok(text) = command::read_stdout_to_string(&path)
        {
            print!("{text}");
            println!("; (showing result for {})", winner.name);
        }
        eprint!("{}", render_table(&rows, stderr_is_terminal()));
    }

    let code = if task.result().is_some_and(TaskResult::is_decisive) {
        exit_codes::DECISIVE
    } else {
        exit_codes::NOT_DECISIVE
    };
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
