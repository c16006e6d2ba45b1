/*
 * controller.rs
 *
 * Owns a Task and its Commands, and runs the monitor-worker-per-Command
 * model straight out of jsi/core.py's ProcessController: start() spawns
 * every Command and a matching monitor thread; each monitor thread blocks
 * on that Command's wait(timeout), marks timed_out and kills on expiry, and
 * always calls on_process_finished when the Command ends. Early exit is a
 * race: whichever monitor thread's Command finishes first with a decisive
 * result calls kill_portfolio() to tear down the rest.
 *
 * kill_portfolio() hands the actual killing to a thread per living Command
 * (the "killer worker" from spec) so a graceful SIGTERM-then-1s-then-
 * SIGKILL never blocks the others -- jsi's _kill_process does the same
 * terminate/sleep/kill dance, just without the explicit thread-per-Command
 * framing Rust's ownership forces on us here. It's a free function, not a
 * Controller method, so both the Controller (external kill/signal bridge)
 * and the monitor threads (early-exit race) can reach it through only an
 * Arc<Task> and an Arc<[Arc<Command>]>.
 */

use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::command::Command;
use crate::error::{PortfolioError, Result};
use crate::task::{Task, TaskStatus};

const KILL_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Knobs the core orchestration logic actually reads. `output_dir`,
/// `supervisor`, and `debug` live on the CLI's own config struct -- the
/// Controller never looks at them.
#[derive(Debug, Clone)]
pub struct Config {
    /// Kill the rest of the portfolio as soon as one Command answers.
    pub early_exit: bool,
    /// Zero means no per-Command deadline.
    pub timeout: Duration,
    /// Delay between successive launches in sequence mode; zero means all
    /// Commands start together.
    pub interval: Duration,
    /// Start Commands one at a time, `interval` apart, instead of all at
    /// once.
    pub sequence: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            early_exit: true,
            timeout: Duration::ZERO,
            interval: Duration::ZERO,
            sequence: false,
        }
    }
}

/// Callback invoked from a monitor thread right after a Command finishes.
pub type ExitCallback = Arc<dyn Fn(&Command, &Task) + Send + Sync>;

/// Orchestrates a race between a portfolio of Commands over one Task.
pub struct Controller {
    pub task: Arc<Task>,
    pub commands: Arc<[Arc<Command>]>,
    config: Config,
    on_exit: Option<ExitCallback>,
    monitors: Vec<JoinHandle<()>>,
}

impl Controller {
    /// # Errors
    ///
    /// Returns [`PortfolioError::NoCommands`] if `commands` is empty.
    pub fn new(task: Arc<Task>, commands: Vec<Arc<Command>>, config: Config) -> Result<Self> {
        if commands.is_empty() {
            return Err(PortfolioError::NoCommands);
        }
        Ok(Self {
            task,
            commands: Arc::from(commands),
            config,
            on_exit: None,
            monitors: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_exit_callback(mut self, callback: ExitCallback) -> Self {
        self.on_exit = Some(callback);
        self
    }

    /// Spawn every Command and a monitor thread per Command. Returns once
    /// all Commands are launched (not once they finish -- call `join` for
    /// that).
    pub fn start(&mut self) {
        self.task.set_status(TaskStatus::Starting, Some(TaskStatus::NotStarted));

        for (index, command) in self.commands.iter().enumerate() {
            let delay = if self.config.sequence {
                self.config.interval.saturating_mul(index as u32)
            } else {
                Duration::ZERO
            };

            let task = Arc::clone(&self.task);
            let commands = Arc::clone(&self.commands);
            let command = Arc::clone(command);
            let config = self.config.clone();
            let on_exit = self.on_exit.clone();

            let handle = thread::Builder::new()
                .name(format!("monitor-{}", command.name))
                .spawn(move || {
                    monitor_process(&task, &commands, &command, delay, &config, on_exit.as_ref());
                })
                .expect("failed to spawn monitor thread");

            self.monitors.push(handle);
        }

        // Soft: a fast Command can finish and call kill_portfolio (which
        // moves status straight to Terminating) while this dispatch loop is
        // still spawning later monitor threads, i.e. before we get here.
        // That's not a bug, just a lost race -- log and move on instead of
        // panicking on the now-stale Starting precondition.
        self.task.try_set_status(TaskStatus::Running, TaskStatus::Starting);
    }

    /// Block until every monitor thread has finished. Idempotent: calling
    /// twice is a no-op the second time since `monitors` is drained.
    pub fn join(&mut self) {
        for handle in self.monitors.drain(..) {
            let _ = handle.join();
        }
        // All monitors only return once their Command has settled. If
        // nothing ever raced to terminate early, status is still Running;
        // if something did, kill_portfolio left it at Terminating. Either
        // way this is the single place that stamps the terminal state --
        // guarded so a second `join()` call is a no-op, not a panic.
        if self.task.status() == TaskStatus::Running {
            self.task.set_status(TaskStatus::Terminating, None);
        }

        // Every monitor has settled and nobody produced a decisive result
        // (e.g. the sole Command's output was unrecognized, or every
        // Command timed out). The Task result is still the contracted
        // UNKNOWN/TIMEOUT/KILLED/ERROR verdict, not left unset.
        if self.task.result().is_none()
            && let Some(result) = self.commands.iter().filter(|c| c.done()).last().map(|c| c.result())
        {
            self.task.set_result(result);
        }

        if self.task.status() == TaskStatus::Terminating {
            self.task.set_status(TaskStatus::Terminated, Some(TaskStatus::Terminating));
        }
    }

    /// Terminate every still-running Command and wait for the portfolio to
    /// settle. Safe to call from any thread, including one racing a
    /// monitor thread's early-exit path, and safe to call more than once.
    pub fn kill(&self) {
        kill_portfolio(&self.task, &self.commands);
    }
}

fn monitor_process(
    task: &Arc<Task>,
    commands: &Arc<[Arc<Command>]>,
    command: &Arc<Command>,
    start_delay: Duration,
    config: &Config,
    on_exit: Option<&ExitCallback>,
) {
    if !start_delay.is_zero() {
        thread::sleep(start_delay);
    }

    if task.status() >= TaskStatus::Terminating {
        return;
    }

    if let Err(err) = command.start() {
        tracing::debug!(command = %command.name, error = %err, "command failed to start");
        return;
    }

    let timeout = if config.timeout.is_zero() {
        None
    } else {
        Some(config.timeout)
    };

    match command.wait(timeout) {
        Ok(()) => {}
        Err(PortfolioError::Timeout(_)) => {
            command.mark_timed_out();
            command.terminate();
            thread::sleep(KILL_GRACE_PERIOD);
            if !command.done() {
                command.kill();
            }
            let _ = command.wait(None);
        }
        Err(err) => {
            tracing::debug!(command = %command.name, error = %err, "monitor wait failed");
            return;
        }
    }

    if let Some(callback) = on_exit {
        callback(command, task);
    }

    on_process_finished(task, commands, command, config);
}

fn on_process_finished(
    task: &Arc<Task>,
    commands: &Arc<[Arc<Command>]>,
    command: &Arc<Command>,
    config: &Config,
) {
    if task.result().is_none() && command.result().is_decisive() {
        task.set_result(command.result());
    }

    if config.early_exit && task.status() == TaskStatus::Running && command.ok() {
        kill_portfolio(task, commands);
    }
}

/// Terminate every started, unfinished Command in the portfolio and block
/// until they've all settled. Shared by `Controller::kill`, the early-exit
/// race in `on_process_finished`, and anything else (the signal bridge,
/// the watchdog) that only holds a `Task`/`Command` handle rather than a
/// whole `Controller`.
pub fn kill_portfolio(task: &Task, commands: &[Arc<Command>]) {
    if !task.try_begin_termination() {
        return;
    }

    let killers: Vec<_> = commands
        .iter()
        .filter(|cmd| cmd.started() && !cmd.done())
        .map(|cmd| {
            let cmd = Arc::clone(cmd);
            thread::spawn(move || {
                cmd.terminate();
                thread::sleep(KILL_GRACE_PERIOD);
                if !cmd.done() {
                    cmd.kill();
                }
            })
        })
        .collect();

    for killer in killers {
        let _ = killer.join();
    }
}
