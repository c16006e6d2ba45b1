/*
 * command.rs
 *
 * One spawned solver invocation. Each Command owns its child process, runs
 * in its own process group (setsid via pre_exec, mirroring the teacher's
 * SpawnAttr process-group flag), and writes stdout/stderr to a Sink. Launch
 * staggering in sequence mode is the Controller's job, not this struct's --
 * see monitor_process's cancellation-aware delay in controller.rs.
 *
 * State is guarded by a single Mutex<Inner> rather than a handful of
 * separate atomics: start/wait/terminate/kill all need a consistent view of
 * "do we have a child, is it already reaped", and a scattered-atomics
 * design invites exactly the races this crate exists to avoid in solvers.
 */

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::classifier::{self, TaskResult};
use crate::error::{InvariantViolation, PortfolioError, Result};

/// Where a Command's stdout/stderr go. The classifier needs to read stdout
/// back after the process exits, so `File` is the only sink that supports
/// that -- `Capture` is a convenience that allocates a temp file under the
/// hood.
#[derive(Debug, Clone)]
pub enum Sink {
    /// Caller-supplied path, e.g. `<input>.<solver>.out`.
    File(PathBuf),
    /// A temp file the Command manages itself.
    Capture,
}

struct Inner {
    child: Option<Child>,
    stdout_path: Option<PathBuf>,
    pid: Option<i32>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    timed_out: bool,
    returncode: Option<i32>,
    result: Option<TaskResult>,
}

/// One solver invocation: executable, args (the input file, if any, is
/// already baked in as the last argv entry -- see
/// `config::SolverDefinition::build_args`), and where its output goes.
pub struct Command {
    pub name: String,
    pub executable: String,
    pub args: Vec<String>,
    pub sink: Sink,
    inner: Mutex<Inner>,
}

impl Command {
    #[must_use]
    pub fn new(name: impl Into<String>, executable: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            args,
            sink: Sink::Capture,
            inner: Mutex::new(Inner {
                child: None,
                stdout_path: None,
                pid: None,
                start_time: None,
                end_time: None,
                timed_out: false,
                returncode: None,
                result: None,
            }),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Sink) -> Self {
        self.sink = sink;
        self
    }

    /// Spawn the child in its own process group so the Controller can
    /// terminate the whole tree with one `killpg`, not just the immediate
    /// child.
    ///
    /// # Errors
    ///
    /// Returns [`PortfolioError::AlreadyStarted`] if called twice, or
    /// [`PortfolioError::Spawn`] if the underlying `exec` fails.
    pub fn start(&self) -> Result<()> {
        let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.child.is_some() {
            return Err(PortfolioError::AlreadyStarted);
        }

        let stdout_path = self.resolve_stdout_path()?;
        let stdout_file = File::create(&stdout_path).map_err(PortfolioError::Spawn)?;
        let stderr_file = stdout_file.try_clone().map_err(PortfolioError::Spawn)?;

        let mut cmd = std::process::Command::new(&self.executable);
        cmd.args(&self.args);
        cmd.stdout(Stdio::from(stdout_file));
        cmd.stderr(Stdio::from(stderr_file));
        cmd.stdin(Stdio::null());

        // SAFETY: setsid() is async-signal-safe and has no preconditions;
        // this closure runs in the forked child before exec, nothing else
        // in it allocates or takes locks.
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        tracing::debug!(command = %self.name, executable = %self.executable, "spawning");
        let child = cmd.spawn().map_err(PortfolioError::Spawn)?;

        guard.pid = Some(child.id() as i32);
        guard.start_time = Some(Instant::now());
        guard.stdout_path = Some(stdout_path);
        guard.child = Some(child);
        Ok(())
    }

    fn resolve_stdout_path(&self) -> Result<PathBuf> {
        match &self.sink {
            Sink::File(path) => Ok(path.clone()),
            Sink::Capture => {
                let mut path = std::env::temp_dir();
                path.push(format!("smt-portfolio-{}-{}.out", std::process::id(), self.name));
                Ok(path)
            }
        }
    }

    #[must_use]
    pub fn pid(&self) -> Option<i32> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pid
    }

    #[must_use]
    pub fn started(&self) -> bool {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).child.is_some()
    }

    #[must_use]
    pub fn done(&self) -> bool {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).end_time.is_some()
    }

    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        let guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let start = guard.start_time?;
        Some(guard.end_time.unwrap_or_else(Instant::now) - start)
    }

    /// Block the calling thread until the child exits or `timeout` elapses,
    /// polling rather than using `Child::wait` directly so a concurrent
    /// `terminate`/`kill` call from another thread is observed promptly.
    ///
    /// # Errors
    ///
    /// Returns [`PortfolioError::NotStarted`] if called before `start`, or
    /// [`PortfolioError::Timeout`] if `timeout` elapses first.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<()> {
        const POLL_INTERVAL: Duration = Duration::from_millis(25);
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            {
                let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                let Some(child) = guard.child.as_mut() else {
                    return Err(PortfolioError::NotStarted);
                };
                if guard.end_time.is_some() {
                    return Ok(());
                }
                if let Some(status) = child.try_wait().map_err(PortfolioError::Io)? {
                    guard.end_time = Some(Instant::now());
                    guard.returncode = Some(exit_status_to_returncode(&status));
                    drop(guard);
                    self.finish();
                    return Ok(());
                }
            }

            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                return Err(PortfolioError::Timeout(timeout.unwrap_or_default()));
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Send SIGTERM to the whole process group.
    pub fn terminate(&self) {
        self.signal_group(libc::SIGTERM);
    }

    /// Send SIGKILL to the whole process group.
    pub fn kill(&self) {
        self.signal_group(libc::SIGKILL);
    }

    fn signal_group(&self, sig: i32) {
        let guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(pid) = guard.pid {
            tracing::debug!(command = %self.name, pid, signal = sig, "sending signal to process group");
            // SAFETY: killpg on a group we created via setsid; a stale pid
            // (process already reaped) just yields ESRCH, which we ignore.
            unsafe {
                libc::killpg(pid, sig);
            }
        }
    }

    /// Mark the deadline as having fired. Called by the monitor worker
    /// before it sends the terminate/kill pair, so the classifier can later
    /// disambiguate TIMEOUT from KILLED.
    pub fn mark_timed_out(&self) {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).timed_out = true;
    }

    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).timed_out
    }

    #[must_use]
    pub fn returncode(&self) -> Option<i32> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).returncode
    }

    /// Classify and cache the result. Safe to call more than once; later
    /// calls just return the cached value.
    ///
    /// # Panics
    ///
    /// Panics if the Command hasn't finished yet.
    pub fn result(&self) -> TaskResult {
        let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(result) = guard.result {
            return result;
        }

        assert!(guard.end_time.is_some(), "{}", InvariantViolation::NotFinished);

        let first_line = guard
            .stdout_path
            .as_deref()
            .map(read_first_line)
            .unwrap_or_default();

        let result = classifier::classify(guard.returncode, guard.timed_out, &first_line);
        tracing::info!(command = %self.name, result = %result, "command classified");
        guard.result = Some(result);
        result
    }

    #[must_use]
    pub fn ok(&self) -> bool {
        self.done() && self.result().is_decisive()
    }

    /// Read back the first line of stdout. Panics (via `result()`'s
    /// assertion) if called before the Command finishes.
    #[must_use]
    pub fn stdout_path(&self) -> Option<PathBuf> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).stdout_path.clone()
    }

    fn finish(&self) {
        let guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        tracing::debug!(
            command = %self.name,
            returncode = ?guard.returncode,
            timed_out = guard.timed_out,
            "command finished"
        );
    }
}

fn exit_status_to_returncode(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        code
    } else if let Some(signal) = status.signal() {
        -signal
    } else {
        -1
    }
}

fn read_first_line(path: &Path) -> String {
    let Ok(file) = File::open(path) else {
        return String::new();
    };
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    let _ = reader.read_line(&mut line);
    line
}

/// Read the whole file back; used by the CLI driver to print the winning
/// solver's output, not by the classifier (which only needs the first line).
pub fn read_stdout_to_string(path: &Path) -> std::io::Result<String> {
    let mut buf = String::new();
    File::open(path)?.read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh_command(name: &str, script: &str) -> Command {
        Command::new(name, "/bin/sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn runs_and_classifies_sat() {
        let cmd = sh_command("t", "echo sat");
        cmd.start().unwrap();
        cmd.wait(Some(Duration::from_secs(5))).unwrap();
        assert!(cmd.done());
        assert_eq!(cmd.result(), TaskResult::Sat);
        assert!(cmd.ok());
    }

    #[test]
    fn wait_times_out_on_slow_command() {
        let cmd = sh_command("slow", "sleep 5; echo sat");
        cmd.start().unwrap();
        let result = cmd.wait(Some(Duration::from_millis(100)));
        assert!(matches!(result, Err(PortfolioError::Timeout(_))));
        cmd.terminate();
        std::thread::sleep(Duration::from_millis(50));
        cmd.kill();
    }

    #[test]
    fn double_start_is_an_error() {
        let cmd = sh_command("t", "echo sat");
        cmd.start().unwrap();
        let err = cmd.start().unwrap_err();
        assert!(matches!(err, PortfolioError::AlreadyStarted));
        cmd.wait(Some(Duration::from_secs(5))).unwrap();
    }

    #[test]
    fn wait_before_start_is_an_error() {
        let cmd = sh_command("t", "echo sat");
        let err = cmd.wait(Some(Duration::from_millis(10))).unwrap_err();
        assert!(matches!(err, PortfolioError::NotStarted));
    }

    #[test]
    #[should_panic(expected = "called before command finished")]
    fn result_before_finish_panics() {
        let cmd = sh_command("t", "sleep 5");
        cmd.start().unwrap();
        let _ = cmd.result();
    }
}
