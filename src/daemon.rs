/*
 * daemon.rs
 *
 * Unix-domain-socket server: one persistent process serving repeated
 * "race a portfolio over this file" requests instead of paying process
 * startup and solver-discovery cost on every invocation. Grounded in
 * jsi/server.py's Server/ResultListener -- accept() loop, one Controller
 * per connection, early_exit always on since a daemon client wants the
 * first decisive answer, not an exhaustive run.
 *
 * Gated behind the `daemon` feature: it's not part of the core contract,
 * just carried forward because the original shipped it and a from-scratch
 * reader of this crate should be able to run it end-to-end the way `jsi`
 * does.
 */

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::classifier::TaskResult;
use crate::command::{self, Command, Sink};
use crate::config::Definitions;
use crate::controller::{Config as ControllerConfig, Controller};
use crate::task::Task;

/// Bound and serving at `socket_path` until the process is killed.
///
/// # Errors
///
/// Returns an error if the socket can't be bound (address in use, parent
/// directory missing).
pub fn serve(socket_path: &Path, definitions: &Definitions, timeout: std::time::Duration) -> std::io::Result<()> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let listener = UnixListener::bind(socket_path)?;
    tracing::info!(socket = %socket_path.display(), "daemon listening");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(err) = handle_connection(stream, definitions, timeout) {
                    tracing::debug!(error = %err, "daemon connection failed");
                }
            }
            Err(err) => tracing::debug!(error = %err, "daemon accept failed"),
        }
    }

    Ok(())
}

fn handle_connection(
    mut stream: UnixStream,
    definitions: &Definitions,
    timeout: std::time::Duration,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let input_path = PathBuf::from(line.trim());

    let (result, stdout) = solve(&input_path, definitions, timeout);

    writeln!(stream, "{result}")?;
    stream.write_all(stdout.as_bytes())?;
    Ok(())
}

/// Race the portfolio over `input_path`, returning the winning Task result
/// and the winning Command's captured stdout. Mirrors `jsi/server.py`'s
/// `Server.solve`.
#[must_use]
pub fn solve(
    input_path: &Path,
    definitions: &Definitions,
    timeout: std::time::Duration,
) -> (TaskResult, String) {
    let task = Arc::new(Task::new(input_path.display().to_string()));

    let commands: Vec<Arc<Command>> = definitions
        .iter()
        .map(|(name, def)| {
            Arc::new(
                Command::new(name.clone(), def.executable.clone(), def.build_args(input_path))
                    .with_sink(Sink::Capture),
            )
        })
        .collect();

    if commands.is_empty() {
        return (TaskResult::Error, String::new());
    }

    let mut controller = Controller::new(
        task.clone(),
        commands.clone(),
        ControllerConfig {
            early_exit: true,
            timeout,
            interval: std::time::Duration::ZERO,
            sequence: false,
        },
    )
    .expect("commands list checked non-empty above");

    controller.start();
    controller.join();

    let winner = commands.iter().find(|c| c.done() && c.ok());
    let stdout = winner
        .and_then(|c| c.stdout_path())
        .and_then(|p| command::read_stdout_to_string(&p).ok())
        .unwrap_or_default();

    (task.result().unwrap_or(TaskResult::Unknown), stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverDefinition;

    #[test]
    fn solve_with_no_definitions_is_an_error_result() {
        let defs = Definitions::new();
        let (result, stdout) = solve(Path::new("/dev/null"), &defs, std::time::Duration::from_secs(5));
        assert_eq!(result, TaskResult::Error);
        assert!(stdout.is_empty());
    }

    #[test]
    fn solve_races_a_single_mock_solver() {
        let mut defs = Definitions::new();
        defs.insert(
            "mock".into(),
            SolverDefinition {
                executable: "/bin/sh".into(),
                model: None,
                args: vec!["-c".into(), "echo sat".into()],
            },
        );
        let (result, _stdout) = solve(Path::new("ignored"), &defs, std::time::Duration::from_secs(5));
        assert_eq!(result, TaskResult::Sat);
    }
}
