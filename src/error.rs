/*
 * error.rs
 *
 * Two very different kinds of failure live here. Invariant violations
 * (backwards status transition, double start(), result() before the
 * Command finished) are programmer errors -- raised via InvariantViolation
 * and never caught internally. Everything else a caller is expected to
 * handle locally (a Timeout on wait(), a spawn failure) is a PortfolioError.
 *
 * The process exit code is the only machine-readable signal: 0 iff the
 * Task's result is SAT or UNSAT, 1 otherwise. Unlike GNU timeout, a
 * decisive-vs-not split, not a taxonomy of failure modes.
 */

use std::time::Duration;
use thiserror::Error;

/// Process-level exit codes. 0/1 only -- the Task result drives everything.
pub mod exit_codes {
    /// Task.result was SAT or UNSAT.
    pub const DECISIVE: i32 = 0;
    /// Task.result was ERROR, UNKNOWN, TIMEOUT, or KILLED.
    pub const NOT_DECISIVE: i32 = 1;
}

/// Conditions the caller is expected to handle locally; never a bug.
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("command already started")]
    AlreadyStarted,

    #[error("command has not been started")]
    NotStarted,

    #[error("timed out waiting for command to exit after {0:?}")]
    Timeout(Duration),

    #[error("failed to spawn process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("controller has no commands to run")]
    NoCommands,

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("invalid duration: negative values not allowed")]
    NegativeDuration,

    #[error("invalid signal: {0}")]
    InvalidSignal(String),

    #[error("invalid solver definitions: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Programmer errors from [`crate::task::Task::set_status`] and
/// [`crate::command::Command::result`]. Raised, never caught -- a bug in the
/// orchestration logic itself, not a runtime condition.
#[derive(Debug, Error)]
pub enum InvariantViolation {
    #[error("status cannot move backward: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("expected status {expected}, found {actual}")]
    PreconditionViolation { expected: String, actual: String },

    #[error("result() called before command finished")]
    NotFinished,

    #[error("task result already set")]
    ResultAlreadySet,
}
