/*
 * task.rs
 *
 * Task owns the status state machine. Status only ever moves forward
 * through NOT_STARTED < STARTING < RUNNING < TERMINATING < TERMINATED; any
 * attempt to move it backward (or sideways into itself when a precondition
 * expects otherwise) is a bug in the Controller, not a runtime condition --
 * set_status panics rather than returning a Result, matching how
 * jsi/core.py's Task never checked for this at all (Python shrugged; we
 * don't).
 */

use std::sync::Mutex;

use crate::classifier::TaskResult;
use crate::error::InvariantViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskStatus {
    NotStarted,
    Starting,
    Running,
    Terminating,
    Terminated,
}

impl TaskStatus {
    const fn name(self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Terminating => "TERMINATING",
            Self::Terminated => "TERMINATED",
        }
    }
}

/// One race between a portfolio of Commands over a single input.
pub struct Task {
    pub name: String,
    status: Mutex<TaskStatus>,
    result: Mutex<Option<TaskResult>>,
}

impl Task {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Mutex::new(TaskStatus::NotStarted),
            result: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn status(&self) -> TaskStatus {
        *self.status.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Move the status forward. `expected` names the status this transition
    /// is only valid from; a mismatch or a backward move panics -- these are
    /// invariant violations, not conditions a caller can recover from.
    ///
    /// # Panics
    ///
    /// Panics if `new` is not strictly greater than the current status, or
    /// if `expected` is given and doesn't match the current status.
    pub fn set_status(&self, new: TaskStatus, expected: Option<TaskStatus>) {
        let mut guard = self
            .status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(expected) = expected
            && *guard != expected
        {
            panic!(
                "{}",
                InvariantViolation::PreconditionViolation {
                    expected: expected.name().to_string(),
                    actual: guard.name().to_string(),
                }
            );
        }

        if new <= *guard {
            panic!(
                "{}",
                InvariantViolation::InvalidTransition {
                    from: guard.name().to_string(),
                    to: new.name().to_string(),
                }
            );
        }

        tracing::debug!(task = %self.name, from = guard.name(), to = new.name(), "task status transition");
        *guard = new;
    }

    /// Move the status forward like `set_status`, but only if the current
    /// status still equals `expected`. If something else (most commonly
    /// `try_begin_termination` winning a race against a monitor thread
    /// that is mid-dispatch) already moved the status on, this is a
    /// log-and-skip no-op instead of a panic -- this transition is allowed
    /// to lose a race, unlike the hard preconditions `set_status` enforces.
    ///
    /// Returns whether this call performed the move.
    pub fn try_set_status(&self, new: TaskStatus, expected: TaskStatus) -> bool {
        let mut guard = self
            .status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if *guard != expected {
            tracing::debug!(
                task = %self.name,
                expected = expected.name(),
                actual = guard.name(),
                to = new.name(),
                "soft status transition skipped, status already moved on"
            );
            return false;
        }

        tracing::debug!(task = %self.name, from = guard.name(), to = new.name(), "task status transition");
        *guard = new;
        true
    }

    /// Atomically move to `Terminating` iff the current status is strictly
    /// less than it, returning whether this call performed the move. Lets
    /// concurrent callers (the early-exit race, an external `kill`, a
    /// signal) race to tear the portfolio down without either double-
    /// running the kill sequence or panicking on a racing transition.
    pub fn try_begin_termination(&self) -> bool {
        let mut guard = self
            .status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if *guard >= TaskStatus::Terminating {
            return false;
        }
        tracing::debug!(task = %self.name, from = guard.name(), to = "TERMINATING", "task status transition");
        *guard = TaskStatus::Terminating;
        true
    }

    /// Set once the first decisive (or final, if none is decisive) Command
    /// result is known. Only ever set once.
    ///
    /// # Panics
    ///
    /// Panics if a result has already been set.
    pub fn set_result(&self, result: TaskResult) {
        let mut guard = self
            .result
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        assert!(guard.is_none(), "{}", InvariantViolation::ResultAlreadySet);
        tracing::info!(task = %self.name, result = %result, "task result decided");
        *guard = Some(result);
    }

    #[must_use]
    pub fn result(&self) -> Option<TaskResult> {
        *self.result.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn done(&self) -> bool {
        self.status() == TaskStatus::Terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_started() {
        let task = Task::new("t1");
        assert_eq!(task.status(), TaskStatus::NotStarted);
        assert!(!task.done());
    }

    #[test]
    fn advances_through_full_lifecycle() {
        let task = Task::new("t1");
        task.set_status(TaskStatus::Starting, Some(TaskStatus::NotStarted));
        task.set_status(TaskStatus::Running, Some(TaskStatus::Starting));
        task.set_status(TaskStatus::Terminating, Some(TaskStatus::Running));
        task.set_status(TaskStatus::Terminated, Some(TaskStatus::Terminating));
        assert!(task.done());
    }

    #[test]
    #[should_panic(expected = "cannot move backward")]
    fn rejects_backward_transition() {
        let task = Task::new("t1");
        task.set_status(TaskStatus::Running, None);
        task.set_status(TaskStatus::Starting, None);
    }

    #[test]
    #[should_panic(expected = "expected status")]
    fn rejects_wrong_precondition() {
        let task = Task::new("t1");
        task.set_status(TaskStatus::Running, Some(TaskStatus::Starting));
    }

    #[test]
    fn result_set_once() {
        let task = Task::new("t1");
        task.set_result(TaskResult::Sat);
        assert_eq!(task.result(), Some(TaskResult::Sat));
    }

    #[test]
    #[should_panic(expected = "already set")]
    fn rejects_double_result() {
        let task = Task::new("t1");
        task.set_result(TaskResult::Sat);
        task.set_result(TaskResult::Unsat);
    }

    #[test]
    fn try_set_status_applies_when_precondition_holds() {
        let task = Task::new("t1");
        task.set_status(TaskStatus::Starting, Some(TaskStatus::NotStarted));
        assert!(task.try_set_status(TaskStatus::Running, TaskStatus::Starting));
        assert_eq!(task.status(), TaskStatus::Running);
    }

    #[test]
    fn try_set_status_is_a_noop_when_something_else_already_moved_on() {
        let task = Task::new("t1");
        task.set_status(TaskStatus::Starting, Some(TaskStatus::NotStarted));
        assert!(task.try_begin_termination());
        assert!(!task.try_set_status(TaskStatus::Running, TaskStatus::Starting));
        assert_eq!(task.status(), TaskStatus::Terminating);
    }

    #[test]
    fn status_totally_ordered() {
        assert!(TaskStatus::NotStarted < TaskStatus::Starting);
        assert!(TaskStatus::Starting < TaskStatus::Running);
        assert!(TaskStatus::Running < TaskStatus::Terminating);
        assert!(TaskStatus::Terminating < TaskStatus::Terminated);
    }
}
