/*
 * classifier.rs
 *
 * A pure function: (returncode, timed_out, first line of stdout) -> TaskResult.
 * No IO, no process handles -- command.rs reopens the sink's file, reads the
 * first line, and hands it here. Keeping this pure is what makes the
 * property tests in this module cheap: every input is a plain value.
 *
 * Match order mirrors jsi/core.py's ProcessMetadata._get_result almost line
 * for line: SIGTERM is checked first (disambiguated by timed_out into
 * TIMEOUT vs KILLED), then the known first-line markers, then a bare
 * timed_out with no recognizable marker, then UNKNOWN.
 */

use std::fmt;

/// The signal POSIX raise()s on SIGTERM, as reported via a negative
/// returncode (the `-15` convention `Popen.returncode` uses on Unix).
const SIGTERM_RETURNCODE: i32 = -15;

/// The final verdict for one Command, and -- once a Command finishes with a
/// decisive result -- for its Task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskResult {
    Sat,
    Unsat,
    Error,
    Unknown,
    Timeout,
    Killed,
}

impl TaskResult {
    /// SAT or UNSAT: the portfolio got a usable answer.
    #[must_use]
    pub const fn is_decisive(self) -> bool {
        matches!(self, Self::Sat | Self::Unsat)
    }
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sat => "sat",
            Self::Unsat => "unsat",
            Self::Error => "error",
            Self::Unknown => "unknown",
            Self::Timeout => "timeout",
            Self::Killed => "killed",
        };
        f.write_str(s)
    }
}

/// Classify a finished Command from its returncode, whether its deadline
/// fired, and the first line of whatever it wrote to stdout.
///
/// ```
/// use smt_portfolio::classifier::{classify, TaskResult};
///
/// assert_eq!(classify(Some(0), false, "sat\n"), TaskResult::Sat);
/// assert_eq!(classify(Some(0), false, "unsat\n"), TaskResult::Unsat);
/// assert_eq!(classify(Some(-15), true, ""), TaskResult::Timeout);
/// assert_eq!(classify(Some(-15), false, ""), TaskResult::Killed);
/// ```
#[must_use]
pub fn classify(returncode: Option<i32>, timed_out: bool, first_line: &str) -> TaskResult {
    if returncode == Some(SIGTERM_RETURNCODE) {
        return if timed_out {
            TaskResult::Timeout
        } else {
            TaskResult::Killed
        };
    }

    if first_line == "sat\n" {
        return TaskResult::Sat;
    }
    if first_line == "unsat\n" {
        return TaskResult::Unsat;
    }
    if first_line.contains("error") {
        return TaskResult::Error;
    }
    // STP prints its model as "ASSERT(...)" lines with no leading "sat" --
    // a satisfying assignment without the marker word.
    if first_line.contains("ASSERT(") {
        return TaskResult::Sat;
    }

    if timed_out {
        return TaskResult::Timeout;
    }

    TaskResult::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn recognizes_sat_unsat() {
        assert_eq!(classify(Some(0), false, "sat\n"), TaskResult::Sat);
        assert_eq!(classify(Some(0), false, "unsat\n"), TaskResult::Unsat);
        assert_eq!(classify(Some(1), false, "unsat\n"), TaskResult::Unsat);
    }

    #[test]
    fn match_is_exact_and_case_sensitive() {
        // No trailing newline (e.g. the final line before EOF) and a
        // different case both fail to match -- this mirrors the original
        // implementation's literal `line == "sat\n"` check exactly.
        assert_eq!(classify(Some(0), false, "sat"), TaskResult::Unknown);
        assert_eq!(classify(Some(0), false, "SAT\n"), TaskResult::Unknown);
        assert_eq!(classify(Some(0), false, "unsat"), TaskResult::Unknown);
    }

    #[test]
    fn recognizes_error() {
        assert_eq!(
            classify(Some(1), false, "error: parse failure"),
            TaskResult::Error
        );
        assert_eq!(classify(Some(1), false, "there was an error"), TaskResult::Error);
        // Case-sensitive, matching the substring check literally.
        assert_eq!(classify(Some(1), false, "Parse Error"), TaskResult::Unknown);
    }

    #[test]
    fn recognizes_stp_assert_marker() {
        assert_eq!(
            classify(Some(0), false, "ASSERT( x = 1 );"),
            TaskResult::Sat
        );
    }

    #[test]
    fn sigterm_disambiguated_by_timed_out() {
        assert_eq!(classify(Some(-15), true, ""), TaskResult::Timeout);
        assert_eq!(classify(Some(-15), false, ""), TaskResult::Killed);
        // A plausible-looking stdout line must not override the SIGTERM check.
        assert_eq!(classify(Some(-15), true, "sat"), TaskResult::Timeout);
    }

    #[test]
    fn bare_timeout_with_no_marker() {
        assert_eq!(classify(Some(0), true, ""), TaskResult::Timeout);
        assert_eq!(classify(None, true, "garbage"), TaskResult::Timeout);
    }

    #[test]
    fn unrecognized_output_is_unknown() {
        assert_eq!(classify(Some(0), false, ""), TaskResult::Unknown);
        assert_eq!(classify(Some(1), false, "whatever"), TaskResult::Unknown);
    }

    proptest! {
        #[test]
        fn classify_is_pure_and_deterministic(
            returncode in proptest::option::of(-20i32..20),
            timed_out in any::<bool>(),
            line in "\\PC*",
        ) {
            let a = classify(returncode, timed_out, &line);
            let b = classify(returncode, timed_out, &line);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn sigterm_never_yields_decisive_result(timed_out in any::<bool>(), line in "\\PC*") {
            let result = classify(Some(-15), timed_out, &line);
            prop_assert!(!result.is_decisive());
        }
    }
}
