/*
 * output.rs
 *
 * Renders the final per-Command results. Two registers: a plain aligned
 * table when stdout isn't a TTY (piped to a file, redirected in CI), an
 * ANSI-colored one when it is -- green for a decisive/ok result, red for
 * error, yellow for timeout/killed, no color for unknown. `std::io::
 * IsTerminal` is stable std, so no crossterm/console dependency is needed
 * for a palette this small.
 */

use std::io::IsTerminal;
use std::time::Duration;

use crate::classifier::TaskResult;

/// One row of the final results table: what a single Command decided, and
/// how long it took.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub solver: String,
    pub result: TaskResult,
    pub elapsed: Option<Duration>,
}

const RESET: &str = "\x1b[0m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";

fn color_for(result: TaskResult) -> Option<&'static str> {
    match result {
        TaskResult::Sat | TaskResult::Unsat => Some(GREEN),
        TaskResult::Error => Some(RED),
        TaskResult::Timeout | TaskResult::Killed => Some(YELLOW),
        TaskResult::Unknown => None,
    }
}

/// Render the results table, using ANSI color codes iff `colorize` is true.
/// Callers decide `colorize` from `std::io::stdout().is_terminal()` so the
/// function itself stays pure and testable.
#[must_use]
pub fn render_table(rows: &[ResultRow], colorize: bool) -> String {
    let name_width = rows
        .iter()
        .map(|r| r.solver.len())
        .max()
        .unwrap_or(0)
        .max("solver".len());

    let mut out = String::new();
    out.push_str(&format!(
        "{:<name_width$}  {:<10}  {:>10}\n",
        "solver", "result", "time",
        name_width = name_width,
    ));

    for row in rows {
        let elapsed = row
            .elapsed
            .map(|d| format!("{:.2}s", d.as_secs_f64()))
            .unwrap_or_else(|| "-".to_string());

        let result_str = row.result.to_string();
        let line = if colorize {
            match color_for(row.result) {
                Some(color) => format!(
                    "{:<name_width$}  {color}{:<10}{RESET}  {:>10}",
                    row.solver,
                    result_str,
                    elapsed,
                    name_width = name_width,
                ),
                None => format!(
                    "{:<name_width$}  {:<10}  {:>10}",
                    row.solver,
                    result_str,
                    elapsed,
                    name_width = name_width,
                ),
            }
        } else {
            format!(
                "{:<name_width$}  {:<10}  {:>10}",
                row.solver,
                result_str,
                elapsed,
                name_width = name_width,
            )
        };
        out.push_str(&line);
        out.push('\n');
    }

    out
}

/// Whether the current stdout is a TTY.
#[must_use]
pub fn stdout_is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Whether the current stderr is a TTY -- the results table is written to
/// stderr (mirroring `jsi/cli.py`, which keeps stdout reserved for the
/// winning solver's own output), so this is what call sites should use to
/// decide `render_table`'s `colorize` argument.
#[must_use]
pub fn stderr_is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Export the results as CSV: `solver,result,elapsed_seconds`.
#[must_use]
pub fn to_csv(rows: &[ResultRow]) -> String {
    let mut out = String::from("solver,result,elapsed_seconds\n");
    for row in rows {
        let elapsed = row
            .elapsed
            .map(|d| format!("{:.3}", d.as_secs_f64()))
            .unwrap_or_default();
        out.push_str(&format!("{},{},{}\n", row.solver, row.result, elapsed));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<ResultRow> {
        vec![
            ResultRow {
                solver: "z3".into(),
                result: TaskResult::Sat,
                elapsed: Some(Duration::from_millis(1234)),
            },
            ResultRow {
                solver: "cvc5".into(),
                result: TaskResult::Killed,
                elapsed: Some(Duration::from_millis(1300)),
            },
        ]
    }

    #[test]
    fn plain_table_has_no_escape_codes() {
        let table = render_table(&rows(), false);
        assert!(!table.contains('\x1b'));
        assert!(table.contains("z3"));
        assert!(table.contains("sat"));
    }

    #[test]
    fn colored_table_wraps_known_results() {
        let table = render_table(&rows(), true);
        assert!(table.contains(GREEN));
        assert!(table.contains(YELLOW));
        assert!(table.contains(RESET));
    }

    #[test]
    fn csv_has_header_and_one_row_per_command() {
        let csv = to_csv(&rows());
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "solver,result,elapsed_seconds");
        assert_eq!(lines.count(), 2);
    }
}
