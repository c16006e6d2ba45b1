/*
 * fuzz_targets/parse_signal.rs
 *
 * parse_signal must not panic on any arbitrary string naming (or failing to
 * name) a signal.
 *
 * edge cases: "SIGFOO", "999", "-1", "term", "Term", "  TERM  ", ""
 */

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = core::str::from_utf8(data) {
        let _ = smt_portfolio::signal::parse_signal(s);
    }
});
