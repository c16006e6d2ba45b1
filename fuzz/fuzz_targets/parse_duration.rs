/*
 * fuzz_targets/parse_duration.rs
 *
 * parse_duration must not panic on any valid UTF-8 string, only return Ok
 * or Err.
 *
 * edge cases: "", "999999999h", "-1", "1.2.3s", unicode, huge numbers
 */

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = core::str::from_utf8(data) {
        let _ = smt_portfolio::duration::parse_duration(s);
    }
});
