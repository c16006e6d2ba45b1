/*
 * fuzz_targets/classify.rs
 *
 * classify() is a pure function over (returncode, timed_out, first line of
 * stdout) -- the arbitrary byte string fuzzers are good at throwing at a
 * function like this. Must never panic, regardless of what a misbehaving
 * solver prints on its first line.
 */

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let returncode = Some(i32::from(data[0]) - 128);
    let timed_out = data[1] & 1 == 1;
    if let Ok(line) = core::str::from_utf8(&data[2..]) {
        let _ = smt_portfolio::classifier::classify(returncode, timed_out, line);
    }
});
