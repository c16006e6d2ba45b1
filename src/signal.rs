/*
 * signal.rs
 *
 * Parse "TERM", "SIGTERM", "term", "15". Reject "SIGFOO", "999".
 *
 * Only the signals the bridge and the killer worker actually use: the
 * interruption set (HUP/INT/QUIT/TERM) plus KILL for the forceful half of
 * the grace-period kill, and USR1/USR2 in case a driver wants them for its
 * own bookkeeping.
 */

use crate::error::{PortfolioError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Signal {
    SIGHUP = libc::SIGHUP,
    SIGINT = libc::SIGINT,
    SIGQUIT = libc::SIGQUIT,
    SIGTERM = libc::SIGTERM,
    SIGKILL = libc::SIGKILL,
    SIGUSR1 = libc::SIGUSR1,
    SIGUSR2 = libc::SIGUSR2,
}

impl Signal {
    #[must_use]
    pub fn try_from_raw(num: i32) -> Option<Self> {
        match num {
            libc::SIGHUP => Some(Self::SIGHUP),
            libc::SIGINT => Some(Self::SIGINT),
            libc::SIGQUIT => Some(Self::SIGQUIT),
            libc::SIGTERM => Some(Self::SIGTERM),
            libc::SIGKILL => Some(Self::SIGKILL),
            libc::SIGUSR1 => Some(Self::SIGUSR1),
            libc::SIGUSR2 => Some(Self::SIGUSR2),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }
}

/// Parse "TERM", "SIGKILL", "9", "hup" -- all the ways to name a signal.
///
/// ```
/// use smt_portfolio::signal::{parse_signal, Signal};
///
/// assert_eq!(parse_signal("TERM").unwrap(), Signal::SIGTERM);
/// assert_eq!(parse_signal("SIGTERM").unwrap(), Signal::SIGTERM);
/// assert_eq!(parse_signal("9").unwrap(), Signal::SIGKILL);
/// ```
pub fn parse_signal(input: &str) -> Result<Signal> {
    let input = input.trim();

    if let Ok(num) = input.parse::<i32>() {
        return Signal::try_from_raw(num)
            .ok_or_else(|| PortfolioError::InvalidSignal(format!("invalid signal number: {num}")));
    }

    let name = input
        .strip_prefix("SIG")
        .or_else(|| input.strip_prefix("sig"))
        .or_else(|| input.strip_prefix("Sig"))
        .unwrap_or(input);

    if name.eq_ignore_ascii_case("TERM") {
        Ok(Signal::SIGTERM)
    } else if name.eq_ignore_ascii_case("KILL") {
        Ok(Signal::SIGKILL)
    } else if name.eq_ignore_ascii_case("INT") {
        Ok(Signal::SIGINT)
    } else if name.eq_ignore_ascii_case("HUP") {
        Ok(Signal::SIGHUP)
    } else if name.eq_ignore_ascii_case("QUIT") {
        Ok(Signal::SIGQUIT)
    } else if name.eq_ignore_ascii_case("USR1") {
        Ok(Signal::SIGUSR1)
    } else if name.eq_ignore_ascii_case("USR2") {
        Ok(Signal::SIGUSR2)
    } else {
        Err(PortfolioError::InvalidSignal(format!(
            "unknown signal: {input}"
        )))
    }
}

#[must_use]
pub const fn signal_name(signal: Signal) -> &'static str {
    match signal {
        Signal::SIGHUP => "SIGHUP",
        Signal::SIGINT => "SIGINT",
        Signal::SIGQUIT => "SIGQUIT",
        Signal::SIGTERM => "SIGTERM",
        Signal::SIGKILL => "SIGKILL",
        Signal::SIGUSR1 => "SIGUSR1",
        Signal::SIGUSR2 => "SIGUSR2",
    }
}

/// Signals the bridge installs handlers for.
pub const INTERRUPTION_SIGNALS: [Signal; 4] = [
    Signal::SIGINT,
    Signal::SIGTERM,
    Signal::SIGQUIT,
    Signal::SIGHUP,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_by_name_and_prefix() {
        assert_eq!(parse_signal("TERM").unwrap(), Signal::SIGTERM);
        assert_eq!(parse_signal("SIGTERM").unwrap(), Signal::SIGTERM);
        assert_eq!(parse_signal("term").unwrap(), Signal::SIGTERM);
        assert_eq!(parse_signal("KILL").unwrap(), Signal::SIGKILL);
    }

    #[test]
    fn parses_by_number() {
        assert_eq!(parse_signal("15").unwrap(), Signal::SIGTERM);
        assert_eq!(parse_signal("9").unwrap(), Signal::SIGKILL);
    }

    #[test]
    fn rejects_unknown() {
        assert!(parse_signal("SIGFOO").is_err());
        assert!(parse_signal("999").is_err());
    }

    #[test]
    fn names_round_trip() {
        for sig in INTERRUPTION_SIGNALS {
            let parsed = parse_signal(signal_name(sig)).unwrap();
            assert_eq!(parsed, sig);
        }
    }
}
