/*
 * duration.rs
 *
 * Parse "30s", "5m", "1.5h", "0.5d". No suffix means seconds. Used for
 * both --timeout and --interval: a Config.timeout/interval of zero means
 * "disabled" (no per-Command deadline, or start everything immediately).
 */

use std::time::Duration;

use crate::error::{PortfolioError, Result};

/// Parse "30", "30s", "1.5m", "2h", "0.5d". No suffix = seconds.
///
/// ```
/// use smt_portfolio::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("1.5m").unwrap(), Duration::from_secs(90));
/// assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
/// assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
/// ```
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();

    if input.is_empty() {
        return Err(PortfolioError::InvalidDuration("empty duration".into()));
    }

    let (num_str, suffix) = split_number_and_suffix(input);
    if num_str.is_empty() {
        return Err(PortfolioError::InvalidDuration(format!(
            "no numeric value in '{input}'"
        )));
    }

    if num_str.starts_with('-') {
        return Err(PortfolioError::NegativeDuration);
    }

    let value: f64 = num_str
        .parse()
        .map_err(|_| PortfolioError::InvalidDuration(format!("invalid number '{input}'")))?;

    let multiplier: f64 = match suffix.to_ascii_lowercase().as_str() {
        "" | "s" => 1.0,
        "m" => 60.0,
        "h" => 3_600.0,
        "d" => 86_400.0,
        _ => {
            return Err(PortfolioError::InvalidDuration(format!(
                "invalid suffix '{suffix}'"
            )));
        }
    };

    let seconds = value * multiplier;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(PortfolioError::InvalidDuration(format!(
            "invalid duration '{input}'"
        )));
    }

    Ok(Duration::from_secs_f64(seconds))
}

/* find where the number ends and the suffix begins */
fn split_number_and_suffix(input: &str) -> (&str, &str) {
    let suffix_start = input
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_ascii_digit() || *c == '.')
        .map_or(0, |(i, c)| i + c.len_utf8());

    (&input[..suffix_start], &input[suffix_start..])
}

/// A zero duration disables the timeout/interval it configures.
#[must_use]
pub const fn is_disabled(duration: &Duration) -> bool {
    duration.is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seconds() {
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("30S").unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn parses_minutes_hours_days() {
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("1.5m").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("0.5d").unwrap(), Duration::from_secs(43200));
    }

    #[test]
    fn parses_zero_as_disabled() {
        let d = parse_duration("0").unwrap();
        assert_eq!(d, Duration::ZERO);
        assert!(is_disabled(&d));
    }

    #[test]
    fn rejects_negative_and_garbage() {
        assert!(parse_duration("-5").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("30x").is_err());
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(parse_duration("  30s  ").unwrap(), Duration::from_secs(30));
    }
}
