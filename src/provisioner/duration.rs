//! # Duration Parsing
//!
//! Parses Go `time.Duration` strings as written by cert-manager into
//! `spec.duration` (e.g. `"2160h0m0s"`, `"1h30m"`, `"1.5h"`).

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

static DURATION_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:\d+(?:\.\d*)?|\.\d+)(?:ns|us|µs|μs|ms|s|m|h))+$")
        .expect("duration format regex is valid")
});

static DURATION_COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<number>\d+(?:\.\d*)?|\.\d+)(?P<unit>ns|us|µs|μs|ms|s|m|h)")
        .expect("duration component regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("duration cannot be empty")]
    Empty,
    #[error("invalid duration {0:?}")]
    Invalid(String),
    #[error("negative duration {0:?} is not supported")]
    Negative(String),
}

/// Parse a Go duration string.
///
/// A bare `"0"` is accepted. Negative durations are rejected since a
/// certificate lifetime cannot be negative.
///
/// # Errors
/// Returns [`DurationError`] if the string is not a valid Go duration.
pub fn parse_go_duration(input: &str) -> Result<Duration, DurationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationError::Empty);
    }

    let unsigned = match trimmed.as_bytes()[0] {
        b'-' => return Err(DurationError::Negative(trimmed.to_string())),
        b'+' => &trimmed[1..],
        _ => trimmed,
    };

    if unsigned == "0" {
        return Ok(Duration::ZERO);
    }

    if !DURATION_FORMAT.is_match(unsigned) {
        return Err(DurationError::Invalid(trimmed.to_string()));
    }

    let mut seconds = 0f64;
    for captures in DURATION_COMPONENT.captures_iter(unsigned) {
        let number: f64 = captures["number"]
            .parse()
            .map_err(|_| DurationError::Invalid(trimmed.to_string()))?;

        let scale = match &captures["unit"] {
            "ns" => 1e-9,
            "us" | "µs" | "μs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(DurationError::Invalid(trimmed.to_string())),
        };
        seconds += number * scale;
    }

    Duration::try_from_secs_f64(seconds).map_err(|_| DurationError::Invalid(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cert_manager_format() {
        assert_eq!(
            parse_go_duration("2160h0m0s").unwrap(),
            Duration::from_secs(2160 * 3600)
        );
        assert_eq!(
            parse_go_duration("168h0m0s").unwrap(),
            Duration::from_secs(7 * 24 * 3600)
        );
    }

    #[test]
    fn test_parse_mixed_units_and_fractions() {
        assert_eq!(parse_go_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_go_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_go_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_go_duration("+10s").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_zero() {
        assert_eq!(parse_go_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_go_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert_eq!(parse_go_duration(""), Err(DurationError::Empty));
        assert!(matches!(parse_go_duration("10"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse_go_duration("10d"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse_go_duration("h"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse_go_duration("1h 30m"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse_go_duration("-1h"), Err(DurationError::Negative(_))));
    }
}
