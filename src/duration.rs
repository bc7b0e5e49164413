//! Lightweight relative-duration parser.
//! Supports: bare seconds ("90"), suffixed terms ("10m", "2h", "1.5d"),
//! and concatenated terms ("1h30m", "1d 12h").
//!
//! Designed for chat-command simplicity — no duration crate dependency.

use std::time::Duration;

use crate::error::{Result, SchedulerError};

/// Parse a relative duration expression into a `Duration`.
pub fn parse(expr: &str) -> Result<Duration> {
    let s = expr.trim();
    if s.is_empty() {
        return Err(SchedulerError::InvalidDuration(
            "empty duration expression".into(),
        ));
    }

    let mut chars = s.chars().peekable();
    let mut total_secs = 0f64;

    while chars.peek().is_some() {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut number = String::new();
        while chars
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || *c == '.')
        {
            if let Some(c) = chars.next() {
                number.push(c);
            }
        }
        if number.is_empty() {
            return Err(SchedulerError::InvalidDuration(format!(
                "expected a number in '{s}'"
            )));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| SchedulerError::InvalidDuration(format!("bad number '{number}'")))?;

        // The unit may be separated from its number ("5 minutes").
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut unit = String::new();
        while chars.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            unit.extend(chars.next().map(|c| c.to_ascii_lowercase()));
        }

        total_secs += value * unit_secs(&unit, s)?;
    }

    Duration::try_from_secs_f64(total_secs)
        .map_err(|_| SchedulerError::InvalidDuration(format!("'{s}' is out of range")))
}

/// Seconds per unit. A bare number means seconds.
fn unit_secs(unit: &str, expr: &str) -> Result<f64> {
    match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(1.0),
        "m" | "min" | "mins" | "minute" | "minutes" => Ok(60.0),
        "h" | "hr" | "hrs" | "hour" | "hours" => Ok(3600.0),
        "d" | "day" | "days" => Ok(86400.0),
        "w" | "week" | "weeks" => Ok(604800.0),
        other => Err(SchedulerError::InvalidDuration(format!(
            "unknown unit '{other}' in '{expr}'"
        ))),
    }
}
