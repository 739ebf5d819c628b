//! String to typed value conversions used by the binder
//!
//! Every converter returns a human-readable cause on failure; the binder
//! attaches the offending key path.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Blank values clear an optional string field.
pub fn optional_string(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn parse_u64(value: &str) -> Result<u64, String> {
    let trimmed = value.trim();
    trimmed
        .parse::<u64>()
        .map_err(|_| format!("expected a non-negative integer, got '{trimmed}'"))
}

pub fn parse_usize(value: &str) -> Result<usize, String> {
    let trimmed = value.trim();
    trimmed
        .parse::<usize>()
        .map_err(|_| format!("expected a non-negative integer, got '{trimmed}'"))
}

pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(format!("expected a boolean, got '{other}'")),
    }
}

/// Percentage in the inclusive range 0..=100.
pub fn parse_percent(value: &str) -> Result<u8, String> {
    let trimmed = value.trim();
    match trimmed.parse::<u8>() {
        Ok(p) if p <= 100 => Ok(p),
        _ => Err(format!("expected a percentage between 0 and 100, got '{trimmed}'")),
    }
}

pub fn parse_http_url(value: &str) -> Result<Option<String>, String> {
    let Some(url) = optional_string(value) else {
        return Ok(None);
    };
    let lower = url.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(Some(url)),
        _ => Err(format!("expected an http(s) URL, got '{url}'")),
    }
}

/// Time unit names accepted for `unit`, mirroring the usual executor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn duration(self, amount: u64) -> Option<Duration> {
        let secs = |mul: u64| amount.checked_mul(mul).map(Duration::from_secs);
        match self {
            Self::Nanoseconds => Some(Duration::from_nanos(amount)),
            Self::Microseconds => Some(Duration::from_micros(amount)),
            Self::Milliseconds => Some(Duration::from_millis(amount)),
            Self::Seconds => Some(Duration::from_secs(amount)),
            Self::Minutes => secs(60),
            Self::Hours => secs(3_600),
            Self::Days => secs(86_400),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nanoseconds" | "ns" => Ok(Self::Nanoseconds),
            "microseconds" | "us" => Ok(Self::Microseconds),
            "milliseconds" | "ms" => Ok(Self::Milliseconds),
            "seconds" | "s" => Ok(Self::Seconds),
            "minutes" | "m" => Ok(Self::Minutes),
            "hours" | "h" => Ok(Self::Hours),
            "days" | "d" => Ok(Self::Days),
            other => Err(format!("unknown time unit '{other}'")),
        }
    }
}

/// Parse a duration: a bare integer is read in `unit`, otherwise a
/// suffixed value such as `500ms`, `30s`, `5m`, `1h` or `1d`.
pub fn parse_duration(value: &str, unit: TimeUnit) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("expected a duration, got ''".to_string());
    }
    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let amount = trimmed
            .parse::<u64>()
            .map_err(|_| format!("duration out of range: '{trimmed}'"))?;
        return unit
            .duration(amount)
            .ok_or_else(|| format!("duration out of range: '{trimmed}'"));
    }
    humantime::parse_duration(trimmed)
        .map_err(|e| format!("expected a duration, got '{trimmed}': {e}"))
}

pub fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

pub(crate) fn serialize_duration<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_duration(*duration))
}

/// Wrapper that never prints its contents.
pub(crate) struct Redacted<'a>(pub &'a Option<String>);

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Some(\"***\")"),
            None => f.write_str("None"),
        }
    }
}

pub(crate) fn serialize_redacted<S: Serializer>(
    value: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    value.as_ref().map(|_| "***").serialize(serializer)
}
