//! Duration strings in the `1h30m` / `45s` / `250ms` style

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static COMPONENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|ms|s|m|h)").unwrap());

/// Parse a duration such as `5m`, `1h30m`, `1.5h`, `300ms` or `0`
///
/// Returns `None` for empty, negative, unit-less or otherwise malformed input.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input == "0" {
        return Some(Duration::ZERO);
    }
    if input.is_empty() || input.starts_with('-') {
        return None;
    }
    let input = input.strip_prefix('+').unwrap_or(input);

    let mut consumed = 0;
    let mut total_nanos = 0f64;

    for caps in COMPONENT_REGEX.captures_iter(input) {
        let whole = caps.get(0)?;
        if whole.start() != consumed {
            return None;
        }
        consumed = whole.end();

        let value: f64 = caps[1].parse().ok()?;
        let unit_nanos = match &caps[2] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        total_nanos += value * unit_nanos;
    }

    if consumed == 0 || consumed != input.len() {
        return None;
    }

    let total_nanos = total_nanos.round();
    if !total_nanos.is_finite() || total_nanos >= u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(total_nanos as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_units() {
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("0"), Some(Duration::ZERO));
    }

    #[test]
    fn test_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1m30s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("1.5h"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration(" 10s "), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_malformed() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("5"), None);
        assert_eq!(parse_duration("five minutes"), None);
        assert_eq!(parse_duration("5x"), None);
        assert_eq!(parse_duration("5m junk"), None);
        assert_eq!(parse_duration("-5m"), None);
        assert_eq!(parse_duration("m5"), None);
    }
}
