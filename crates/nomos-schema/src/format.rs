//! String formats.
//!
//! | format | check |
//! |---|---|
//! | `date` | `YYYY-MM-DD` |
//! | `date-time` | RFC 3339 |
//! | `time` | `hh:mm:ss[.frac][Z\|±hh:mm]` |
//! | `uuid` | hyphenated UUID |
//! | `email` | `local@domain` |
//! | `ipv4`, `ipv6` | address literal |
//! | `byte` | standard base64 |
//! | `hostname` | RFC 1123 labels |
//!
//! Unknown formats, and `binary`, always pass.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveTime};
use regex::Regex;

/// Whether `value` conforms to `format`.
pub fn matches(format: &str, value: &str) -> bool {
    match format {
        "date" => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() && value.len() == 10,
        "date-time" => DateTime::parse_from_rfc3339(value).is_ok(),
        "time" => is_time(value),
        "uuid" => value.len() == 36 && uuid::Uuid::try_parse(value).is_ok(),
        "email" => email_regex().is_some_and(|re| re.is_match(value)),
        "ipv4" => value.parse::<Ipv4Addr>().is_ok(),
        "ipv6" => value.parse::<Ipv6Addr>().is_ok(),
        "byte" => base64::engine::general_purpose::STANDARD
            .decode(value)
            .is_ok(),
        "hostname" => is_hostname(value),
        _ => true,
    }
}

fn is_time(value: &str) -> bool {
    let local = if let Some(stripped) = value.strip_suffix(['Z', 'z']) {
        stripped
    } else if value.len() > 6 && matches!(value.as_bytes()[value.len() - 6], b'+' | b'-') {
        let (local, offset) = value.split_at(value.len() - 6);
        if NaiveTime::parse_from_str(&format!("{}:00", &offset[1..]), "%H:%M:%S").is_err() {
            return false;
        }
        local
    } else {
        value
    };
    NaiveTime::parse_from_str(local, "%H:%M:%S%.f").is_ok()
}

fn is_hostname(value: &str) -> bool {
    let value = value.strip_suffix('.').unwrap_or(value);
    !value.is_empty()
        && value.len() <= 253
        && value.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r#"^[^@\s]+@[^@<>",\s]+\.[^@<>",\s]+$"#).ok())
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dates() {
        assert!(matches("date", "2024-02-29"));
        assert!(!matches("date", "2023-02-29"));
        assert!(!matches("date", "2024-2-1"));
        assert!(matches("date-time", "2024-02-29T12:30:00Z"));
        assert!(matches("date-time", "2024-02-29T12:30:00.5+02:00"));
        assert!(!matches("date-time", "2024-02-29 12:30"));
    }

    #[test]
    fn test_time() {
        assert!(matches("time", "12:30:00"));
        assert!(matches("time", "12:30:00.123Z"));
        assert!(matches("time", "23:59:59+05:30"));
        assert!(!matches("time", "24:00:00"));
        assert!(!matches("time", "12:30"));
    }

    #[test]
    fn test_identifiers() {
        assert!(matches("uuid", "67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(!matches("uuid", "67e5504410b1426f9247bb680e5fe0c8"));
        assert!(matches("email", "pets@example.com"));
        assert!(!matches("email", "pets.example.com"));
        assert!(matches("hostname", "api.example.com"));
        assert!(!matches("hostname", "-api.example.com"));
    }

    #[test]
    fn test_addresses_and_bytes() {
        assert!(matches("ipv4", "192.168.0.1"));
        assert!(!matches("ipv4", "256.0.0.1"));
        assert!(matches("ipv6", "::1"));
        assert!(matches("byte", "aGVsbG8="));
        assert!(!matches("byte", "not base64!"));
    }

    #[test]
    fn test_unknown_and_binary_pass() {
        assert!(matches("binary", "\u{0}\u{1}"));
        assert!(matches("x-custom", "anything"));
    }
}
