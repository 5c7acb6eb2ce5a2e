//! Token coercion shared by filtering and import.
//!
//! - [`parse_number_token`] - formatted numbers ("1 234,50 €", "$1,234.50")
//! - [`parse_bool_token`] - the yes/no vocabulary accepted on paste
//! - [`parse_date_time`] - explicit day-first formats, then ISO-like fallbacks

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Date formats tried in order before the generic fallbacks.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%-d/%-m/%Y"];

const DATE_TIME_FALLBACKS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FALLBACKS: &[&str] = &["%Y/%m/%d", "%Y.%m.%d", "%d.%m.%Y"];

const TRUE_TOKENS: &[&str] = &["true", "1", "oui", "yes", "vrai", "o"];
const FALSE_TOKENS: &[&str] = &["false", "0", "non", "no", "faux", "n"];

/// Parse a number typed by a human or copied from a formatted sheet.
///
/// Currency symbols, spaces and other decoration are dropped. A comma is read
/// as the decimal separator unless a dot follows it or it repeats, in which
/// case it is a thousands separator.
pub fn parse_number_token(raw: &str) -> Option<f64> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '.' | ','))
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_comma = kept.rfind(',');
    let last_dot = kept.rfind('.');
    let comma_count = kept.matches(',').count();

    let normalized = match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => kept.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => kept.replace(',', ""),
        (Some(_), None) if comma_count > 1 => kept.replace(',', ""),
        (Some(_), None) => kept.replace(',', "."),
        _ => kept,
    };

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a boolean from the accepted token vocabulary (case-insensitive).
pub fn parse_bool_token(raw: &str) -> Option<bool> {
    let token = raw.trim().to_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Parse a date-only token.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_date_time(raw).map(|dt| dt.date())
}

/// Parse a date or date-time token. Date-only inputs resolve to midnight.
pub fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATE_TIME_FALLBACKS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FALLBACKS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_plain() {
        assert_eq!(parse_number_token("42"), Some(42.0));
        assert_eq!(parse_number_token("-3.5"), Some(-3.5));
    }

    #[test]
    fn test_parse_number_strips_decoration() {
        assert_eq!(parse_number_token("1 234,50 €"), Some(1234.5));
        assert_eq!(parse_number_token("$1,234.50"), Some(1234.5));
        assert_eq!(parse_number_token("1.234,5"), Some(1234.5));
        assert_eq!(parse_number_token("1,234,567"), Some(1234567.0));
        assert_eq!(parse_number_token("12%"), Some(12.0));
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert_eq!(parse_number_token("abc"), None);
        assert_eq!(parse_number_token("-"), None);
        assert_eq!(parse_number_token("1-2"), None);
        assert_eq!(parse_number_token(""), None);
    }

    #[test]
    fn test_parse_bool_vocabulary() {
        for t in ["true", "1", "OUI", "yes", "vrai", "o"] {
            assert_eq!(parse_bool_token(t), Some(true), "{t}");
        }
        for t in ["false", "0", "non", "No", "faux", "n"] {
            assert_eq!(parse_bool_token(t), Some(false), "{t}");
        }
        assert_eq!(parse_bool_token("maybe"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date("2024-03-09"), Some(expected));
        assert_eq!(parse_date("09/03/2024"), Some(expected));
        assert_eq!(parse_date("09-03-2024"), Some(expected));
        assert_eq!(parse_date("9/3/2024"), Some(expected));
        assert_eq!(parse_date("2024/03/09"), Some(expected));
    }

    #[test]
    fn test_parse_date_time_fallbacks() {
        let dt = parse_date_time("2024-03-09T10:30:00").unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "10:30");
        let rfc = parse_date_time("2024-03-09T10:30:00Z").unwrap();
        assert_eq!(rfc, dt);
        assert!(parse_date_time("31/02/2024").is_none());
        assert!(parse_date_time("soon").is_none());
    }
}
