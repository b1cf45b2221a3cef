use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Naive fallback formats, tried after the zone-aware parsers.
/// Values without a zone are taken as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S", // RFC-822 style without a zone
    "%d %b %Y %H:%M:%S",     // same, weekday omitted
    "%Y-%m-%dT%H:%M:%S",     // ISO-8601 without a zone
    "%Y-%m-%d %H:%M:%S",
];

/// Parses the date encodings feeds actually use into epoch seconds.
///
/// Candidates are tried in a fixed order (RFC 2822, RFC 3339, then the
/// naive fallbacks) and the first successful parse wins. Returns 0 when
/// nothing matches — callers treat 0 as "unknown", and one unparsable
/// date never fails a feed's parse.
pub fn normalize_date(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return dt.timestamp();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return dt.timestamp();
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return dt.and_utc().timestamp();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return dt.and_utc().timestamp();
        }
    }

    0
}
