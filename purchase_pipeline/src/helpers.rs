use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Parses an event timestamp as written by the ingestion API and the attribution exports.
///
/// RFC 3339 (`2025-10-20T08:00:00Z`, `2025-10-20T10:00:00+02:00`) is the canonical form. Space separated timestamps,
/// with or without an offset, and bare dates (midnight) are also accepted. Timestamps without an offset are taken to
/// be UTC. Returns `None` for anything else; callers decide how to report it.
pub fn parse_event_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = OFFSET_FORMATS.iter().find_map(|fmt| DateTime::parse_from_str(s, fmt).ok()) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = NAIVE_FORMATS.iter().find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok()) {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc())
}

/// Parses a reporting date. Full timestamps are accepted too, in which case the UTC date is used.
pub fn parse_report_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| parse_event_time(s).map(|t| t.date_naive()))
}
