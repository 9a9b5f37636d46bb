use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub fn parse_datetime(dt_str: &str) -> Option<DateTime<Utc>> {
    let dt_str = dt_str.trim();

    // Try ISO 8601 format first
    if let Ok(dt) = DateTime::parse_from_rfc3339(dt_str) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

    let clean_str = dt_str.trim_end_matches('Z');
    for fmt in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(clean_str, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    // Date inputs carry no time of day
    NaiveDate::parse_from_str(clean_str, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}
