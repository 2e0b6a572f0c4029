//! ISO-8601 timestamp helpers. Per §6.4, all persisted timestamps are
//! stored as ISO-8601 strings rather than integers, so every row type in
//! this crate carries `String` timestamp columns and converts through
//! [`chrono::DateTime<Utc>`] at the edges.

use chrono::{DateTime, Utc};

/// The current instant, formatted for storage.
#[must_use]
pub fn now() -> String {
    format(Utc::now())
}

/// Format a timestamp for storage.
#[must_use]
pub fn format(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Parse a stored timestamp. Rows written by this crate always round-trip;
/// a parse failure indicates external tampering or a schema mismatch, so
/// callers should surface it rather than silently treating the row as
/// already expired.
pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_format_and_parse() {
        let dt = Utc::now();
        let formatted = format(dt);
        let parsed = parse(&formatted).unwrap();
        assert_eq!(dt.timestamp_millis(), parsed.timestamp_millis());
    }
}
