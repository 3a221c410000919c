//! Timestamp helpers shared by the store, history, and conversation log.

use chrono::{DateTime, Utc};

/// Format a timestamp the way history snapshots and metadata fields do:
/// `2024-01-01T12:00:00.123456789Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

/// A timestamp safe to use as part of a filename (colons replaced).
pub fn filename_safe_timestamp(ts: DateTime<Utc>) -> String {
    format_timestamp(ts).replace(':', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn filename_safe_strips_colons() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let safe = filename_safe_timestamp(ts);
        assert!(!safe.contains(':'));
    }
}
