//! Shared helpers and constants.

use chrono::{DateTime, Utc};

pub const APP_NAME: &str = "voicehub_backend";

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Parses an RFC 3339 timestamp, tolerating the `Z` suffix variants SQLite
/// rows carry. Returns `None` for anything unparseable so callers can fall
/// back instead of failing a whole listing.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
