use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed timestamp layout for `last_modified`. Zero-padded UTC with second
/// precision, so string order equals chronological order.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Identity of one snapshot of the remote state object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub last_modified: String,
    #[serde(rename = "md5", alias = "content_digest", default)]
    pub content_digest: String,
}

impl Version {
    pub fn new(last_modified: impl Into<String>, content_digest: impl Into<String>) -> Self {
        Self {
            last_modified: last_modified.into(),
            content_digest: content_digest.into(),
        }
    }

    /// Version reported when a destroy finds nothing to fetch.
    pub fn deleted_at(now: DateTime<Utc>) -> Self {
        Self {
            last_modified: format_timestamp(now),
            content_digest: String::new(),
        }
    }

    /// Orders by `last_modified` alone, compared as plain strings.
    pub fn cmp_modified(&self, other: &Version) -> Ordering {
        self.last_modified.cmp(&other.last_modified)
    }

    pub fn is_newer_than(&self, other: &Version) -> bool {
        self.cmp_modified(other) == Ordering::Greater
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIME_FORMAT).to_string()
}

pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(input, TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Re-renders an HTTP `Last-Modified` header (RFC 7231 / RFC 2822 date) in
/// [`TIME_FORMAT`].
pub fn from_http_date(header: &str) -> Option<String> {
    DateTime::parse_from_rfc2822(header.trim())
        .ok()
        .map(|dt| format_timestamp(dt.with_timezone(&Utc)))
}

/// Normalizes an `ETag` into a lowercase digest without quotes.
pub fn digest_from_etag(etag: &str) -> String {
    etag.trim()
        .trim_start_matches("W/")
        .trim_matches('"')
        .to_ascii_lowercase()
}
