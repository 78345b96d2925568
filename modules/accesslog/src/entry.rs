use std::collections::BTreeMap;

use serde::Deserialize;
use time::{OffsetDateTime, UtcOffset};

/// Header map as received: multi-valued, case-sensitive keys.
pub type Headers = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogRequest {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub remote_addr: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub headers: Headers,
}

/// One observed HTTP access. `time` is authoritative; the raw `ts` float is
/// kept as received for structured records.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    #[serde(skip, default = "unix_epoch")]
    pub time: OffsetDateTime,
    #[serde(rename = "ts", default)]
    pub timestamp: f64,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub duration: f64,
    #[serde(rename = "status", default)]
    pub status_code: u16,
    #[serde(default)]
    pub request: LogRequest,
    #[serde(rename = "resp_headers", default)]
    pub response_headers: Headers,
}

pub(crate) fn unix_epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

impl LogEntry {
    /// First `Content-Type` value with any `;`-separated parameters stripped,
    /// empty string if the header is absent.
    pub fn content_type(&self) -> &str {
        match self
            .response_headers
            .get("Content-Type")
            .and_then(|values| values.first())
        {
            Some(value) => value.split(';').next().unwrap_or(""),
            None => "",
        }
    }

    /// First `Referer` value, empty string if absent.
    pub fn referrer(&self) -> &str {
        self.request
            .headers
            .get("Referer")
            .and_then(|values| values.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn unix_nanos(&self) -> i64 {
        self.time.unix_timestamp_nanos() as i64
    }

    /// Calendar date of the entry in UTC, `YYYY-MM-DD`.
    pub fn utc_date(&self) -> String {
        let format = time::macros::format_description!("[year]-[month]-[day]");
        self.time
            .to_offset(UtcOffset::UTC)
            .format(format)
            .unwrap_or_default()
    }
}

/// Rebuilds an instant from a float Unix timestamp. Both the seconds and the
/// nanosecond remainder are truncated, not rounded; recorded aggregates
/// depend on the truncating behavior.
pub(crate) fn time_from_epoch(ts: f64) -> Result<OffsetDateTime, crate::ParseError> {
    let secs = ts as i64;
    let nanos = ((ts - secs as f64) * 1_000_000_000.0) as i64;
    let time = OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|_| crate::ParseError::Timestamp(ts.to_string()))?;
    Ok(time + time::Duration::nanoseconds(nanos))
}
