use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;

use accesslog::{LogReader, ParseError};
use time::{OffsetDateTime, Time};

use crate::is_relevant_referrer;

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Restrict the time window to the current local day.
    pub today_only: bool,
    /// Count only entries with this exact content type.
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewCount {
    pub uri: String,
    pub count: i64,
}

/// In-memory summary of one log file, nothing persisted.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// First and last entry timestamps that passed the filters.
    pub range_start: Option<OffsetDateTime>,
    pub range_end: Option<OffsetDateTime>,
    /// View counts for the current local day, per URI.
    pub views: BTreeMap<String, i64>,
    /// Distinct relevant referrers per URI.
    pub referrers: BTreeMap<String, BTreeSet<String>>,
    /// URIs that returned 404, with occurrence counts.
    pub not_found: BTreeMap<String, i64>,
}

impl ScanReport {
    /// The `n` most-viewed URIs, descending by count; ties resolve to URI
    /// order.
    pub fn top(&self, n: usize) -> Vec<ViewCount> {
        let mut counts: Vec<ViewCount> = self
            .views
            .iter()
            .map(|(uri, count)| ViewCount {
                uri: uri.clone(),
                count: *count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts.truncate(n);
        counts
    }
}

/// Reads the whole stream and classifies entries purely in memory: the same
/// view/referrer logic as ingestion, but scoped to the current local day and
/// without touching the store.
pub fn scan<R: BufRead>(
    reader: &mut LogReader<R>,
    opts: &ScanOptions,
    own_domain: &str,
) -> Result<ScanReport, ParseError> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let today = now.date();
    let window_start = opts.today_only.then(|| now.replace_time(Time::MIDNIGHT));
    let window_end = now;

    let mut report = ScanReport::default();
    while let Some(entry) = reader.next_entry()? {
        if let Some(start) = window_start {
            if entry.time < start {
                continue;
            }
        }
        if entry.time > window_end {
            continue;
        }
        if entry.status_code == 404 {
            *report.not_found.entry(entry.request.uri.clone()).or_insert(0) += 1;
        }
        if let Some(wanted) = &opts.content_type {
            if entry.content_type() != wanted {
                continue;
            }
        }
        if report.range_start.is_none() {
            report.range_start = Some(entry.time);
        }
        report.range_end = Some(entry.time);
        if (200..300).contains(&entry.status_code)
            && entry.time.to_offset(now.offset()).date() == today
        {
            *report.views.entry(entry.request.uri.clone()).or_insert(0) += 1;
            let referrer = entry.referrer();
            if is_relevant_referrer(referrer, own_domain) {
                report
                    .referrers
                    .entry(entry.request.uri.clone())
                    .or_default()
                    .insert(referrer.to_string());
            }
        }
    }
    Ok(report)
}
