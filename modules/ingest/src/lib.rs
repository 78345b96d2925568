//! Incremental aggregation over access-log entries: watermark-based
//! collection of unseen entries, folding into per-day view counts and
//! referrer edges, and a non-persisting scan report.

mod referrer;
mod scan;

pub use referrer::is_relevant_referrer;
pub use scan::{scan, ScanOptions, ScanReport, ViewCount};

use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;

use accesslog::{LogEntry, LogReader, ParseError};

/// Watermark sentinel for a store with no prior ingestion.
pub const NO_WATERMARK: i64 = -1;

/// One ingestion run's aggregate deltas, handed to the store as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deltas {
    /// date (`YYYY-MM-DD`, UTC) -> request URI -> view count increment.
    pub views: BTreeMap<String, BTreeMap<String, i64>>,
    /// (referrer URL, request URI) edges observed this run.
    pub edges: BTreeSet<(String, String)>,
    /// Watermark to persist with the deltas; `NO_WATERMARK` if nothing has
    /// ever been ingested.
    pub watermark: i64,
}

/// Drains the reader and keeps every entry past the watermark. Returns the
/// retained entries together with the new watermark: the maximum timestamp
/// seen, or the old value unchanged when no entry passed the filter. Any
/// parse error aborts the run before anything is persisted.
pub fn collect_new_entries<R: BufRead>(
    reader: &mut LogReader<R>,
    watermark: i64,
) -> Result<(Vec<LogEntry>, i64), ParseError> {
    let mut kept = Vec::new();
    let mut next_watermark = watermark;
    while let Some(entry) = reader.next_entry()? {
        let nanos = entry.unix_nanos();
        if watermark != NO_WATERMARK && nanos <= watermark {
            // Already accounted for by a previous run.
            continue;
        }
        if nanos > next_watermark {
            next_watermark = nanos;
        }
        kept.push(entry);
    }
    Ok((kept, next_watermark))
}

/// Folds collected entries into aggregate deltas. Only successful HTML page
/// views count; referrer edges are recorded when the classifier accepts the
/// entry's referrer.
pub fn fold(entries: &[LogEntry], own_domain: &str, watermark: i64) -> Deltas {
    let mut deltas = Deltas {
        views: BTreeMap::new(),
        edges: BTreeSet::new(),
        watermark,
    };
    for entry in entries {
        if entry.status_code != 200 || entry.content_type() != "text/html" {
            continue;
        }
        let date = entry.utc_date();
        *deltas
            .views
            .entry(date)
            .or_default()
            .entry(entry.request.uri.clone())
            .or_insert(0) += 1;
        let referrer = entry.referrer();
        if is_relevant_referrer(referrer, own_domain) {
            deltas
                .edges
                .insert((referrer.to_string(), entry.request.uri.clone()));
        }
    }
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use accesslog::LogFormat;
    use std::io::Cursor;

    fn json_reader(lines: &str) -> LogReader<Cursor<String>> {
        LogReader::new(LogFormat::Json, Cursor::new(lines.to_string()))
    }

    fn html_view(ts: f64, uri: &str, referrer: Option<&str>) -> String {
        let referrer = referrer
            .map(|r| format!(r#","headers":{{"Referer":["{r}"]}}"#))
            .unwrap_or_default();
        format!(
            r#"{{"ts":{ts},"status":200,"request":{{"method":"GET","uri":"{uri}"{referrer}}},"resp_headers":{{"Content-Type":["text/html; charset=utf-8"]}}}}"#
        )
    }

    #[test]
    fn collect_skips_entries_at_or_before_watermark() {
        let input = [
            html_view(1.0, "/a/", None),
            html_view(2.0, "/b/", None),
            html_view(3.0, "/c/", None),
        ]
        .join("\n");
        let mut reader = json_reader(&input);
        let (kept, watermark) = collect_new_entries(&mut reader, 2_000_000_000).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].request.uri, "/c/");
        assert_eq!(watermark, 3_000_000_000);
    }

    #[test]
    fn collect_keeps_everything_without_prior_watermark() {
        let input = [html_view(1.0, "/a/", None), html_view(2.0, "/b/", None)].join("\n");
        let mut reader = json_reader(&input);
        let (kept, watermark) = collect_new_entries(&mut reader, NO_WATERMARK).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(watermark, 2_000_000_000);
    }

    #[test]
    fn collect_watermark_unchanged_when_no_new_entries() {
        let input = html_view(1.0, "/a/", None);
        let mut reader = json_reader(&input);
        let (kept, watermark) = collect_new_entries(&mut reader, 5_000_000_000).unwrap();
        assert!(kept.is_empty());
        assert_eq!(watermark, 5_000_000_000);
    }

    #[test]
    fn collect_takes_max_not_last_timestamp() {
        let input = [html_view(3.0, "/a/", None), html_view(2.0, "/b/", None)].join("\n");
        let mut reader = json_reader(&input);
        let (kept, watermark) = collect_new_entries(&mut reader, NO_WATERMARK).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(watermark, 3_000_000_000);
    }

    #[test]
    fn collect_aborts_on_parse_error() {
        let input = format!("{}\nnot json\n", html_view(1.0, "/a/", None));
        let mut reader = json_reader(&input);
        assert!(collect_new_entries(&mut reader, NO_WATERMARK).is_err());
    }

    #[test]
    fn fold_counts_only_html_success() {
        let input = [
            html_view(1589436543.0, "/post/", None),
            html_view(1589436544.0, "/post/", None),
            // 200 but not html
            r#"{"ts":1589436545.0,"status":200,"request":{"uri":"/feed.json"},"resp_headers":{"Content-Type":["application/json"]}}"#.to_string(),
            // html but not 200
            r#"{"ts":1589436546.0,"status":404,"request":{"uri":"/missing/"},"resp_headers":{"Content-Type":["text/html"]}}"#.to_string(),
        ]
        .join("\n");
        let mut reader = json_reader(&input);
        let (kept, watermark) = collect_new_entries(&mut reader, NO_WATERMARK).unwrap();
        let deltas = fold(&kept, "example.org", watermark);
        assert_eq!(deltas.views.len(), 1);
        assert_eq!(deltas.views["2020-05-14"]["/post/"], 2);
        assert_eq!(deltas.views["2020-05-14"].len(), 1);
    }

    #[test]
    fn fold_records_relevant_referrer_edges_once() {
        let input = [
            html_view(1589436543.0, "/post/", Some("https://other.org/link")),
            html_view(1589436544.0, "/post/", Some("https://other.org/link")),
            html_view(1589436545.0, "/post/", Some("https://duckduckgo.com/?q=x")),
            html_view(1589436546.0, "/post/", Some("https://example.org/self")),
        ]
        .join("\n");
        let mut reader = json_reader(&input);
        let (kept, watermark) = collect_new_entries(&mut reader, NO_WATERMARK).unwrap();
        let deltas = fold(&kept, "example.org", watermark);
        assert_eq!(deltas.edges.len(), 1);
        assert!(deltas
            .edges
            .contains(&("https://other.org/link".to_string(), "/post/".to_string())));
        assert_eq!(deltas.views["2020-05-14"]["/post/"], 4);
    }

    #[test]
    fn fold_passes_watermark_through() {
        let deltas = fold(&[], "example.org", 42);
        assert!(deltas.views.is_empty());
        assert!(deltas.edges.is_empty());
        assert_eq!(deltas.watermark, 42);
    }
}
