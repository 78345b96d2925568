use std::io::BufRead;
use std::sync::OnceLock;

use regex::Regex;
use time::OffsetDateTime;

use crate::entry::unix_epoch;
use crate::{Headers, LogEntry, LogRequest, ParseError};

// IP - REMOTE_USER [TIMESTAMP] "METHOD PATH PROTOCOL" STATUS SIZE "REFERRER" "USER_AGENT"
const LINE_GRAMMAR: &str = r#"^(?P<addr>\S+) \S+ (?P<user>\S+) \[(?P<ts>[^\]]*)\] "(?P<method>\S+) (?P<path>\S+) (?P<proto>[^"]*)" (?P<status>\d+|-) (?P<size>\d+|-) "(?P<referrer>[^"]*)" "(?P<agent>[^"]*)""#;

fn line_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LINE_GRAMMAR).expect("combined log grammar compiles"))
}

/// Reads classic combined-format lines. A line the grammar cannot match is
/// fatal for the whole run.
pub struct CombinedReader<R> {
    input: R,
}

impl<R: BufRead> CombinedReader<R> {
    pub fn new(input: R) -> Self {
        CombinedReader { input }
    }

    pub fn next_entry(&mut self) -> Result<Option<LogEntry>, ParseError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(['\r', '\n']);
        parse_line(line).map(Some)
    }
}

fn parse_line(line: &str) -> Result<LogEntry, ParseError> {
    let caps = line_grammar()
        .captures(line)
        .ok_or_else(|| ParseError::Grammar(line.to_string()))?;

    let time = match &caps["ts"] {
        "" => unix_epoch(),
        raw => parse_timestamp(raw)?,
    };
    // A dash in the status column is recorded as status 0, not rejected.
    let status_code = match &caps["status"] {
        "-" => 0,
        raw => raw
            .parse()
            .map_err(|_| ParseError::Grammar(line.to_string()))?,
    };
    let size = match &caps["size"] {
        "-" => 0,
        raw => raw.parse().unwrap_or(0),
    };

    let mut headers = Headers::new();
    if let Some(referrer) = header_value(&caps["referrer"]) {
        headers.insert("Referer".to_string(), vec![referrer]);
    }
    if let Some(agent) = header_value(&caps["agent"]) {
        headers.insert("User-Agent".to_string(), vec![agent]);
    }

    Ok(LogEntry {
        time,
        timestamp: 0.0,
        size,
        duration: 0.0,
        status_code,
        request: LogRequest {
            method: caps["method"].to_string(),
            uri: caps["path"].to_string(),
            remote_addr: caps["addr"].to_string(),
            host: String::new(),
            headers,
        },
        response_headers: Headers::new(),
    })
}

// "-" is the combined-format placeholder for an absent header.
fn header_value(raw: &str) -> Option<String> {
    match raw {
        "" | "-" => None,
        value => Some(value.to_string()),
    }
}

fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, ParseError> {
    let format = time::macros::format_description!(
        "[day]/[month repr:short]/[year]:[hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
    );
    OffsetDateTime::parse(raw, format).map_err(|_| ParseError::Timestamp(raw.to_string()))
}
