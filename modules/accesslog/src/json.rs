use std::io::BufRead;

use crate::entry::time_from_epoch;
use crate::{LogEntry, ParseError};

/// Reads one self-contained JSON record per line. A line that fails to
/// decode is fatal for the whole run; a zero-length final read is clean
/// end-of-input.
pub struct JsonReader<R> {
    input: R,
}

impl<R: BufRead> JsonReader<R> {
    pub fn new(input: R) -> Self {
        JsonReader { input }
    }

    pub fn next_entry(&mut self) -> Result<Option<LogEntry>, ParseError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let mut entry: LogEntry = serde_json::from_str(&line)?;
        entry.time = time_from_epoch(entry.timestamp)?;
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = r#"{"ts":1589436543.3458548,"status":200,"size":1234,"request":{"method":"GET","uri":"/weeknotes/2020-05-10/","remote_addr":"10.0.0.1","host":"example.org","headers":{"Referer":["https://other.org/post"]}},"resp_headers":{"Content-Type":["text/html; charset=utf-8"]}}"#;

    #[test]
    fn decodes_nested_fields_and_truncated_fraction() {
        let mut reader = JsonReader::new(Cursor::new(SAMPLE));
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.status_code, 200);
        assert_eq!(entry.request.uri, "/weeknotes/2020-05-10/");
        assert_eq!(entry.request.method, "GET");
        assert_eq!(entry.content_type(), "text/html");
        assert_eq!(entry.referrer(), "https://other.org/post");
        assert_eq!(entry.time.unix_timestamp(), 1589436543);
        assert_eq!(entry.time.nanosecond(), 345_854_759);
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn trailing_newline_is_clean_eof() {
        let mut reader = JsonReader::new(Cursor::new(format!("{SAMPLE}\n")));
        assert!(reader.next_entry().unwrap().is_some());
        assert!(reader.next_entry().unwrap().is_none());
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn malformed_record_is_fatal() {
        let mut reader = JsonReader::new(Cursor::new("{not json}\n"));
        assert!(matches!(reader.next_entry(), Err(ParseError::Json(_))));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let line = r#"{"ts":1.5,"status":301,"duration":0.004,"user_id":"","request":{"uri":"/"}}"#;
        let mut reader = JsonReader::new(Cursor::new(line));
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.status_code, 301);
        assert_eq!(entry.request.uri, "/");
        assert_eq!(entry.time.unix_timestamp(), 1);
        assert_eq!(entry.time.nanosecond(), 500_000_000);
    }
}
