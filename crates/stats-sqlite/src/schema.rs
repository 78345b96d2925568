/// Ordered migrations, applied by index against `PRAGMA user_version`.
/// Append only; never edit an applied batch.
pub const MIGRATIONS: &[&str] = &[
    // 0001: URL identities and per-day view counters
    r#"
CREATE TABLE urls (
  id   INTEGER PRIMARY KEY AUTOINCREMENT,
  url  TEXT NOT NULL UNIQUE
);

CREATE TABLE page_views (
  url_id  INTEGER NOT NULL REFERENCES urls(id) ON DELETE CASCADE,
  date    TEXT NOT NULL,
  count   INTEGER NOT NULL,
  UNIQUE (url_id, date)
);
"#,
    // 0002: single authoritative ingestion watermark
    r#"
CREATE TABLE ingest_watermark (
  id             INTEGER PRIMARY KEY CHECK (id = 1),
  log_timestamp  INTEGER NOT NULL
);
"#,
    // 0003: referrer edges
    r#"
CREATE TABLE referrers (
  source_id  INTEGER NOT NULL REFERENCES urls(id) ON DELETE CASCADE,
  target_id  INTEGER NOT NULL REFERENCES urls(id) ON DELETE CASCADE,
  UNIQUE (source_id, target_id)
);
"#,
];
