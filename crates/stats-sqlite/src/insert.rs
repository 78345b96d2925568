use crate::UrlId;
use anyhow::Result;
use ingest::{Deltas, NO_WATERMARK};
use rusqlite::{params, Connection};

// Free functions over `&Connection` so every write runs inside whatever
// transaction the caller holds; `rusqlite::Transaction` derefs to it.

/// Last persisted watermark, `NO_WATERMARK` if nothing was ever ingested.
pub fn last_watermark(conn: &Connection) -> Result<i64> {
    match conn.query_row(
        "SELECT log_timestamp FROM ingest_watermark WHERE id = 1",
        [],
        |r| r.get(0),
    ) {
        Ok(ts) => Ok(ts),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(NO_WATERMARK),
        Err(e) => Err(e.into()),
    }
}

pub fn set_watermark(conn: &Connection, ts: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO ingest_watermark (id, log_timestamp) VALUES (1, ?)
         ON CONFLICT(id) DO UPDATE SET log_timestamp = excluded.log_timestamp",
        params![ts],
    )?;
    Ok(())
}

/// Stable integer identity for a URL, created on first reference.
pub fn get_or_create_url(conn: &Connection, url: &str) -> Result<UrlId> {
    conn.execute(
        "INSERT INTO urls (url) VALUES (?) ON CONFLICT(url) DO NOTHING",
        params![url],
    )?;
    let id = conn.query_row("SELECT id FROM urls WHERE url = ?", params![url], |r| {
        r.get(0)
    })?;
    Ok(id)
}

/// Merges this run's increment into the persisted counter: prior value plus
/// increment, never overwritten from scratch.
pub fn merge_view_count(conn: &Connection, url_id: UrlId, date: &str, incr: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO page_views (url_id, date, count) VALUES (?,?,?)
         ON CONFLICT(url_id, date) DO UPDATE SET count = count + excluded.count",
        params![url_id, date, incr],
    )?;
    Ok(())
}

/// Inserts one referrer edge. The edge set is a set: a uniqueness conflict
/// on re-insert means the edge already exists and is success.
pub fn add_referrer_edge(conn: &Connection, source_id: UrlId, target_id: UrlId) -> Result<()> {
    match conn.execute(
        "INSERT INTO referrers (source_id, target_id) VALUES (?,?)",
        params![source_id, target_id],
    ) {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Applies one ingestion run's deltas. Must be called inside the same
/// transaction that read the watermark; the caller commits or discards the
/// whole unit of work.
pub fn apply_deltas(conn: &Connection, deltas: &Deltas) -> Result<()> {
    for (date, views) in &deltas.views {
        for (url, incr) in views {
            let url_id = get_or_create_url(conn, url)?;
            merge_view_count(conn, url_id, date, *incr)?;
        }
    }
    for (source, target) in &deltas.edges {
        let source_id = get_or_create_url(conn, source)?;
        let target_id = get_or_create_url(conn, target)?;
        add_referrer_edge(conn, source_id, target_id)?;
    }
    if deltas.watermark != NO_WATERMARK {
        set_watermark(conn, deltas.watermark)?;
    }
    Ok(())
}
