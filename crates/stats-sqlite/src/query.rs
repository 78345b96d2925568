use crate::{Db, PageCount, ReferrerEdge};
use anyhow::Result;
use rusqlite::params;

impl Db {
    /// Most-viewed URLs for one day, descending by count.
    pub fn top_pages(&self, date: &str, limit: i64) -> Result<Vec<PageCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.url, v.count FROM page_views v
             JOIN urls u ON (u.id = v.url_id)
             WHERE v.date = ?
             ORDER BY v.count DESC, u.url ASC
             LIMIT ?",
        )?;
        let rows = stmt.query_map(params![date, limit], |r| {
            Ok(PageCount {
                url: r.get(0)?,
                count: r.get(1)?,
            })
        })?;
        let mut pages = Vec::new();
        for row in rows {
            pages.push(row?);
        }
        Ok(pages)
    }

    /// All persisted referrer edges, resolved back to URL strings.
    pub fn referrer_edges(&self) -> Result<Vec<ReferrerEdge>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.url, t.url FROM referrers r
             JOIN urls s ON (s.id = r.source_id)
             JOIN urls t ON (t.id = r.target_id)
             ORDER BY t.url, s.url",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(ReferrerEdge {
                source: r.get(0)?,
                target: r.get(1)?,
            })
        })?;
        let mut edges = Vec::new();
        for row in rows {
            edges.push(row?);
        }
        Ok(edges)
    }
}
