use crate::schema::MIGRATIONS;
use anyhow::Result;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

pub struct Db {
    pub conn: Connection,
}

impl Db {
    pub fn open_or_create(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        migrate(&mut conn)?;
        Ok(Db { conn })
    }

    /// Read-only handle for queries; never migrates.
    pub fn open_read_only(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Db { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        apply_pragmas(&conn)?;
        migrate(&mut conn)?;
        Ok(Db { conn })
    }
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

fn migrate(conn: &mut Connection) -> Result<()> {
    let applied: usize = conn.query_row("PRAGMA user_version", [], |r| r.get::<_, i64>(0))? as usize;
    for (idx, batch) in MIGRATIONS.iter().enumerate().skip(applied) {
        debug!(version = idx + 1, "applying schema migration");
        let tx = conn.transaction()?;
        tx.execute_batch(batch)?;
        tx.pragma_update(None, "user_version", (idx + 1) as i64)?;
        tx.commit()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrates_fresh_database_to_latest() {
        let db = Db::open_in_memory().unwrap();
        let version: i64 = db
            .conn
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version as usize, MIGRATIONS.len());
    }

    #[test]
    fn reopening_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.sqlite");
        {
            let db = Db::open_or_create(&path).unwrap();
            db.conn
                .execute("INSERT INTO urls (url) VALUES ('/a/')", [])
                .unwrap();
        }
        let db = Db::open_or_create(&path).unwrap();
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(1) FROM urls", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn read_only_handle_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.sqlite");
        drop(Db::open_or_create(&path).unwrap());
        let db = Db::open_read_only(&path).unwrap();
        assert!(db
            .conn
            .execute("INSERT INTO urls (url) VALUES ('/a/')", [])
            .is_err());
    }
}
