use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS snapshots (
    key TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT DEFAULT (datetime('now'))
);
";

pub const BILLS_KEY: &str = "bills";
pub const NETWORKS_KEY: &str = "networks";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn read_snapshot(conn: &Connection, key: &str) -> Result<Option<String>> {
    let payload = conn
        .query_row("SELECT payload FROM snapshots WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(payload)
}

pub fn write_snapshot(conn: &Connection, key: &str, payload: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO snapshots (key, payload, updated_at) VALUES (?1, ?2, datetime('now')) \
         ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
        rusqlite::params![key, payload],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_snapshots_table() {
        let (_dir, conn) = test_db();
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='snapshots'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_missing_snapshot_is_none() {
        let (_dir, conn) = test_db();
        assert_eq!(read_snapshot(&conn, BILLS_KEY).unwrap(), None);
    }

    #[test]
    fn test_write_snapshot_overwrites() {
        let (_dir, conn) = test_db();
        write_snapshot(&conn, NETWORKS_KEY, "[]").unwrap();
        write_snapshot(&conn, NETWORKS_KEY, "[1]").unwrap();
        assert_eq!(read_snapshot(&conn, NETWORKS_KEY).unwrap().as_deref(), Some("[1]"));
        let rows: i64 = conn.query_row("SELECT count(*) FROM snapshots", [], |r| r.get(0)).unwrap();
        assert_eq!(rows, 1);
    }
}
