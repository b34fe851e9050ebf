use std::{path::Path, time::Duration};

use rusqlite::{Connection, OpenFlags};

pub const DATABASE_FILE_NAME: &str = "usage.db";

const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS track (
    title TEXT NOT NULL,
    process_name TEXT NOT NULL,
    category TEXT NOT NULL,
    seconds INTEGER NOT NULL,
    date TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    PRIMARY KEY (title, date)
);

CREATE INDEX IF NOT EXISTS idx_track_date ON track(date);
"#;

/// Opens the writer connection and makes sure the table exists.
pub fn open_writer(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

/// Opens a connection that can't modify the database.
pub fn open_reader(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}
