//! SQLite schema definition

use rusqlite::Connection;

/// Creates the pages table and its indexes if they do not exist
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            host TEXT NOT NULL,
            title TEXT,
            content TEXT NOT NULL,
            crawled_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_pages_host ON pages(host);
        ",
    )
}
