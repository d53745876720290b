use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT,
            date INTEGER NOT NULL,
            date_nanos INTEGER NOT NULL DEFAULT 0,
            content BLOB
        );

        CREATE INDEX IF NOT EXISTS notes_date_idx ON notes(date DESC, date_nanos DESC);

        CREATE TABLE IF NOT EXISTS flags (
            name TEXT PRIMARY KEY NOT NULL,
            value INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .context("applying schema migrations")?;
    Ok(())
}
