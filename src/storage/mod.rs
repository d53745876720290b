use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::config::StorageOptions;
use crate::model::{Note, NoteId};
use crate::richtext;

mod schema;

/// One row of the `notes` table. `date` is unix seconds with the sub-second
/// part in `date_nanos`; `content` is the rich text archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub id: String,
    pub title: Option<String>,
    pub date: i64,
    pub date_nanos: u32,
    pub content: Option<Vec<u8>>,
}

impl NoteRecord {
    /// Content that cannot be archived is stored as absent.
    pub fn from_note(note: &Note) -> Self {
        let content = note
            .content
            .as_ref()
            .and_then(|content| match richtext::to_bytes(content) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    tracing::warn!(note_id = %note.id(), %err, "dropping unserializable note content");
                    None
                }
            });
        Self {
            id: note.id().to_string(),
            title: note.title.clone(),
            date: note.date().unix_timestamp(),
            date_nanos: note.date().nanosecond(),
            content,
        }
    }

    /// `None` when the id or date cannot be read back; unreadable content
    /// degrades to a note without content.
    pub fn into_note(self) -> Option<Note> {
        let id = match self.id.parse::<NoteId>() {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(id = %self.id, %err, "skipping note with malformed id");
                return None;
            }
        };
        let date = match OffsetDateTime::from_unix_timestamp(self.date)
            .and_then(|date| date.replace_nanosecond(self.date_nanos))
        {
            Ok(date) => date,
            Err(err) => {
                tracing::warn!(%id, %err, "skipping note with out-of-range date");
                return None;
            }
        };
        let content = self.content.as_deref().and_then(|bytes| {
            let restored = richtext::from_bytes(bytes);
            if restored.is_none() {
                tracing::warn!(%id, "note content could not be decoded, loading without it");
            }
            restored
        });
        Some(Note::with_id(id, self.title, date, content))
    }
}

#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl StorageHandle {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    /// Inserts a note or rewrites its title and content. The creation date of
    /// an existing row is never touched.
    pub fn upsert_note(&self, record: &NoteRecord) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO notes (id, title, date, date_nanos, content)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    content = excluded.content",
                params![
                    record.id,
                    record.title,
                    record.date,
                    record.date_nanos,
                    record.content
                ],
            )
            .with_context(|| format!("saving note {}", record.id))?;
            Ok(())
        })
    }

    pub fn delete_note(&self, id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let deleted = conn
                .execute("DELETE FROM notes WHERE id = ?1", params![id])
                .with_context(|| format!("deleting note {id}"))?;
            Ok(deleted > 0)
        })
    }

    pub fn fetch_all_notes(&self) -> Result<Vec<NoteRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, date, date_nanos, content
                 FROM notes
                 ORDER BY date DESC, date_nanos DESC",
            )?;
            let records = stmt
                .query_map([], |row| {
                    Ok(NoteRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        date: row.get(2)?,
                        date_nanos: row.get(3)?,
                        content: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()
                .context("fetching notes")?;
            Ok(records)
        })
    }

    pub fn note_count(&self) -> Result<usize> {
        self.with_connection(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
                .context("counting notes")?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
    }

    pub fn flag_is_set(&self, name: &str) -> Result<bool> {
        self.with_connection(|conn| read_flag(conn, name))
    }

    /// Inserts `record` and sets `flag` in one transaction, unless the flag is
    /// already set. Returns whether the note was written.
    pub fn insert_note_once(&self, flag: &str, record: &NoteRecord) -> Result<bool> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        if read_flag(&tx, flag)? {
            return Ok(false);
        }
        tx.execute(
            "INSERT INTO notes (id, title, date, date_nanos, content)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.title,
                record.date,
                record.date_nanos,
                record.content
            ],
        )
        .context("inserting seed note")?;
        tx.execute(
            "INSERT INTO flags (name, value) VALUES (?1, 1)
             ON CONFLICT(name) DO UPDATE SET value = 1",
            params![flag],
        )
        .with_context(|| format!("setting flag {flag}"))?;
        tx.commit()?;
        Ok(true)
    }
}

fn read_flag(conn: &Connection, name: &str) -> Result<bool> {
    let value: Option<i64> = conn
        .query_row(
            "SELECT value FROM flags WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("reading flag {name}"))?;
    Ok(value.unwrap_or(0) != 0)
}

pub fn init(options: &StorageOptions) -> Result<StorageHandle> {
    let db_path = &options.database_path;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, options)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %db_path.display(), "note database ready");
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(options.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.busy_timeout(Duration::from_millis(storage.busy_timeout_ms))
        .context("setting busy timeout")?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::richtext::{RichText, TextAttributes};
    use tempfile::TempDir;
    use time::macros::datetime;

    pub(crate) fn storage_options(root: &TempDir) -> StorageOptions {
        StorageOptions {
            database_path: root.path().join("data").join("notes.db"),
            ..StorageOptions::default()
        }
    }

    fn init_storage() -> anyhow::Result<(TempDir, StorageHandle)> {
        let temp = TempDir::new()?;
        let storage = init(&storage_options(&temp))?;
        Ok((temp, storage))
    }

    fn record(title: &str, date: OffsetDateTime) -> NoteRecord {
        NoteRecord::from_note(&Note::new(Some(title.into()), date, None))
    }

    #[test]
    fn fetch_orders_newest_first() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        storage.upsert_note(&record("middle", datetime!(2024-02-02 10:00 UTC)))?;
        storage.upsert_note(&record("oldest", datetime!(2024-01-01 10:00 UTC)))?;
        storage.upsert_note(&record("newest", datetime!(2024-03-03 10:00 UTC)))?;

        let titles: Vec<_> = storage
            .fetch_all_notes()?
            .into_iter()
            .map(|row| row.title.unwrap_or_default())
            .collect();
        assert_eq!(titles, vec!["newest", "middle", "oldest"]);
        Ok(())
    }

    #[test]
    fn upsert_keeps_original_date() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let mut row = record("first", datetime!(2024-01-01 0:00 UTC));
        storage.upsert_note(&row)?;

        row.title = Some("renamed".into());
        row.date = 0;
        storage.upsert_note(&row)?;

        let rows = storage.fetch_all_notes()?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title.as_deref(), Some("renamed"));
        assert_eq!(rows[0].date, datetime!(2024-01-01 0:00 UTC).unix_timestamp());
        Ok(())
    }

    #[test]
    fn delete_reports_whether_a_row_went_away() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let row = record("gone", datetime!(2024-01-01 0:00 UTC));
        storage.upsert_note(&row)?;
        assert!(storage.delete_note(&row.id)?);
        assert!(!storage.delete_note(&row.id)?);
        assert_eq!(storage.note_count()?, 0);
        Ok(())
    }

    #[test]
    fn insert_note_once_honours_flag() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        assert!(!storage.flag_is_set("seeded")?);
        assert!(storage.insert_note_once("seeded", &record("one", datetime!(2024-01-01 0:00 UTC)))?);
        assert!(storage.flag_is_set("seeded")?);
        assert!(!storage.insert_note_once("seeded", &record("two", datetime!(2024-01-01 0:00 UTC)))?);
        assert_eq!(storage.note_count()?, 1);
        Ok(())
    }

    #[test]
    fn record_conversion_round_trips_a_note() {
        let content = RichText::plain("body", &TextAttributes::default());
        let note = Note::new(
            Some("title".into()),
            datetime!(2024-05-06 7:08:09.123456789 UTC),
            Some(content),
        );
        let restored = NoteRecord::from_note(&note).into_note().expect("readable");
        assert_eq!(restored, note);
    }

    #[test]
    fn corrupt_content_loads_as_absent() {
        let note = Note::new(None, datetime!(2024-01-01 0:00 UTC), None);
        let mut row = NoteRecord::from_note(&note);
        row.content = Some(b"not an archive".to_vec());
        let restored = row.into_note().expect("id and date are fine");
        assert_eq!(restored.id(), note.id());
        assert!(restored.content.is_none());
    }

    #[test]
    fn malformed_id_is_skipped() {
        let row = NoteRecord {
            id: "not-a-uuid".into(),
            title: None,
            date: 0,
            date_nanos: 0,
            content: None,
        };
        assert!(row.into_note().is_none());
    }

    #[test]
    fn dates_outside_the_nanosecond_range_survive_storage() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let far_future = datetime!(2300-01-01 0:00 UTC);
        let far_past = datetime!(1600-06-15 12:30:00.5 UTC);
        storage.upsert_note(&record("future", far_future))?;
        storage.upsert_note(&record("past", far_past))?;

        let notes: Vec<Note> = storage
            .fetch_all_notes()?
            .into_iter()
            .filter_map(NoteRecord::into_note)
            .collect();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].date(), far_future);
        assert_eq!(notes[1].date(), far_past);
        Ok(())
    }

    #[test]
    fn sub_second_dates_order_newest_first() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        storage.upsert_note(&record("early", datetime!(2024-01-01 0:00:00.1 UTC)))?;
        storage.upsert_note(&record("late", datetime!(2024-01-01 0:00:00.9 UTC)))?;

        let titles: Vec<_> = storage
            .fetch_all_notes()?
            .into_iter()
            .map(|row| row.title.unwrap_or_default())
            .collect();
        assert_eq!(titles, vec!["late", "early"]);
        Ok(())
    }
}
