//! The in-memory note list and its durable mirror.
//!
//! All mutation happens on the caller's thread through `&mut self`. Durable
//! writes are handed to [`writer::BackgroundWriter`] and never awaited by the
//! mutating call; only [`NoteStore::flush`], [`NoteStore::load`] and
//! [`NoteStore::close`] block on the most recent pending write.

use std::path::PathBuf;

use thiserror::Error;
use time::OffsetDateTime;

use crate::config::StorageOptions;
use crate::model::Note;
use crate::richtext::{FontTraits, FontVariant, RichText, TextAttributes};
use crate::storage::{self, NoteRecord, StorageHandle};

pub mod writer;

pub use writer::{PendingWrite, WriteOutcome, WriterStats};
use writer::{BackgroundWriter, WriteJob};

pub const FIRST_LAUNCH_FLAG: &str = "first_launch_seeded";
pub const WELCOME_TITLE: &str = "Write something here!";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("note database at {path} is unavailable")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("note index {index} out of range for {len} notes")]
    IndexOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub struct NoteStore {
    storage: StorageHandle,
    writer: BackgroundWriter,
    notes: Vec<Note>,
    pending: Option<PendingWrite>,
}

impl NoteStore {
    pub fn open(options: &StorageOptions) -> Result<Self, StoreError> {
        let storage = storage::init(options).map_err(|source| StoreError::Unavailable {
            path: options.database_path.clone(),
            source,
        })?;
        Self::with_storage(storage)
    }

    pub fn with_storage(storage: StorageHandle) -> Result<Self, StoreError> {
        let writer =
            BackgroundWriter::spawn(storage.clone()).map_err(|source| StoreError::Unavailable {
                path: storage.database_path().to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %storage.database_path().display(), "note store opened");
        Ok(Self {
            storage,
            writer,
            notes: Vec::new(),
            pending: None,
        })
    }

    pub fn storage(&self) -> &StorageHandle {
        &self.storage
    }

    pub fn list_snapshot(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Builds a note with a fresh id, puts it at the top of the list and
    /// queues it for saving.
    pub fn create(
        &mut self,
        title: Option<String>,
        date: OffsetDateTime,
        content: Option<RichText>,
    ) -> Note {
        let note = Note::new(title, date, content);
        tracing::debug!(note_id = %note.id(), "creating note");
        self.notes.insert(0, note.clone());
        self.submit(WriteJob::Save(NoteRecord::from_note(&note)));
        note
    }

    /// Replaces the note with the same id in place, or inserts it at the top
    /// when the id is unknown, then queues a save.
    pub fn update(&mut self, note: Note) {
        let record = NoteRecord::from_note(&note);
        match self.position_of(&note) {
            Some(index) => self.notes[index] = note,
            None => self.notes.insert(0, note),
        }
        self.submit(WriteJob::Save(record));
    }

    pub fn delete(&mut self, index: usize) -> Result<Note, StoreError> {
        if index >= self.notes.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: self.notes.len(),
            });
        }
        let note = self.notes.remove(index);
        tracing::debug!(note_id = %note.id(), index, "deleting note");
        self.submit(WriteJob::Delete {
            id: note.id().to_string(),
        });
        Ok(note)
    }

    /// Replaces the list with every stored note, newest first.
    pub fn load(&mut self) -> Result<usize, StoreError> {
        self.flush();
        let records = self.storage.fetch_all_notes()?;
        self.notes = records
            .into_iter()
            .filter_map(NoteRecord::into_note)
            .collect();
        tracing::debug!(count = self.notes.len(), "loaded notes");
        Ok(self.notes.len())
    }

    /// Writes the welcome note on the very first launch. Returns whether it did.
    pub fn bootstrap_default(&mut self) -> Result<bool, StoreError> {
        if self.storage.flag_is_set(FIRST_LAUNCH_FLAG)? {
            return Ok(false);
        }
        let note = Note::new(
            Some(WELCOME_TITLE.to_string()),
            OffsetDateTime::now_utc(),
            Some(welcome_content()),
        );
        let seeded = self
            .storage
            .insert_note_once(FIRST_LAUNCH_FLAG, &NoteRecord::from_note(&note))?;
        if seeded {
            tracing::info!(note_id = %note.id(), "seeded welcome note");
        }
        Ok(seeded)
    }

    /// Blocks until the most recently queued write finishes.
    pub fn flush(&mut self) -> Option<WriteOutcome> {
        self.pending.take().map(PendingWrite::wait)
    }

    pub fn write_stats(&self) -> WriterStats {
        self.writer.stats()
    }

    pub fn close(mut self) -> Result<WriterStats, StoreError> {
        self.flush();
        self.writer.shutdown();
        let stats = self.writer.stats();
        tracing::debug!(
            committed = stats.committed,
            failed = stats.failed,
            "note store closed"
        );
        Ok(stats)
    }

    fn position_of(&self, note: &Note) -> Option<usize> {
        self.notes
            .iter()
            .position(|current| current.id() == note.id())
    }

    fn submit(&mut self, job: WriteJob) {
        self.pending = Some(self.writer.submit(job));
    }
}

fn welcome_content() -> RichText {
    let body = TextAttributes::default();
    let styled = |variant: FontVariant, underline: bool| {
        let traits = variant.traits();
        TextAttributes {
            is_bold: traits.contains(FontTraits::BOLD),
            is_italic: traits.contains(FontTraits::ITALIC),
            is_underline: underline,
            ..body
        }
    };

    let mut content = RichText::new();
    content.push_styled(
        "Hi, this is your first note.\n",
        &TextAttributes::with_size(24),
    );
    content.push_styled("you can make text ", &body);
    content.push_styled("bold, ", &styled(FontVariant::Bold, false));
    content.push_styled("underlined,", &styled(FontVariant::Regular, true));
    content.push_styled(" italicized, ", &styled(FontVariant::Italic, false));
    content.push_styled("or all of the above.", &styled(FontVariant::BoldItalic, true));
    content
}
