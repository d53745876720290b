use std::fmt;
use std::str::FromStr;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::richtext::RichText;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(Uuid);

impl NoteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for NoteId {
    type Err = uuid::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(raw).map(Self)
    }
}

/// A user note. `id` and `date` are fixed at creation; title and content are
/// edited in place and saved through the note store.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    id: NoteId,
    date: OffsetDateTime,
    pub title: Option<String>,
    pub content: Option<RichText>,
}

impl Note {
    pub fn new(title: Option<String>, date: OffsetDateTime, content: Option<RichText>) -> Self {
        Self::with_id(NoteId::new(), title, date, content)
    }

    pub(crate) fn with_id(
        id: NoteId,
        title: Option<String>,
        date: OffsetDateTime,
        content: Option<RichText>,
    ) -> Self {
        Self {
            id,
            date,
            title,
            content,
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn date(&self) -> OffsetDateTime {
        self.date
    }

    pub fn plain_text(&self) -> String {
        self.content
            .as_ref()
            .map(RichText::plain_text)
            .unwrap_or_default()
    }
}
