use time::OffsetDateTime;

use crate::model::Note;
use crate::richtext::{decode, encode, ImageAttachment, RichText, StyleMap, TextAttributes};
use crate::store::NoteStore;

/// State of the editor screen for one note, saved back when the screen is
/// dismissed.
#[derive(Debug, Clone)]
pub struct EditSession {
    note: Option<Note>,
    title: Option<String>,
    content: RichText,
    typing: TextAttributes,
}

impl EditSession {
    pub fn new_note(defaults: TextAttributes) -> Self {
        Self {
            note: None,
            title: None,
            content: RichText::new(),
            typing: defaults,
        }
    }

    /// Typing continues in the style of the last text run.
    pub fn open(note: Note) -> Self {
        let content = note.content.clone().unwrap_or_default();
        let typing = content.trailing_style().map(decode).unwrap_or_default();
        Self {
            title: note.title.clone(),
            note: Some(note),
            content,
            typing,
        }
    }

    pub fn is_new(&self) -> bool {
        self.note.is_none()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: &str) {
        let trimmed = title.trim();
        self.title = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }

    pub fn typing_attributes(&self) -> TextAttributes {
        self.typing
    }

    pub fn set_typing_attributes(&mut self, attrs: TextAttributes) {
        self.typing = attrs;
    }

    pub fn typing_style(&self) -> StyleMap {
        encode(&self.typing)
    }

    pub fn insert_text(&mut self, text: &str) {
        let style = self.typing_style();
        self.content.push_text(text, &style);
    }

    pub fn insert_image(&mut self, image: ImageAttachment) {
        self.content.push_image(image);
    }

    pub fn content(&self) -> &RichText {
        &self.content
    }

    /// Saves the session into `store`. A new note with no content is dropped
    /// without touching the store.
    pub fn finish(self, store: &mut NoteStore, now: OffsetDateTime) -> Option<Note> {
        let content = (!self.content.is_empty()).then_some(self.content);
        let note = match self.note {
            Some(mut note) => {
                note.title = self.title;
                note.content = content;
                note
            }
            None => {
                let has_text = content
                    .as_ref()
                    .is_some_and(|content| !content.plain_text().is_empty());
                if !has_text {
                    tracing::debug!("skipping save of empty new note");
                    return None;
                }
                store.create(self.title, now, content)
            }
        };
        store.update(note.clone());
        Some(note)
    }
}
