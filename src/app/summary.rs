use time::macros::format_description;
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ListOptions;
use crate::model::{Note, NoteId};
use crate::richtext::OBJECT_REPLACEMENT;

pub const UNTITLED: &str = "New Note";
pub const NO_TEXT: &str = "No text";

/// One row of the note list, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSummary {
    pub index: usize,
    pub id: NoteId,
    pub title: String,
    pub date: String,
    pub preview: String,
}

impl NoteSummary {
    pub fn from_note(index: usize, note: &Note, options: &ListOptions) -> Self {
        let title = match note.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => UNTITLED.to_string(),
        };
        Self {
            index,
            id: note.id(),
            title,
            date: format_date(note.date()),
            preview: build_preview(&note.plain_text(), options.preview_graphemes),
        }
    }
}

pub fn summarize(notes: &[Note], options: &ListOptions) -> Vec<NoteSummary> {
    notes
        .iter()
        .enumerate()
        .map(|(index, note)| NoteSummary::from_note(index, note, options))
        .collect()
}

pub fn format_date(date: OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year]");
    date.format(format)
        .unwrap_or_else(|_| date.date().to_string())
}

fn build_preview(text: &str, max_graphemes: usize) -> String {
    let flattened = text
        .split_whitespace()
        .map(|word| word.replace(OBJECT_REPLACEMENT, ""))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if flattened.is_empty() {
        return NO_TEXT.to_string();
    }
    let graphemes: Vec<&str> = flattened.graphemes(true).collect();
    if graphemes.len() <= max_graphemes {
        return flattened;
    }
    let mut preview: String = graphemes[..max_graphemes].concat();
    preview.truncate(preview.trim_end().len());
    preview.push('…');
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::{ImageAttachment, RichText, TextAttributes};
    use time::macros::datetime;

    fn options(preview_graphemes: usize) -> ListOptions {
        ListOptions { preview_graphemes }
    }

    #[test]
    fn placeholders_fill_missing_title_and_text() {
        let note = Note::new(Some("   ".into()), datetime!(2024-02-09 18:00 UTC), None);
        let summary = NoteSummary::from_note(3, &note, &options(20));
        assert_eq!(summary.title, UNTITLED);
        assert_eq!(summary.preview, NO_TEXT);
        assert_eq!(summary.date, "09.02.2024");
        assert_eq!(summary.index, 3);
        // the placeholder is presentation only
        assert_eq!(note.title.as_deref(), Some("   "));
    }

    #[test]
    fn preview_flattens_lines_and_drops_images() {
        let mut content = RichText::plain("Groceries\n\n milk", &TextAttributes::default());
        content.push_image(ImageAttachment::new(1, 1, vec![1]));
        let note = Note::new(None, datetime!(2024-01-01 0:00 UTC), Some(content));
        let summary = NoteSummary::from_note(0, &note, &options(40));
        assert_eq!(summary.preview, "Groceries milk");

        let image_only = {
            let mut content = RichText::new();
            content.push_image(ImageAttachment::new(1, 1, vec![1]));
            Note::new(None, datetime!(2024-01-01 0:00 UTC), Some(content))
        };
        assert_eq!(
            NoteSummary::from_note(0, &image_only, &options(40)).preview,
            NO_TEXT
        );
    }

    #[test]
    fn preview_truncates_on_grapheme_boundaries() {
        assert_eq!(build_preview("héllo wörld", 6), "héllo…");
        assert_eq!(build_preview("👩‍👩‍👧 family", 1), "👩‍👩‍👧…");
        assert_eq!(build_preview("short", 10), "short");
    }

    #[test]
    fn summaries_follow_list_order() {
        let date = datetime!(2024-01-01 0:00 UTC);
        let notes = vec![
            Note::new(Some("b".into()), date, None),
            Note::new(Some("a".into()), date, None),
        ];
        let rows = summarize(&notes, &ListOptions::default());
        assert_eq!(
            rows.iter().map(|row| row.title.as_str()).collect::<Vec<_>>(),
            vec!["b", "a"]
        );
        assert_eq!(rows[1].index, 1);
    }
}
