use std::fmt::Write as _;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::Args;
use time::OffsetDateTime;

use crate::app::summary::format_date;
use crate::app::{summarize, EditSession, NoteSummary, UNTITLED};
use crate::config::AppConfig;
use crate::model::Note;
use crate::richtext::{decode, FontSize, Run, TextAttributes};
use crate::store::NoteStore;

#[derive(Args, Debug, Clone, Default)]
pub struct StyleArgs {
    /// Font size in points (12, 16 or 24)
    #[arg(long)]
    pub size: Option<u16>,
    /// Write the text in bold
    #[arg(long)]
    pub bold: bool,
    /// Write the text in italics
    #[arg(long)]
    pub italic: bool,
    /// Underline the text
    #[arg(long)]
    pub underline: bool,
}

impl StyleArgs {
    fn is_empty(&self) -> bool {
        self.size.is_none() && !self.bold && !self.italic && !self.underline
    }

    /// Layers the requested style over `base`; flags only switch styles on.
    fn apply(&self, base: TextAttributes) -> Result<TextAttributes> {
        let font_size = match self.size {
            Some(points) => match FontSize::from_points(points) {
                Some(preset) => preset.points(),
                None => bail!("font size {points} is not one of 12, 16 or 24"),
            },
            None => base.font_size,
        };
        Ok(TextAttributes {
            font_size,
            is_bold: base.is_bold || self.bold,
            is_italic: base.is_italic || self.italic,
            is_underline: base.is_underline || self.underline,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Title for the note
    #[arg()]
    pub title: Option<String>,
    /// Provide the note body inline. If omitted, reads from stdin.
    #[arg(long)]
    pub body: Option<String>,
    #[command(flatten)]
    pub style: StyleArgs,
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Position of the note in the list (0 is the top)
    pub index: usize,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Position of the note in the list (0 is the top)
    pub index: usize,
    /// Replace the title
    #[arg(long)]
    pub title: Option<String>,
    /// Text appended to the end of the note
    #[arg(long)]
    pub append: Option<String>,
    #[command(flatten)]
    pub style: StyleArgs,
}

pub fn list_notes(config: &AppConfig, store: &NoteStore) -> Result<()> {
    let rows = summarize(store.list_snapshot(), &config.list);
    print!("{}", format_note_list(&rows));
    Ok(())
}

pub fn new_note(config: &AppConfig, store: &mut NoteStore, args: NewArgs) -> Result<()> {
    let body = match args.body.clone() {
        Some(body) => body,
        None => read_stdin()?.unwrap_or_default(),
    };
    print!("{}", run_new(config, store, args, &body)?);
    Ok(())
}

fn run_new(config: &AppConfig, store: &mut NoteStore, args: NewArgs, body: &str) -> Result<String> {
    let defaults = TextAttributes::with_size(config.editor.default_font_size);
    let mut session = EditSession::new_note(args.style.apply(defaults)?);
    if let Some(title) = &args.title {
        session.set_title(title);
    }
    session.insert_text(body.trim_end_matches('\n'));

    Ok(match session.finish(store, OffsetDateTime::now_utc()) {
        Some(note) => format!("Created note {}\n", note.id()),
        None => "Nothing to save: the note has no text.\n".to_string(),
    })
}

pub fn show_note(store: &NoteStore, args: IndexArgs) -> Result<()> {
    let note = note_at(store, args.index)?;
    print!("{}", format_note(note));
    Ok(())
}

pub fn edit_note(store: &mut NoteStore, args: EditArgs) -> Result<()> {
    print!("{}", run_edit(store, args)?);
    Ok(())
}

fn run_edit(store: &mut NoteStore, args: EditArgs) -> Result<String> {
    let note = note_at(store, args.index)?.clone();
    let mut session = EditSession::open(note);
    if let Some(title) = &args.title {
        session.set_title(title);
    }
    if !args.style.is_empty() {
        let typing = args.style.apply(session.typing_attributes())?;
        session.set_typing_attributes(typing);
    }
    if let Some(text) = &args.append {
        session.insert_text(text);
    }
    session.finish(store, OffsetDateTime::now_utc());
    Ok(format!("Updated note #{}\n", args.index))
}

pub fn delete_note(store: &mut NoteStore, args: IndexArgs) -> Result<()> {
    print!("{}", run_delete(store, args)?);
    Ok(())
}

fn run_delete(store: &mut NoteStore, args: IndexArgs) -> Result<String> {
    note_at(store, args.index)?;
    let removed = store
        .delete(args.index)
        .with_context(|| format!("deleting note #{}", args.index))?;
    Ok(format!(
        "Deleted \"{}\"\n",
        removed.title.as_deref().unwrap_or(UNTITLED)
    ))
}

fn note_at(store: &NoteStore, index: usize) -> Result<&Note> {
    match store.get(index) {
        Some(note) => Ok(note),
        None => bail!("no note at index {index} ({} notes)", store.len()),
    }
}

fn format_note_list(rows: &[NoteSummary]) -> String {
    if rows.is_empty() {
        return "No notes yet.\n".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(&mut out, "#{}  {}", row.index, row.title);
        let _ = writeln!(&mut out, "    {}  {}", row.date, row.preview);
    }
    out
}

fn format_note(note: &Note) -> String {
    let mut out = String::new();
    let title = note
        .title
        .as_deref()
        .filter(|title| !title.trim().is_empty())
        .unwrap_or(UNTITLED);
    let _ = writeln!(&mut out, "{title}");
    let _ = writeln!(&mut out, "{}  {}", format_date(note.date()), note.id());
    out.push('\n');

    let Some(content) = &note.content else {
        out.push_str("(no content)\n");
        return out;
    };
    let _ = writeln!(&mut out, "{}", content.plain_text());
    out.push('\n');
    for (position, run) in content.runs().iter().enumerate() {
        match run {
            Run::Text { text, style } => {
                let _ = writeln!(
                    &mut out,
                    "  {:>2}. {:<28} {:?}",
                    position + 1,
                    describe_style(&decode(style)),
                    text
                );
            }
            Run::Image(image) => {
                let _ = writeln!(
                    &mut out,
                    "  {:>2}. image {}x{} ({} bytes)",
                    position + 1,
                    image.width,
                    image.height,
                    image.data.len()
                );
            }
        }
    }
    out
}

fn describe_style(attrs: &TextAttributes) -> String {
    let mut parts = vec![format!("{}pt", attrs.font_size)];
    if attrs.is_bold {
        parts.push("bold".into());
    }
    if attrs.is_italic {
        parts.push("italic".into());
    }
    if attrs.is_underline {
        parts.push("underline".into());
    }
    parts.join(" ")
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::storage_options;
    use tempfile::TempDir;
    use time::macros::datetime;

    type TestResult<T = ()> = Result<T>;

    fn setup_store() -> TestResult<(TempDir, NoteStore)> {
        let temp = TempDir::new().context("creating temp dir")?;
        let store = NoteStore::open(&storage_options(&temp))?;
        Ok((temp, store))
    }

    fn new_args(title: Option<&str>, style: StyleArgs) -> NewArgs {
        NewArgs {
            title: title.map(str::to_string),
            body: None,
            style,
        }
    }

    #[test]
    fn cli_new_creates_styled_note() -> TestResult {
        let (_temp, mut store) = setup_store()?;
        let style = StyleArgs {
            size: Some(24),
            bold: true,
            ..StyleArgs::default()
        };
        let output = run_new(
            &AppConfig::default(),
            &mut store,
            new_args(Some("Plan"), style),
            "ship it\n",
        )?;
        assert!(output.starts_with("Created note "));

        let note = &store.list_snapshot()[0];
        assert_eq!(note.title.as_deref(), Some("Plan"));
        assert_eq!(note.plain_text(), "ship it");
        let shown = format_note(note);
        assert!(shown.contains("24pt bold"), "{shown}");
        Ok(())
    }

    #[test]
    fn cli_new_skips_empty_body() -> TestResult {
        let (_temp, mut store) = setup_store()?;
        let output = run_new(
            &AppConfig::default(),
            &mut store,
            new_args(Some("Empty"), StyleArgs::default()),
            "\n",
        )?;
        assert!(output.starts_with("Nothing to save"));
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn cli_rejects_unknown_font_size() -> TestResult {
        let style = StyleArgs {
            size: Some(13),
            ..StyleArgs::default()
        };
        assert!(style.apply(TextAttributes::default()).is_err());
        Ok(())
    }

    #[test]
    fn cli_edit_appends_in_place() -> TestResult {
        let (_temp, mut store) = setup_store()?;
        let date = datetime!(2024-01-01 0:00 UTC);
        store.create(
            Some("keep".into()),
            date,
            Some(crate::richtext::RichText::plain("a", &TextAttributes::default())),
        );
        store.create(Some("top".into()), date, None);

        run_edit(
            &mut store,
            EditArgs {
                index: 1,
                title: None,
                append: Some("b".into()),
                style: StyleArgs {
                    underline: true,
                    ..StyleArgs::default()
                },
            },
        )?;
        let edited = &store.list_snapshot()[1];
        assert_eq!(edited.title.as_deref(), Some("keep"));
        assert_eq!(edited.plain_text(), "ab");
        assert_eq!(edited.content.as_ref().map(|c| c.runs().len()), Some(2));
        Ok(())
    }

    #[test]
    fn cli_delete_checks_bounds_first() -> TestResult {
        let (_temp, mut store) = setup_store()?;
        store.create(None, datetime!(2024-01-01 0:00 UTC), None);

        assert!(run_delete(&mut store, IndexArgs { index: 5 }).is_err());
        assert_eq!(store.len(), 1);

        let output = run_delete(&mut store, IndexArgs { index: 0 })?;
        assert_eq!(output, "Deleted \"New Note\"\n");
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn cli_list_formats_rows() -> TestResult {
        let (_temp, mut store) = setup_store()?;
        store.create(
            None,
            datetime!(2024-06-30 12:00 UTC),
            Some(crate::richtext::RichText::plain("milk\neggs", &TextAttributes::default())),
        );
        let rows = summarize(store.list_snapshot(), &AppConfig::default().list);
        assert_eq!(
            format_note_list(&rows),
            "#0  New Note\n    30.06.2024  milk eggs\n"
        );
        assert_eq!(format_note_list(&[]), "No notes yet.\n");
        Ok(())
    }
}
