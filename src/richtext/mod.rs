pub mod archive;
pub mod attributes;

pub use archive::{from_bytes, to_bytes, ArchiveError};
pub use attributes::{
    decode, encode, FontDescriptor, FontSize, FontTraits, FontVariant, StyleKey, StyleMap,
    StyleValue, TextAttributes, UnderlineStyle,
};

/// Character that stands in for an inline image in the plain-text projection.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub width: u32,
    pub height: u32,
    /// Encoded image bytes (PNG, JPEG, ...). Opaque to the note store.
    pub data: Vec<u8>,
}

impl ImageAttachment {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    Text { text: String, style: StyleMap },
    Image(ImageAttachment),
}

/// Styled note content: text runs and inline images, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    runs: Vec<Run>,
}

impl RichText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: &str, attrs: &TextAttributes) -> Self {
        let mut content = Self::new();
        content.push_text(text, &encode(attrs));
        content
    }

    /// Appends `text`, extending the last run when it carries the same style.
    pub fn push_text(&mut self, text: &str, style: &StyleMap) {
        if text.is_empty() {
            return;
        }
        if let Some(Run::Text {
            text: last,
            style: last_style,
        }) = self.runs.last_mut()
        {
            if last_style == style {
                last.push_str(text);
                return;
            }
        }
        self.runs.push(Run::Text {
            text: text.to_string(),
            style: style.clone(),
        });
    }

    pub fn push_styled(&mut self, text: &str, attrs: &TextAttributes) {
        self.push_text(text, &encode(attrs));
    }

    pub fn push_image(&mut self, image: ImageAttachment) {
        self.runs.push(Run::Image(image));
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageAttachment> {
        self.runs.iter().filter_map(|run| match run {
            Run::Image(image) => Some(image),
            Run::Text { .. } => None,
        })
    }

    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            match run {
                Run::Text { text, .. } => out.push_str(text),
                Run::Image(_) => out.push(OBJECT_REPLACEMENT),
            }
        }
        out
    }

    /// Style of the last text run, which is what typing at the end continues with.
    pub fn trailing_style(&self) -> Option<&StyleMap> {
        self.runs.iter().rev().find_map(|run| match run {
            Run::Text { style, .. } => Some(style),
            Run::Image(_) => None,
        })
    }

    pub(crate) fn from_runs(runs: Vec<Run>) -> Self {
        Self { runs }
    }
}
