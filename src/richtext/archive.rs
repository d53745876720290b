use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::{serde_as, skip_serializing_none, DisplayFromStr};
use thiserror::Error;

use super::attributes::{FontDescriptor, FontVariant, StyleMap, StyleValue, UnderlineStyle};
use super::{ImageAttachment, RichText, Run};

const ARCHIVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("image attachment {index} has no data")]
    EmptyAttachment { index: usize },
    #[error("image attachment {index} has zero-sized dimensions {width}x{height}")]
    ZeroSizedAttachment {
        index: usize,
        width: u32,
        height: u32,
    },
    #[error("encoding rich text archive")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    runs: Vec<ArchivedRun>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ArchivedRun {
    Text(ArchivedText),
    Image(ArchivedImage),
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize)]
struct ArchivedText {
    text: String,
    font: Option<ArchivedFont>,
    underline: Option<u8>,
}

#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
struct ArchivedFont {
    family: String,
    size: u16,
    #[serde_as(as = "DisplayFromStr")]
    variant: FontVariant,
}

#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
struct ArchivedImage {
    width: u32,
    height: u32,
    #[serde_as(as = "Base64")]
    data: Vec<u8>,
}

/// Serializes note content for the `content` column.
pub fn to_bytes(content: &RichText) -> Result<Vec<u8>, ArchiveError> {
    let mut runs = Vec::with_capacity(content.runs().len());
    for (index, run) in content.runs().iter().enumerate() {
        let archived = match run {
            Run::Text { text, style } => ArchivedRun::Text(archive_style(text, style)),
            Run::Image(image) => {
                check_attachment(index, image)?;
                ArchivedRun::Image(ArchivedImage {
                    width: image.width,
                    height: image.height,
                    data: image.data.clone(),
                })
            }
        };
        runs.push(archived);
    }
    let envelope = Envelope {
        version: ARCHIVE_VERSION,
        runs,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Restores content written by [`to_bytes`]. Anything unreadable yields `None`.
pub fn from_bytes(bytes: &[u8]) -> Option<RichText> {
    let envelope: Envelope = match serde_json::from_slice(bytes) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::debug!(?err, "discarding unreadable rich text archive");
            return None;
        }
    };
    if envelope.version != ARCHIVE_VERSION {
        tracing::debug!(
            version = envelope.version,
            "discarding rich text archive with unknown version"
        );
        return None;
    }

    let mut runs = Vec::with_capacity(envelope.runs.len());
    for (index, run) in envelope.runs.into_iter().enumerate() {
        match run {
            ArchivedRun::Text(archived) => {
                if archived.text.is_empty() {
                    tracing::debug!(index, "discarding archive with an empty text run");
                    return None;
                }
                runs.push(restore_style(archived));
            }
            ArchivedRun::Image(archived) => {
                let image = ImageAttachment::new(archived.width, archived.height, archived.data);
                if let Err(err) = check_attachment(index, &image) {
                    tracing::debug!(%err, "discarding archive with invalid attachment");
                    return None;
                }
                runs.push(Run::Image(image));
            }
        }
    }
    Some(RichText::from_runs(runs))
}

fn check_attachment(index: usize, image: &ImageAttachment) -> Result<(), ArchiveError> {
    if image.width == 0 || image.height == 0 {
        return Err(ArchiveError::ZeroSizedAttachment {
            index,
            width: image.width,
            height: image.height,
        });
    }
    if image.data.is_empty() {
        return Err(ArchiveError::EmptyAttachment { index });
    }
    Ok(())
}

fn archive_style(text: &str, style: &StyleMap) -> ArchivedText {
    ArchivedText {
        text: text.to_string(),
        font: style.font().map(|font| ArchivedFont {
            family: font.family.clone(),
            size: font.size,
            variant: font.variant,
        }),
        underline: style.underline().map(UnderlineStyle::raw),
    }
}

fn restore_style(archived: ArchivedText) -> Run {
    let mut style = StyleMap::new();
    if let Some(font) = archived.font {
        style.insert(StyleValue::Font(FontDescriptor {
            family: font.family,
            size: font.size,
            variant: font.variant,
        }));
    }
    if let Some(raw) = archived.underline {
        style.insert(StyleValue::Underline(UnderlineStyle::from_raw(raw)));
    }
    Run::Text {
        text: archived.text,
        style,
    }
}
