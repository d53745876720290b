use bitflags::bitflags;
use indexmap::IndexMap;
use strum::{Display, EnumIter, EnumString};

/// Family name of the platform UI font. Any other family is treated as foreign
/// when decoding and contributes no bold/italic information.
pub const SYSTEM_FONT_FAMILY: &str = "system";
pub const DEFAULT_FONT_SIZE: u16 = 16;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FontTraits: u8 {
        const BOLD = 0b01;
        const ITALIC = 0b10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum FontVariant {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontVariant {
    pub fn from_traits(traits: FontTraits) -> Self {
        match (
            traits.contains(FontTraits::BOLD),
            traits.contains(FontTraits::ITALIC),
        ) {
            (true, true) => FontVariant::BoldItalic,
            (true, false) => FontVariant::Bold,
            (false, true) => FontVariant::Italic,
            (false, false) => FontVariant::Regular,
        }
    }

    pub fn traits(self) -> FontTraits {
        match self {
            FontVariant::Regular => FontTraits::empty(),
            FontVariant::Bold => FontTraits::BOLD,
            FontVariant::Italic => FontTraits::ITALIC,
            FontVariant::BoldItalic => FontTraits::BOLD | FontTraits::ITALIC,
        }
    }
}

/// Size presets offered by the format menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum FontSize {
    Large,
    Medium,
    Small,
}

impl FontSize {
    pub fn points(self) -> u16 {
        match self {
            FontSize::Large => 24,
            FontSize::Medium => DEFAULT_FONT_SIZE,
            FontSize::Small => 12,
        }
    }

    pub fn from_points(points: u16) -> Option<Self> {
        match points {
            24 => Some(FontSize::Large),
            16 => Some(FontSize::Medium),
            12 => Some(FontSize::Small),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontDescriptor {
    pub family: String,
    pub size: u16,
    pub variant: FontVariant,
}

impl FontDescriptor {
    pub fn system(size: u16, variant: FontVariant) -> Self {
        Self {
            family: SYSTEM_FONT_FAMILY.to_string(),
            size,
            variant,
        }
    }

    pub fn is_system(&self) -> bool {
        self.family == SYSTEM_FONT_FAMILY
    }
}

/// Underline styles with the raw values renderers exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnderlineStyle {
    None,
    Single,
    Thick,
    Double,
}

impl UnderlineStyle {
    pub fn raw(self) -> u8 {
        match self {
            UnderlineStyle::None => 0,
            UnderlineStyle::Single => 1,
            UnderlineStyle::Thick => 2,
            UnderlineStyle::Double => 9,
        }
    }

    /// Unknown raw values still mean "some underline".
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => UnderlineStyle::None,
            2 => UnderlineStyle::Thick,
            9 => UnderlineStyle::Double,
            _ => UnderlineStyle::Single,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum StyleKey {
    Font,
    Underline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleValue {
    Font(FontDescriptor),
    Underline(UnderlineStyle),
}

impl StyleValue {
    pub fn key(&self) -> StyleKey {
        match self {
            StyleValue::Font(_) => StyleKey::Font,
            StyleValue::Underline(_) => StyleKey::Underline,
        }
    }
}

/// Style attributes attached to one run of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    entries: IndexMap<StyleKey, StyleValue>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under the key matching its kind, so a key never holds
    /// the other kind's value.
    pub fn insert(&mut self, value: StyleValue) -> Option<StyleValue> {
        self.entries.insert(value.key(), value)
    }

    pub fn get(&self, key: StyleKey) -> Option<&StyleValue> {
        self.entries.get(&key)
    }

    pub fn contains_key(&self, key: StyleKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn remove(&mut self, key: StyleKey) -> Option<StyleValue> {
        self.entries.shift_remove(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StyleKey, &StyleValue)> {
        self.entries.iter()
    }

    /// The font entry, if the `Font` key holds a font value.
    pub fn font(&self) -> Option<&FontDescriptor> {
        match self.entries.get(&StyleKey::Font) {
            Some(StyleValue::Font(font)) => Some(font),
            _ => None,
        }
    }

    pub fn underline(&self) -> Option<UnderlineStyle> {
        match self.entries.get(&StyleKey::Underline) {
            Some(StyleValue::Underline(style)) => Some(*style),
            _ => None,
        }
    }
}

/// Style selected in the format menu for the text at the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextAttributes {
    pub font_size: u16,
    pub is_bold: bool,
    pub is_italic: bool,
    pub is_underline: bool,
}

impl Default for TextAttributes {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            is_bold: false,
            is_italic: false,
            is_underline: false,
        }
    }
}

impl TextAttributes {
    pub fn with_size(font_size: u16) -> Self {
        Self {
            font_size,
            ..Self::default()
        }
    }

    pub fn traits(&self) -> FontTraits {
        let mut traits = FontTraits::empty();
        traits.set(FontTraits::BOLD, self.is_bold);
        traits.set(FontTraits::ITALIC, self.is_italic);
        traits
    }

    pub fn variant(&self) -> FontVariant {
        FontVariant::from_traits(self.traits())
    }
}

pub fn encode(attrs: &TextAttributes) -> StyleMap {
    let mut style = StyleMap::new();
    style.insert(StyleValue::Font(FontDescriptor::system(
        attrs.font_size,
        attrs.variant(),
    )));
    if attrs.is_underline {
        style.insert(StyleValue::Underline(UnderlineStyle::Single));
    }
    style
}

pub fn decode(style: &StyleMap) -> TextAttributes {
    let Some(font) = style.font() else {
        return TextAttributes::default();
    };
    let traits = if font.is_system() {
        font.variant.traits()
    } else {
        FontTraits::empty()
    };
    TextAttributes {
        font_size: font.size,
        is_bold: traits.contains(FontTraits::BOLD),
        is_italic: traits.contains(FontTraits::ITALIC),
        is_underline: style.contains_key(StyleKey::Underline),
    }
}

impl From<&TextAttributes> for StyleMap {
    fn from(attrs: &TextAttributes) -> Self {
        encode(attrs)
    }
}

impl From<&StyleMap> for TextAttributes {
    fn from(style: &StyleMap) -> Self {
        decode(style)
    }
}
