//! Fonts used for layout and drawing.
//!
//! A [`FontRef`] is either one of the standard 14 fonts, which viewers
//! supply and which are never embedded, or an [`OpenTypeFont`] whose
//! program travels with the document.

mod opentype;
mod standard;

pub use opentype::OpenTypeFont;
pub use standard::{FontFamily, StandardFont};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Reference to a font used by a style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FontRef {
    /// Standard 14 font
    Standard(StandardFont),
    /// Caller supplied font, shared
    OpenType(Arc<OpenTypeFont>),
}

impl FontRef {
    /// PostScript name of the font.
    pub fn name(&self) -> &str {
        match self {
            FontRef::Standard(f) => f.postscript_name(),
            FontRef::OpenType(f) => f.postscript_name(),
        }
    }

    /// Whether the font program is embedded.
    pub fn is_embedded(&self) -> bool {
        matches!(self, FontRef::OpenType(_))
    }

    /// Advance width of a character in 1/1000 em.
    pub fn char_width(&self, ch: char) -> f32 {
        match self {
            FontRef::Standard(f) => f32::from(f.char_width(ch)),
            FontRef::OpenType(f) => f32::from(f.char_width(ch)),
        }
    }

    /// Width of text in points at the given size.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units: f32 = text.chars().map(|c| self.char_width(c)).sum();
        units * font_size / 1000.0
    }

    /// Ascender in points at the given size.
    pub fn ascent(&self, font_size: f32) -> f32 {
        let units = match self {
            FontRef::Standard(f) => f.ascender(),
            FontRef::OpenType(f) => f.ascender(),
        };
        units * font_size / 1000.0
    }

    /// Descender depth in points at the given size (positive).
    pub fn descent(&self, font_size: f32) -> f32 {
        let units = match self {
            FontRef::Standard(f) => f.descender(),
            FontRef::OpenType(f) => f.descender(),
        };
        -units * font_size / 1000.0
    }

    /// Whether a glyph exists for the character.
    pub fn covers(&self, ch: char) -> bool {
        match self {
            FontRef::Standard(f) => f.covers(ch),
            FontRef::OpenType(f) => f.covers(ch),
        }
    }

    /// Bold face.
    pub fn is_bold(&self) -> bool {
        match self {
            FontRef::Standard(f) => f.is_bold(),
            FontRef::OpenType(f) => f.is_bold(),
        }
    }

    /// Italic face.
    pub fn is_italic(&self) -> bool {
        match self {
            FontRef::Standard(f) => f.is_italic(),
            FontRef::OpenType(f) => f.is_italic(),
        }
    }
}

impl Default for FontRef {
    fn default() -> Self {
        FontRef::Standard(StandardFont::Helvetica)
    }
}

impl From<StandardFont> for FontRef {
    fn from(font: StandardFont) -> Self {
        FontRef::Standard(font)
    }
}

impl From<Arc<OpenTypeFont>> for FontRef {
    fn from(font: Arc<OpenTypeFont>) -> Self {
        FontRef::OpenType(font)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width() {
        let font = FontRef::Standard(StandardFont::Helvetica);
        // "Hi" = 722 + 222
        assert!((font.text_width("Hi", 10.0) - 9.44).abs() < 1e-4);
        assert!(!font.is_embedded());
    }

    #[test]
    fn test_vertical_metrics() {
        let font = FontRef::default();
        assert!((font.ascent(10.0) - 7.18).abs() < 1e-4);
        assert!((font.descent(10.0) - 2.07).abs() < 1e-4);
    }

    #[test]
    fn test_opentype_ref() {
        let font = Arc::new(OpenTypeFont::from_metrics(
            "Sans",
            "Sans",
            false,
            false,
            [('a', 400)],
            Vec::new(),
        ));
        let r = FontRef::from(font);
        assert!(r.is_embedded());
        assert_eq!(r.name(), "Sans");
        assert_eq!(r.char_width('a'), 400.0);
    }
}
