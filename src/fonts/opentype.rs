//! OpenType / TrueType fonts supplied by the caller.
//!
//! Fonts are parsed once with `ttf-parser`; the widths and names needed for
//! layout and substitution are kept, together with the program bytes that
//! travel with the document.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ttf_parser::{Face, GlyphId};

use crate::error::{Error, Result};

/// A font program that is embedded in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTypeFont {
    postscript_name: String,
    family: String,
    bold: bool,
    italic: bool,
    /// Ascender in 1/1000 em
    ascender: f32,
    /// Descender in 1/1000 em (negative)
    descender: f32,
    /// Advance widths in 1/1000 em keyed by code point
    widths: BTreeMap<u32, u16>,
    missing_width: u16,
    #[serde(with = "crate::io::base64_bytes")]
    program: Arc<Vec<u8>>,
}

impl OpenTypeFont {
    /// Parse a TrueType/OpenType font from raw data.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Font("font file is empty".to_string()));
        }
        let face = Face::parse(&data, 0).map_err(|e| Error::Font(e.to_string()))?;
        let units_per_em = u32::from(face.units_per_em().max(1));
        let scale = |v: i16| f32::from(v) * 1000.0 / units_per_em as f32;

        let mut widths = BTreeMap::new();
        for codepoint in 0x20..=0xFFFF_u32 {
            let Some(ch) = char::from_u32(codepoint) else {
                continue;
            };
            if let Some(GlyphId(gid)) = face.glyph_index(ch) {
                let advance = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0);
                widths.insert(codepoint, (u32::from(advance) * 1000 / units_per_em) as u16);
            }
        }
        let missing_width = face
            .glyph_hor_advance(GlyphId(0))
            .map(|a| (u32::from(a) * 1000 / units_per_em) as u16)
            .unwrap_or(500);

        let name = |id: u16| {
            face.names()
                .into_iter()
                .find(|n| n.name_id == id && n.is_unicode())
                .and_then(|n| n.to_string())
        };
        let family = name(ttf_parser::name_id::FAMILY).unwrap_or_else(|| "Unknown".to_string());
        let postscript_name = name(ttf_parser::name_id::POST_SCRIPT_NAME)
            .unwrap_or_else(|| family.replace(' ', ""));

        let (bold, italic) = (face.is_bold(), face.is_italic());
        let (ascender, descender) = (scale(face.ascender()), scale(face.descender()));

        log::debug!(
            "Parsed font {} ({} glyph mappings)",
            postscript_name,
            widths.len()
        );

        Ok(Self {
            postscript_name,
            family,
            bold,
            italic,
            ascender,
            descender,
            widths,
            missing_width,
            program: Arc::new(data),
        })
    }

    /// Load a font from a file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Build a font from already known metrics. The program bytes are
    /// carried opaquely.
    pub fn from_metrics(
        postscript_name: impl Into<String>,
        family: impl Into<String>,
        bold: bool,
        italic: bool,
        widths: impl IntoIterator<Item = (char, u16)>,
        program: Vec<u8>,
    ) -> Self {
        Self {
            postscript_name: postscript_name.into(),
            family: family.into(),
            bold,
            italic,
            ascender: 750.0,
            descender: -250.0,
            widths: widths.into_iter().map(|(c, w)| (c as u32, w)).collect(),
            missing_width: 500,
            program: Arc::new(program),
        }
    }

    /// PostScript name.
    pub fn postscript_name(&self) -> &str {
        &self.postscript_name
    }

    /// Family name.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Whether the font is bold.
    pub fn is_bold(&self) -> bool {
        self.bold
    }

    /// Whether the font is italic.
    pub fn is_italic(&self) -> bool {
        self.italic
    }

    /// Ascender in 1/1000 em.
    pub fn ascender(&self) -> f32 {
        self.ascender
    }

    /// Descender in 1/1000 em.
    pub fn descender(&self) -> f32 {
        self.descender
    }

    /// Whether the font maps this character to a glyph.
    pub fn covers(&self, ch: char) -> bool {
        self.widths.contains_key(&(ch as u32))
    }

    /// Advance width in 1/1000 em.
    pub fn char_width(&self, ch: char) -> u16 {
        self.widths.get(&(ch as u32)).copied().unwrap_or(self.missing_width)
    }

    /// The raw font program.
    pub fn program(&self) -> &[u8] {
        &self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_garbage() {
        assert!(OpenTypeFont::from_bytes(Vec::new()).is_err());
        assert!(OpenTypeFont::from_bytes(vec![1, 2, 3, 4, 5]).is_err());
    }

    #[test]
    fn test_from_metrics() {
        let font = OpenTypeFont::from_metrics(
            "Test-Bold",
            "Test",
            true,
            false,
            ('a'..='z').map(|c| (c, 500)),
            vec![0u8; 4],
        );
        assert!(font.covers('q'));
        assert!(!font.covers('Q'));
        assert_eq!(font.char_width('q'), 500);
        assert!(font.is_bold());
        assert_eq!(font.program().len(), 4);
    }
}
