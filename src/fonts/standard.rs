//! The fourteen standard PDF fonts.
//!
//! Widths are the AFM advance widths in 1/1000 em for printable ASCII
//! plus the typographic quotes and dashes the layout engine substitutes.
//! Oblique and italic faces share the widths of their upright face.

use serde::{Deserialize, Serialize};

/// One of the 14 standard fonts every PDF viewer must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardFont {
    /// Helvetica
    Helvetica,
    /// Helvetica-Bold
    HelveticaBold,
    /// Helvetica-Oblique
    HelveticaOblique,
    /// Helvetica-BoldOblique
    HelveticaBoldOblique,
    /// Times-Roman
    TimesRoman,
    /// Times-Bold
    TimesBold,
    /// Times-Italic
    TimesItalic,
    /// Times-BoldItalic
    TimesBoldItalic,
    /// Courier
    Courier,
    /// Courier-Bold
    CourierBold,
    /// Courier-Oblique
    CourierOblique,
    /// Courier-BoldOblique
    CourierBoldOblique,
    /// Symbol
    Symbol,
    /// ZapfDingbats
    ZapfDingbats,
}

/// Generic family of a standard font, used when looking for substitutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFamily {
    /// Sans-serif (Helvetica)
    SansSerif,
    /// Serif (Times)
    Serif,
    /// Monospace (Courier)
    Monospace,
    /// Symbol
    Symbol,
    /// Dingbats
    Dingbats,
}

// Printable ASCII 0x20..=0x7E.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

const DEFAULT_WIDTH: u16 = 500;

impl StandardFont {
    /// All standard fonts.
    pub const ALL: [StandardFont; 14] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::TimesItalic,
        StandardFont::TimesBoldItalic,
        StandardFont::Courier,
        StandardFont::CourierBold,
        StandardFont::CourierOblique,
        StandardFont::CourierBoldOblique,
        StandardFont::Symbol,
        StandardFont::ZapfDingbats,
    ];

    /// PostScript name, e.g. "Times-Bold".
    pub fn postscript_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Look up a standard font by PostScript name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.postscript_name() == name)
    }

    /// Generic family.
    pub fn family(&self) -> FontFamily {
        match self {
            StandardFont::Helvetica
            | StandardFont::HelveticaBold
            | StandardFont::HelveticaOblique
            | StandardFont::HelveticaBoldOblique => FontFamily::SansSerif,
            StandardFont::TimesRoman
            | StandardFont::TimesBold
            | StandardFont::TimesItalic
            | StandardFont::TimesBoldItalic => FontFamily::Serif,
            StandardFont::Courier
            | StandardFont::CourierBold
            | StandardFont::CourierOblique
            | StandardFont::CourierBoldOblique => FontFamily::Monospace,
            StandardFont::Symbol => FontFamily::Symbol,
            StandardFont::ZapfDingbats => FontFamily::Dingbats,
        }
    }

    /// Whether this is a bold face.
    pub fn is_bold(&self) -> bool {
        matches!(
            self,
            StandardFont::HelveticaBold
                | StandardFont::HelveticaBoldOblique
                | StandardFont::TimesBold
                | StandardFont::TimesBoldItalic
                | StandardFont::CourierBold
                | StandardFont::CourierBoldOblique
        )
    }

    /// Whether this is an italic or oblique face.
    pub fn is_italic(&self) -> bool {
        matches!(
            self,
            StandardFont::HelveticaOblique
                | StandardFont::HelveticaBoldOblique
                | StandardFont::TimesItalic
                | StandardFont::TimesBoldItalic
                | StandardFont::CourierOblique
                | StandardFont::CourierBoldOblique
        )
    }

    /// Ascender in 1/1000 em.
    pub fn ascender(&self) -> f32 {
        match self.family() {
            FontFamily::SansSerif => 718.0,
            FontFamily::Serif if self.is_bold() => 676.0,
            FontFamily::Serif => 683.0,
            FontFamily::Monospace if self.is_bold() => 626.0,
            FontFamily::Monospace => 629.0,
            FontFamily::Symbol | FontFamily::Dingbats => 800.0,
        }
    }

    /// Descender in 1/1000 em (negative).
    pub fn descender(&self) -> f32 {
        match self.family() {
            FontFamily::SansSerif => -207.0,
            FontFamily::Serif if self.is_bold() => -205.0,
            FontFamily::Serif => -217.0,
            FontFamily::Monospace if self.is_bold() => -142.0,
            FontFamily::Monospace => -157.0,
            FontFamily::Symbol | FontFamily::Dingbats => -200.0,
        }
    }

    /// Advance width of a character in 1/1000 em.
    pub fn char_width(&self, ch: char) -> u16 {
        let table = match self.family() {
            FontFamily::Monospace => return 600,
            FontFamily::Symbol | FontFamily::Dingbats => return DEFAULT_WIDTH,
            FontFamily::SansSerif if self.is_bold() => &HELVETICA_BOLD,
            FontFamily::SansSerif => &HELVETICA,
            FontFamily::Serif if self.is_bold() => &TIMES_BOLD,
            FontFamily::Serif => &TIMES_ROMAN,
        };
        let serif = self.family() == FontFamily::Serif;
        match ch {
            ' '..='~' => table[ch as usize - 0x20],
            '\u{a0}' => table[0],
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{2039}' | '\u{203a}' => {
                if serif {
                    333
                } else {
                    222
                }
            },
            '\u{201c}' | '\u{201d}' | '\u{201e}' => {
                if serif {
                    444
                } else {
                    333
                }
            },
            '\u{ab}' | '\u{bb}' => {
                if serif {
                    500
                } else {
                    556
                }
            },
            '\u{2013}' => {
                if serif {
                    500
                } else {
                    556
                }
            },
            '\u{2014}' | '\u{2026}' => 1000,
            '\u{2022}' => 350,
            _ => DEFAULT_WIDTH,
        }
    }

    /// Whether the font's standard encoding can show this character.
    pub fn covers(&self, ch: char) -> bool {
        match self.family() {
            FontFamily::Symbol | FontFamily::Dingbats => true,
            _ => {
                (ch as u32) < 0x100
                    || matches!(
                        ch,
                        '\u{2013}'
                            | '\u{2014}'
                            | '\u{2018}'..='\u{201e}'
                            | '\u{2022}'
                            | '\u{2026}'
                            | '\u{2039}'
                            | '\u{203a}'
                            | '\u{20ac}'
                    )
            },
        }
    }
}

impl std::fmt::Display for StandardFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.postscript_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for font in StandardFont::ALL {
            assert_eq!(StandardFont::from_name(font.postscript_name()), Some(font));
        }
        assert_eq!(StandardFont::from_name("Arial"), None);
    }

    #[test]
    fn test_widths() {
        assert_eq!(StandardFont::Helvetica.char_width(' '), 278);
        assert_eq!(StandardFont::Helvetica.char_width('W'), 944);
        assert_eq!(StandardFont::HelveticaOblique.char_width('i'), 222);
        assert_eq!(StandardFont::TimesRoman.char_width('a'), 444);
        assert_eq!(StandardFont::TimesBold.char_width('W'), 1000);
        assert_eq!(StandardFont::Courier.char_width('i'), 600);
        assert_eq!(StandardFont::Helvetica.char_width('\u{201c}'), 333);
    }

    #[test]
    fn test_style_flags() {
        assert!(StandardFont::TimesBoldItalic.is_bold());
        assert!(StandardFont::TimesBoldItalic.is_italic());
        assert!(!StandardFont::Courier.is_bold());
        assert_eq!(StandardFont::CourierBold.family(), FontFamily::Monospace);
    }

    #[test]
    fn test_coverage() {
        assert!(StandardFont::Helvetica.covers('é'));
        assert!(StandardFont::Helvetica.covers('\u{201c}'));
        assert!(!StandardFont::Helvetica.covers('\u{05d0}'));
    }
}
