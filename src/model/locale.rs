//! Language tags and the typographic conventions that depend on them.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

lazy_static! {
    static ref LOCALE_RE: Regex =
        Regex::new(r"^([A-Za-z]{2,3})(?:[-_]([A-Za-z]{2}|[0-9]{3}))?$").expect("valid regex");
}

/// Writing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Left to right
    Ltr,
    /// Right to left
    Rtl,
}

/// Quotation marks used by a language: outer open, outer close, inner
/// open, inner close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteMarks {
    /// Opening double quote
    pub open_double: char,
    /// Closing double quote
    pub close_double: char,
    /// Opening single quote
    pub open_single: char,
    /// Closing single quote, also used as apostrophe
    pub close_single: char,
}

/// A language with optional region, e.g. `en-GB`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale {
    language: String,
    region: Option<String>,
}

impl Locale {
    /// Create a locale from a language code and optional region.
    pub fn new(language: &str, region: Option<&str>) -> Self {
        Self {
            language: language.to_ascii_lowercase(),
            region: region.map(|r| r.to_ascii_uppercase()),
        }
    }

    /// ISO 639 language code, lower case.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Region code, upper case.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Direction of the script normally used for this language.
    pub fn direction(&self) -> Direction {
        match self.language.as_str() {
            "ar" | "he" | "iw" | "fa" | "ur" | "yi" | "ps" | "sd" => Direction::Rtl,
            _ => Direction::Ltr,
        }
    }

    /// Quotation marks for this language.
    pub fn quote_marks(&self) -> QuoteMarks {
        let (open_double, close_double, open_single, close_single) = match self.language.as_str() {
            "de" if self.region.as_deref() == Some("CH") => ('\u{ab}', '\u{bb}', '\u{2039}', '\u{203a}'),
            "de" | "cs" | "sk" | "sl" | "lt" | "is" => ('\u{201e}', '\u{201c}', '\u{201a}', '\u{2018}'),
            "fr" | "es" | "it" | "pt" | "ru" | "uk" | "el" | "ca" | "no" | "nb" => {
                ('\u{ab}', '\u{bb}', '\u{2039}', '\u{203a}')
            },
            "ja" | "zh" => ('\u{300c}', '\u{300d}', '\u{300e}', '\u{300f}'),
            "sv" | "fi" => ('\u{201d}', '\u{201d}', '\u{2019}', '\u{2019}'),
            "pl" | "hu" | "ro" => ('\u{201e}', '\u{201d}', '\u{201a}', '\u{2019}'),
            _ => ('\u{201c}', '\u{201d}', '\u{2018}', '\u{2019}'),
        };
        QuoteMarks {
            open_double,
            close_double,
            open_single,
            close_single,
        }
    }

    /// Replace straight quotes with the language's typographic quotes.
    /// A quote opens when it follows whitespace, an opening bracket or the
    /// start of the text; a single quote between letters is an apostrophe.
    pub fn substitute_quotes(&self, text: &str) -> String {
        let marks = self.quote_marks();
        let mut out = String::with_capacity(text.len());
        let mut prev: Option<char> = None;
        let chars: Vec<char> = text.chars().collect();
        for (i, &c) in chars.iter().enumerate() {
            let opens = match prev {
                None => true,
                Some(p) => p.is_whitespace() || matches!(p, '(' | '[' | '{' | '\u{2014}' | '\u{2013}'),
            };
            let replaced = match c {
                '"' if opens => marks.open_double,
                '"' => marks.close_double,
                '\'' => {
                    let next_is_alpha = chars.get(i + 1).map_or(false, |n| n.is_alphanumeric());
                    let prev_is_alpha = prev.map_or(false, |p| p.is_alphanumeric());
                    if prev_is_alpha && next_is_alpha {
                        '\u{2019}'
                    } else if opens {
                        marks.open_single
                    } else {
                        marks.close_single
                    }
                },
                other => other,
            };
            out.push(replaced);
            prev = Some(c);
        }
        out
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::new("en", None)
    }
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = LOCALE_RE
            .captures(s.trim())
            .ok_or_else(|| Error::InvalidArgument(format!("invalid language tag '{}'", s)))?;
        let language = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        Ok(Locale::new(language, caps.get(2).map(|m| m.as_str())))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{}", self.language, region),
            None => f.write_str(&self.language),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let locale: Locale = "en_gb".parse().unwrap();
        assert_eq!(locale.language(), "en");
        assert_eq!(locale.region(), Some("GB"));
        assert_eq!(locale.to_string(), "en-GB");
        assert!("english".parse::<Locale>().is_err());
    }

    #[test]
    fn test_direction() {
        assert_eq!(Locale::new("ar", None).direction(), Direction::Rtl);
        assert_eq!(Locale::new("de", None).direction(), Direction::Ltr);
    }

    #[test]
    fn test_english_quotes() {
        let en = Locale::default();
        assert_eq!(
            en.substitute_quotes("He said \"don't\" and 'left'"),
            "He said \u{201c}don\u{2019}t\u{201d} and \u{2018}left\u{2019}"
        );
    }

    #[test]
    fn test_german_and_french_quotes() {
        let de = Locale::new("de", None);
        assert_eq!(de.substitute_quotes("\"Ja\""), "\u{201e}Ja\u{201c}");
        let fr = Locale::new("fr", Some("FR"));
        assert_eq!(fr.substitute_quotes("\"Oui\""), "\u{ab}Oui\u{bb}");
    }
}
