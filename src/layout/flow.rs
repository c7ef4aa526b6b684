//! Pending flow items and tokenization of text into them.

use std::sync::Arc;

use super::tags::TagNodeId;
use crate::model::{Direction, Locale};
use crate::style::Style;

/// Handle to a run of text added with `add_text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextId(pub(crate) usize);

/// Handle to an inline or floating box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxId(pub(crate) usize);

/// Side a float is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Left edge
    Left,
    /// Right edge
    Right,
}

/// Which floats the flow must move below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clear {
    /// Left floats only
    Left,
    /// Right floats only
    Right,
    /// All floats
    Both,
}

impl Clear {
    pub(crate) fn covers(&self, side: Side) -> bool {
        matches!(
            (self, side),
            (Clear::Both, _) | (Clear::Left, Side::Left) | (Clear::Right, Side::Right)
        )
    }
}

/// Item waiting to be committed into lines by `flush`.
#[derive(Debug, Clone)]
pub(crate) enum Item {
    Word {
        text: String,
        style: Arc<Style>,
        text_id: TextId,
        tag: Option<TagNodeId>,
        rtl: bool,
    },
    Space {
        style: Arc<Style>,
    },
    LineBreak {
        style: Arc<Style>,
    },
    Inline {
        id: BoxId,
        width: f32,
        height: f32,
        offset: f32,
        tag: Option<TagNodeId>,
    },
    Float {
        id: BoxId,
        side: Side,
        width: f32,
        height: f32,
        clear: bool,
        tag: Option<TagNodeId>,
    },
    Clear(Clear),
}

/// Split text into words, spaces and hard breaks. Quotes are substituted
/// and direction taken from the locale when one is given.
pub(crate) fn tokenize(
    text: &str,
    style: Arc<Style>,
    locale: Option<&Locale>,
    text_id: TextId,
    tag: Option<TagNodeId>,
) -> Vec<Item> {
    let text = match locale {
        Some(l) => l.substitute_quotes(text),
        None => text.to_string(),
    };
    let rtl = locale.map_or(false, |l| l.direction() == Direction::Rtl);

    let mut items = Vec::new();
    let mut word = String::new();
    let flush_word = |word: &mut String, items: &mut Vec<Item>| {
        if !word.is_empty() {
            items.push(Item::Word {
                text: std::mem::take(word),
                style: Arc::clone(&style),
                text_id,
                tag,
                rtl,
            });
        }
    };

    for c in text.chars() {
        match c {
            '\n' => {
                flush_word(&mut word, &mut items);
                items.push(Item::LineBreak {
                    style: Arc::clone(&style),
                });
            },
            '\r' => {},
            ' ' | '\t' => {
                flush_word(&mut word, &mut items);
                items.push(Item::Space {
                    style: Arc::clone(&style),
                });
            },
            other => word.push(other),
        }
    }
    flush_word(&mut word, &mut items);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(items: &[Item]) -> Vec<String> {
        items
            .iter()
            .map(|i| match i {
                Item::Word { text, .. } => text.clone(),
                Item::Space { .. } => "_".to_string(),
                Item::LineBreak { .. } => "\\n".to_string(),
                _ => "?".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_tokenize_words_spaces_breaks() {
        let items = tokenize("Hello  world\nagain", Arc::new(Style::new()), None, TextId(0), None);
        assert_eq!(words(&items), vec!["Hello", "_", "_", "world", "\\n", "again"]);
    }

    #[test]
    fn test_tokenize_substitutes_quotes_and_direction() {
        let de = Locale::new("de", None);
        let items = tokenize("\"Ja\"", Arc::new(Style::new()), Some(&de), TextId(0), None);
        assert_eq!(words(&items), vec!["\u{201e}Ja\u{201c}"]);

        let he = Locale::new("he", None);
        let items = tokenize("shalom", Arc::new(Style::new()), Some(&he), TextId(0), None);
        assert!(matches!(items[0], Item::Word { rtl: true, .. }));
    }

    #[test]
    fn test_no_locale_means_no_substitution() {
        let items = tokenize("\"x\"", Arc::new(Style::new()), None, TextId(0), None);
        assert_eq!(words(&items), vec!["\"x\""]);
    }
}
