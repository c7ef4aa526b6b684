//! Replacing unembedded fonts with fonts from a pool.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::fonts::{FontFamily, FontRef, OpenTypeFont, StandardFont};
use crate::model::{ContentOp, Document};

/// Substitutes embedded fonts for unembedded ones.
///
/// A candidate must cover every character drawn with the font it
/// replaces. Among those, fonts of the same generic family and with the
/// same weight and slant are preferred; ties go to the earlier font in
/// the pool.
#[derive(Debug, Clone, Default)]
pub struct FontAction {
    pool: Vec<Arc<OpenTypeFont>>,
}

impl FontAction {
    /// Create an action choosing from `pool`.
    pub fn new(pool: impl IntoIterator<Item = Arc<OpenTypeFont>>) -> Self {
        Self {
            pool: pool.into_iter().collect(),
        }
    }

    /// Fonts that may be substituted in.
    pub fn pool(&self) -> &[Arc<OpenTypeFont>] {
        &self.pool
    }

    /// Best substitute for `font` able to draw every character of `chars`.
    pub fn substitute(&self, font: &FontRef, chars: &BTreeSet<char>) -> Option<Arc<OpenTypeFont>> {
        let family = match font {
            FontRef::Standard(f) => Some(f.family()),
            FontRef::OpenType(f) => classify(f.family()),
        };
        let mut best: Option<(u32, &Arc<OpenTypeFont>)> = None;
        for candidate in &self.pool {
            if !chars.iter().all(|c| c.is_whitespace() || candidate.covers(*c)) {
                continue;
            }
            let mut score = 0;
            if family.is_some() && classify(candidate.family()) == family {
                score += 4;
            }
            if candidate.is_bold() == font.is_bold() {
                score += 2;
            }
            if candidate.is_italic() == font.is_italic() {
                score += 1;
            }
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, candidate));
            }
        }
        best.map(|(_, f)| Arc::clone(f))
    }

    /// Replace every unembedded font of the document for which a
    /// substitute exists. Returns the replaced and replacement names.
    pub fn apply(&self, doc: &mut Document) -> Vec<(String, String)> {
        let mut used: BTreeMap<String, (FontRef, BTreeSet<char>)> = BTreeMap::new();
        for page in doc.pages() {
            for op in page.content() {
                if let ContentOp::Text { text, style, .. } = op {
                    if style.font.is_embedded() {
                        continue;
                    }
                    let entry = used
                        .entry(style.font.name().to_string())
                        .or_insert_with(|| (style.font.clone(), BTreeSet::new()));
                    entry.1.extend(text.chars());
                }
            }
        }

        let mut replacements: BTreeMap<String, Arc<OpenTypeFont>> = BTreeMap::new();
        for (name, (font, chars)) in &used {
            match self.substitute(font, chars) {
                Some(sub) => {
                    log::debug!("substituting {} for {}", sub.postscript_name(), name);
                    replacements.insert(name.clone(), sub);
                },
                None => log::warn!("no substitute covers the text drawn in {}", name),
            }
        }
        if replacements.is_empty() {
            return Vec::new();
        }

        for page in doc.pages_mut() {
            for op in page.content_mut().iter_mut() {
                if let ContentOp::Text { style, .. } = op {
                    if let Some(sub) = replacements.get(style.font.name()) {
                        style.font = FontRef::OpenType(Arc::clone(sub));
                    }
                }
            }
        }
        replacements
            .into_iter()
            .map(|(name, sub)| (name, sub.postscript_name().to_string()))
            .collect()
    }
}

/// Generic family guessed from a family name.
fn classify(family: &str) -> Option<FontFamily> {
    let name = family.to_ascii_lowercase();
    if name.contains("mono") || name.contains("courier") || name.contains("code") {
        Some(FontFamily::Monospace)
    } else if name.contains("sans") || name.contains("arial") || name.contains("helvetica") {
        Some(FontFamily::SansSerif)
    } else if name.contains("serif") || name.contains("times") || name.contains("roman") {
        Some(FontFamily::Serif)
    } else if name.contains("symbol") {
        Some(FontFamily::Symbol)
    } else if name.contains("dingbat") {
        Some(FontFamily::Dingbats)
    } else {
        StandardFont::from_name(family).map(|f| f.family())
    }
}
