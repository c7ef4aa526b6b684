//! Line breaking and placement.
//!
//! Coordinates inside a box are measured from its top-left corner with y
//! growing downwards. Lines are committed greedily: a line takes items
//! until the next one would exceed the width left free by floats that are
//! active at the line's top.

use std::collections::VecDeque;
use std::sync::Arc;

use super::flow::{BoxId, Clear, Item, Side, TextId};
use super::tags::TagNodeId;
use crate::style::{Style, TextAlign, VerticalAlign};

const EPSILON: f32 = 1e-3;

/// What a fragment shows.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentContent {
    /// A word
    Text(String),
    /// An inline box
    Box(BoxId),
}

/// A positioned piece of a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Word or box
    pub content: FragmentContent,
    /// Distance from the box's left edge
    pub x: f32,
    /// Distance from the line's top to this fragment's baseline
    pub baseline: f32,
    /// Advance width
    pub width: f32,
    /// Extent above the baseline
    pub ascent: f32,
    /// Extent below the baseline
    pub descent: f32,
    /// Style the text was added with; `None` for boxes
    pub style: Option<Arc<Style>>,
    /// Run the text came from
    pub text_id: Option<TextId>,
    /// Innermost structure tag
    pub tag: Option<TagNodeId>,
}

/// A committed line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Distance from the box's top
    pub top: f32,
    /// Line height
    pub height: f32,
    /// Distance from the line's top to the shared baseline
    pub baseline: f32,
    /// Fragments in visual order
    pub fragments: Vec<Fragment>,
    /// Last line of a paragraph
    pub paragraph_end: bool,
}

impl Line {
    /// Distance from the box's top to the line's bottom.
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// A float placed against one side of the box.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedFloat {
    /// Box handle
    pub id: BoxId,
    /// Side it floats on
    pub side: Side,
    /// Distance from the box's left edge
    pub x: f32,
    /// Distance from the box's top
    pub top: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
    /// Innermost structure tag
    pub tag: Option<TagNodeId>,
}

impl PlacedFloat {
    /// Distance from the box's top to the float's bottom.
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    fn active_at(&self, y: f32) -> bool {
        self.top <= y + EPSILON && y < self.bottom() - EPSILON
    }
}

#[derive(Debug)]
struct Entry {
    content: FragmentContent,
    width: f32,
    gap: f32,
    above: f32,
    below: f32,
    ascent: f32,
    descent: f32,
    bottom_aligned: bool,
    style: Option<Arc<Style>>,
    text_id: Option<TextId>,
    tag: Option<TagNodeId>,
    rtl: bool,
}

#[derive(Debug, Default)]
struct LineBuilder {
    entries: Vec<Entry>,
    width: f32,
    pending_space: f32,
    break_style: Option<Arc<Style>>,
}

impl LineBuilder {
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, mut entry: Entry) {
        entry.gap = if self.entries.is_empty() { 0.0 } else { self.pending_space };
        self.width += entry.gap + entry.width;
        self.pending_space = 0.0;
        self.entries.push(entry);
    }
}

/// Committed lines and floats plus the flow cursor.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Flow {
    pub width: f32,
    pub cursor: f32,
    pub lines: Vec<Line>,
    pub floats: Vec<PlacedFloat>,
}

fn text_entry(text: String, style: Arc<Style>, text_id: TextId, tag: Option<TagNodeId>, rtl: bool) -> Entry {
    let size = style.font_size;
    let ascent = style.font.ascent(size);
    let descent = style.font.descent(size);
    let half_leading = ((style.line_height() - (ascent + descent)) / 2.0).max(0.0);
    Entry {
        width: style.text_width(&text),
        content: FragmentContent::Text(text),
        gap: 0.0,
        above: ascent + half_leading,
        below: descent + half_leading,
        ascent,
        descent,
        bottom_aligned: style.vertical_align == VerticalAlign::Bottom,
        style: Some(style),
        text_id: Some(text_id),
        tag,
        rtl,
    }
}

fn box_entry(id: BoxId, width: f32, height: f32, offset: f32, tag: Option<TagNodeId>) -> Entry {
    Entry {
        content: FragmentContent::Box(id),
        width,
        gap: 0.0,
        above: height - offset,
        below: offset,
        ascent: height - offset,
        descent: offset,
        bottom_aligned: false,
        style: None,
        text_id: None,
        tag,
        rtl: false,
    }
}

/// Longest prefix of `word` (at least one character) that fits `available`.
fn split_word(word: &str, style: &Style, available: f32) -> (String, String) {
    let mut end = 0;
    for (i, c) in word.char_indices() {
        let next = i + c.len_utf8();
        if end > 0 && style.text_width(&word[..next]) > available + EPSILON {
            break;
        }
        end = next;
    }
    (word[..end].to_string(), word[end..].to_string())
}

impl Flow {
    pub fn new(width: f32) -> Self {
        Self {
            width,
            cursor: 0.0,
            lines: Vec::new(),
            floats: Vec::new(),
        }
    }

    /// Height of everything committed, floats included.
    pub fn height(&self) -> f32 {
        self.floats
            .iter()
            .map(|f| f.bottom())
            .fold(self.cursor, f32::max)
    }

    fn bounds_at(&self, y: f32) -> (f32, f32) {
        let mut left = 0.0f32;
        let mut right = self.width;
        for f in self.floats.iter().filter(|f| f.active_at(y)) {
            match f.side {
                Side::Left => left = left.max(f.x + f.width),
                Side::Right => right = right.min(f.x),
            }
        }
        (left, right)
    }

    /// Bottom of the nearest float active at `y`, if any.
    fn next_float_bottom(&self, y: f32) -> Option<f32> {
        self.floats
            .iter()
            .filter(|f| f.active_at(y))
            .map(|f| f.bottom())
            .fold(None, |acc: Option<f32>, b| Some(acc.map_or(b, |a| a.min(b))))
    }

    fn place_float(&mut self, id: BoxId, side: Side, width: f32, height: f32, clear: bool, tag: Option<TagNodeId>) {
        let mut y = self.cursor;
        if clear {
            y = self
                .floats
                .iter()
                .filter(|f| f.side == side)
                .map(|f| f.bottom())
                .fold(y, f32::max);
        }
        loop {
            let (left, right) = self.bounds_at(y);
            let fits = right - left + EPSILON >= width;
            match self.next_float_bottom(y) {
                Some(bottom) if !fits => y = bottom,
                _ => {
                    let x = match side {
                        Side::Left => left,
                        Side::Right => (right - width).max(0.0),
                    };
                    log::debug!("float {:?} placed {:?} at ({}, {})", id, side, x, y);
                    self.floats.push(PlacedFloat {
                        id,
                        side,
                        x,
                        top: y,
                        width,
                        height,
                        tag,
                    });
                    return;
                },
            }
        }
    }

    fn clear(&mut self, clear: Clear) {
        self.cursor = self
            .floats
            .iter()
            .filter(|f| clear.covers(f.side))
            .map(|f| f.bottom())
            .fold(self.cursor, f32::max);
    }

    fn place_deferred(&mut self, deferred: &mut Vec<Item>) {
        for item in deferred.drain(..) {
            if let Item::Float {
                id,
                side,
                width,
                height,
                clear,
                tag,
            } = item
            {
                self.place_float(id, side, width, height, clear, tag);
            }
        }
    }

    /// Commit pending items into lines.
    pub fn commit(&mut self, items: Vec<Item>) {
        let mut queue: VecDeque<Item> = items.into();
        let mut line = LineBuilder::default();
        let mut deferred: Vec<Item> = Vec::new();

        while let Some(item) = queue.pop_front() {
            match item {
                Item::Float {
                    id,
                    side,
                    width,
                    height,
                    clear,
                    tag,
                } => {
                    if line.is_empty() {
                        self.place_float(id, side, width, height, clear, tag);
                    } else {
                        deferred.push(Item::Float {
                            id,
                            side,
                            width,
                            height,
                            clear,
                            tag,
                        });
                    }
                },
                Item::Clear(clear) => {
                    if !line.is_empty() {
                        self.finish_line(&mut line, true);
                        self.place_deferred(&mut deferred);
                    }
                    self.clear(clear);
                },
                Item::LineBreak { style } => {
                    if line.is_empty() {
                        line.break_style = Some(style);
                    }
                    self.finish_line(&mut line, true);
                    self.place_deferred(&mut deferred);
                },
                Item::Space { style } => {
                    if !line.is_empty() {
                        line.pending_space += style.text_width(" ");
                    }
                },
                Item::Word {
                    text,
                    style,
                    text_id,
                    tag,
                    rtl,
                } => {
                    let (left, right) = self.bounds_at(self.cursor);
                    let available = right - left;
                    let width = style.text_width(&text);
                    if !line.is_empty() && line.width + line.pending_space + width > available + EPSILON {
                        queue.push_front(Item::Word {
                            text,
                            style,
                            text_id,
                            tag,
                            rtl,
                        });
                        self.finish_line(&mut line, false);
                        self.place_deferred(&mut deferred);
                        continue;
                    }
                    if line.is_empty() && width > available + EPSILON {
                        if available < self.width - EPSILON {
                            if let Some(bottom) = self.next_float_bottom(self.cursor) {
                                self.cursor = bottom;
                                queue.push_front(Item::Word {
                                    text,
                                    style,
                                    text_id,
                                    tag,
                                    rtl,
                                });
                                continue;
                            }
                        }
                        let (head, rest) = split_word(&text, &style, available);
                        line.push(text_entry(head, Arc::clone(&style), text_id, tag, rtl));
                        if !rest.is_empty() {
                            queue.push_front(Item::Word {
                                text: rest,
                                style,
                                text_id,
                                tag,
                                rtl,
                            });
                            self.finish_line(&mut line, false);
                            self.place_deferred(&mut deferred);
                        }
                        continue;
                    }
                    line.push(text_entry(text, style, text_id, tag, rtl));
                },
                Item::Inline {
                    id,
                    width,
                    height,
                    offset,
                    tag,
                } => {
                    let (left, right) = self.bounds_at(self.cursor);
                    let available = right - left;
                    if !line.is_empty() && line.width + line.pending_space + width > available + EPSILON {
                        queue.push_front(Item::Inline {
                            id,
                            width,
                            height,
                            offset,
                            tag,
                        });
                        self.finish_line(&mut line, false);
                        self.place_deferred(&mut deferred);
                        continue;
                    }
                    if line.is_empty() && width > available + EPSILON && available < self.width - EPSILON {
                        if let Some(bottom) = self.next_float_bottom(self.cursor) {
                            self.cursor = bottom;
                            queue.push_front(Item::Inline {
                                id,
                                width,
                                height,
                                offset,
                                tag,
                            });
                            continue;
                        }
                    }
                    line.push(box_entry(id, width, height, offset, tag));
                },
            }
        }

        if !line.is_empty() {
            self.finish_line(&mut line, true);
        }
        self.place_deferred(&mut deferred);
    }

    fn finish_line(&mut self, line: &mut LineBuilder, paragraph_end: bool) {
        let builder = std::mem::take(line);
        if builder.entries.is_empty() {
            if let Some(style) = builder.break_style {
                let size = style.font_size;
                let ascent = style.font.ascent(size);
                let descent = style.font.descent(size);
                let height = style.line_height();
                let baseline = ascent + ((height - (ascent + descent)) / 2.0).max(0.0);
                self.lines.push(Line {
                    top: self.cursor,
                    height,
                    baseline,
                    fragments: Vec::new(),
                    paragraph_end: true,
                });
                self.cursor += height;
            }
            return;
        }

        let mut max_above = 0.0f32;
        let mut max_below = 0.0f32;
        let mut max_total = 0.0f32;
        for e in &builder.entries {
            if e.bottom_aligned {
                max_total = max_total.max(e.above + e.below);
            } else {
                max_above = max_above.max(e.above);
                max_below = max_below.max(e.below);
            }
        }
        let height = (max_above + max_below).max(max_total);
        let baseline = if max_above > 0.0 || max_below > 0.0 {
            max_above
        } else {
            height - builder.entries.iter().map(|e| e.below).fold(0.0, f32::max)
        };

        let (left, right) = self.bounds_at(self.cursor);
        let available = (right - left).max(0.0);
        let align = builder
            .entries
            .iter()
            .find_map(|e| e.style.as_ref().map(|s| s.text_align))
            .unwrap_or_default();
        let gaps = builder.entries.len().saturating_sub(1);
        let content = builder.width;
        let slack = available - content;
        let (start, extra) = match align {
            TextAlign::Left => (0.0, 0.0),
            TextAlign::Right => (slack.max(0.0), 0.0),
            TextAlign::Center => ((slack / 2.0).max(0.0), 0.0),
            TextAlign::Justify => {
                if !paragraph_end && gaps > 0 && slack > 0.0 {
                    (0.0, slack / gaps as f32)
                } else {
                    (0.0, 0.0)
                }
            },
        };
        let rtl = builder.entries.first().map_or(false, |e| e.rtl);

        let mut x = left + start;
        let mut fragments = Vec::with_capacity(builder.entries.len());
        for (i, e) in builder.entries.into_iter().enumerate() {
            if i > 0 {
                x += e.gap + extra;
            }
            let mut fx = x;
            if rtl {
                fx = left + right - x - e.width;
            }
            let frag_baseline = if e.bottom_aligned {
                height - e.below
            } else {
                baseline
            };
            x += e.width;
            fragments.push(Fragment {
                content: e.content,
                x: fx,
                baseline: frag_baseline,
                width: e.width,
                ascent: e.ascent,
                descent: e.descent,
                style: e.style,
                text_id: e.text_id,
                tag: e.tag,
            });
        }
        if rtl {
            fragments.reverse();
        }

        self.lines.push(Line {
            top: self.cursor,
            height,
            baseline,
            fragments,
            paragraph_end,
        });
        self.cursor += height;
    }
}
