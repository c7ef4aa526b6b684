//! Text layout engine.
//!
//! A [`LayoutBox`] has a fixed width and a height that grows as content is
//! committed. Text, inline boxes and floats are added to a pending list;
//! [`LayoutBox::flush`] breaks the pending content into lines. A flushed
//! box can be split at a height, which moves the overflowing lines into a
//! new box that continues the flow (typically on the next page).
//!
//! ## Example
//!
//! ```
//! use pdf_folio::layout::LayoutBox;
//! use pdf_folio::style::{Style, TextAlign};
//!
//! let mut lbox = LayoutBox::new(200.0);
//! let style = Style::new().with_align(TextAlign::Justify);
//! lbox.add_text("The quick brown fox jumps over the lazy dog. ", &style, None);
//! lbox.flush();
//! let height = lbox.height().unwrap();
//! assert!(height > 0.0);
//!
//! let rest = lbox.split_at(15.0).unwrap();
//! assert!(lbox.height().unwrap() <= 15.0);
//! assert!((lbox.height().unwrap() + rest.height().unwrap() - height).abs() < 1e-3);
//! ```

mod flow;
mod line;
mod tags;

pub use flow::{BoxId, Clear, Side, TextId};
pub use line::{Fragment, FragmentContent, Line, PlacedFloat};
pub use tags::{TagArena, TagNode, TagNodeId};

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::model::{ImageRef, Locale, Page};
use crate::style::Style;
use flow::{tokenize, Item};
use line::Flow;

const EPSILON: f32 = 1e-3;

/// Whether a box has uncommitted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    /// Content has been added since the last flush
    Building,
    /// All content is committed into lines
    Flushed,
}

/// A flow of text and boxes laid out into lines of fixed width.
#[derive(Debug, Clone)]
pub struct LayoutBox {
    flow: Flow,
    pending: Vec<Item>,
    state: LayoutState,
    tags: TagArena,
    next_text: usize,
    next_box: usize,
    images: BTreeMap<BoxId, ImageRef>,
}

impl LayoutBox {
    /// Create an empty box of the given width.
    pub fn new(width: f32) -> Self {
        Self {
            flow: Flow::new(width),
            pending: Vec::new(),
            state: LayoutState::Flushed,
            tags: TagArena::new(),
            next_text: 0,
            next_box: 0,
            images: BTreeMap::new(),
        }
    }

    /// Box width.
    pub fn width(&self) -> f32 {
        self.flow.width
    }

    /// Current state.
    pub fn state(&self) -> LayoutState {
        self.state
    }

    /// True when nothing has been committed or added.
    pub fn is_empty(&self) -> bool {
        self.flow.lines.is_empty() && self.flow.floats.is_empty() && self.pending.is_empty()
    }

    fn building(&mut self) {
        self.state = LayoutState::Building;
    }

    /// Add text in a style. The style is captured now; later changes to
    /// the caller's style do not affect this text. With a locale, straight
    /// quotes become the language's quotation marks and right-to-left
    /// languages are laid out right to left.
    pub fn add_text(&mut self, text: &str, style: &Style, locale: Option<&Locale>) -> TextId {
        let id = TextId(self.next_text);
        self.next_text += 1;
        let items = tokenize(text, Arc::new(style.clone()), locale, id, self.tags.current());
        self.pending.extend(items);
        self.building();
        id
    }

    /// Add a box that flows like a glyph. `offset` is how far its bottom
    /// sits below the baseline.
    pub fn add_box_inline(&mut self, width: f32, height: f32, offset: f32) -> BoxId {
        let id = self.new_box_id();
        self.pending.push(Item::Inline {
            id,
            width,
            height,
            offset,
            tag: self.tags.current(),
        });
        self.building();
        id
    }

    /// Float a box against the left edge. With `clear` it is placed below
    /// any earlier left floats.
    pub fn add_box_left(&mut self, width: f32, height: f32, clear: bool) -> BoxId {
        self.add_float(Side::Left, width, height, clear)
    }

    /// Float a box against the right edge. With `clear` it is placed below
    /// any earlier right floats.
    pub fn add_box_right(&mut self, width: f32, height: f32, clear: bool) -> BoxId {
        self.add_float(Side::Right, width, height, clear)
    }

    fn add_float(&mut self, side: Side, width: f32, height: f32, clear: bool) -> BoxId {
        let id = self.new_box_id();
        self.pending.push(Item::Float {
            id,
            side,
            width,
            height,
            clear,
            tag: self.tags.current(),
        });
        self.building();
        id
    }

    fn new_box_id(&mut self) -> BoxId {
        let id = BoxId(self.next_box);
        self.next_box += 1;
        id
    }

    /// Move the flow below floats on the given sides.
    pub fn add_clear(&mut self, clear: Clear) {
        self.pending.push(Item::Clear(clear));
        self.building();
    }

    /// Show an image in a box.
    pub fn set_box_image(&mut self, id: BoxId, image: ImageRef) -> Result<()> {
        if id.0 >= self.next_box {
            return Err(Error::InvalidArgument(format!("no box {:?} in this layout", id)));
        }
        self.images.insert(id, image);
        Ok(())
    }

    /// Image shown in a box.
    pub fn box_image(&self, id: BoxId) -> Option<&ImageRef> {
        self.images.get(&id)
    }

    /// Open a structure tag around the content added next.
    pub fn begin_tag(&mut self, role: impl Into<String>, attributes: IndexMap<String, String>) -> TagNodeId {
        self.tags.begin(role, attributes)
    }

    /// Close the innermost structure tag.
    pub fn end_tag(&mut self) -> Result<()> {
        self.tags.end().map(|_| ())
    }

    /// Structure tags used by this box.
    pub fn tags(&self) -> &TagArena {
        &self.tags
    }

    /// Commit pending content into lines.
    pub fn flush(&mut self) {
        let items = std::mem::take(&mut self.pending);
        if !items.is_empty() {
            log::debug!("flushing {} items into box of width {}", items.len(), self.flow.width);
            self.flow.commit(items);
        }
        self.state = LayoutState::Flushed;
    }

    fn require_flushed(&self, operation: &str) -> Result<()> {
        if self.state != LayoutState::Flushed || !self.pending.is_empty() {
            return Err(Error::state(format!("{} called with unflushed content", operation)));
        }
        Ok(())
    }

    /// Height of the committed content.
    pub fn height(&self) -> Result<f32> {
        self.require_flushed("height")?;
        Ok(self.flow.height())
    }

    /// Committed lines.
    pub fn lines(&self) -> &[Line] {
        &self.flow.lines
    }

    /// Placed floats.
    pub fn floats(&self) -> &[PlacedFloat] {
        &self.flow.floats
    }

    /// Keep the lines that fit within `max_height` and return a new box
    /// holding the rest. Lines and floats are never divided: the split
    /// falls on the lowest line boundary that fits and that no float
    /// straddles. If no line fits, this box keeps nothing.
    pub fn split_at(&mut self, max_height: f32) -> Result<LayoutBox> {
        self.require_flushed("split_at")?;
        let total = self.flow.height();
        let mut remainder = LayoutBox {
            flow: Flow::new(self.flow.width),
            pending: Vec::new(),
            state: LayoutState::Flushed,
            tags: self.tags.clone(),
            next_text: self.next_text,
            next_box: self.next_box,
            images: BTreeMap::new(),
        };
        if total <= max_height + EPSILON {
            return Ok(remainder);
        }

        let boundary_of = |k: usize, lines: &[Line]| if k == 0 { 0.0 } else { lines[k - 1].bottom() };
        let straddles = |b: f32, floats: &[PlacedFloat]| {
            floats
                .iter()
                .any(|f| f.top < b - EPSILON && f.bottom() > b + EPSILON)
        };
        let mut keep = 0;
        for k in (0..=self.flow.lines.len()).rev() {
            let b = boundary_of(k, &self.flow.lines);
            if b <= max_height + EPSILON && !straddles(b, &self.flow.floats) {
                keep = k;
                break;
            }
        }
        let boundary = boundary_of(keep, &self.flow.lines);
        log::debug!(
            "split at {}: keeping {} of {} lines, boundary {}",
            max_height,
            keep,
            self.flow.lines.len(),
            boundary
        );

        let mut moved = self.flow.lines.split_off(keep);
        for line in &mut moved {
            line.top -= boundary;
        }
        let (stay, go): (Vec<PlacedFloat>, Vec<PlacedFloat>) = std::mem::take(&mut self.flow.floats)
            .into_iter()
            .partition(|f| f.top < boundary - EPSILON);
        self.flow.floats = stay;
        let go: Vec<PlacedFloat> = go
            .into_iter()
            .map(|mut f| {
                f.top -= boundary;
                f
            })
            .collect();

        let moved_boxes: Vec<BoxId> = go
            .iter()
            .map(|f| f.id)
            .chain(moved.iter().flat_map(|l| l.fragments.iter()).filter_map(|f| match f.content {
                FragmentContent::Box(id) => Some(id),
                FragmentContent::Text(_) => None,
            }))
            .collect();
        for id in moved_boxes {
            if let Some(image) = self.images.remove(&id) {
                remainder.images.insert(id, image);
            }
        }

        remainder.flow.lines = moved;
        remainder.flow.floats = go;
        remainder.flow.cursor = (self.flow.cursor - boundary).max(0.0);
        self.flow.cursor = boundary;
        Ok(remainder)
    }

    /// Rectangles covered by a run of text, one per fragment, in a space
    /// whose origin is the box's top-left corner with y growing upwards
    /// (so everything inside the box has negative y).
    pub fn text_corners(&self, id: TextId) -> Result<Vec<Rect>> {
        self.require_flushed("text_corners")?;
        let mut out = Vec::new();
        for line in &self.flow.lines {
            for frag in line.fragments.iter().filter(|f| f.text_id == Some(id)) {
                let baseline = line.top + frag.baseline;
                let bottom = baseline + frag.descent;
                out.push(Rect::new(frag.x, -bottom, frag.width, frag.ascent + frag.descent));
            }
        }
        Ok(out)
    }

    /// Draw the committed content onto a page with the box's top-left
    /// corner at (`left`, `top`) in page space. Words keep the style they
    /// were added with; boxes paint their image if they have one. Content
    /// under structure tags is wrapped in the same tags on the page, with
    /// the same keys, so an element split across pages stays one element.
    pub fn draw(&self, page: &mut Page, left: f32, top: f32) -> Result<()> {
        self.require_flushed("draw")?;
        let style = page.style().clone();
        let mut open = Vec::new();

        for float in &self.flow.floats {
            self.retag(page, &mut open, float.tag)?;
            if let Some(image) = self.images.get(&float.id) {
                let (x0, y1) = (left + float.x, top - float.top);
                page.draw_image(image, x0, y1 - float.height, x0 + float.width, y1);
            }
        }
        for line in &self.flow.lines {
            for frag in &line.fragments {
                self.retag(page, &mut open, frag.tag)?;
                let baseline = top - (line.top + frag.baseline);
                let x = left + frag.x;
                match &frag.content {
                    FragmentContent::Text(word) => {
                        if let Some(s) = &frag.style {
                            page.set_style(s);
                        }
                        page.draw_text(word.clone(), x, baseline);
                    },
                    FragmentContent::Box(id) => {
                        if let Some(image) = self.images.get(id) {
                            page.draw_image(image, x, baseline - frag.descent, x + frag.width, baseline + frag.ascent);
                        }
                    },
                }
            }
        }
        self.retag(page, &mut open, None)?;
        page.set_style(&style);
        Ok(())
    }

    /// Close and open page tags so the open ones match the path to `tag`.
    fn retag(&self, page: &mut Page, open: &mut Vec<TagNodeId>, tag: Option<TagNodeId>) -> Result<()> {
        let path = self.tags.path(tag);
        let common = open.iter().zip(&path).take_while(|(a, b)| a == b).count();
        while open.len() > common {
            page.end_tag()?;
            open.pop();
        }
        for &id in &path[common..] {
            if let Some(node) = self.tags.node(id) {
                page.begin_tag_with_key(node.key, node.role.clone(), node.attributes.clone());
                open.push(id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TextAlign;

    fn paragraph(words: usize) -> String {
        (0..words).map(|i| format!("word{} ", i)).collect()
    }

    #[test]
    fn test_height_before_flush_is_state_misuse() {
        let mut lbox = LayoutBox::new(100.0);
        lbox.add_text("pending", &Style::new(), None);
        assert!(matches!(lbox.height(), Err(Error::StateMisuse(_))));
        assert!(matches!(lbox.split_at(10.0), Err(Error::StateMisuse(_))));
        lbox.flush();
        assert!(lbox.height().is_ok());
        lbox.add_text("more", &Style::new(), None);
        assert_eq!(lbox.state(), LayoutState::Building);
    }

    #[test]
    fn test_unmatched_end_tag() {
        let mut lbox = LayoutBox::new(100.0);
        assert!(matches!(lbox.end_tag(), Err(Error::StateMisuse(_))));
        lbox.begin_tag("P", IndexMap::new());
        assert!(lbox.end_tag().is_ok());
    }

    #[test]
    fn test_split_preserves_heights_and_order() {
        let mut lbox = LayoutBox::new(150.0);
        lbox.add_text(&paragraph(60), &Style::new().with_align(TextAlign::Justify), None);
        lbox.flush();
        let total = lbox.height().unwrap();
        let all_lines = lbox.lines().len();

        let rest = lbox.split_at(50.0).unwrap();
        let head = lbox.height().unwrap();
        let tail = rest.height().unwrap();
        assert!(head <= 50.0 + 1e-3);
        assert!((head + tail - total).abs() < 1e-3);
        assert_eq!(lbox.lines().len() + rest.lines().len(), all_lines);
        assert_eq!(rest.state(), LayoutState::Flushed);
        assert!(rest.lines()[0].top.abs() < 1e-3);
    }

    #[test]
    fn test_split_when_everything_fits() {
        let mut lbox = LayoutBox::new(300.0);
        lbox.add_text("short", &Style::new(), None);
        lbox.flush();
        let rest = lbox.split_at(1000.0).unwrap();
        assert!(rest.is_empty());
        assert_eq!(rest.height().unwrap(), 0.0);
    }

    #[test]
    fn test_split_never_cuts_a_float() {
        let mut lbox = LayoutBox::new(200.0);
        lbox.add_box_left(50.0, 40.0, false);
        lbox.add_text(&paragraph(40), &Style::new(), None);
        lbox.flush();
        let rest = lbox.split_at(30.0).unwrap();
        for f in lbox.floats() {
            assert!(f.bottom() <= 30.0 + 1e-3);
        }
        assert_eq!(lbox.floats().len() + rest.floats().len(), 1);
    }

    #[test]
    fn test_remainder_keeps_open_tags_and_can_continue() {
        let mut lbox = LayoutBox::new(100.0);
        let p = lbox.begin_tag("P", IndexMap::new());
        lbox.add_text(&paragraph(30), &Style::new(), None);
        lbox.flush();
        let mut rest = lbox.split_at(20.0).unwrap();
        assert_eq!(rest.tags().current(), Some(p));
        assert_eq!(rest.tags().node(p).unwrap().key, lbox.tags().node(p).unwrap().key);
        rest.end_tag().unwrap();
        rest.add_text("tail", &Style::new(), None);
        rest.flush();
        assert!(rest.height().is_ok());
    }

    #[test]
    fn test_text_corners() {
        let mut lbox = LayoutBox::new(200.0);
        let a = lbox.add_text("first ", &Style::new(), None);
        let b = lbox.add_text("second", &Style::new(), None);
        lbox.flush();
        let ra = lbox.text_corners(a).unwrap();
        let rb = lbox.text_corners(b).unwrap();
        assert_eq!(ra.len(), 1);
        assert_eq!(rb.len(), 1);
        assert!(rb[0].x > ra[0].x);
        assert!(ra[0].top() <= 0.0);
    }

    #[test]
    fn test_box_image() {
        let mut lbox = LayoutBox::new(200.0);
        let id = lbox.add_box_inline(10.0, 10.0, 0.0);
        let img = ImageRef::from_rgb8(1, 1, &[0, 0, 0]).unwrap();
        assert!(lbox.set_box_image(id, img).is_ok());
        assert!(lbox.box_image(id).is_some());
        assert!(lbox.set_box_image(BoxId(99), ImageRef::from_rgb8(1, 1, &[0, 0, 0]).unwrap()).is_err());
    }

    #[test]
    fn test_draw_replays_tags_across_pages() {
        use crate::geometry::PageSize;
        use crate::model::ContentOp;

        let mut lbox = LayoutBox::new(100.0);
        lbox.begin_tag("P", IndexMap::new());
        lbox.add_text(&paragraph(30), &Style::new(), None);
        lbox.end_tag().unwrap();
        lbox.flush();
        let rest = lbox.split_at(20.0).unwrap();

        let mut first = Page::new(PageSize::A4);
        let mut second = Page::new(PageSize::A4);
        lbox.draw(&mut first, 72.0, 770.0).unwrap();
        rest.draw(&mut second, 72.0, 770.0).unwrap();
        assert!(first.check_balanced().is_ok());
        assert!(second.check_balanced().is_ok());

        let key = |page: &Page| {
            page.content().iter().find_map(|op| match op {
                ContentOp::BeginTag { key, .. } => Some(*key),
                _ => None,
            })
        };
        assert!(key(&first).is_some());
        assert_eq!(key(&first), key(&second));
        match &first.content()[1] {
            ContentOp::Text { x, y, .. } => {
                assert_eq!(*x, 72.0);
                assert!(*y < 770.0);
            },
            other => panic!("unexpected {:?}", other),
        }
    }
}
