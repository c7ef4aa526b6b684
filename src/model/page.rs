//! Pages and their content streams.
//!
//! Drawing calls append [`ContentOp`]s that capture a copy of the current
//! style, so changing the style afterwards never alters what was drawn.
//! Save/restore, structure tags and layers are markers in the same stream
//! and must be balanced before the document is rendered.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::annotation::Annotation;
use super::ids::{AnnotationId, LayerId, PageId, TagKey};
use super::image::ImageRef;
use crate::error::{Error, Result};
use crate::geometry::{PageSize, Point, Rect};
use crate::layout::{FragmentContent, LayoutBox, TagNodeId};
use crate::style::Style;

/// Role that marks content as an artifact rather than document content.
pub const ARTIFACT: &str = "Artifact";

/// One operation in a page's content stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentOp {
    /// Push the graphics state
    Save,
    /// Pop the graphics state
    Restore,
    /// Show text with its baseline starting at (x, y)
    Text {
        /// Baseline start, x
        x: f32,
        /// Baseline start, y
        y: f32,
        /// Text shown
        text: String,
        /// Style captured at draw time
        style: Style,
    },
    /// Fill and/or stroke a rectangle
    Rectangle {
        /// Rectangle in page space
        rect: Rect,
        /// Style captured at draw time
        style: Style,
    },
    /// Stroke a line
    Line {
        /// Start
        from: Point,
        /// End
        to: Point,
        /// Style captured at draw time
        style: Style,
    },
    /// Paint an image into a rectangle
    Image {
        /// Target rectangle
        rect: Rect,
        /// Image
        image: ImageRef,
        /// Constant opacity
        alpha: f32,
    },
    /// Open a structure element
    BeginTag {
        /// Element identity
        key: TagKey,
        /// Role, e.g. "P"
        role: String,
        /// Attributes
        attributes: IndexMap<String, String>,
    },
    /// Close the innermost structure element
    EndTag,
    /// Start content belonging to a layer
    BeginLayer(LayerId),
    /// End layer content
    EndLayer,
}

impl ContentOp {
    /// Whether this op paints something.
    pub fn is_drawing(&self) -> bool {
        matches!(
            self,
            ContentOp::Text { .. } | ContentOp::Rectangle { .. } | ContentOp::Line { .. } | ContentOp::Image { .. }
        )
    }

    /// Style captured by a drawing op.
    pub fn style(&self) -> Option<&Style> {
        match self {
            ContentOp::Text { style, .. } | ContentOp::Rectangle { style, .. } | ContentOp::Line { style, .. } => {
                Some(style)
            },
            _ => None,
        }
    }

    /// Mutable style of a drawing op.
    pub fn style_mut(&mut self) -> Option<&mut Style> {
        match self {
            ContentOp::Text { style, .. } | ContentOp::Rectangle { style, .. } | ContentOp::Line { style, .. } => {
                Some(style)
            },
            _ => None,
        }
    }
}

/// Which page boundary box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBox {
    /// Visible region
    Crop,
    /// Meaningful content
    Art,
    /// Region including bleed
    Bleed,
    /// Finished page after trimming
    Trim,
}

/// A page: media box, optional boundary boxes, annotations and content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    id: PageId,
    media_box: Rect,
    crop_box: Option<Rect>,
    art_box: Option<Rect>,
    bleed_box: Option<Rect>,
    trim_box: Option<Rect>,
    rotation: u16,
    annotations: Vec<Annotation>,
    content: Vec<ContentOp>,
    #[serde(skip)]
    style: Style,
    #[serde(skip)]
    saved: Vec<Style>,
    #[serde(skip)]
    open_tags: usize,
    #[serde(skip)]
    open_layers: usize,
}

impl Page {
    /// Create an empty page.
    pub fn new(size: PageSize) -> Self {
        Self {
            id: PageId::new(),
            media_box: size.to_rect(),
            crop_box: None,
            art_box: None,
            bleed_box: None,
            trim_box: None,
            rotation: 0,
            annotations: Vec::new(),
            content: Vec::new(),
            style: Style::default(),
            saved: Vec::new(),
            open_tags: 0,
            open_layers: 0,
        }
    }

    /// Identity.
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Width of the media box.
    pub fn width(&self) -> f32 {
        self.media_box.width
    }

    /// Height of the media box.
    pub fn height(&self) -> f32 {
        self.media_box.height
    }

    /// Media box.
    pub fn media_box(&self) -> Rect {
        self.media_box
    }

    /// A boundary box; unset boxes default to the crop box, which
    /// defaults to the media box.
    pub fn page_box(&self, which: PageBox) -> Rect {
        let crop = self.crop_box.unwrap_or(self.media_box);
        let explicit = match which {
            PageBox::Crop => self.crop_box,
            PageBox::Art => self.art_box,
            PageBox::Bleed => self.bleed_box,
            PageBox::Trim => self.trim_box,
        };
        explicit.unwrap_or(crop)
    }

    /// Override a boundary box.
    pub fn set_page_box(&mut self, which: PageBox, rect: Option<Rect>) {
        let slot = match which {
            PageBox::Crop => &mut self.crop_box,
            PageBox::Art => &mut self.art_box,
            PageBox::Bleed => &mut self.bleed_box,
            PageBox::Trim => &mut self.trim_box,
        };
        *slot = rect;
    }

    /// Rotation in degrees.
    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    /// Set the rotation; must be a multiple of 90.
    pub fn set_rotation(&mut self, degrees: i32) -> Result<()> {
        if degrees % 90 != 0 {
            return Err(Error::InvalidArgument(format!(
                "rotation {} is not a multiple of 90",
                degrees
            )));
        }
        self.rotation = degrees.rem_euclid(360) as u16;
        Ok(())
    }

    /// Annotations in z-order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Live list of annotations.
    pub fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
        &mut self.annotations
    }

    /// Add an annotation on top of the others.
    pub fn add_annotation(&mut self, annotation: Annotation) -> AnnotationId {
        let id = annotation.id();
        self.annotations.push(annotation);
        id
    }

    /// Look up an annotation.
    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    /// Remove an annotation. Replies to it lose their parent reference.
    pub fn remove_annotation(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id() == id)?;
        let removed = self.annotations.remove(index);
        for a in &mut self.annotations {
            if a.in_reply_to == Some(id) {
                a.in_reply_to = None;
            }
        }
        Some(removed)
    }

    /// Content stream.
    pub fn content(&self) -> &[ContentOp] {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut Vec<ContentOp> {
        &mut self.content
    }

    /// Replace the content stream, e.g. after rasterizing the page.
    pub fn replace_content(&mut self, content: Vec<ContentOp>) {
        self.content = content;
        self.saved.clear();
        self.open_tags = 0;
        self.open_layers = 0;
    }

    /// Current style.
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Set the style used by later drawing calls.
    pub fn set_style(&mut self, style: &Style) {
        self.style = style.clone();
    }

    /// Push the current style.
    pub fn save(&mut self) {
        self.saved.push(self.style.clone());
        self.content.push(ContentOp::Save);
    }

    /// Pop the style pushed by the matching `save`.
    pub fn restore(&mut self) -> Result<()> {
        let style = self
            .saved
            .pop()
            .ok_or_else(|| Error::state("restore without matching save"))?;
        self.style = style;
        self.content.push(ContentOp::Restore);
        Ok(())
    }

    /// Draw text with its baseline starting at (x, y).
    pub fn draw_text(&mut self, text: impl Into<String>, x: f32, y: f32) {
        self.content.push(ContentOp::Text {
            x,
            y,
            text: text.into(),
            style: self.style.clone(),
        });
    }

    /// Draw a rectangle between two corners.
    pub fn draw_rectangle(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        self.content.push(ContentOp::Rectangle {
            rect: Rect::from_points(x0, y0, x1, y1),
            style: self.style.clone(),
        });
    }

    /// Draw a line.
    pub fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        self.content.push(ContentOp::Line {
            from: Point::new(x0, y0),
            to: Point::new(x1, y1),
            style: self.style.clone(),
        });
    }

    /// Paint an image between two corners.
    pub fn draw_image(&mut self, image: &ImageRef, x0: f32, y0: f32, x1: f32, y1: f32) {
        self.content.push(ContentOp::Image {
            rect: Rect::from_points(x0, y0, x1, y1),
            image: image.clone(),
            alpha: self.style.alpha,
        });
    }

    /// Open a structure element.
    pub fn begin_tag(&mut self, role: impl Into<String>, attributes: IndexMap<String, String>) -> TagKey {
        let key = TagKey::new();
        self.begin_tag_with_key(key, role.into(), attributes);
        key
    }

    pub(crate) fn begin_tag_with_key(&mut self, key: TagKey, role: String, attributes: IndexMap<String, String>) {
        self.open_tags += 1;
        self.content.push(ContentOp::BeginTag { key, role, attributes });
    }

    /// Close the innermost structure element.
    pub fn end_tag(&mut self) -> Result<()> {
        if self.open_tags == 0 {
            return Err(Error::state("end_tag without matching begin_tag"));
        }
        self.open_tags -= 1;
        self.content.push(ContentOp::EndTag);
        Ok(())
    }

    /// Mark following content as an artifact.
    pub fn begin_artifact(&mut self) -> TagKey {
        self.begin_tag(ARTIFACT, IndexMap::new())
    }

    /// Start content belonging to a layer.
    pub fn begin_layer(&mut self, layer: LayerId) {
        self.open_layers += 1;
        self.content.push(ContentOp::BeginLayer(layer));
    }

    /// End layer content.
    pub fn end_layer(&mut self) -> Result<()> {
        if self.open_layers == 0 {
            return Err(Error::state("end_layer without matching begin_layer"));
        }
        self.open_layers -= 1;
        self.content.push(ContentOp::EndLayer);
        Ok(())
    }

    /// Draw a flushed layout box with its top-left corner at (x, top).
    /// Structure tags of the box become tags in the page content.
    pub fn draw_layout_box(&mut self, lbox: &LayoutBox, x: f32, top: f32) -> Result<()> {
        lbox.height()?;
        let tags = lbox.tags();
        let mut open: Vec<TagNodeId> = Vec::new();

        let mut sync_tags = |page: &mut Page, target: Option<TagNodeId>| {
            let path = tags.path(target);
            let common = open.iter().zip(path.iter()).take_while(|(a, b)| a == b).count();
            while open.len() > common {
                open.pop();
                page.open_tags -= 1;
                page.content.push(ContentOp::EndTag);
            }
            for &node_id in &path[common..] {
                if let Some(node) = tags.node(node_id) {
                    page.begin_tag_with_key(node.key, node.role.clone(), node.attributes.clone());
                    open.push(node_id);
                }
            }
        };

        for float in lbox.floats() {
            if let Some(image) = lbox.box_image(float.id) {
                sync_tags(self, float.tag);
                let rect = Rect::new(x + float.x, top - float.bottom(), float.width, float.height);
                self.content.push(ContentOp::Image {
                    rect,
                    image: image.clone(),
                    alpha: 1.0,
                });
            }
        }

        for line in lbox.lines() {
            for frag in &line.fragments {
                let baseline = top - (line.top + frag.baseline);
                match &frag.content {
                    FragmentContent::Text(text) => {
                        sync_tags(self, frag.tag);
                        let style = frag.style.as_deref().cloned().unwrap_or_default();
                        self.content.push(ContentOp::Text {
                            x: x + frag.x,
                            y: baseline,
                            text: text.clone(),
                            style,
                        });
                    },
                    FragmentContent::Box(id) => {
                        if let Some(image) = lbox.box_image(*id) {
                            sync_tags(self, frag.tag);
                            let rect = Rect::new(
                                x + frag.x,
                                baseline - frag.descent,
                                frag.width,
                                frag.ascent + frag.descent,
                            );
                            self.content.push(ContentOp::Image {
                                rect,
                                image: image.clone(),
                                alpha: 1.0,
                            });
                        }
                    },
                }
            }
        }
        sync_tags(self, None);
        Ok(())
    }

    /// Whether save/restore, tags and layers are balanced.
    pub fn is_balanced(&self) -> bool {
        let mut saves = 0i64;
        let mut tags = 0i64;
        let mut layers = 0i64;
        for op in &self.content {
            match op {
                ContentOp::Save => saves += 1,
                ContentOp::Restore => saves -= 1,
                ContentOp::BeginTag { .. } => tags += 1,
                ContentOp::EndTag => tags -= 1,
                ContentOp::BeginLayer(_) => layers += 1,
                ContentOp::EndLayer => layers -= 1,
                _ => {},
            }
            if saves < 0 || tags < 0 || layers < 0 {
                return false;
            }
        }
        saves == 0 && tags == 0 && layers == 0
    }

    /// Fail with `StateMisuse` unless the content is balanced.
    pub fn check_balanced(&self) -> Result<()> {
        if self.is_balanced() {
            Ok(())
        } else {
            Err(Error::state(format!("page {} has unbalanced save/restore, tag or layer markers", self.id)))
        }
    }

    /// Whether any content is tagged.
    pub fn is_tagged(&self) -> bool {
        self.content.iter().any(|op| matches!(op, ContentOp::BeginTag { .. }))
    }

    /// Copy of this page with a fresh page id, fresh annotation ids and
    /// fresh structure tag keys. Reply chains within the page follow the
    /// new ids.
    pub fn duplicate(&self) -> Page {
        let mut copy = self.clone();
        copy.renew_ids(&mut IndexMap::new());
        copy
    }

    /// Give the page, its annotations and its tags fresh ids; returns the
    /// annotation id mapping. Tag keys are looked up in `tags` first so
    /// that elements continued across pages stay joined.
    pub(crate) fn renew_ids(&mut self, tags: &mut IndexMap<TagKey, TagKey>) -> IndexMap<AnnotationId, AnnotationId> {
        self.id = PageId::new();
        for op in &mut self.content {
            if let ContentOp::BeginTag { key, .. } = op {
                *key = *tags.entry(*key).or_insert_with(TagKey::new);
            }
        }
        let mut mapping = IndexMap::new();
        for a in &mut self.annotations {
            let old = a.id();
            a.renew_id();
            mapping.insert(old, a.id());
        }
        for a in &mut self.annotations {
            if let Some(parent) = a.in_reply_to {
                a.in_reply_to = mapping.get(&parent).copied();
            }
        }
        mapping
    }
}
