//! Page annotations.
//!
//! An annotation belongs to exactly one page and is positioned in that
//! page's coordinate space. Reply chains refer to the parent annotation by
//! id only.

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::action::{Action, AnnotationEvent};
use super::embedded_file::EmbeddedFile;
use super::ids::AnnotationId;
use crate::color::Color;
use crate::geometry::Rect;

bitflags! {
    /// Annotation flags (ISO 32000-1 Table 165).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AnnotationFlags: u32 {
        /// Do not display an unknown annotation type
        const INVISIBLE = 1 << 0;
        /// Do not display or print
        const HIDDEN = 1 << 1;
        /// Print the annotation when printing the page
        const PRINT = 1 << 2;
        /// Do not scale with page zoom
        const NO_ZOOM = 1 << 3;
        /// Do not rotate with the page
        const NO_ROTATE = 1 << 4;
        /// Do not display on screen
        const NO_VIEW = 1 << 5;
        /// Do not allow interaction
        const READ_ONLY = 1 << 6;
        /// Do not allow deletion or modification
        const LOCKED = 1 << 7;
        /// Invert NO_VIEW on mouse events
        const TOGGLE_NO_VIEW = 1 << 8;
        /// Do not allow the contents to change
        const LOCKED_CONTENTS = 1 << 9;
    }
}

/// Text markup variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkupType {
    /// Highlight
    Highlight,
    /// Underline
    Underline,
    /// Strike out
    StrikeOut,
    /// Squiggly underline
    Squiggly,
}

/// Geometric shape variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeType {
    /// Rectangle
    Square,
    /// Ellipse
    Circle,
    /// Straight line
    Line,
    /// Closed polygon
    Polygon,
    /// Free hand ink
    Ink,
}

/// What kind of annotation this is, with variant specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// Hyperlink area
    Link,
    /// Sticky note
    Note {
        /// Icon name, e.g. "Comment"
        icon: String,
        /// Initially open
        open: bool,
    },
    /// Rubber stamp
    Stamp {
        /// Stamp name, e.g. "Approved"
        name: String,
    },
    /// Text markup over quads
    Markup {
        /// Markup style
        markup: MarkupType,
        /// Marked areas
        quads: Vec<Rect>,
    },
    /// Geometric shape
    Shape {
        /// Shape type
        shape: ShapeType,
        /// Interior fill color
        interior: Option<Color>,
    },
    /// File attachment
    File {
        /// Attached file
        file: EmbeddedFile,
    },
    /// Visual placement of a form field
    Widget {
        /// Name of the form element
        field: String,
    },
}

impl AnnotationKind {
    /// Subtype name as used in PDF.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            AnnotationKind::Link => "Link",
            AnnotationKind::Note { .. } => "Text",
            AnnotationKind::Stamp { .. } => "Stamp",
            AnnotationKind::Markup { markup, .. } => match markup {
                MarkupType::Highlight => "Highlight",
                MarkupType::Underline => "Underline",
                MarkupType::StrikeOut => "StrikeOut",
                MarkupType::Squiggly => "Squiggly",
            },
            AnnotationKind::Shape { shape, .. } => match shape {
                ShapeType::Square => "Square",
                ShapeType::Circle => "Circle",
                ShapeType::Line => "Line",
                ShapeType::Polygon => "Polygon",
                ShapeType::Ink => "Ink",
            },
            AnnotationKind::File { .. } => "FileAttachment",
            AnnotationKind::Widget { .. } => "Widget",
        }
    }
}

/// An annotation on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    id: AnnotationId,
    /// Variant and its data
    pub kind: AnnotationKind,
    /// Rectangle in page space
    pub rect: Rect,
    /// Text contents, also the alternate description
    pub contents: Option<String>,
    /// Author
    pub author: Option<String>,
    /// Last modification
    pub modified: Option<DateTime<Utc>>,
    /// Border or icon color
    pub color: Option<Color>,
    /// Flags
    pub flags: AnnotationFlags,
    /// Actions keyed by event
    pub actions: IndexMap<AnnotationEvent, Action>,
    /// Associated files
    pub associated_files: Vec<EmbeddedFile>,
    /// Whether an appearance stream exists
    pub has_appearance: bool,
    /// Annotation this one replies to
    pub in_reply_to: Option<AnnotationId>,
}

impl Annotation {
    /// Create an annotation of the given kind. It is printable and has an
    /// appearance.
    pub fn new(kind: AnnotationKind, rect: Rect) -> Self {
        Self {
            id: AnnotationId::new(),
            kind,
            rect,
            contents: None,
            author: None,
            modified: None,
            color: None,
            flags: AnnotationFlags::PRINT,
            actions: IndexMap::new(),
            associated_files: Vec::new(),
            has_appearance: true,
            in_reply_to: None,
        }
    }

    /// Link running an action on click.
    pub fn link(rect: Rect, action: Action) -> Self {
        let mut annot = Self::new(AnnotationKind::Link, rect);
        annot.actions.insert(AnnotationEvent::Click, action);
        annot
    }

    /// Sticky note with text.
    pub fn note(rect: Rect, text: impl Into<String>) -> Self {
        let mut annot = Self::new(
            AnnotationKind::Note {
                icon: "Comment".to_string(),
                open: false,
            },
            rect,
        );
        annot.contents = Some(text.into());
        annot
    }

    /// File attachment.
    pub fn file(rect: Rect, file: EmbeddedFile) -> Self {
        Self::new(AnnotationKind::File { file }, rect)
    }

    /// Widget for a form field.
    pub fn widget(rect: Rect, field: impl Into<String>) -> Self {
        Self::new(
            AnnotationKind::Widget {
                field: field.into(),
            },
            rect,
        )
    }

    /// Reply to another annotation.
    pub fn reply_to(mut self, parent: AnnotationId) -> Self {
        self.in_reply_to = Some(parent);
        self
    }

    /// Identity.
    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub(crate) fn renew_id(&mut self) {
        self.id = AnnotationId::new();
    }

    /// Not displayed on screen.
    pub fn is_hidden(&self) -> bool {
        self.flags
            .intersects(AnnotationFlags::HIDDEN | AnnotationFlags::INVISIBLE | AnnotationFlags::NO_VIEW)
    }

    /// Printed along with the page.
    pub fn is_printable(&self) -> bool {
        self.flags.contains(AnnotationFlags::PRINT)
    }

    /// Widget annotations belong to form fields.
    pub fn is_widget(&self) -> bool {
        matches!(self.kind, AnnotationKind::Widget { .. })
    }

    /// Colors the annotation paints with.
    pub fn colors(&self) -> Vec<&Color> {
        let mut out: Vec<&Color> = self.color.iter().collect();
        if let AnnotationKind::Shape {
            interior: Some(c), ..
        } = &self.kind
        {
            out.push(c);
        }
        out
    }

    /// Mutable access to the colors the annotation paints with.
    pub fn colors_mut(&mut self) -> Vec<&mut Color> {
        let mut out: Vec<&mut Color> = self.color.iter_mut().collect();
        if let AnnotationKind::Shape {
            interior: Some(c), ..
        } = &mut self.kind
        {
            out.push(c);
        }
        out
    }

    /// All files attached to this annotation, including the attachment
    /// of a File annotation.
    pub fn files(&self) -> Vec<&EmbeddedFile> {
        let mut out: Vec<&EmbeddedFile> = self.associated_files.iter().collect();
        if let AnnotationKind::File { file } = &self.kind {
            out.push(file);
        }
        out
    }

    /// Mutable access to all attached files.
    pub fn files_mut(&mut self) -> Vec<&mut EmbeddedFile> {
        let mut out: Vec<&mut EmbeddedFile> = self.associated_files.iter_mut().collect();
        if let AnnotationKind::File { file } = &mut self.kind {
            out.push(file);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let mut annot = Annotation::note(Rect::new(0.0, 0.0, 20.0, 20.0), "hello");
        assert!(annot.is_printable());
        assert!(!annot.is_hidden());
        annot.flags.insert(AnnotationFlags::NO_VIEW);
        assert!(annot.is_hidden());
        annot.flags.remove(AnnotationFlags::PRINT);
        assert!(!annot.is_printable());
    }

    #[test]
    fn test_reply_is_reference() {
        let parent = Annotation::note(Rect::default(), "question");
        let reply = Annotation::note(Rect::default(), "answer").reply_to(parent.id());
        assert_eq!(reply.in_reply_to, Some(parent.id()));
    }

    #[test]
    fn test_pdf_names() {
        assert_eq!(Annotation::widget(Rect::default(), "Name").kind.pdf_name(), "Widget");
        let shape = AnnotationKind::Shape {
            shape: ShapeType::Circle,
            interior: None,
        };
        assert_eq!(shape.pdf_name(), "Circle");
    }

    #[test]
    fn test_colors_include_interior() {
        let mut annot = Annotation::new(
            AnnotationKind::Shape {
                shape: ShapeType::Square,
                interior: Some(Color::rgb(1.0, 0.0, 0.0)),
            },
            Rect::default(),
        );
        annot.color = Some(Color::gray(0.0));
        assert_eq!(annot.colors().len(), 2);
    }
}
