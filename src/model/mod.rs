//! Document object model.
//!
//! A [`Document`] owns its pages, form, bookmarks, named actions, embedded
//! files, layers, metadata and signature revisions. Objects that refer to
//! each other (bookmarks to pages, widgets to fields, replies to
//! annotations) do so through ids.

mod action;
mod annotation;
mod bookmark;
mod concat;
mod document;
mod embedded_file;
mod form;
mod ids;
mod image;
mod layer;
mod locale;
mod page;
mod signature;
mod structure;
mod xmp;

pub use action::{Action, AnnotationEvent, DocumentEvent};
pub use annotation::{Annotation, AnnotationFlags, AnnotationKind, MarkupType, ShapeType};
pub use bookmark::Bookmark;
pub use concat::BookmarkMode;
pub use document::{Document, EncryptionSettings, Permissions, RenderOptions};
pub use embedded_file::{AfRelationship, EmbeddedFile};
pub use form::{BarCodeSymbology, FieldFlags, FieldKind, Form, FormElement, WidgetRef};
pub use ids::{AnnotationId, LayerId, PageId, TagKey};
pub use image::{ImageFilter, ImageRef};
pub use layer::{LayerIntent, OptionalContentLayer};
pub use locale::{Direction, Locale, QuoteMarks};
pub use page::{ContentOp, Page, PageBox, ARTIFACT};
pub use signature::SignatureRevision;
pub use structure::{StructureElement, StructureNode};
pub use xmp::{HistoryEntry, ParsedXmp, XmpMetadata};
