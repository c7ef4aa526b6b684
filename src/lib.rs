// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::should_implement_trait)]

//! # PDF Folio
//!
//! A PDF document model with a text layout engine and output-profile
//! compliance: inspect a document for the features it uses, compare it
//! against PDF/A, PDF/X or PDF/UA, and repair it until it conforms.
//!
//! ## Core Features
//!
//! ### Content Model
//! - **Documents**: pages, annotations, forms, bookmarks, named actions,
//!   embedded files, optional-content layers, XMP metadata, signatures
//! - **Tagged content**: structure tags and artifacts in page content
//! - **Concatenation**: append documents with name-collision detection
//!
//! ### Layout
//! - **LayoutBox**: line breaking, justification, inline and floating
//!   boxes, splitting at a height for pagination
//! - **Locales**: text direction and quotation-mark substitution
//!
//! ### Color & Profiles
//! - **Color spaces**: device, calibrated, Lab, ICC, spot, separation, DeviceN
//! - **OutputProfile**: required and denied features, claims, output intents
//! - **Repair**: color remapping, font substitution, rasterization
//! - **PDF/A conversion**: one-shot state machine over the repair pipeline
//!
//! ## Quick Start
//!
//! ```
//! use pdf_folio::geometry::PageSize;
//! use pdf_folio::layout::LayoutBox;
//! use pdf_folio::model::Document;
//! use pdf_folio::style::Style;
//!
//! let mut doc = Document::new();
//! let mut body = LayoutBox::new(451.0);
//! body.add_text("Quarterly results were in line with expectations. ", &Style::new(), None);
//! body.flush();
//!
//! let page = doc.new_page(PageSize::A4);
//! body.draw(page, 72.0, 770.0).unwrap();
//! let bytes = pdf_folio::io::render(&doc).unwrap();
//! assert!(!bytes.is_empty());
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Primitives
pub mod color;
pub mod fonts;
pub mod geometry;
pub mod style;

// Content model
pub mod model;

// Text layout
pub mod layout;

// Output profiles and repair
pub mod profile;

// Document packages
pub mod io;

// Configuration
pub mod config;

pub use error::{Error, Result};
