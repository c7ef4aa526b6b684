//! Output profiles: what a document has, what a target standard requires
//! and denies, and how to get from one to the other.
//!
//! - [`inspect`] measures a document into an [`OutputProfile`]
//! - [`StandardProfile`] gives the requirements of PDF/A, PDF/X and PDF/UA
//! - [`OutputProfiler`] repairs a document towards a target
//! - [`PdfAConversion`] drives a whole PDF/A conversion
//!
//! ## Example
//!
//! ```
//! use pdf_folio::geometry::PageSize;
//! use pdf_folio::model::Document;
//! use pdf_folio::profile::{inspect, Feature, StandardProfile};
//!
//! let mut doc = Document::new();
//! doc.new_page(PageSize::Letter).draw_text("Draft", 72.0, 720.0);
//!
//! let target = StandardProfile::PdfA2b.profile();
//! let mismatches = inspect(&doc).is_compatible_with(&target).unwrap();
//! assert!(mismatches.contains(&Feature::FontUnembedded));
//! assert!(mismatches.contains(&Feature::XMPMetaData));
//! ```

mod color_action;
mod convert;
mod feature;
mod font_action;
mod inspect;
mod intent;
mod output_profile;
mod profiler;
mod raster;
mod standards;

pub use color_action::ColorAction;
pub use convert::{verify, ConversionState, PdfAConversion};
pub use feature::{Feature, FeatureSet};
pub use font_action::FontAction;
pub use inspect::inspect;
pub use intent::{OutputIntent, GTS_PDFA1, GTS_PDFX, ISO_PDFE1};
pub use output_profile::{
    AssociatedFileInfo, ComplianceFailure, FileOwner, FontInfo, OutputProfile, ProfileComplianceError,
};
pub use profiler::{ApplyReport, Fix, OutputProfiler, RasterizedPage, Strategy};
pub use raster::{PageRasterizer, VectorRasterizer};
pub use standards::{StandardFamily, StandardProfile};
