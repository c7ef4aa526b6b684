//! Embedded files and associated-file relationships.
//!
//! Files can be attached to the document as a whole (the EmbeddedFiles map)
//! or to an individual annotation. PDF/A-3 calls both "associated files"
//! and expects each to declare its relationship to the content.
//!
//! ## Example
//!
//! ```
//! use pdf_folio::model::{AfRelationship, EmbeddedFile};
//!
//! let file = EmbeddedFile::new("data.csv", b"a,b\n1,2\n".to_vec())
//!     .with_description("Monthly sales data")
//!     .with_mime_type("text/csv")
//!     .with_af_relationship(AfRelationship::Data);
//! assert_eq!(file.size(), 8);
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Represents a file carried inside the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedFile {
    /// File name, also the key in the document's EmbeddedFiles map
    pub name: String,
    /// File contents
    #[serde(with = "crate::io::base64_bytes")]
    pub data: Arc<Vec<u8>>,
    /// Optional description of the file
    pub description: Option<String>,
    /// MIME type, e.g. "application/xml"
    pub mime_type: Option<String>,
    /// Creation date
    pub creation_date: Option<DateTime<Utc>>,
    /// Modification date
    pub modification_date: Option<DateTime<Utc>>,
    /// Relationship of the file to the content it is attached to
    pub af_relationship: Option<AfRelationship>,
}

/// Associated file relationship (PDF 2.0 / PDF/A-3 `AFRelationship`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AfRelationship {
    /// The file is the original source
    Source,
    /// The file contains data referenced by the document
    Data,
    /// An alternative representation
    Alternative,
    /// Supplementary data
    Supplement,
    /// Encrypted payload
    EncryptedPayload,
    /// Form data
    FormData,
    /// A schema definition
    Schema,
    /// Relationship not known
    Unspecified,
}

impl AfRelationship {
    /// Get the PDF name for this relationship.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            AfRelationship::Source => "Source",
            AfRelationship::Data => "Data",
            AfRelationship::Alternative => "Alternative",
            AfRelationship::Supplement => "Supplement",
            AfRelationship::EncryptedPayload => "EncryptedPayload",
            AfRelationship::FormData => "FormData",
            AfRelationship::Schema => "Schema",
            AfRelationship::Unspecified => "Unspecified",
        }
    }
}

impl EmbeddedFile {
    /// Create a new embedded file.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data: Arc::new(data),
            description: None,
            mime_type: None,
            creation_date: None,
            modification_date: None,
            af_relationship: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the creation and modification dates.
    pub fn with_dates(mut self, created: DateTime<Utc>, modified: DateTime<Utc>) -> Self {
        self.creation_date = Some(created);
        self.modification_date = Some(modified);
        self
    }

    /// Set the AF relationship.
    pub fn with_af_relationship(mut self, relationship: AfRelationship) -> Self {
        self.af_relationship = Some(relationship);
        self
    }

    /// Size of the file data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether the file is itself a PDF.
    pub fn is_pdf(&self) -> bool {
        self.mime_type.as_deref() == Some("application/pdf") || self.data.starts_with(b"%PDF-")
    }

    /// Hex encoded SHA-256 of the contents.
    pub fn checksum(&self) -> String {
        Sha256::digest(self.data.as_slice())
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let file = EmbeddedFile::new("invoice.xml", b"<invoice/>".to_vec())
            .with_mime_type("application/xml")
            .with_af_relationship(AfRelationship::Alternative);
        assert_eq!(file.af_relationship.map(|r| r.pdf_name()), Some("Alternative"));
        assert!(!file.is_pdf());
        assert_eq!(file.checksum().len(), 64);
    }

    #[test]
    fn test_pdf_detection() {
        let file = EmbeddedFile::new("a.pdf", b"%PDF-1.7\n".to_vec());
        assert!(file.is_pdf());
    }
}
