//! Digital signature revisions.
//!
//! The signing math is handled elsewhere; a revision only records who
//! signed which field, when, and the opaque signature container.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A signature applied to the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRevision {
    /// Signature field name
    pub field: String,
    /// Signer name
    pub signer: Option<String>,
    /// Reason for signing
    pub reason: Option<String>,
    /// Location of signing
    pub location: Option<String>,
    /// Signing time
    pub signed_at: DateTime<Utc>,
    /// Signature handler, e.g. "Adobe.PPKLite"
    pub filter: String,
    /// Encoding, e.g. "ETSI.CAdES.detached"
    pub sub_filter: String,
    /// Certification signature rather than approval
    pub certifying: bool,
    /// Encoded signature container
    #[serde(with = "crate::io::base64_bytes")]
    pub contents: Arc<Vec<u8>>,
}

impl SignatureRevision {
    /// Record a signature on a field.
    pub fn new(field: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            signer: None,
            reason: None,
            location: None,
            signed_at: Utc::now(),
            filter: "Adobe.PPKLite".to_string(),
            sub_filter: "ETSI.CAdES.detached".to_string(),
            certifying: false,
            contents: Arc::new(contents),
        }
    }

    /// Set the signer name.
    pub fn with_signer(mut self, signer: impl Into<String>) -> Self {
        self.signer = Some(signer.into());
        self
    }

    /// Set the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
