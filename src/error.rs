//! Error types for the document engine.
//!
//! Programming errors (calling an operation in the wrong state, unbalanced
//! markers, duplicate names) are kept apart from expected failures such as
//! a package that cannot be loaded or a profile that cannot be satisfied.

use std::collections::BTreeSet;

pub use crate::profile::ProfileComplianceError;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building, checking or serializing a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operation invoked in a state that does not allow it
    #[error("Invalid state: {0}")]
    StateMisuse(String),

    /// Form element names already present in the target document
    #[error("Duplicate form field names: [{}]", join_names(.0))]
    NameCollision(BTreeSet<String>),

    /// A feature is both required and denied
    #[error(transparent)]
    ProfileCompliance(#[from] ProfileComplianceError),

    /// Package could not be read
    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    /// Unexpected failure while repairing a document
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// Argument out of range or otherwise unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Font error
    #[error("Font error: {0}")]
    Font(String),

    /// Image error
    #[error("Image error: {0}")]
    Image(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures on the load side of the serialization boundary.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Input does not start with the package magic
    #[error("Not a document package")]
    NotAPackage,

    /// Package written by a newer format version
    #[error("Unsupported package version: {0}")]
    UnsupportedVersion(u32),

    /// Header or body could not be decoded
    #[error("Malformed package: {0}")]
    Malformed(String),

    /// Package is encrypted and no decryption handler was supplied
    #[error("Document is encrypted and requires a password")]
    PasswordRequired,

    /// Supplied password does not open the package
    #[error("Incorrect password")]
    IncorrectPassword,

    /// Package uses an encryption handler that is not available
    #[error("Unsupported encryption handler: {0}")]
    UnsupportedEncryption(String),

    /// IO error while reading
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_names(names: &BTreeSet<String>) -> String {
    names
        .iter()
        .map(|n| format!("\"{}\"", n))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Shorthand for [`Error::StateMisuse`].
    pub(crate) fn state(msg: impl Into<String>) -> Self {
        Error::StateMisuse(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Feature;

    #[test]
    fn test_state_misuse_error() {
        let err = Error::state("split before flush");
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid state"));
        assert!(msg.contains("split before flush"));
    }

    #[test]
    fn test_name_collision_lists_names() {
        let names: BTreeSet<String> = ["Name", "Address"].iter().map(|s| s.to_string()).collect();
        let msg = format!("{}", Error::NameCollision(names));
        assert_eq!(msg, "Duplicate form field names: [\"Address\", \"Name\"]");
    }

    #[test]
    fn test_load_error_conversion() {
        let err: Error = LoadError::PasswordRequired.into();
        assert!(matches!(err, Error::Load(LoadError::PasswordRequired)));
        assert!(format!("{}", err).contains("requires a password"));
    }

    #[test]
    fn test_profile_compliance_carries_feature() {
        let err: Error = ProfileComplianceError::conflict(Feature::Encrypted, "PDF/A-2b").into();
        match err {
            Error::ProfileCompliance(e) => assert_eq!(e.feature(), Feature::Encrypted),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(format!("{}", err).contains("IO error"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
