//! The document package: reading and writing whole documents.
//!
//! A package is a magic line, a one-line JSON header, then the document
//! body. The body is the document serialized as JSON, deflated when
//! compression is on and encrypted when the document has encryption
//! settings:
//!
//! ```text
//! %FOLIO-1
//! {"version":1,"compressed":true,"linearized":false,...}
//! <body>
//! ```

use std::io::{Read, Write};
use std::path::Path;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::crypt::{self, DecryptionHandler, STANDARD_FILTER};
use crate::config::RenderConfig;
use crate::error::{Error, LoadError, Result};
use crate::model::Document;
use crate::profile::{inspect, ProfileComplianceError};

/// First line of every package.
pub const MAGIC: &[u8] = b"%FOLIO-1\n";

/// Newest body format this build reads and the one it writes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PackageHeader {
    version: u32,
    compressed: bool,
    linearized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encryption: Option<EncryptionHeader>,
    /// XMP packet, readable without decrypting the body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncryptionHeader {
    filter: String,
    #[serde(with = "super::base64_bytes")]
    salt: Vec<u8>,
    #[serde(with = "super::base64_bytes")]
    iv: Vec<u8>,
    #[serde(with = "super::base64_bytes")]
    check: Vec<u8>,
}

/// Render a document with default options.
///
/// ## Example
///
/// ```
/// use pdf_folio::geometry::PageSize;
/// use pdf_folio::io::{render, Reader};
/// use pdf_folio::model::Document;
///
/// let mut doc = Document::new();
/// doc.new_page(PageSize::A4).draw_text("Hello", 72.0, 770.0);
/// let bytes = render(&doc).unwrap();
/// assert!(bytes.starts_with(b"%FOLIO-1"));
///
/// let loaded = Reader::new().load(&bytes).unwrap();
/// assert_eq!(loaded, doc);
/// ```
pub fn render(doc: &Document) -> Result<Vec<u8>> {
    render_with(doc, &RenderConfig::default())
}

/// Render a document into a buffer.
pub fn render_with(doc: &Document, config: &RenderConfig) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    render_to_with(doc, &mut out, config)?;
    Ok(out)
}

/// Render a document into a writer with default options.
pub fn render_to<W: Write>(doc: &Document, writer: W) -> Result<()> {
    render_to_with(doc, writer, &RenderConfig::default())
}

/// Render a document into a file with default options. The file is only
/// created or replaced once the package has been built.
pub fn render_file(doc: &Document, path: impl AsRef<Path>) -> Result<()> {
    let bytes = render(doc)?;
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

/// Render a document into a writer.
///
/// Fails before writing anything when page content is unbalanced, a page
/// id repeats, or the document's required profile is not met.
pub fn render_to_with<W: Write>(doc: &Document, mut writer: W, config: &RenderConfig) -> Result<()> {
    doc.validate()?;
    if let Some(required) = doc.required_profile() {
        if let Some(mismatches) = inspect(doc).is_compatible_with(required) {
            log::debug!("{} mismatches against {}: {:?}", mismatches.len(), required.name(), mismatches);
            return Err(ProfileComplianceError::unfixable(mismatches[0], required.name()).into());
        }
    }

    let producer_missing = doc.info("Producer").is_none() && config.producer.is_some();
    let body = if producer_missing {
        let mut doc = doc.clone();
        doc.set_info("Producer", config.producer.as_deref());
        serde_json::to_vec(&doc)?
    } else {
        serde_json::to_vec(doc)?
    };

    let compressed = config.compress.unwrap_or(doc.options().compress);
    let mut body = if compressed {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body)?;
        encoder.finish()?
    } else {
        body
    };

    let encryption = match doc.encryption() {
        Some(settings) => {
            let salt = Uuid::new_v4().into_bytes();
            let iv = Uuid::new_v4().into_bytes();
            let key = crypt::derive_key(&salt, &settings.password);
            body = crypt::encrypt(&key, &iv, &body)?;
            Some(EncryptionHeader {
                filter: STANDARD_FILTER.to_string(),
                salt: salt.to_vec(),
                iv: iv.to_vec(),
                check: crypt::key_check(&key),
            })
        },
        None => None,
    };

    let metadata = doc.xmp().present.then(|| {
        let packet = doc.xmp_packet();
        if config.pretty_xmp {
            packet
        } else {
            packet.lines().map(str::trim).collect::<Vec<_>>().join(" ")
        }
    });

    let header = PackageHeader {
        version: FORMAT_VERSION,
        compressed,
        linearized: doc.options().linearize,
        encryption,
        metadata,
    };

    writer.write_all(MAGIC)?;
    serde_json::to_writer(&mut writer, &header)?;
    writer.write_all(b"\n")?;
    writer.write_all(&body)?;
    writer.flush()?;
    log::debug!(
        "rendered {} pages, {} body bytes (compressed: {}, encrypted: {})",
        doc.pages().len(),
        body.len(),
        header.compressed,
        header.encryption.is_some()
    );
    Ok(())
}

/// Loads packages.
#[derive(Debug, Default)]
pub struct Reader {
    decryption: Option<Box<dyn DecryptionHandler>>,
}

impl Reader {
    /// Create a reader without decryption.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decrypt encrypted packages with `handler`.
    pub fn with_decryption(mut self, handler: impl DecryptionHandler + 'static) -> Self {
        self.decryption = Some(Box::new(handler));
        self
    }

    /// Load a package from a file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Document> {
        let data = std::fs::read(path.as_ref()).map_err(LoadError::Io)?;
        self.load(&data)
    }

    /// Load a package from a reader.
    pub fn load_from<R: Read>(&self, mut reader: R) -> Result<Document> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).map_err(LoadError::Io)?;
        self.load(&data)
    }

    /// Load a package from bytes.
    pub fn load(&self, data: &[u8]) -> Result<Document> {
        let rest = data.strip_prefix(MAGIC).ok_or(LoadError::NotAPackage)?;
        let newline = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| LoadError::Malformed("header is not terminated".into()))?;
        let header: PackageHeader = serde_json::from_slice(&rest[..newline])
            .map_err(|e| LoadError::Malformed(format!("header: {}", e)))?;
        if header.version > FORMAT_VERSION {
            return Err(LoadError::UnsupportedVersion(header.version).into());
        }
        let mut body = rest[newline + 1..].to_vec();

        let mut password = None;
        if let Some(enc) = &header.encryption {
            if enc.filter != STANDARD_FILTER {
                return Err(LoadError::UnsupportedEncryption(enc.filter.clone()).into());
            }
            let handler = self.decryption.as_ref().ok_or(LoadError::PasswordRequired)?;
            if handler.filter() != enc.filter {
                return Err(LoadError::UnsupportedEncryption(handler.filter().to_string()).into());
            }
            let iv: [u8; 16] = enc
                .iv
                .as_slice()
                .try_into()
                .map_err(|_| LoadError::Malformed("initialization vector must be 16 bytes".into()))?;
            let key = handler.derive_key(&enc.salt);
            if crypt::key_check(&key) != enc.check {
                return Err(LoadError::IncorrectPassword.into());
            }
            body = crypt::decrypt(&key, &iv, &body)?;
            password = handler.password().map(str::to_string);
        }

        if header.compressed {
            let mut inflated = Vec::new();
            ZlibDecoder::new(body.as_slice())
                .read_to_end(&mut inflated)
                .map_err(|e| LoadError::Malformed(format!("body: {}", e)))?;
            body = inflated;
        }

        let mut doc: Document =
            serde_json::from_slice(&body).map_err(|e| LoadError::Malformed(format!("body: {}", e)))?;

        // The password never enters the body.
        match (doc.encryption().cloned(), password) {
            (Some(mut settings), Some(password)) => {
                settings.password = password;
                doc.set_encryption(Some(settings));
            },
            (Some(_), None) => {
                log::warn!("encryption handler gave no password; document will render unencrypted");
                doc.set_encryption(None);
            },
            _ => {},
        }
        doc.validate().map_err(|e| match e {
            Error::StateMisuse(msg) => Error::Load(LoadError::Malformed(msg)),
            other => other,
        })?;
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageSize;
    use crate::io::PasswordHandler;
    use crate::model::EncryptionSettings;
    use crate::profile::{Feature, OutputProfile};

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.new_page(PageSize::A4).draw_text("Hello", 72.0, 770.0);
        doc.set_info("Title", Some("Sample"));
        doc
    }

    #[test]
    fn test_header_line() {
        let bytes = render_with(&sample(), &RenderConfig::new().with_compression(false)).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        let header = text.lines().nth(1).unwrap();
        assert!(header.contains("\"compressed\":false"));
        assert!(!header.contains("encryption"));
    }

    #[test]
    fn test_uncompressed_round_trip() {
        let doc = sample();
        let bytes = render_with(&doc, &RenderConfig::new().with_compression(false)).unwrap();
        assert_eq!(Reader::new().load(&bytes).unwrap(), doc);
    }

    #[test]
    fn test_producer_only_fills_gap() {
        let config = RenderConfig::new().with_producer("folio test");
        let loaded = Reader::new().load(&render_with(&sample(), &config).unwrap()).unwrap();
        assert_eq!(loaded.info("Producer"), Some("folio test"));

        let mut doc = sample();
        doc.set_info("Producer", Some("original"));
        let loaded = Reader::new().load(&render_with(&doc, &config).unwrap()).unwrap();
        assert_eq!(loaded.info("Producer"), Some("original"));
    }

    #[test]
    fn test_encrypted_round_trip() {
        let mut doc = sample();
        doc.set_encryption(Some(EncryptionSettings::new("secret")));
        let bytes = render(&doc).unwrap();
        assert!(!String::from_utf8_lossy(&bytes).contains("Sample"));

        let err = Reader::new().load(&bytes).unwrap_err();
        assert!(matches!(err, Error::Load(LoadError::PasswordRequired)));

        let err = Reader::new()
            .with_decryption(PasswordHandler::new("wrong"))
            .load(&bytes)
            .unwrap_err();
        assert!(matches!(err, Error::Load(LoadError::IncorrectPassword)));

        let loaded = Reader::new()
            .with_decryption(PasswordHandler::new("secret"))
            .load(&bytes)
            .unwrap();
        assert_eq!(loaded, doc);
        assert_eq!(loaded.encryption().unwrap().password, "secret");
    }

    #[test]
    fn test_unknown_filter_is_unsupported() {
        let mut doc = sample();
        doc.set_encryption(Some(EncryptionSettings::new("pw")));
        let bytes = render_with(&doc, &RenderConfig::new()).unwrap();
        let header_end = MAGIC.len() + bytes[MAGIC.len()..].iter().position(|&b| b == b'\n').unwrap();
        let header = String::from_utf8(bytes[..header_end].to_vec()).unwrap();
        let mut patched = header.replace("\"Standard\"", "\"Adobe.PubSec\"").into_bytes();
        patched.extend_from_slice(&bytes[header_end..]);

        let err = Reader::new()
            .with_decryption(PasswordHandler::new("pw"))
            .load(&patched)
            .unwrap_err();
        assert!(matches!(err, Error::Load(LoadError::UnsupportedEncryption(f)) if f == "Adobe.PubSec"));
    }

    #[test]
    fn test_rejects_foreign_and_future_input() {
        let err = Reader::new().load(b"%PDF-1.7\n").unwrap_err();
        assert!(matches!(err, Error::Load(LoadError::NotAPackage)));

        let future = b"%FOLIO-1\n{\"version\":9,\"compressed\":false,\"linearized\":false}\n{}";
        let err = Reader::new().load(future).unwrap_err();
        assert!(matches!(err, Error::Load(LoadError::UnsupportedVersion(9))));

        let broken = b"%FOLIO-1\n{\"version\":1,\"compressed\":false,\"linearized\":false}\n{\"pages\":";
        let err = Reader::new().load(broken).unwrap_err();
        assert!(matches!(err, Error::Load(LoadError::Malformed(_))));
    }

    #[test]
    fn test_unbalanced_content_does_not_render() {
        let mut doc = sample();
        doc.pages_mut()[0].save();
        assert!(matches!(render(&doc), Err(Error::StateMisuse(_))));
    }

    #[test]
    fn test_failed_render_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.folio");
        let doc = sample();
        render_file(&doc, &path).unwrap();
        let before = std::fs::read(&path).unwrap();

        let mut broken = doc.clone();
        broken.pages_mut()[0].begin_tag("P", Default::default());
        assert!(matches!(render_file(&broken, &path), Err(Error::StateMisuse(_))));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_required_profile_blocks_render() {
        let mut profile = OutputProfile::new("Unencrypted");
        profile.set_denied(Feature::Encrypted);
        let mut doc = Document::with_profile(profile);
        doc.new_page(PageSize::A4);
        doc.set_encryption(Some(EncryptionSettings::new("pw")));
        match render(&doc) {
            Err(Error::ProfileCompliance(e)) => assert_eq!(e.feature(), Feature::Encrypted),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_metadata_is_compacted() {
        let mut doc = sample();
        doc.xmp_mut().present = true;
        let bytes = render(&doc).unwrap();
        let header_end = MAGIC.len() + bytes[MAGIC.len()..].iter().position(|&b| b == b'\n').unwrap();
        let header: PackageHeader = serde_json::from_slice(&bytes[MAGIC.len()..header_end]).unwrap();
        let packet = header.metadata.unwrap();
        assert!(!packet.contains('\n'));
        assert!(packet.contains("Sample"));
    }
}
