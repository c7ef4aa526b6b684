//! ICC profile descriptors.
//!
//! Only the header and the `desc` tag are interpreted; the transform itself
//! is left to whatever consumes the embedded bytes.

use std::io::{Cursor, Read};
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Colour model of a profile or device space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorModel {
    /// Single gray channel
    Gray,
    /// Red, green, blue
    Rgb,
    /// Cyan, magenta, yellow, black
    Cmyk,
    /// CIE L*a*b*
    Lab,
}

impl ColorModel {
    /// Number of components for this model.
    pub fn components(&self) -> usize {
        match self {
            ColorModel::Gray => 1,
            ColorModel::Rgb | ColorModel::Lab => 3,
            ColorModel::Cmyk => 4,
        }
    }

    fn from_signature(sig: &[u8; 4]) -> Option<Self> {
        match sig {
            b"GRAY" => Some(ColorModel::Gray),
            b"RGB " => Some(ColorModel::Rgb),
            b"CMYK" => Some(ColorModel::Cmyk),
            b"Lab " => Some(ColorModel::Lab),
            _ => None,
        }
    }
}

/// An ICC color profile, identified by its description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IccProfile {
    description: String,
    model: ColorModel,
    /// Major version from the header (2 or 4 in practice)
    version: u8,
    #[serde(with = "crate::io::base64_opt", default)]
    data: Option<Arc<Vec<u8>>>,
}

const HEADER_LEN: usize = 128;

impl IccProfile {
    /// Create a descriptor without embedded profile data.
    pub fn new(description: impl Into<String>, model: ColorModel, version: u8) -> Self {
        Self {
            description: description.into(),
            model,
            version,
            data: None,
        }
    }

    /// The built-in sRGB profile.
    pub fn srgb() -> Self {
        Self::new("sRGB IEC61966-2.1", ColorModel::Rgb, 2)
    }

    /// Parse an ICC profile, reading its header and `desc` tag.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() < HEADER_LEN + 4 {
            return Err(Error::InvalidArgument("ICC profile too short".to_string()));
        }
        if &data[36..40] != b"acsp" {
            return Err(Error::InvalidArgument("ICC profile missing 'acsp' signature".to_string()));
        }
        let version = data[8];
        let mut sig = [0u8; 4];
        sig.copy_from_slice(&data[16..20]);
        let model = ColorModel::from_signature(&sig).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "unsupported ICC color space '{}'",
                String::from_utf8_lossy(&sig)
            ))
        })?;
        let description = read_description(&data)?.unwrap_or_else(|| "Unnamed ICC profile".to_string());
        Ok(Self {
            description,
            model,
            version,
            data: Some(Arc::new(data)),
        })
    }

    /// Human readable description from the `desc` tag.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Colour model of the profile's data space.
    pub fn model(&self) -> ColorModel {
        self.model
    }

    /// Number of color components.
    pub fn components(&self) -> usize {
        self.model.components()
    }

    /// Major ICC version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Raw profile bytes, when embedded.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref().map(|d| d.as_slice())
    }
}

/// Walk the tag table looking for `desc`. Handles both the v2
/// `desc` type and the v4 `mluc` type.
fn read_description(data: &[u8]) -> Result<Option<String>> {
    let mut cursor = Cursor::new(&data[HEADER_LEN..]);
    let count = cursor.read_u32::<BigEndian>()? as usize;
    for _ in 0..count {
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        let offset = cursor.read_u32::<BigEndian>()? as usize;
        let size = cursor.read_u32::<BigEndian>()? as usize;
        if &sig != b"desc" {
            continue;
        }
        let tag = data
            .get(offset..offset.saturating_add(size))
            .ok_or_else(|| Error::InvalidArgument("ICC desc tag out of range".to_string()))?;
        return Ok(parse_desc_tag(tag));
    }
    Ok(None)
}

fn parse_desc_tag(tag: &[u8]) -> Option<String> {
    if tag.len() < 12 {
        return None;
    }
    let mut cursor = Cursor::new(tag);
    let mut kind = [0u8; 4];
    cursor.read_exact(&mut kind).ok()?;
    cursor.set_position(8);
    match &kind {
        b"desc" => {
            let len = cursor.read_u32::<BigEndian>().ok()? as usize;
            let text = tag.get(12..12 + len)?;
            let text = text.split(|b| *b == 0).next().unwrap_or(text);
            Some(String::from_utf8_lossy(text).into_owned())
        },
        b"mluc" => {
            let records = cursor.read_u32::<BigEndian>().ok()?;
            let _record_size = cursor.read_u32::<BigEndian>().ok()?;
            if records == 0 {
                return None;
            }
            let _lang = cursor.read_u32::<BigEndian>().ok()?;
            let len = cursor.read_u32::<BigEndian>().ok()? as usize;
            let offset = cursor.read_u32::<BigEndian>().ok()? as usize;
            let raw = tag.get(offset..offset + len)?;
            let units: Vec<u16> = raw
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            Some(String::from_utf16_lossy(&units))
        },
        _ => None,
    }
}
