//! Standard profiles: PDF/A, PDF/X and PDF/UA as feature requirements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::feature::Feature;
use super::intent::{GTS_PDFA1, GTS_PDFX};
use super::output_profile::OutputProfile;
use crate::error::Error;

/// A published standard a document can claim.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StandardProfile {
    PdfA1a,
    PdfA1b,
    PdfA2a,
    PdfA2b,
    PdfA2u,
    PdfA3a,
    PdfA3b,
    PdfA3u,
    PdfA4,
    PdfA4e,
    PdfA4f,
    PdfX1a2003,
    PdfX3_2003,
    PdfX4,
    PdfUa1,
    /// No restrictions
    Default,
}

/// Family of a standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFamily {
    /// Archival
    PdfA,
    /// Print exchange
    PdfX,
    /// Accessibility
    PdfUa,
    /// None
    None,
}

impl StandardProfile {
    /// Every standard, PDF/A first.
    pub const ALL: &'static [StandardProfile] = &[
        StandardProfile::PdfA1a,
        StandardProfile::PdfA1b,
        StandardProfile::PdfA2a,
        StandardProfile::PdfA2b,
        StandardProfile::PdfA2u,
        StandardProfile::PdfA3a,
        StandardProfile::PdfA3b,
        StandardProfile::PdfA3u,
        StandardProfile::PdfA4,
        StandardProfile::PdfA4e,
        StandardProfile::PdfA4f,
        StandardProfile::PdfX1a2003,
        StandardProfile::PdfX3_2003,
        StandardProfile::PdfX4,
        StandardProfile::PdfUa1,
        StandardProfile::Default,
    ];

    /// Display name, e.g. "PDF/A-2b".
    pub fn name(&self) -> &'static str {
        match self {
            StandardProfile::PdfA1a => "PDF/A-1a",
            StandardProfile::PdfA1b => "PDF/A-1b",
            StandardProfile::PdfA2a => "PDF/A-2a",
            StandardProfile::PdfA2b => "PDF/A-2b",
            StandardProfile::PdfA2u => "PDF/A-2u",
            StandardProfile::PdfA3a => "PDF/A-3a",
            StandardProfile::PdfA3b => "PDF/A-3b",
            StandardProfile::PdfA3u => "PDF/A-3u",
            StandardProfile::PdfA4 => "PDF/A-4",
            StandardProfile::PdfA4e => "PDF/A-4e",
            StandardProfile::PdfA4f => "PDF/A-4f",
            StandardProfile::PdfX1a2003 => "PDF/X-1a:2003",
            StandardProfile::PdfX3_2003 => "PDF/X-3:2003",
            StandardProfile::PdfX4 => "PDF/X-4",
            StandardProfile::PdfUa1 => "PDF/UA-1",
            StandardProfile::Default => "Default",
        }
    }

    /// Family of the standard.
    pub fn family(&self) -> StandardFamily {
        match self {
            StandardProfile::PdfX1a2003 | StandardProfile::PdfX3_2003 | StandardProfile::PdfX4 => {
                StandardFamily::PdfX
            },
            StandardProfile::PdfUa1 => StandardFamily::PdfUa,
            StandardProfile::Default => StandardFamily::None,
            _ => StandardFamily::PdfA,
        }
    }

    /// Whether this is a PDF/A standard.
    pub fn is_pdfa(&self) -> bool {
        self.family() == StandardFamily::PdfA
    }

    /// PDF/A part number.
    pub fn pdfa_part(&self) -> Option<u8> {
        match self {
            StandardProfile::PdfA1a | StandardProfile::PdfA1b => Some(1),
            StandardProfile::PdfA2a | StandardProfile::PdfA2b | StandardProfile::PdfA2u => Some(2),
            StandardProfile::PdfA3a | StandardProfile::PdfA3b | StandardProfile::PdfA3u => Some(3),
            StandardProfile::PdfA4 | StandardProfile::PdfA4e | StandardProfile::PdfA4f => Some(4),
            _ => None,
        }
    }

    /// PDF/A conformance letter as written in XMP.
    pub fn pdfa_conformance(&self) -> Option<&'static str> {
        match self {
            StandardProfile::PdfA1a | StandardProfile::PdfA2a | StandardProfile::PdfA3a => Some("A"),
            StandardProfile::PdfA1b | StandardProfile::PdfA2b | StandardProfile::PdfA3b => Some("B"),
            StandardProfile::PdfA2u | StandardProfile::PdfA3u => Some("U"),
            StandardProfile::PdfA4e => Some("E"),
            StandardProfile::PdfA4f => Some("F"),
            _ => None,
        }
    }

    /// Identify a PDF/A standard from its XMP part and conformance.
    pub fn from_pdfa(part: u8, conformance: Option<&str>) -> Option<StandardProfile> {
        let conformance = conformance.map(|c| c.to_ascii_uppercase());
        match (part, conformance.as_deref()) {
            (1, Some("A")) => Some(StandardProfile::PdfA1a),
            (1, Some("B")) => Some(StandardProfile::PdfA1b),
            (2, Some("A")) => Some(StandardProfile::PdfA2a),
            (2, Some("B")) => Some(StandardProfile::PdfA2b),
            (2, Some("U")) => Some(StandardProfile::PdfA2u),
            (3, Some("A")) => Some(StandardProfile::PdfA3a),
            (3, Some("B")) => Some(StandardProfile::PdfA3b),
            (3, Some("U")) => Some(StandardProfile::PdfA3u),
            (4, None) => Some(StandardProfile::PdfA4),
            (4, Some("E")) => Some(StandardProfile::PdfA4e),
            (4, Some("F")) => Some(StandardProfile::PdfA4f),
            _ => None,
        }
    }

    /// Level-a variants accept a level-b fallback when accessibility
    /// requirements cannot be met.
    pub fn downgraded(&self) -> Option<StandardProfile> {
        match self {
            StandardProfile::PdfA1a => Some(StandardProfile::PdfA1b),
            StandardProfile::PdfA2a => Some(StandardProfile::PdfA2b),
            StandardProfile::PdfA3a => Some(StandardProfile::PdfA3b),
            _ => None,
        }
    }

    /// Feature requirements of this standard.
    pub fn profile(&self) -> OutputProfile {
        let mut p = OutputProfile::new(self.name());
        match self.family() {
            StandardFamily::PdfA => pdfa_requirements(self, &mut p),
            StandardFamily::PdfX => pdfx_requirements(self, &mut p),
            StandardFamily::PdfUa => {
                for f in [Feature::TaggedPDF, Feature::Language, Feature::InfoTitle, Feature::XMPMetaData] {
                    p.set_required(f);
                }
                for f in [
                    Feature::UntaggedContent,
                    Feature::AnnotationWithoutContents,
                    Feature::FormFieldWithoutTooltip,
                    Feature::FontUnembedded,
                    Feature::TextWithoutUnicode,
                ] {
                    p.set_denied(f);
                }
            },
            StandardFamily::None => {},
        }
        if *self != StandardProfile::Default {
            p.add_claim(*self);
        }
        p
    }
}

fn pdfa_requirements(standard: &StandardProfile, p: &mut OutputProfile) {
    p.require_intent_type(GTS_PDFA1);
    p.set_required(Feature::XMPMetaData);
    for f in [
        Feature::Encrypted,
        Feature::JavaScript,
        Feature::LaunchAction,
        Feature::XFAForm,
        Feature::FontUnembedded,
        Feature::UnanchoredDeviceGray,
        Feature::UnanchoredDeviceRGB,
        Feature::UnanchoredDeviceCMYK,
        Feature::AnnotationWithoutAppearance,
        Feature::AnnotationNotPrintable,
        Feature::AnnotationHidden,
        Feature::ImageLZW,
        Feature::OutputIntentsDiffer,
    ] {
        p.set_denied(f);
    }
    match standard.pdfa_part() {
        Some(1) => {
            for f in [
                Feature::Transparency,
                Feature::ImageJPEG2000,
                Feature::OptionalContent,
                Feature::EmbeddedFiles,
                Feature::ColorSpaceICCVersion4,
            ] {
                p.set_denied(f);
            }
        },
        Some(2) => p.set_denied(Feature::EmbeddedFileNotPDF),
        Some(3) => p.set_denied(Feature::AssociatedFileWithoutRelationship),
        Some(4) => {
            if *standard == StandardProfile::PdfA4 {
                p.set_denied(Feature::EmbeddedFileNotPDF);
            } else {
                p.set_denied(Feature::AssociatedFileWithoutRelationship);
            }
            p.set_denied(Feature::TextWithoutUnicode);
        },
        _ => {},
    }
    match standard.pdfa_conformance() {
        Some("A") => {
            p.set_required(Feature::TaggedPDF);
            p.set_required(Feature::Language);
            p.set_denied(Feature::UntaggedContent);
            p.set_denied(Feature::TextWithoutUnicode);
            p.set_denied(Feature::AnnotationWithoutContents);
        },
        Some("U") => p.set_denied(Feature::TextWithoutUnicode),
        _ => {},
    }
}

fn pdfx_requirements(standard: &StandardProfile, p: &mut OutputProfile) {
    p.require_intent_type(GTS_PDFX);
    p.set_required(Feature::OutputIntentPDFX);
    p.set_required(Feature::InfoTitle);
    for f in [Feature::Encrypted, Feature::JavaScript, Feature::FontUnembedded] {
        p.set_denied(f);
    }
    if *standard == StandardProfile::PdfX4 {
        return;
    }
    for f in [
        Feature::Transparency,
        Feature::HasMultipleOutputIntents,
        Feature::ImageJPEG2000,
        Feature::OptionalContent,
    ] {
        p.set_denied(f);
    }
    if *standard == StandardProfile::PdfX1a2003 {
        for f in [
            Feature::ColorSpaceDeviceRGB,
            Feature::ColorSpaceCalibrated,
            Feature::ColorSpaceLab,
            Feature::ColorSpaceICC,
        ] {
            p.set_denied(f);
        }
    }
}

impl fmt::Display for StandardProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StandardProfile {
    type Err = Error;

    /// Accepts display names ("PDF/A-2b") and compact forms ("pdfa2b").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        StandardProfile::ALL
            .iter()
            .copied()
            .find(|p| {
                let name: String = p
                    .name()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                name == compact
            })
            .ok_or_else(|| Error::InvalidArgument(format!("unknown profile '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("PDF/A-2b".parse::<StandardProfile>().unwrap(), StandardProfile::PdfA2b);
        assert_eq!("pdfa3a".parse::<StandardProfile>().unwrap(), StandardProfile::PdfA3a);
        assert_eq!("PDF/X-1a:2003".parse::<StandardProfile>().unwrap(), StandardProfile::PdfX1a2003);
        assert_eq!("pdfua1".parse::<StandardProfile>().unwrap(), StandardProfile::PdfUa1);
        assert!("pdf/z".parse::<StandardProfile>().is_err());
    }

    #[test]
    fn test_pdfa_mapping_round_trips() {
        for p in StandardProfile::ALL.iter().filter(|p| p.is_pdfa()) {
            assert_eq!(
                StandardProfile::from_pdfa(p.pdfa_part().unwrap(), p.pdfa_conformance()),
                Some(*p)
            );
        }
    }

    #[test]
    fn test_level_a_requires_tags() {
        let a = StandardProfile::PdfA2a.profile();
        assert!(a.is_required(Feature::TaggedPDF));
        let b = StandardProfile::PdfA2b.profile();
        assert!(!b.is_required(Feature::TaggedPDF));
        assert_eq!(StandardProfile::PdfA2a.downgraded(), Some(StandardProfile::PdfA2b));
        assert_eq!(StandardProfile::PdfA2b.downgraded(), None);
    }

    #[test]
    fn test_standard_profiles_do_not_conflict_with_themselves() {
        for p in StandardProfile::ALL {
            let profile = p.profile();
            assert!(profile.required().intersection(profile.denied()).is_empty(), "{}", p);
        }
    }

    #[test]
    fn test_pdfa_and_pdfx_merge() {
        let mut a = StandardProfile::PdfA2b.profile();
        a.merge(&StandardProfile::PdfX4.profile(), None).unwrap();
        assert!(a.is_required(Feature::OutputIntentPDFX));
        assert!(a.is_denied(Feature::XFAForm));
        assert_eq!(a.claims(), &[StandardProfile::PdfA2b, StandardProfile::PdfX4]);
    }

    #[test]
    fn test_pdfa1_denies_transparency_pdfa2_allows() {
        assert!(StandardProfile::PdfA1b.profile().is_denied(Feature::Transparency));
        assert!(!StandardProfile::PdfA2b.profile().is_denied(Feature::Transparency));
    }
}
