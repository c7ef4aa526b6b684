//! The catalog of profile features.
//!
//! Every feature has a stable identifier (its variant name) and a human
//! description. Code that checks compliance walks [`Feature::ALL`] rather
//! than assuming how many features exist.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! features {
    ($( $name:ident => $desc:literal ),* $(,)?) => {
        /// A boolean property a document may have, and a profile may require
        /// or deny.
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Feature {
            $( $name ),*
        }

        impl Feature {
            /// Every feature, in catalog order.
            pub const ALL: &'static [Feature] = &[ $( Feature::$name ),* ];

            /// Stable identifier.
            pub fn identifier(&self) -> &'static str {
                match self {
                    $( Feature::$name => stringify!($name) ),*
                }
            }

            /// Human readable description.
            pub fn description(&self) -> &'static str {
                match self {
                    $( Feature::$name => $desc ),*
                }
            }
        }
    };
}

features! {
    Linearized => "Document is linearized for fast web view",
    Encrypted => "Document is encrypted",
    RegularCompression => "Document streams are compressed",
    XMPMetaData => "Document has XMP metadata",
    InfoTitle => "Document has a title",
    Language => "Document declares a natural language",
    TaggedPDF => "Document content is tagged with a logical structure",
    UntaggedContent => "Tagged document has content that is neither tagged nor an artifact",
    JavaScript => "Document contains JavaScript",
    LaunchAction => "Document contains actions that launch external applications",
    XFAForm => "Document contains an XFA form",
    AcroForm => "Document contains interactive form fields",
    FormFieldWithoutTooltip => "A form field has no alternate description",
    DigitalSignature => "Document is digitally signed",
    EmbeddedFiles => "Document contains embedded files",
    EmbeddedFileNotPDF => "An embedded file is not a PDF",
    AssociatedFileWithoutRelationship => "An associated file has no relationship to the content",
    OptionalContent => "Document contains optional content layers",
    OutputIntentPDFA => "Document has a PDF/A output intent",
    OutputIntentPDFX => "Document has a PDF/X output intent",
    HasMultipleOutputIntents => "Document has more than one output intent",
    OutputIntentsDiffer => "Output intents use different ICC profiles",
    Annotations => "Document contains annotations",
    AnnotationWithoutAppearance => "An annotation has no appearance stream",
    AnnotationNotPrintable => "A visible annotation is not set to print",
    AnnotationHidden => "An annotation is hidden or invisible",
    AnnotationWithoutContents => "An annotation has no alternate description",
    AnnotationColorSpaceDeviceRGB => "An annotation uses a DeviceRGB color",
    AnnotationColorSpaceDeviceCMYK => "An annotation uses a DeviceCMYK color",
    FontUnembedded => "Text is drawn with a font that is not embedded",
    TextWithoutUnicode => "Text contains characters with no Unicode meaning",
    ColorSpaceDeviceGray => "Content uses DeviceGray",
    ColorSpaceDeviceRGB => "Content uses DeviceRGB",
    ColorSpaceDeviceCMYK => "Content uses DeviceCMYK",
    ColorSpaceCalibrated => "Content uses a calibrated RGB color space",
    ColorSpaceLab => "Content uses a Lab color space",
    ColorSpaceICC => "Content uses an ICC based color space",
    ColorSpaceICCVersion4 => "Content uses a version 4 ICC profile",
    ColorSpaceSeparation => "Content uses a Separation or spot color",
    ColorSpaceDeviceN => "Content uses a DeviceN color space",
    NChannelProcessDeviceCMYK => "A DeviceN color space has DeviceCMYK process colorants",
    UnanchoredDeviceGray => "DeviceGray is used without an output intent",
    UnanchoredDeviceRGB => "DeviceRGB is used without an RGB output intent",
    UnanchoredDeviceCMYK => "DeviceCMYK is used without a CMYK output intent",
    Overprint => "Content is drawn with overprint enabled",
    Transparency => "Content uses transparency or blend modes",
    ImageLZW => "An image is LZW compressed",
    ImageJPEG2000 => "An image is JPEG 2000 compressed",
}

const _: () = assert!(Feature::ALL.len() <= 128, "FeatureSet holds at most 128 features");

impl Feature {
    /// Look a feature up by identifier.
    pub fn from_identifier(id: &str) -> Option<Feature> {
        Feature::ALL.iter().copied().find(|f| f.identifier() == id)
    }

    fn bit(&self) -> u128 {
        1u128 << (*self as u32)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// A set of features stored as a bitset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Feature>", into = "Vec<Feature>")]
pub struct FeatureSet(u128);

impl FeatureSet {
    /// Empty set.
    pub fn new() -> Self {
        Self(0)
    }

    /// Whether the feature is in the set.
    pub fn contains(&self, feature: Feature) -> bool {
        self.0 & feature.bit() != 0
    }

    /// Add a feature; returns true if it was not present.
    pub fn insert(&mut self, feature: Feature) -> bool {
        let added = !self.contains(feature);
        self.0 |= feature.bit();
        added
    }

    /// Remove a feature; returns true if it was present.
    pub fn remove(&mut self, feature: Feature) -> bool {
        let present = self.contains(feature);
        self.0 &= !feature.bit();
        present
    }

    /// Set or clear a feature.
    pub fn set(&mut self, feature: Feature, value: bool) {
        if value {
            self.insert(feature);
        } else {
            self.remove(feature);
        }
    }

    /// Union of two sets.
    pub fn union(&self, other: &FeatureSet) -> FeatureSet {
        FeatureSet(self.0 | other.0)
    }

    /// Features in both sets.
    pub fn intersection(&self, other: &FeatureSet) -> FeatureSet {
        FeatureSet(self.0 & other.0)
    }

    /// Features in self but not in other.
    pub fn difference(&self, other: &FeatureSet) -> FeatureSet {
        FeatureSet(self.0 & !other.0)
    }

    /// True when no feature is set.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of features in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Features in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.iter().copied().filter(move |f| self.contains(*f))
    }
}

impl From<Vec<Feature>> for FeatureSet {
    fn from(features: Vec<Feature>) -> Self {
        features.into_iter().collect()
    }
}

impl From<FeatureSet> for Vec<Feature> {
    fn from(set: FeatureSet) -> Self {
        set.iter().collect()
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut set = FeatureSet::new();
        for f in iter {
            set.insert(f);
        }
        set
    }
}

impl Extend<Feature> for FeatureSet {
    fn extend<I: IntoIterator<Item = Feature>>(&mut self, iter: I) {
        for f in iter {
            self.insert(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_identifiers_unique() {
        for (i, a) in Feature::ALL.iter().enumerate() {
            assert!(!a.description().is_empty());
            assert_eq!(Feature::from_identifier(a.identifier()), Some(*a));
            for b in &Feature::ALL[i + 1..] {
                assert_ne!(a.identifier(), b.identifier());
            }
        }
    }

    #[test]
    fn test_set_operations() {
        let mut set = FeatureSet::new();
        assert!(set.insert(Feature::Linearized));
        assert!(!set.insert(Feature::Linearized));
        set.insert(Feature::Encrypted);
        assert_eq!(set.len(), 2);
        let other: FeatureSet = vec![Feature::Encrypted, Feature::JavaScript].into();
        assert_eq!(set.intersection(&other).iter().collect::<Vec<_>>(), vec![Feature::Encrypted]);
        assert_eq!(set.difference(&other).iter().collect::<Vec<_>>(), vec![Feature::Linearized]);
        assert_eq!(set.union(&other).len(), 3);
        assert!(set.remove(Feature::Linearized));
        assert!(!set.contains(Feature::Linearized));
    }

    #[test]
    fn test_serializes_as_identifiers() {
        let set: FeatureSet = vec![Feature::Transparency, Feature::Linearized].into();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[\"Linearized\",\"Transparency\"]");
        let back: FeatureSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
