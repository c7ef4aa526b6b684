//! Output intents: the target printing condition a document declares.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::feature::Feature;
use super::output_profile::OutputProfile;
use crate::color::{ColorModel, IccProfile};

/// Output intent subtype used by PDF/A.
pub const GTS_PDFA1: &str = "GTS_PDFA1";
/// Output intent subtype used by PDF/X.
pub const GTS_PDFX: &str = "GTS_PDFX";
/// Output intent subtype used by PDF/E.
pub const ISO_PDFE1: &str = "ISO_PDFE1";

/// A declared output condition with an optional destination profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputIntent {
    /// Subtype, e.g. [`GTS_PDFA1`]
    pub intent_type: String,
    /// Output condition identifier, e.g. "sRGB IEC61966-2.1" or "FOGRA39"
    pub identifier: String,
    /// Registry the identifier is defined in
    pub registry: Option<String>,
    /// Human readable condition
    pub info: Option<String>,
    /// Destination profile
    pub profile: Option<Arc<IccProfile>>,
}

impl OutputIntent {
    /// Create an intent with an embedded destination profile.
    pub fn new(intent_type: impl Into<String>, profile: Arc<IccProfile>) -> Self {
        Self {
            intent_type: intent_type.into(),
            identifier: profile.description().to_string(),
            registry: None,
            info: Some(profile.description().to_string()),
            profile: Some(profile),
        }
    }

    /// A PDF/A intent for the sRGB profile.
    pub fn srgb(intent_type: impl Into<String>) -> Self {
        let mut intent = Self::new(intent_type, Arc::new(IccProfile::srgb()));
        intent.registry = Some("http://www.color.org".to_string());
        intent
    }

    /// Same output condition under a different subtype.
    pub fn with_type(&self, intent_type: impl Into<String>) -> Self {
        Self {
            intent_type: intent_type.into(),
            ..self.clone()
        }
    }

    /// Color model of the destination profile.
    pub fn model(&self) -> Option<ColorModel> {
        self.profile.as_ref().map(|p| p.model())
    }

    /// Whether two intents describe the same destination.
    pub fn same_destination(&self, other: &OutputIntent) -> bool {
        match (&self.profile, &other.profile) {
            (Some(a), Some(b)) => a.description() == b.description() && a.model() == b.model(),
            (None, None) => self.identifier == other.identifier,
            _ => false,
        }
    }

    /// Features of this intent that `target` denies, or `None` if the
    /// intent can be carried by a document claiming `target`.
    pub fn is_compatible_with(&self, target: &OutputProfile) -> Option<Vec<Feature>> {
        let mut mismatches = Vec::new();
        if let Some(profile) = &self.profile {
            if profile.version() >= 4 && target.is_denied(Feature::ColorSpaceICCVersion4) {
                mismatches.push(Feature::ColorSpaceICCVersion4);
            }
            let model_feature = match profile.model() {
                ColorModel::Rgb => Some(Feature::ColorSpaceDeviceRGB),
                ColorModel::Cmyk => Some(Feature::ColorSpaceDeviceCMYK),
                ColorModel::Gray => Some(Feature::ColorSpaceDeviceGray),
                ColorModel::Lab => None,
            };
            if let Some(f) = model_feature {
                if target.is_denied(f) {
                    mismatches.push(f);
                }
            }
        }
        if mismatches.is_empty() {
            None
        } else {
            Some(mismatches)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_intent() {
        let intent = OutputIntent::srgb(GTS_PDFA1);
        assert_eq!(intent.intent_type, GTS_PDFA1);
        assert_eq!(intent.model(), Some(ColorModel::Rgb));
        assert_eq!(intent.identifier, "sRGB IEC61966-2.1");
        let x = intent.with_type(GTS_PDFX);
        assert!(x.same_destination(&intent));
    }

    #[test]
    fn test_v4_profile_rejected_by_denying_target() {
        let v4 = Arc::new(IccProfile::new("Coated v4", ColorModel::Cmyk, 4));
        let intent = OutputIntent::new(GTS_PDFA1, v4);
        let mut target = OutputProfile::new("strict");
        assert!(intent.is_compatible_with(&target).is_none());
        target.set_denied(Feature::ColorSpaceICCVersion4);
        assert_eq!(
            intent.is_compatible_with(&target),
            Some(vec![Feature::ColorSpaceICCVersion4])
        );
    }
}
