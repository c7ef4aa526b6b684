//! Output profiles.
//!
//! An [`OutputProfile`] plays two roles. Built from a standard it is a
//! *target*: a set of required and denied features plus the output intent
//! types a conforming document must carry. Built by inspecting a document
//! it is a *measurement*: the set of features the document actually has,
//! together with inventories of its fonts, inks, ICC profiles and
//! associated files.
//!
//! ## Example
//!
//! ```
//! use pdf_folio::profile::{Feature, OutputProfile};
//!
//! let mut target = OutputProfile::new("Web ready");
//! target.set_required(Feature::Linearized);
//! target.set_denied(Feature::Encrypted);
//!
//! let mut measured = OutputProfile::new("Document");
//! measured.set_feature(Feature::Encrypted, true);
//! let mismatches = measured.is_compatible_with(&target).unwrap();
//! assert_eq!(mismatches, vec![Feature::Linearized, Feature::Encrypted]);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::feature::{Feature, FeatureSet};
use super::intent::OutputIntent;
use super::standards::StandardProfile;
use crate::color::{Color, IccProfile};
use crate::model::AfRelationship;

/// Why a profile could not be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceFailure {
    /// One profile requires the feature and the other denies it
    Conflict,
    /// The document has a denied feature no repair pass removes
    Unfixable,
}

/// A feature that prevents a profile from being satisfied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", compliance_message(.failure, .feature, .profile))]
pub struct ProfileComplianceError {
    feature: Feature,
    profile: String,
    failure: ComplianceFailure,
}

fn compliance_message(failure: &ComplianceFailure, feature: &Feature, profile: &str) -> String {
    match failure {
        ComplianceFailure::Conflict => format!(
            "Profile conflict: {} is required by one profile and denied by {}",
            feature, profile
        ),
        ComplianceFailure::Unfixable => format!(
            "Cannot satisfy {}: {} ({}) cannot be removed",
            profile,
            feature,
            feature.description()
        ),
    }
}

impl ProfileComplianceError {
    /// The feature is required by one profile and denied by `profile`.
    pub fn conflict(feature: Feature, profile: impl Into<String>) -> Self {
        Self {
            feature,
            profile: profile.into(),
            failure: ComplianceFailure::Conflict,
        }
    }

    /// The feature is denied by `profile` and cannot be removed.
    pub fn unfixable(feature: Feature, profile: impl Into<String>) -> Self {
        Self {
            feature,
            profile: profile.into(),
            failure: ComplianceFailure::Unfixable,
        }
    }

    /// The offending feature.
    pub fn feature(&self) -> Feature {
        self.feature
    }

    /// Name of the profile involved.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Kind of failure.
    pub fn failure(&self) -> ComplianceFailure {
        self.failure
    }
}

/// A font seen while inspecting a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontInfo {
    /// PostScript name
    pub name: String,
    /// Whether the font program is embedded
    pub embedded: bool,
    /// Pages (0-based) the font is used on
    pub pages: Vec<usize>,
}

/// Where an associated file is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileOwner {
    /// The document's EmbeddedFiles map
    Document,
    /// An annotation on the given page (0-based)
    Annotation(usize),
}

/// An associated file seen while inspecting a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociatedFileInfo {
    /// File name
    pub name: String,
    /// Declared relationship
    pub relationship: Option<AfRelationship>,
    /// Whether the file is itself a PDF
    pub is_pdf: bool,
    /// Attachment point
    pub owner: FileOwner,
}

/// Required, denied and measured features with intents and inventories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputProfile {
    name: String,
    required: FeatureSet,
    denied: FeatureSet,
    set: FeatureSet,
    claims: Vec<StandardProfile>,
    denied_claims: Vec<StandardProfile>,
    output_intents: Vec<OutputIntent>,
    required_intent_types: Vec<String>,
    fonts: Vec<FontInfo>,
    separations: BTreeMap<String, Color>,
    icc_profiles: Vec<Arc<IccProfile>>,
    associated_files: Vec<AssociatedFileInfo>,
}

impl OutputProfile {
    /// Create an empty profile that requires and denies nothing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: FeatureSet::new(),
            denied: FeatureSet::new(),
            set: FeatureSet::new(),
            claims: Vec::new(),
            denied_claims: Vec::new(),
            output_intents: Vec::new(),
            required_intent_types: Vec::new(),
            fonts: Vec::new(),
            separations: BTreeMap::new(),
            icc_profiles: Vec::new(),
            associated_files: Vec::new(),
        }
    }

    /// Profile name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the profile.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether the measured feature is present.
    pub fn is_set(&self, feature: Feature) -> bool {
        self.set.contains(feature)
    }

    /// Record a measured feature as present or absent.
    pub fn set_feature(&mut self, feature: Feature, value: bool) {
        self.set.set(feature, value);
    }

    /// Whether the feature is required.
    pub fn is_required(&self, feature: Feature) -> bool {
        self.required.contains(feature)
    }

    /// Whether the feature is denied.
    pub fn is_denied(&self, feature: Feature) -> bool {
        self.denied.contains(feature)
    }

    /// Require a feature. A feature is never both required and denied.
    pub fn set_required(&mut self, feature: Feature) {
        self.denied.remove(feature);
        self.required.insert(feature);
    }

    /// Deny a feature. A feature is never both required and denied.
    pub fn set_denied(&mut self, feature: Feature) {
        self.required.remove(feature);
        self.denied.insert(feature);
    }

    /// Neither require nor deny a feature.
    pub fn clear_requirement(&mut self, feature: Feature) {
        self.required.remove(feature);
        self.denied.remove(feature);
    }

    /// Drop every requirement, denial and required intent type.
    pub fn clear(&mut self) {
        self.required = FeatureSet::new();
        self.denied = FeatureSet::new();
        self.required_intent_types.clear();
    }

    /// Measured features.
    pub fn features(&self) -> &FeatureSet {
        &self.set
    }

    /// Required features.
    pub fn required(&self) -> &FeatureSet {
        &self.required
    }

    /// Denied features.
    pub fn denied(&self) -> &FeatureSet {
        &self.denied
    }

    /// Compare measured features against a target. Returns `None` when
    /// compatible, otherwise every feature that is required but unset or
    /// denied but set, in catalog order.
    pub fn is_compatible_with(&self, target: &OutputProfile) -> Option<Vec<Feature>> {
        let missing = target.required.difference(&self.set);
        let forbidden = target.denied.intersection(&self.set);
        let mismatches: Vec<Feature> = missing.union(&forbidden).iter().collect();
        if mismatches.is_empty() {
            None
        } else {
            Some(mismatches)
        }
    }

    /// First feature that one profile requires and the other denies.
    pub fn conflict_with(&self, other: &OutputProfile) -> Option<Feature> {
        let a = self.required.intersection(&other.denied);
        let b = self.denied.intersection(&other.required);
        a.union(&b).iter().next()
    }

    /// Merge another target into this one: the result requires and denies
    /// the union of both. Fails without modifying `self` if the two
    /// conflict. Output intents of types `other` requires are carried over
    /// from `other`, or else from `context` (usually the measured profile
    /// of the document being converted).
    pub fn merge(
        &mut self,
        other: &OutputProfile,
        context: Option<&OutputProfile>,
    ) -> Result<(), ProfileComplianceError> {
        if let Some(feature) = self.conflict_with(other) {
            let blame = if self.is_required(feature) {
                other.name.clone()
            } else {
                self.name.clone()
            };
            return Err(ProfileComplianceError::conflict(feature, blame));
        }

        self.required = self.required.union(&other.required);
        self.denied = self.denied.union(&other.denied);
        for claim in &other.claims {
            self.add_claim(*claim);
        }
        for claim in &other.denied_claims {
            if !self.denied_claims.contains(claim) {
                self.denied_claims.push(*claim);
            }
        }
        for t in &other.required_intent_types {
            if !self.required_intent_types.contains(t) {
                self.required_intent_types.push(t.clone());
            }
        }
        for intent in &other.output_intents {
            self.add_output_intent(intent.clone());
        }
        if let Some(context) = context {
            for t in &other.required_intent_types {
                if self.output_intents.iter().any(|i| &i.intent_type == t) {
                    continue;
                }
                if let Some(intent) = context.output_intents.iter().find(|i| &i.intent_type == t) {
                    self.output_intents.push(intent.clone());
                }
            }
        }
        self.name = format!("{} + {}", self.name, other.name);
        Ok(())
    }

    /// Standards this profile claims.
    pub fn claims(&self) -> &[StandardProfile] {
        &self.claims
    }

    /// Add a claim.
    pub fn add_claim(&mut self, claim: StandardProfile) {
        if !self.claims.contains(&claim) {
            self.claims.push(claim);
        }
    }

    /// Stop claiming a standard and remember that it was withdrawn.
    pub fn deny_claim(&mut self, claim: StandardProfile) {
        self.claims.retain(|c| *c != claim);
        if !self.denied_claims.contains(&claim) {
            self.denied_claims.push(claim);
        }
    }

    /// Standards whose claims were withdrawn.
    pub fn denied_claims(&self) -> &[StandardProfile] {
        &self.denied_claims
    }

    /// Output intents.
    pub fn output_intents(&self) -> &[OutputIntent] {
        &self.output_intents
    }

    /// Add an output intent, replacing any with the same subtype.
    pub fn add_output_intent(&mut self, intent: OutputIntent) {
        self.output_intents.retain(|i| i.intent_type != intent.intent_type);
        self.output_intents.push(intent);
    }

    /// Output intent of a subtype.
    pub fn output_intent(&self, intent_type: &str) -> Option<&OutputIntent> {
        self.output_intents.iter().find(|i| i.intent_type == intent_type)
    }

    /// Output intent subtypes a conforming document must carry.
    pub fn required_intent_types(&self) -> &[String] {
        &self.required_intent_types
    }

    /// Require an output intent subtype.
    pub fn require_intent_type(&mut self, intent_type: impl Into<String>) {
        let t = intent_type.into();
        if !self.required_intent_types.contains(&t) {
            self.required_intent_types.push(t);
        }
    }

    /// Fonts used.
    pub fn fonts(&self) -> &[FontInfo] {
        &self.fonts
    }

    /// Spot and Separation inks by name with their fallback color.
    pub fn separations(&self) -> &BTreeMap<String, Color> {
        &self.separations
    }

    /// Distinct ICC profiles referenced.
    pub fn icc_profiles(&self) -> &[Arc<IccProfile>] {
        &self.icc_profiles
    }

    /// Associated files.
    pub fn associated_files(&self) -> &[AssociatedFileInfo] {
        &self.associated_files
    }

    pub(crate) fn record_font(&mut self, name: &str, embedded: bool, page: usize) {
        match self.fonts.iter_mut().find(|f| f.name == name) {
            Some(font) => {
                if !font.pages.contains(&page) {
                    font.pages.push(page);
                }
            },
            None => self.fonts.push(FontInfo {
                name: name.to_string(),
                embedded,
                pages: vec![page],
            }),
        }
    }

    pub(crate) fn record_separation(&mut self, name: &str, fallback: &Color) {
        self.separations
            .entry(name.to_string())
            .or_insert_with(|| fallback.clone());
    }

    pub(crate) fn record_icc(&mut self, profile: &Arc<IccProfile>) {
        if !self.icc_profiles.iter().any(|p| p.as_ref() == profile.as_ref()) {
            self.icc_profiles.push(Arc::clone(profile));
        }
    }

    pub(crate) fn record_file(&mut self, info: AssociatedFileInfo) {
        self.associated_files.push(info);
    }

    /// Fold another measurement into this one.
    pub(crate) fn absorb(&mut self, other: OutputProfile) {
        self.set = self.set.union(&other.set);
        for font in other.fonts {
            for page in &font.pages {
                self.record_font(&font.name, font.embedded, *page);
            }
        }
        for (name, color) in other.separations {
            self.separations.entry(name).or_insert(color);
        }
        for icc in &other.icc_profiles {
            self.record_icc(icc);
        }
        self.associated_files.extend(other.associated_files);
    }
}

impl Default for OutputProfile {
    fn default() -> Self {
        StandardProfile::Default.profile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::GTS_PDFA1;

    #[test]
    fn test_required_and_denied_are_exclusive() {
        let mut p = OutputProfile::new("p");
        p.set_required(Feature::TaggedPDF);
        p.set_denied(Feature::TaggedPDF);
        assert!(p.is_denied(Feature::TaggedPDF));
        assert!(!p.is_required(Feature::TaggedPDF));
        p.clear_requirement(Feature::TaggedPDF);
        assert!(!p.is_denied(Feature::TaggedPDF));
    }

    #[test]
    fn test_required_unset_reports_exactly_that_feature() {
        let mut target = OutputProfile::new("t");
        target.set_required(Feature::Linearized);
        let measured = OutputProfile::new("m");
        assert_eq!(measured.is_compatible_with(&target), Some(vec![Feature::Linearized]));
    }

    #[test]
    fn test_merge_conflict_leaves_profile_unchanged() {
        let mut a = OutputProfile::new("A");
        a.set_required(Feature::Encrypted);
        a.set_denied(Feature::JavaScript);
        let mut b = OutputProfile::new("B");
        b.set_denied(Feature::Encrypted);
        b.set_required(Feature::TaggedPDF);

        let before = a.clone();
        let err = a.merge(&b, None).unwrap_err();
        assert_eq!(err.feature(), Feature::Encrypted);
        assert_eq!(err.profile(), "B");
        assert_eq!(a, before);
    }

    #[test]
    fn test_merge_unions_requirements() {
        let mut a = OutputProfile::new("A");
        a.set_denied(Feature::JavaScript);
        let mut b = OutputProfile::new("B");
        b.set_required(Feature::TaggedPDF);
        a.merge(&b, None).unwrap();
        assert!(a.is_denied(Feature::JavaScript));
        assert!(a.is_required(Feature::TaggedPDF));
        assert_eq!(a.name(), "A + B");
    }

    #[test]
    fn test_merge_takes_intents_from_context() {
        let mut a = OutputProfile::new("A");
        let mut b = OutputProfile::new("B");
        b.require_intent_type(GTS_PDFA1);
        let mut measured = OutputProfile::new("doc");
        measured.add_output_intent(OutputIntent::srgb(GTS_PDFA1));
        a.merge(&b, Some(&measured)).unwrap();
        assert!(a.output_intent(GTS_PDFA1).is_some());
    }

    #[test]
    fn test_deny_claim() {
        let mut p = OutputProfile::new("p");
        p.add_claim(StandardProfile::PdfA2b);
        p.add_claim(StandardProfile::PdfX4);
        p.deny_claim(StandardProfile::PdfX4);
        assert_eq!(p.claims(), &[StandardProfile::PdfA2b]);
        assert_eq!(p.denied_claims(), &[StandardProfile::PdfX4]);
    }

    #[test]
    fn test_unfixable_message() {
        let err = ProfileComplianceError::unfixable(Feature::XFAForm, "PDF/A-1b");
        let msg = err.to_string();
        assert!(msg.contains("XFAForm"));
        assert!(msg.contains("PDF/A-1b"));
    }

    #[test]
    fn test_conflict_message_through_error_trait() {
        let err: Box<dyn std::error::Error> =
            Box::new(ProfileComplianceError::conflict(Feature::Encrypted, "PDF/A-2b"));
        assert_eq!(
            err.to_string(),
            "Profile conflict: Encrypted is required by one profile and denied by PDF/A-2b"
        );
        assert!(err.source().is_none());
    }
}
