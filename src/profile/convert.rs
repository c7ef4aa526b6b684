//! Converting documents to PDF/A.

use std::fmt;

use super::color_action::ColorAction;
use super::feature::Feature;
use super::inspect::inspect;
use super::intent::{OutputIntent, GTS_PDFA1};
use super::output_profile::OutputProfile;
use super::profiler::{ApplyReport, OutputProfiler};
use super::standards::StandardProfile;
use crate::config::ConversionConfig;
use crate::error::{Error, Result};
use crate::model::Document;

/// Where a [`PdfAConversion`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    /// Not run yet
    New,
    /// The document already met its target
    Valid,
    /// The document was repaired
    Fixed,
    /// The document was repaired, replacing some pages by images
    FixedWithRasterization,
    /// The document could not be repaired and was left untouched
    Failed,
}

impl fmt::Display for ConversionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversionState::New => "new",
            ConversionState::Valid => "valid",
            ConversionState::Fixed => "fixed",
            ConversionState::FixedWithRasterization => "fixed with rasterization",
            ConversionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One-shot conversion of a document to PDF/A.
///
/// ## Example
///
/// ```
/// use pdf_folio::config::ConversionConfig;
/// use pdf_folio::geometry::PageSize;
/// use pdf_folio::model::Document;
/// use pdf_folio::profile::{ConversionState, PdfAConversion, StandardProfile};
///
/// let mut doc = Document::new();
/// doc.new_page(PageSize::A4).draw_rectangle(72.0, 72.0, 144.0, 144.0);
///
/// let mut conversion = PdfAConversion::new(ConversionConfig::any_pdfa());
/// assert_eq!(conversion.run(&mut doc).unwrap(), ConversionState::Fixed);
/// assert_eq!(conversion.used_target(), Some(StandardProfile::PdfA1b));
/// assert!(conversion.run(&mut doc).is_err());
/// ```
#[derive(Debug)]
pub struct PdfAConversion {
    config: ConversionConfig,
    retained: Vec<OutputProfile>,
    state: ConversionState,
    message: Option<String>,
    used_target: Option<StandardProfile>,
    report: Option<ApplyReport>,
}

impl PdfAConversion {
    /// Create a conversion.
    ///
    /// Retained profiles that deny multiple output intents cannot sit next
    /// to a PDF/A intent and are dropped, as are retained profiles for
    /// targets that are allowed anyway.
    pub fn new(config: ConversionConfig) -> Self {
        let retained = config
            .retained
            .iter()
            .filter(|p| {
                if p.is_denied(Feature::HasMultipleOutputIntents) {
                    log::debug!("not retaining {}: it denies multiple output intents", p.name());
                    return false;
                }
                !p.claims().iter().any(|c| config.allowed.contains(c))
            })
            .cloned()
            .collect();
        Self {
            config,
            retained,
            state: ConversionState::New,
            message: None,
            used_target: None,
            report: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConversionState {
        self.state
    }

    /// Outcome description, or the reason for failure.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Target the document meets after a successful run.
    pub fn used_target(&self) -> Option<StandardProfile> {
        self.used_target
    }

    /// What the repair changed, if it ran.
    pub fn report(&self) -> Option<&ApplyReport> {
        self.report.as_ref()
    }

    /// Profiles kept when a document already meets them.
    pub fn retained(&self) -> &[OutputProfile] {
        &self.retained
    }

    /// Convert `doc`. The document is only modified if the conversion
    /// succeeds.
    ///
    /// Returns the final state; a document that cannot be made compliant
    /// yields [`ConversionState::Failed`]. Unexpected failures during the
    /// repair are returned as [`Error::Conversion`] after recording the
    /// failed state. Running twice is a [`Error::StateMisuse`].
    pub fn run(&mut self, doc: &mut Document) -> Result<ConversionState> {
        if self.state != ConversionState::New {
            return Err(Error::state(format!("conversion already {}", self.state)));
        }

        let measured = inspect(doc);
        let used = measured
            .claims()
            .iter()
            .copied()
            .find(|c| self.config.allowed.contains(c))
            .unwrap_or(self.config.default_target);
        let mut target = used.profile();

        let has_intents = target
            .required_intent_types()
            .iter()
            .all(|t| doc.output_intents().iter().any(|i| &i.intent_type == t));
        if measured.claims().contains(&used) && has_intents && measured.is_compatible_with(&target).is_none() {
            log::info!("document already meets {}", used);
            return Ok(self.finish(ConversionState::Valid, Some(used), format!("valid {}", used)));
        }

        for claim in measured.claims() {
            if *claim == used || self.config.allowed.contains(claim) {
                continue;
            }
            if !self.retain(&mut target, *claim, &measured) {
                log::debug!("withdrawing claim {}", claim);
                target.deny_claim(*claim);
            }
        }

        let mut profiler = self.config.profiler.clone();
        self.resolve_intent(&mut target, &measured, doc, &mut profiler);

        let mut work = doc.clone();
        let report = match OutputProfiler::new(&mut work, profiler).apply(&target) {
            Ok(report) => report,
            Err(Error::ProfileCompliance(e)) => {
                log::info!("conversion to {} failed: {}", target.name(), e);
                return Ok(self.finish(ConversionState::Failed, None, e.to_string()));
            },
            Err(e) => {
                let message = format!("conversion to {} failed: {}", target.name(), e);
                self.finish(ConversionState::Failed, None, message.clone());
                return Err(Error::Conversion(message));
            },
        };
        *doc = work;

        let achieved = report.downgraded.unwrap_or(used);
        let mut message = format!("converted to {}", achieved);
        if let Some(lower) = report.downgraded {
            log::info!("downgraded from {} to {}", used, lower);
            message = format!("{} (downgraded from {})", message, used);
        }
        let state = if report.rasterized.is_empty() {
            ConversionState::Fixed
        } else {
            ConversionState::FixedWithRasterization
        };
        log::info!("{}: {} fixes, {} pages rasterized", message, report.fixes.len(), report.rasterized.len());
        self.report = Some(report);
        Ok(self.finish(state, Some(achieved), message))
    }

    fn finish(&mut self, state: ConversionState, used: Option<StandardProfile>, message: String) -> ConversionState {
        self.state = state;
        self.used_target = used;
        self.message = Some(message);
        state
    }

    /// Merge the retained profile for `claim` into `target` if the
    /// document already meets it.
    fn retain(&self, target: &mut OutputProfile, claim: StandardProfile, measured: &OutputProfile) -> bool {
        let Some(profile) = self.retained.iter().find(|p| p.claims().contains(&claim)) else {
            return false;
        };
        if let Some(mismatches) = measured.is_compatible_with(profile) {
            log::debug!("document claims {} but fails {:?}", claim, mismatches);
            return false;
        }
        match target.merge(profile, Some(measured)) {
            Ok(()) => {
                log::debug!("retaining {}", claim);
                true
            },
            Err(e) => {
                log::debug!("cannot retain {}: {}", claim, e);
                false
            },
        }
    }

    /// Pick the output intent of the conversion: the configured space, an
    /// existing PDF/A intent, any other usable intent, or a profile from the
    /// pool matching the document's colors. The profile of the other color
    /// model becomes the first choice for converting colors.
    fn resolve_intent(
        &self,
        target: &mut OutputProfile,
        measured: &OutputProfile,
        doc: &Document,
        profiler: &mut crate::config::ProfilerConfig,
    ) {
        let requirements = target.clone();
        let usable = |intent: &OutputIntent| intent.is_compatible_with(&requirements).is_none();

        for intent_type in target.required_intent_types().to_vec() {
            if intent_type == GTS_PDFA1 || target.output_intent(&intent_type).is_some() {
                continue;
            }
            if let Some(existing) = doc
                .output_intents()
                .iter()
                .find(|i| i.intent_type == intent_type && usable(i))
            {
                target.add_output_intent(existing.clone());
            }
        }

        let mut chosen = self
            .config
            .intent_space
            .as_ref()
            .map(|space| OutputIntent::new(GTS_PDFA1, space.clone()))
            .filter(|i| {
                let ok = usable(i);
                if !ok {
                    log::warn!("configured output intent {} is not usable", i.identifier);
                }
                ok
            });
        if chosen.is_none() {
            chosen = doc
                .output_intents()
                .iter()
                .find(|i| i.intent_type == GTS_PDFA1 && usable(i))
                .cloned();
        }
        if chosen.is_none() {
            chosen = doc
                .output_intents()
                .iter()
                .find(|i| usable(i))
                .map(|i| i.with_type(GTS_PDFA1));
        }

        let pool = ColorAction::new(
            measured
                .icc_profiles()
                .iter()
                .cloned()
                .chain(profiler.icc_pool.iter().cloned()),
        );
        let cmyk = uses_cmyk(measured);
        let (first, second, first_name, second_name) = if cmyk {
            (pool.device_cmyk(), pool.device_rgb(), "CMYK", "RGB")
        } else {
            (pool.device_rgb(), pool.device_cmyk(), "RGB", "CMYK")
        };
        if first.is_none() {
            log::warn!("no {} profile available", first_name);
        }
        if second.is_none() {
            log::warn!("no {} fallback profile available", second_name);
        }

        if chosen.is_none() {
            chosen = first
                .or(second)
                .map(|icc| OutputIntent::new(GTS_PDFA1, icc.clone()))
                .filter(|i| usable(i));
        }
        let fallback = match chosen.as_ref().and_then(|i| i.model()) {
            Some(model) => [first, second].into_iter().flatten().find(|p| p.model() != model),
            None => second,
        };
        if let Some(fallback) = fallback {
            profiler.icc_pool.insert(0, fallback.clone());
        }

        match chosen {
            Some(intent) => {
                log::debug!("using output intent {}", intent.identifier);
                target.add_output_intent(intent);
            },
            None => log::debug!("no output intent chosen"),
        }
    }
}

/// Whether the document looks like print work that belongs in CMYK.
fn uses_cmyk(measured: &OutputProfile) -> bool {
    const PROCESS_INKS: [&str; 3] = ["Cyan", "Magenta", "Yellow"];
    [
        Feature::ColorSpaceDeviceCMYK,
        Feature::AnnotationColorSpaceDeviceCMYK,
        Feature::NChannelProcessDeviceCMYK,
        Feature::Overprint,
    ]
    .iter()
    .any(|f| measured.is_set(*f))
        || measured
            .separations()
            .keys()
            .any(|name| PROCESS_INKS.contains(&name.as_str()))
}

/// Check a document against a target. Returns `None` when it complies,
/// otherwise a report listing required features that are missing as
/// `-Feature` and denied features that are present as `+Feature`.
///
/// ```
/// use pdf_folio::model::{Document, EncryptionSettings};
/// use pdf_folio::profile::{verify, Feature, OutputProfile};
///
/// let mut target = OutputProfile::new("web");
/// target.set_required(Feature::Linearized);
/// target.set_denied(Feature::Encrypted);
///
/// let mut doc = Document::new();
/// doc.set_encryption(Some(EncryptionSettings::new("secret")));
/// assert_eq!(
///     verify(&doc, &target).unwrap(),
///     "[ERROR] Verify failed against web: -Linearized +Encrypted"
/// );
/// ```
pub fn verify(doc: &Document, target: &OutputProfile) -> Option<String> {
    let mismatches = inspect(doc).is_compatible_with(target)?;
    let items: Vec<String> = mismatches
        .iter()
        .map(|f| {
            if target.is_required(*f) {
                format!("-{}", f)
            } else {
                format!("+{}", f)
            }
        })
        .collect();
    Some(format!("[ERROR] Verify failed against {}: {}", target.name(), items.join(" ")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::color::{Color, ColorModel, IccProfile};
    use crate::config::ProfilerConfig;
    use crate::geometry::PageSize;
    use crate::model::EncryptionSettings;
    use crate::profile::Strategy;
    use crate::style::Style;

    fn drawing_doc(fill: Color) -> Document {
        let mut doc = Document::new();
        let page = doc.new_page(PageSize::A5);
        page.set_style(&Style::new().with_fill(fill));
        page.draw_rectangle(10.0, 10.0, 100.0, 100.0);
        doc
    }

    fn config() -> ConversionConfig {
        ConversionConfig::any_pdfa().with_profiler(ProfilerConfig::new().with_raster_dpi(18.0))
    }

    #[test]
    fn test_valid_document_is_left_alone() {
        let mut doc = drawing_doc(Color::rgb(0.1, 0.2, 0.3));
        doc.output_intents_mut().push(OutputIntent::srgb(GTS_PDFA1));
        doc.xmp_mut().present = true;
        doc.xmp_mut().set_claim(StandardProfile::PdfA1b);
        let before = doc.clone();

        let mut conversion = PdfAConversion::new(config());
        assert_eq!(conversion.run(&mut doc).unwrap(), ConversionState::Valid);
        assert_eq!(conversion.used_target(), Some(StandardProfile::PdfA1b));
        assert!(conversion.report().is_none());
        assert_eq!(doc, before);

        let err = conversion.run(&mut doc).unwrap_err();
        assert!(matches!(err, Error::StateMisuse(_)));
    }

    #[test]
    fn test_rasterization_state() {
        let mut doc = drawing_doc(Color::gray(0.5));
        doc.pages_mut()[0].draw_text("unembedded", 20.0, 300.0);
        let mut conversion = PdfAConversion::new(config());
        assert_eq!(
            conversion.run(&mut doc).unwrap(),
            ConversionState::FixedWithRasterization
        );
        assert_eq!(conversion.report().unwrap().rasterized.len(), 1);
        assert!(verify(&doc, &StandardProfile::PdfA1b.profile()).is_none());
    }

    #[test]
    fn test_failure_leaves_document_untouched() {
        let mut doc = drawing_doc(Color::gray(0.5));
        doc.set_encryption(Some(EncryptionSettings::new("secret")));
        let before = doc.clone();
        let config = config().with_profiler(ProfilerConfig::new().with_strategy(Strategy::empty()));
        let mut conversion = PdfAConversion::new(config);
        assert_eq!(conversion.run(&mut doc).unwrap(), ConversionState::Failed);
        assert!(conversion.message().unwrap().contains("Encrypted"));
        assert_eq!(conversion.used_target(), None);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_cmyk_documents_get_cmyk_intent() {
        let fogra = Arc::new(IccProfile::new("Coated FOGRA39", ColorModel::Cmyk, 2));
        let srgb = Arc::new(IccProfile::srgb());
        let profiler = ProfilerConfig::new()
            .with_icc_profile(srgb.clone())
            .with_icc_profile(fogra.clone());

        let mut doc = drawing_doc(Color::cmyk(0.0, 1.0, 1.0, 0.0));
        let mut conversion = PdfAConversion::new(config().with_profiler(profiler.clone()));
        assert_eq!(conversion.run(&mut doc).unwrap(), ConversionState::Fixed);
        assert_eq!(doc.output_intents().len(), 1);
        assert_eq!(doc.output_intents()[0].model(), Some(ColorModel::Cmyk));

        let mut doc = drawing_doc(Color::rgb(1.0, 0.0, 0.0));
        let mut conversion = PdfAConversion::new(config().with_profiler(profiler));
        conversion.run(&mut doc).unwrap();
        assert_eq!(doc.output_intents()[0].model(), Some(ColorModel::Rgb));
    }

    #[test]
    fn test_separation_names_select_cmyk() {
        let mut measured = OutputProfile::new("m");
        assert!(!uses_cmyk(&measured));
        measured.record_separation("magenta", &Color::cmyk(0.0, 1.0, 0.0, 0.0));
        assert!(!uses_cmyk(&measured));
        measured.record_separation("Magenta", &Color::cmyk(0.0, 1.0, 0.0, 0.0));
        assert!(uses_cmyk(&measured));
    }

    #[test]
    fn test_unmet_claims_are_withdrawn() {
        let mut doc = drawing_doc(Color::gray(0.2));
        doc.xmp_mut().present = true;
        doc.xmp_mut().set_claim(StandardProfile::PdfX4);
        let mut conversion = PdfAConversion::new(config());
        assert_eq!(conversion.run(&mut doc).unwrap(), ConversionState::Fixed);
        assert_eq!(doc.xmp().claims, vec![StandardProfile::PdfA1b]);
    }

    #[test]
    fn test_claims_of_other_allowed_targets_are_kept() {
        let mut doc = drawing_doc(Color::gray(0.2));
        doc.xmp_mut().present = true;
        doc.xmp_mut().set_claim(StandardProfile::PdfA1b);
        doc.xmp_mut().set_claim(StandardProfile::PdfUa1);
        let config = config().with_allowed([StandardProfile::PdfA1b, StandardProfile::PdfUa1]);
        let mut conversion = PdfAConversion::new(config);
        assert_eq!(conversion.run(&mut doc).unwrap(), ConversionState::Fixed);
        assert_eq!(conversion.used_target(), Some(StandardProfile::PdfA1b));
        assert!(doc.xmp().claims.contains(&StandardProfile::PdfUa1));
        assert!(doc.xmp().claims.contains(&StandardProfile::PdfA1b));
    }

    #[test]
    fn test_retained_profiles_filtered() {
        let config = ConversionConfig::new()
            .with_allowed([StandardProfile::PdfUa1])
            .with_retained([
                StandardProfile::PdfX1a2003.profile(),
                StandardProfile::PdfX4.profile(),
                StandardProfile::PdfUa1.profile(),
            ]);
        let conversion = PdfAConversion::new(config);
        let names: Vec<&str> = conversion.retained().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec![StandardProfile::PdfX4.name()]);
    }

    #[test]
    fn test_verify_format() {
        let mut target = OutputProfile::new("T");
        target.set_required(Feature::Linearized);
        target.set_denied(Feature::Encrypted);
        let mut doc = Document::new();
        assert_eq!(
            verify(&doc, &target).unwrap(),
            "[ERROR] Verify failed against T: -Linearized"
        );
        doc.set_encryption(Some(EncryptionSettings::new("secret")));
        assert_eq!(
            verify(&doc, &target).unwrap(),
            "[ERROR] Verify failed against T: -Linearized +Encrypted"
        );
        doc.set_encryption(None);
        doc.options_mut().linearize = true;
        assert!(verify(&doc, &target).is_none());
    }
}
