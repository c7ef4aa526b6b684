//! Measuring a document and repairing it towards a target profile.
//!
//! [`OutputProfiler::apply`] runs its passes in a fixed order: structural
//! fixes first, then color remapping, font substitution, an optional
//! conformance downgrade and finally per-page rasterization for whatever
//! content is still denied. Every change is recorded in the returned
//! [`ApplyReport`].

use std::collections::HashSet;
use std::sync::Arc;

use bitflags::bitflags;
use chrono::Utc;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::color_action::ColorAction;
use super::feature::{Feature, FeatureSet};
use super::font_action::FontAction;
use super::inspect::{anchor, inspect, inspect_page};
use super::intent::{OutputIntent, GTS_PDFA1, GTS_PDFX};
use super::output_profile::{OutputProfile, ProfileComplianceError};
use super::raster::{PageRasterizer, VectorRasterizer};
use super::standards::StandardProfile;
use crate::config::ProfilerConfig;
use crate::error::Result;
use crate::model::{
    Action, AfRelationship, AnnotationEvent, AnnotationFlags, AnnotationKind, ContentOp, Document, EmbeddedFile,
    ImageFilter, ImageRef, PageId, TagKey, ARTIFACT,
};
use crate::style::Style;

bitflags! {
    /// Kinds of repair an [`OutputProfiler`] may make.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Strategy: u32 {
        /// Remove content the target prohibits: encryption, scripts, XFA,
        /// launch actions, hidden annotations, embedded files and layers
        const STRIP_PROHIBITED = 1 << 0;
        /// Substitute embedded fonts from the pool for unembedded ones
        const EMBED_FONTS = 1 << 1;
        /// Convert colors into spaces the target accepts
        const REMAP_COLORS = 1 << 2;
        /// Fall back from level A to level B conformance
        const DOWNGRADE = 1 << 3;
        /// Replace pages that cannot be fixed otherwise by images
        const RASTERIZE = 1 << 4;
        /// Everything
        const JUST_FIX_IT = Self::STRIP_PROHIBITED.bits()
            | Self::EMBED_FONTS.bits()
            | Self::REMAP_COLORS.bits()
            | Self::DOWNGRADE.bits()
            | Self::RASTERIZE.bits();
    }
}

/// Page content features that flattening the page to an image removes.
const RASTER_FIXABLE: &[Feature] = &[
    Feature::UntaggedContent,
    Feature::FontUnembedded,
    Feature::TextWithoutUnicode,
    Feature::ColorSpaceDeviceGray,
    Feature::ColorSpaceDeviceRGB,
    Feature::ColorSpaceDeviceCMYK,
    Feature::ColorSpaceCalibrated,
    Feature::ColorSpaceLab,
    Feature::ColorSpaceICC,
    Feature::ColorSpaceICCVersion4,
    Feature::ColorSpaceSeparation,
    Feature::ColorSpaceDeviceN,
    Feature::NChannelProcessDeviceCMYK,
    Feature::UnanchoredDeviceGray,
    Feature::UnanchoredDeviceRGB,
    Feature::UnanchoredDeviceCMYK,
    Feature::Overprint,
    Feature::Transparency,
    Feature::ImageLZW,
    Feature::ImageJPEG2000,
];

/// One change made by a repair pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    /// Feature the change addresses
    pub feature: Feature,
    /// What was done
    pub description: String,
}

/// A page replaced by an image of itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedPage {
    /// Page index at the time of rasterization
    pub index: usize,
    /// Page identity
    pub id: PageId,
    /// First denied feature that forced rasterization
    pub feature: Feature,
}

/// Everything [`OutputProfiler::apply`] changed.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    /// Structural fixes, in the order they were made
    pub fixes: Vec<Fix>,
    /// Rasterized pages
    pub rasterized: Vec<RasterizedPage>,
    /// Standard the target was downgraded to, if any
    pub downgraded: Option<StandardProfile>,
    /// Replaced fonts as (original, substitute) names
    pub substituted_fonts: Vec<(String, String)>,
    /// Number of colors rewritten
    pub colors_changed: usize,
    /// Target the document now meets. Differs from the requested target
    /// after a downgrade.
    pub target: OutputProfile,
}

impl ApplyReport {
    fn new(target: &OutputProfile) -> Self {
        Self {
            fixes: Vec::new(),
            rasterized: Vec::new(),
            downgraded: None,
            substituted_fonts: Vec::new(),
            colors_changed: 0,
            target: target.clone(),
        }
    }

    fn fix(&mut self, feature: Feature, description: impl Into<String>) {
        let description = description.into();
        log::debug!("{}: {}", feature, description);
        self.fixes.push(Fix { feature, description });
    }

    /// Whether the document was modified at all.
    pub fn changed(&self) -> bool {
        !self.fixes.is_empty()
            || !self.rasterized.is_empty()
            || !self.substituted_fonts.is_empty()
            || self.colors_changed > 0
            || self.downgraded.is_some()
    }
}

/// Profiles a document and repairs it.
///
/// The measured profile is cached until [`apply`](Self::apply) changes the
/// document.
///
/// ## Example
///
/// ```
/// use pdf_folio::config::ProfilerConfig;
/// use pdf_folio::geometry::PageSize;
/// use pdf_folio::model::{Action, Document, DocumentEvent};
/// use pdf_folio::profile::{Feature, OutputProfiler, StandardProfile};
///
/// let mut doc = Document::new();
/// doc.new_page(PageSize::A4).draw_rectangle(72.0, 72.0, 144.0, 144.0);
/// doc.actions_mut().insert(DocumentEvent::Open, Action::JavaScript("app.alert(1)".into()));
///
/// let mut profiler = OutputProfiler::new(&mut doc, ProfilerConfig::new());
/// assert!(profiler.profile().is_set(Feature::JavaScript));
///
/// let report = profiler.apply(&StandardProfile::PdfA1b.profile()).unwrap();
/// assert!(report.fixes.iter().any(|f| f.feature == Feature::JavaScript));
/// assert!(!profiler.profile().is_set(Feature::JavaScript));
/// ```
#[derive(Debug)]
pub struct OutputProfiler<'a> {
    doc: &'a mut Document,
    config: ProfilerConfig,
    cached: Option<OutputProfile>,
}

impl<'a> OutputProfiler<'a> {
    /// Create a profiler for `doc`.
    pub fn new(doc: &'a mut Document, config: ProfilerConfig) -> Self {
        Self {
            doc,
            config,
            cached: None,
        }
    }

    /// The document being profiled.
    pub fn document(&self) -> &Document {
        self.doc
    }

    /// Configuration.
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Measured profile of the document.
    pub fn profile(&mut self) -> &OutputProfile {
        let doc = &*self.doc;
        self.cached.get_or_insert_with(|| inspect(doc))
    }

    fn allows(&self, strategy: Strategy) -> bool {
        self.config.strategy.contains(strategy)
    }

    /// Modify the document until it meets `target`.
    ///
    /// Fails with [`Error::ProfileCompliance`](crate::Error::ProfileCompliance)
    /// naming the first feature still out of line when the passes the
    /// strategy allows cannot fix everything. The document keeps whatever
    /// changes were made; callers that need atomicity work on a copy.
    pub fn apply(&mut self, target: &OutputProfile) -> Result<ApplyReport> {
        let measured = self.profile().clone();
        let mut target = target.clone();
        let mut report = ApplyReport::new(&target);
        self.cached = None;

        self.fix_structure(&measured, &target, &mut report)?;
        self.fix_intents(&measured, &target, &mut report);
        self.fix_claims(&target, &mut report);

        if self.allows(Strategy::REMAP_COLORS) {
            let action = ColorAction::new(self.config.icc_pool.iter().cloned());
            report.colors_changed = action.apply(self.doc, &target)?;
        }
        if self.allows(Strategy::EMBED_FONTS) && target.is_denied(Feature::FontUnembedded) {
            let action = FontAction::new(self.config.font_pool.iter().cloned());
            for (from, to) in action.apply(self.doc) {
                report.fix(Feature::FontUnembedded, format!("substituted {} for {}", to, from));
                report.substituted_fonts.push((from, to));
            }
        }

        if self.allows(Strategy::DOWNGRADE) {
            let remaining = inspect(self.doc).is_compatible_with(&target).unwrap_or_default();
            if let Some((lower, next)) = downgrade(&target, &remaining) {
                log::info!("downgrading {} to {}", target.name(), lower);
                target = next;
                report.downgraded = Some(lower);
                self.fix_claims(&target, &mut report);
            }
        }

        if self.allows(Strategy::RASTERIZE) {
            self.rasterize(&target, &mut report)?;
        }

        if report.changed() && !self.doc.signatures().is_empty() {
            let removed = self.doc.clear_signatures();
            log::warn!("removed {} signatures invalidated by the repair", removed);
            report.fix(Feature::DigitalSignature, format!("removed {} signatures", removed));
        }
        if report.changed() && self.doc.xmp().present {
            self.doc
                .xmp_mut()
                .add_history("converted", Some(target.name().to_string()));
        }

        report.target = target;
        let after = self.profile();
        if let Some(mismatches) = after.is_compatible_with(&report.target) {
            log::warn!(
                "{} still fails {}: {:?}",
                after.name(),
                report.target.name(),
                mismatches
            );
            return Err(ProfileComplianceError::unfixable(mismatches[0], report.target.name()).into());
        }
        Ok(report)
    }

    fn fix_structure(&mut self, measured: &OutputProfile, target: &OutputProfile, report: &mut ApplyReport) -> Result<()> {
        let offends = |f: Feature| {
            (target.is_denied(f) && measured.is_set(f)) || (target.is_required(f) && !measured.is_set(f))
        };
        let strip = self.allows(Strategy::STRIP_PROHIBITED);
        let doc = &mut *self.doc;

        if strip && offends(Feature::Encrypted) {
            doc.set_encryption(None);
            report.fix(Feature::Encrypted, "removed encryption");
        }
        if strip && offends(Feature::JavaScript) {
            let scripts = doc.javascript().len();
            doc.javascript_mut().clear();
            let actions = strip_actions(doc, Action::is_javascript);
            report.fix(
                Feature::JavaScript,
                format!("removed {} scripts and {} script actions", scripts, actions),
            );
        }
        if strip && offends(Feature::XFAForm) && doc.form_mut().remove_xfa() {
            report.fix(Feature::XFAForm, "removed XFA form");
        }
        if strip && offends(Feature::LaunchAction) {
            let actions = strip_actions(doc, Action::is_launch);
            report.fix(Feature::LaunchAction, format!("removed {} launch actions", actions));
        }

        if offends(Feature::Linearized) {
            doc.options_mut().linearize = target.is_required(Feature::Linearized);
            report.fix(Feature::Linearized, "changed linearization");
        }
        if offends(Feature::RegularCompression) {
            doc.options_mut().compress = target.is_required(Feature::RegularCompression);
            report.fix(Feature::RegularCompression, "changed compression");
        }
        if offends(Feature::XMPMetaData) {
            let now = Utc::now();
            let xmp = doc.xmp_mut();
            xmp.present = true;
            if xmp.create_date.is_none() {
                xmp.create_date = Some(now);
            }
            xmp.modify_date = Some(now);
            report.fix(Feature::XMPMetaData, "added XMP metadata");
        }
        if offends(Feature::InfoTitle) {
            let title = self.config.default_title.as_deref().unwrap_or("Untitled");
            doc.set_info("Title", Some(title));
            report.fix(Feature::InfoTitle, format!("set title to \"{}\"", title));
        }
        if offends(Feature::Language) {
            match &self.config.default_language {
                Some(locale) => {
                    doc.set_locale(Some(locale.clone()));
                    report.fix(Feature::Language, format!("set language to {}", locale.language()));
                },
                None => log::debug!("no default language to set"),
            }
        }

        if offends(Feature::UntaggedContent) {
            let mut wrapped = 0;
            for page in doc.pages_mut() {
                wrapped += wrap_artifacts(page.content_mut());
            }
            report.fix(
                Feature::UntaggedContent,
                format!("marked {} runs of untagged content as artifacts", wrapped),
            );
        }

        self.fix_annotations(measured, target, report);

        let doc = &mut *self.doc;
        if offends(Feature::FormFieldWithoutTooltip) {
            for (name, element) in doc.form_mut().iter_mut() {
                if element.tooltip.as_deref().map_or(true, |t| t.trim().is_empty()) {
                    element.tooltip = Some(name.to_string());
                }
            }
            report.fix(Feature::FormFieldWithoutTooltip, "used field names as tooltips");
        }

        if strip && offends(Feature::EmbeddedFiles) {
            let removed = strip_files(doc, |_| false);
            report.fix(Feature::EmbeddedFiles, format!("removed {} embedded files", removed));
        } else if strip && offends(Feature::EmbeddedFileNotPDF) {
            let removed = strip_files(doc, EmbeddedFile::is_pdf);
            report.fix(
                Feature::EmbeddedFileNotPDF,
                format!("removed {} embedded files that are not PDF", removed),
            );
        }
        if offends(Feature::AssociatedFileWithoutRelationship) {
            let unspecified = |file: &mut EmbeddedFile| {
                if file.af_relationship.is_none() {
                    file.af_relationship = Some(AfRelationship::Unspecified);
                }
            };
            doc.embedded_files_mut().values_mut().for_each(unspecified);
            for page in doc.pages_mut() {
                for annot in page.annotations_mut() {
                    annot.files_mut().into_iter().for_each(unspecified);
                }
            }
            report.fix(
                Feature::AssociatedFileWithoutRelationship,
                "marked associated files as Unspecified",
            );
        }

        if strip && offends(Feature::OptionalContent) {
            let hidden = flatten_layers(doc);
            report.fix(
                Feature::OptionalContent,
                format!("flattened layers, dropping {} hidden drawing operations", hidden),
            );
        }

        if offends(Feature::ImageLZW) {
            let mut reencoded = 0;
            for page in doc.pages_mut() {
                for op in page.content_mut().iter_mut() {
                    if let ContentOp::Image { image, .. } = op {
                        if image.filter != ImageFilter::Lzw {
                            continue;
                        }
                        match image.reencode_flate() {
                            Ok(flate) => {
                                *image = flate;
                                reencoded += 1;
                            },
                            Err(e) => log::warn!("cannot re-encode LZW image: {}", e),
                        }
                    }
                }
            }
            report.fix(Feature::ImageLZW, format!("re-encoded {} LZW images with Flate", reencoded));
        }
        Ok(())
    }

    fn fix_annotations(&mut self, measured: &OutputProfile, target: &OutputProfile, report: &mut ApplyReport) {
        let offends = |f: Feature| target.is_denied(f) && measured.is_set(f);
        let strip = self.allows(Strategy::STRIP_PROHIBITED);
        let pages = self.doc.pages_mut();

        if offends(Feature::AnnotationHidden) {
            let hidden = AnnotationFlags::HIDDEN | AnnotationFlags::INVISIBLE | AnnotationFlags::NO_VIEW;
            let mut removed = 0;
            for page in pages.iter_mut() {
                let annotations = page.annotations_mut();
                let before = annotations.len();
                if strip {
                    annotations.retain(|a| a.is_widget() || !a.is_hidden());
                }
                removed += before - annotations.len();
                for annot in annotations.iter_mut().filter(|a| a.is_hidden()) {
                    annot.flags.remove(hidden);
                }
            }
            report.fix(
                Feature::AnnotationHidden,
                format!("removed {} hidden annotations and showed the rest", removed),
            );
        }
        if offends(Feature::AnnotationWithoutAppearance) {
            for annot in pages.iter_mut().flat_map(|p| p.annotations_mut().iter_mut()) {
                annot.has_appearance = true;
            }
            report.fix(Feature::AnnotationWithoutAppearance, "generated annotation appearances");
        }
        if offends(Feature::AnnotationNotPrintable) {
            for annot in pages.iter_mut().flat_map(|p| p.annotations_mut().iter_mut()) {
                if !annot.is_hidden() {
                    annot.flags.insert(AnnotationFlags::PRINT);
                }
            }
            report.fix(Feature::AnnotationNotPrintable, "set the print flag on visible annotations");
        }
        if offends(Feature::AnnotationWithoutContents) {
            for annot in pages.iter_mut().flat_map(|p| p.annotations_mut().iter_mut()) {
                if annot.is_widget() || annot.contents.as_deref().map_or(false, |c| !c.trim().is_empty()) {
                    continue;
                }
                let description = annot
                    .actions
                    .get(&AnnotationEvent::Click)
                    .map(Action::describe)
                    .unwrap_or_else(|| annot.kind.pdf_name().to_string());
                annot.contents = Some(description);
            }
            report.fix(Feature::AnnotationWithoutContents, "described annotations");
        }
    }

    fn fix_intents(&mut self, measured: &OutputProfile, target: &OutputProfile, report: &mut ApplyReport) {
        let intents = self.doc.output_intents_mut();
        for intent in target.output_intents() {
            if intents.contains(intent) {
                continue;
            }
            intents.retain(|i| i.intent_type != intent.intent_type);
            intents.push(intent.clone());
            report.fix(
                intent_feature(&intent.intent_type),
                format!("set {} output intent to {}", intent.intent_type, intent.identifier),
            );
        }

        for intent_type in target.required_intent_types() {
            if intents.iter().any(|i| &i.intent_type == intent_type) {
                continue;
            }
            let intent = match intents.first() {
                Some(existing) => existing.with_type(intent_type.as_str()),
                None => {
                    log::warn!("no output intent available for {}, using sRGB", intent_type);
                    OutputIntent::srgb(intent_type.as_str())
                },
            };
            report.fix(
                intent_feature(intent_type),
                format!("added {} output intent {}", intent_type, intent.identifier),
            );
            intents.push(intent);
        }

        if target.is_denied(Feature::HasMultipleOutputIntents) && intents.len() > 1 {
            let keep = target
                .required_intent_types()
                .iter()
                .find_map(|t| intents.iter().position(|i| &i.intent_type == t))
                .unwrap_or(0);
            let kept = intents.swap_remove(keep);
            intents.clear();
            intents.push(kept);
            report.fix(Feature::HasMultipleOutputIntents, "kept a single output intent");
        }

        if target.is_denied(Feature::OutputIntentsDiffer) && intents.len() > 1 {
            let primary = intents
                .iter()
                .find(|i| i.intent_type == GTS_PDFA1)
                .or_else(|| intents.first())
                .cloned();
            if let Some(primary) = primary {
                let mut changed = false;
                for intent in intents.iter_mut() {
                    if !intent.same_destination(&primary) {
                        *intent = primary.with_type(intent.intent_type.as_str());
                        changed = true;
                    }
                }
                if changed || measured.is_set(Feature::OutputIntentsDiffer) {
                    report.fix(
                        Feature::OutputIntentsDiffer,
                        format!("aligned output intents on {}", primary.identifier),
                    );
                }
            }
        }
    }

    fn fix_claims(&mut self, target: &OutputProfile, report: &mut ApplyReport) {
        let xmp = self.doc.xmp_mut();
        let before = xmp.claims.clone();
        xmp.claims.retain(|c| !target.denied_claims().contains(c));
        for claim in target.claims() {
            xmp.set_claim(*claim);
        }
        if !target.claims().is_empty() {
            xmp.present = true;
        }
        if xmp.claims != before {
            let names: Vec<&str> = xmp.claims.iter().map(|c| c.name()).collect();
            report.fix(Feature::XMPMetaData, format!("claims set to [{}]", names.join(", ")));
        }
    }

    fn rasterize(&mut self, target: &OutputProfile, report: &mut ApplyReport) -> Result<()> {
        let fixable: FeatureSet = RASTER_FIXABLE.iter().copied().collect();
        let denied = target.denied().intersection(&fixable);
        if denied.is_empty() {
            return Ok(());
        }

        let tagged = self.doc.is_tagged();
        let intents = self.doc.output_intents().to_vec();
        let jobs: Vec<(usize, Feature)> = self
            .doc
            .pages()
            .iter()
            .enumerate()
            .filter_map(|(index, page)| {
                let mut measured = inspect_page(page, index, tagged);
                anchor(&mut measured, &intents);
                measured.features().intersection(&denied).iter().next().map(|f| (index, f))
            })
            .collect();
        if jobs.is_empty() {
            return Ok(());
        }

        let default_rasterizer: Arc<dyn PageRasterizer> = Arc::new(VectorRasterizer::new());
        let rasterizer = self.config.rasterizer.as_ref().unwrap_or(&default_rasterizer).as_ref();
        let dpi = self.config.raster_dpi;
        let pages = self.doc.pages();
        let render = |&(index, _): &(usize, Feature)| rasterizer.rasterize(&pages[index], dpi);
        let images: Vec<Result<ImageRef>> = match &self.config.raster_pool {
            Some(pool) => pool.install(|| jobs.par_iter().map(render).collect()),
            None => jobs.iter().map(render).collect(),
        };

        let colors = ColorAction::new(self.config.icc_pool.iter().cloned());
        let remap = self.allows(Strategy::REMAP_COLORS);
        for ((index, feature), image) in jobs.into_iter().zip(images) {
            let image = image?.with_alt_text(format!("Page {}", index + 1));
            let page = &mut self.doc.pages_mut()[index];
            let media = page.media_box();
            let style = page.style().clone();
            page.replace_content(Vec::new());
            page.set_style(&Style::new());
            if tagged {
                let mut attributes = IndexMap::new();
                attributes.insert("Alt".to_string(), format!("Page {}", index + 1));
                page.begin_tag("Figure", attributes);
            }
            page.draw_image(&image, media.left(), media.bottom(), media.right(), media.top());
            if tagged {
                page.end_tag()?;
            }
            page.set_style(&style);
            if remap {
                report.colors_changed += colors.fix_page(page, target, &intents)?;
            }

            log::warn!("rasterized page {} because of {}", index + 1, feature);
            report.rasterized.push(RasterizedPage {
                index,
                id: page.id(),
                feature,
            });
        }
        Ok(())
    }
}

fn intent_feature(intent_type: &str) -> Feature {
    if intent_type == GTS_PDFX {
        Feature::OutputIntentPDFX
    } else {
        Feature::OutputIntentPDFA
    }
}

/// Remove matching actions from every place a document holds them.
fn strip_actions(doc: &mut Document, matches: impl Fn(&Action) -> bool) -> usize {
    let mut removed = 0;
    let mut count = |before: usize, after: usize| removed += before - after;

    let actions = doc.actions_mut();
    let before = actions.len();
    actions.retain(|_, a| !matches(a));
    count(before, actions.len());

    let named = doc.named_actions_mut();
    let before = named.len();
    named.retain(|_, a| !matches(a));
    count(before, named.len());

    for (_, element) in doc.form_mut().iter_mut() {
        let before = element.actions.len();
        element.actions.retain(|_, a| !matches(a));
        count(before, element.actions.len());
    }
    for page in doc.pages_mut() {
        for annot in page.annotations_mut() {
            let before = annot.actions.len();
            annot.actions.retain(|_, a| !matches(a));
            count(before, annot.actions.len());
        }
    }
    for bookmark in doc.bookmarks_mut() {
        bookmark.walk_mut(&mut |b| {
            if b.action.as_ref().map_or(false, |a| matches(a)) {
                b.action = None;
                count(1, 0);
            }
        });
    }
    removed
}

/// Keep only the files `keep` accepts, at document level and on
/// annotations. File annotations whose attachment goes are removed too.
fn strip_files(doc: &mut Document, keep: impl Fn(&EmbeddedFile) -> bool) -> usize {
    let files = doc.embedded_files_mut();
    let mut removed = files.len();
    files.retain(|_, f| keep(f));
    removed -= files.len();

    for page in doc.pages_mut() {
        let annotations = page.annotations_mut();
        let before = annotations.len();
        annotations.retain(|a| match &a.kind {
            AnnotationKind::File { file } => keep(file),
            _ => true,
        });
        removed += before - annotations.len();
        for annot in annotations.iter_mut() {
            let before = annot.associated_files.len();
            annot.associated_files.retain(|f| keep(f));
            removed += before - annot.associated_files.len();
        }
    }
    removed
}

/// Drop drawing operations in hidden layers and every layer marker.
/// Returns the number of dropped operations.
fn flatten_layers(doc: &mut Document) -> usize {
    let hidden: HashSet<_> = doc.layers().iter().filter(|l| !l.visible).map(|l| l.id()).collect();
    let mut dropped = 0;
    for page in doc.pages_mut() {
        let content = std::mem::take(page.content_mut());
        let mut stack: Vec<bool> = Vec::new();
        let mut kept = Vec::with_capacity(content.len());
        for op in content {
            let inside_hidden = stack.last().copied().unwrap_or(false);
            match op {
                ContentOp::BeginLayer(id) => stack.push(inside_hidden || hidden.contains(&id)),
                ContentOp::EndLayer => {
                    stack.pop();
                },
                op if op.is_drawing() && inside_hidden => dropped += 1,
                op => kept.push(op),
            }
        }
        *page.content_mut() = kept;
    }
    doc.layers_mut().clear();
    dropped
}

/// Wrap every run of drawing operations outside any tag in an artifact.
fn wrap_artifacts(content: &mut Vec<ContentOp>) -> usize {
    let ops = std::mem::take(content);
    let mut depth = 0usize;
    let mut in_run = false;
    let mut runs = 0;
    for op in ops {
        let untagged = depth == 0 && op.is_drawing();
        if untagged && !in_run {
            content.push(ContentOp::BeginTag {
                key: TagKey::new(),
                role: ARTIFACT.to_string(),
                attributes: IndexMap::new(),
            });
            in_run = true;
            runs += 1;
        } else if !untagged && in_run {
            content.push(ContentOp::EndTag);
            in_run = false;
        }
        match op {
            ContentOp::BeginTag { .. } => depth += 1,
            ContentOp::EndTag => depth = depth.saturating_sub(1),
            _ => {},
        }
        content.push(op);
    }
    if in_run {
        content.push(ContentOp::EndTag);
    }
    runs
}

/// Level B fallback of a level A target, if the remaining mismatches
/// include something only level A cares about.
fn downgrade(target: &OutputProfile, remaining: &[Feature]) -> Option<(StandardProfile, OutputProfile)> {
    let (from, to) = target.claims().iter().find_map(|c| c.downgraded().map(|d| (*c, d)))?;
    let mut next = to.profile();
    if !remaining.iter().any(|f| !next.is_required(*f) && !next.is_denied(*f)) {
        return None;
    }
    for claim in target.claims() {
        if *claim == from {
            continue;
        }
        let profile = claim.profile();
        if profile.is_required(Feature::TaggedPDF) || next.merge(&profile, None).is_err() {
            next.deny_claim(*claim);
        }
    }
    next.deny_claim(from);
    for claim in target.denied_claims() {
        next.deny_claim(*claim);
    }
    for intent in target.output_intents() {
        next.add_output_intent(intent.clone());
    }
    for intent_type in target.required_intent_types() {
        next.require_intent_type(intent_type.clone());
    }
    Some((to, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::error::Error;
    use crate::fonts::OpenTypeFont;
    use crate::geometry::{PageSize, Rect};
    use crate::model::{Annotation, Bookmark, DocumentEvent, EncryptionSettings};

    fn config() -> ProfilerConfig {
        ProfilerConfig::new().with_raster_dpi(18.0)
    }

    fn drawing_doc() -> Document {
        let mut doc = Document::new();
        let page = doc.new_page(PageSize::A5);
        page.set_style(&Style::new().with_fill(Color::rgb(0.2, 0.4, 0.6)));
        page.draw_rectangle(10.0, 10.0, 100.0, 100.0);
        doc
    }

    #[test]
    fn test_profile_is_cached_until_apply() {
        let mut doc = drawing_doc();
        doc.set_encryption(Some(EncryptionSettings::new("secret")));
        let mut profiler = OutputProfiler::new(&mut doc, config());
        assert!(profiler.profile().is_set(Feature::Encrypted));
        profiler.apply(&StandardProfile::PdfA1b.profile()).unwrap();
        assert!(!profiler.profile().is_set(Feature::Encrypted));
    }

    #[test]
    fn test_strips_scripts_and_encryption() {
        let mut doc = drawing_doc();
        doc.set_encryption(Some(EncryptionSettings::new("secret")));
        doc.javascript_mut().insert("init".into(), "var x = 1;".into());
        doc.actions_mut()
            .insert(DocumentEvent::Open, Action::JavaScript("init()".into()));
        doc.bookmarks_mut()
            .push(Bookmark::new("Run").with_action(Action::Launch("calc.exe".into())));

        let target = StandardProfile::PdfA1b.profile();
        let report = OutputProfiler::new(&mut doc, config()).apply(&target).unwrap();

        assert!(doc.encryption().is_none());
        assert!(doc.javascript().is_empty());
        assert!(doc.actions().is_empty());
        assert!(doc.bookmarks()[0].action.is_none());
        assert_eq!(doc.output_intents().len(), 1);
        assert_eq!(doc.output_intents()[0].intent_type, GTS_PDFA1);
        assert!(doc.xmp().present);
        assert_eq!(doc.xmp().claims, vec![StandardProfile::PdfA1b]);
        assert!(report.rasterized.is_empty());
        for feature in [Feature::Encrypted, Feature::JavaScript, Feature::LaunchAction] {
            assert!(report.fixes.iter().any(|f| f.feature == feature), "{}", feature);
        }
        assert!(inspect(&doc).is_compatible_with(&target).is_none());
    }

    #[test]
    fn test_disabled_strategy_reports_first_unfixed_feature() {
        let mut doc = drawing_doc();
        doc.set_encryption(Some(EncryptionSettings::new("secret")));
        let config = config().with_strategy(Strategy::empty());
        let err = OutputProfiler::new(&mut doc, config)
            .apply(&StandardProfile::PdfA1b.profile())
            .unwrap_err();
        match err {
            Error::ProfileCompliance(e) => assert_eq!(e.feature(), Feature::Encrypted),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(doc.encryption().is_some());
    }

    #[test]
    fn test_rasterizes_unembedded_text() {
        let mut doc = drawing_doc();
        doc.pages_mut()[0].draw_text("Hello", 20.0, 200.0);
        doc.new_page(PageSize::A5).draw_text("World", 20.0, 200.0);
        doc.new_page(PageSize::A5).draw_line(0.0, 0.0, 50.0, 50.0);

        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let config = config().with_raster_pool(Arc::new(pool));
        let target = StandardProfile::PdfA1b.profile();
        let report = OutputProfiler::new(&mut doc, config).apply(&target).unwrap();

        let pages: Vec<(usize, Feature)> = report.rasterized.iter().map(|r| (r.index, r.feature)).collect();
        assert_eq!(pages, vec![(0, Feature::FontUnembedded), (1, Feature::FontUnembedded)]);
        assert_eq!(report.rasterized[0].id, doc.pages()[0].id());
        assert!(matches!(doc.pages()[0].content(), [ContentOp::Image { .. }]));
        assert!(matches!(doc.pages()[2].content(), [ContentOp::Line { .. }]));
        assert!(inspect(&doc).is_compatible_with(&target).is_none());
    }

    #[test]
    fn test_font_pool_avoids_rasterization() {
        let mut doc = drawing_doc();
        doc.pages_mut()[0].draw_text("Hello", 20.0, 200.0);
        let ascii: String = (' '..='~').collect();
        let font = OpenTypeFont::from_metrics(
            "FreeSans",
            "Free Sans",
            false,
            false,
            ascii.chars().map(|c| (c, 500)),
            vec![0, 1, 0, 0],
        );
        let config = config().with_font(Arc::new(font));
        let report = OutputProfiler::new(&mut doc, config)
            .apply(&StandardProfile::PdfA1b.profile())
            .unwrap();
        assert!(report.rasterized.is_empty());
        assert_eq!(
            report.substituted_fonts,
            vec![("Helvetica".to_string(), "FreeSans".to_string())]
        );
    }

    #[test]
    fn test_downgrades_untagged_document() {
        let mut doc = drawing_doc();
        let report = OutputProfiler::new(&mut doc, config())
            .apply(&StandardProfile::PdfA1a.profile())
            .unwrap();
        assert_eq!(report.downgraded, Some(StandardProfile::PdfA1b));
        assert!(report.target.claims().contains(&StandardProfile::PdfA1b));
        assert_eq!(doc.xmp().claims, vec![StandardProfile::PdfA1b]);

        let mut doc = drawing_doc();
        let config = config().with_strategy(Strategy::JUST_FIX_IT - Strategy::DOWNGRADE);
        let err = OutputProfiler::new(&mut doc, config)
            .apply(&StandardProfile::PdfA1a.profile())
            .unwrap_err();
        assert!(matches!(err, Error::ProfileCompliance(_)));
    }

    #[test]
    fn test_fixes_annotations() {
        let mut doc = drawing_doc();
        let page = &mut doc.pages_mut()[0];
        let mut note = Annotation::note(Rect::new(0.0, 0.0, 20.0, 20.0), "Check");
        note.flags = AnnotationFlags::empty();
        note.has_appearance = false;
        page.add_annotation(note);
        let mut hidden = Annotation::note(Rect::new(30.0, 0.0, 20.0, 20.0), "Secret");
        hidden.flags = AnnotationFlags::HIDDEN;
        page.add_annotation(hidden);

        OutputProfiler::new(&mut doc, config())
            .apply(&StandardProfile::PdfA1b.profile())
            .unwrap();
        let annotations = doc.pages()[0].annotations();
        assert_eq!(annotations.len(), 1);
        assert!(annotations[0].is_printable());
        assert!(annotations[0].has_appearance);
    }

    #[test]
    fn test_flattens_layers() {
        let mut doc = Document::new();
        let hidden = doc.add_layer("Draft").visible(false).id();
        let shown = doc.add_layer("Final").id();
        let page = doc.new_page(PageSize::A5);
        page.begin_layer(hidden);
        page.draw_rectangle(0.0, 0.0, 10.0, 10.0);
        page.end_layer().unwrap();
        page.begin_layer(shown);
        page.draw_line(0.0, 0.0, 10.0, 10.0);
        page.end_layer().unwrap();

        OutputProfiler::new(&mut doc, config())
            .apply(&StandardProfile::PdfA1b.profile())
            .unwrap();
        assert!(doc.layers().is_empty());
        assert!(matches!(doc.pages()[0].content(), [ContentOp::Line { .. }]));
    }

    #[test]
    fn test_wraps_untagged_runs() {
        let mut content = vec![
            ContentOp::Save,
            ContentOp::Line {
                from: crate::geometry::Point::new(0.0, 0.0),
                to: crate::geometry::Point::new(1.0, 1.0),
                style: Style::new(),
            },
            ContentOp::BeginTag {
                key: TagKey::new(),
                role: "P".into(),
                attributes: IndexMap::new(),
            },
            ContentOp::Text {
                x: 0.0,
                y: 0.0,
                text: "a".into(),
                style: Style::new(),
            },
            ContentOp::EndTag,
            ContentOp::Restore,
        ];
        assert_eq!(wrap_artifacts(&mut content), 1);
        assert_eq!(content.len(), 8);
        assert!(matches!(&content[1], ContentOp::BeginTag { role, .. } if role == ARTIFACT));
        assert!(matches!(content[3], ContentOp::EndTag));
    }
}
