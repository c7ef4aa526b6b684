//! Measuring which features a document has.
//!
//! Inspection never modifies the document and is deterministic: the same
//! document always yields the same profile.

use super::feature::Feature;
use super::intent::{OutputIntent, GTS_PDFA1, GTS_PDFX};
use super::output_profile::{AssociatedFileInfo, FileOwner, OutputProfile};
use crate::color::{ColorModel, ColorSpace};
use crate::model::{Action, AnnotationKind, ContentOp, Document, EmbeddedFile, ImageFilter, Page};
use crate::style::Style;

/// Measure a document.
///
/// ## Example
///
/// ```
/// use pdf_folio::geometry::PageSize;
/// use pdf_folio::model::Document;
/// use pdf_folio::profile::{inspect, Feature};
///
/// let mut doc = Document::new();
/// doc.new_page(PageSize::A4).draw_text("Hello", 72.0, 770.0);
/// doc.options_mut().linearize = true;
///
/// let profile = inspect(&doc);
/// assert!(profile.is_set(Feature::Linearized));
/// assert!(profile.is_set(Feature::FontUnembedded));
/// assert!(!profile.is_set(Feature::Encrypted));
/// ```
pub fn inspect(doc: &Document) -> OutputProfile {
    let mut profile = OutputProfile::new("Document");

    profile.set_feature(Feature::Linearized, doc.options().linearize);
    profile.set_feature(Feature::RegularCompression, doc.options().compress);
    profile.set_feature(Feature::Encrypted, doc.encryption().is_some());
    profile.set_feature(Feature::XMPMetaData, doc.xmp().present);
    profile.set_feature(
        Feature::InfoTitle,
        doc.info("Title").map_or(false, |t| !t.trim().is_empty()),
    );
    profile.set_feature(Feature::Language, doc.locale().is_some());
    let tagged = doc.is_tagged();
    profile.set_feature(Feature::TaggedPDF, tagged);
    for claim in &doc.xmp().claims {
        profile.add_claim(*claim);
    }

    let mut actions: Vec<&Action> = doc.actions().values().chain(doc.named_actions().values()).collect();
    let mut bookmarks = Vec::new();
    for b in doc.bookmarks() {
        b.walk(&mut bookmarks);
    }
    actions.extend(bookmarks.iter().filter_map(|b| b.action.as_ref()));
    actions.extend(doc.form().iter().flat_map(|(_, e)| e.actions.values()));
    record_actions(&mut profile, actions);
    if !doc.javascript().is_empty() {
        profile.set_feature(Feature::JavaScript, true);
    }

    let form = doc.form();
    profile.set_feature(Feature::XFAForm, form.has_xfa());
    profile.set_feature(Feature::AcroForm, !form.is_empty());
    profile.set_feature(
        Feature::FormFieldWithoutTooltip,
        form.iter()
            .any(|(_, e)| e.tooltip.as_deref().map_or(true, |t| t.trim().is_empty())),
    );
    profile.set_feature(Feature::DigitalSignature, !doc.signatures().is_empty());

    for file in doc.embedded_files().values() {
        record_file(&mut profile, file, FileOwner::Document);
    }
    profile.set_feature(Feature::OptionalContent, !doc.layers().is_empty());

    let intents = doc.output_intents();
    profile.set_feature(
        Feature::OutputIntentPDFA,
        intents.iter().any(|i| i.intent_type == GTS_PDFA1),
    );
    profile.set_feature(
        Feature::OutputIntentPDFX,
        intents.iter().any(|i| i.intent_type == GTS_PDFX),
    );
    profile.set_feature(Feature::HasMultipleOutputIntents, intents.len() > 1);
    profile.set_feature(
        Feature::OutputIntentsDiffer,
        intents
            .iter()
            .enumerate()
            .any(|(i, a)| intents[i + 1..].iter().any(|b| !a.same_destination(b))),
    );
    for intent in intents {
        if let Some(icc) = &intent.profile {
            profile.record_icc(icc);
        }
        profile.add_output_intent(intent.clone());
    }

    for (index, page) in doc.pages().iter().enumerate() {
        profile.absorb(inspect_page(page, index, tagged));
    }
    anchor(&mut profile, intents);

    log::debug!(
        "inspected {} pages: {} features set",
        doc.pages().len(),
        profile.features().len()
    );
    profile
}

/// Measure one page. `tagged` says whether the document as a whole is
/// tagged, which decides whether untagged content counts.
///
/// Unanchored device color features are not computed here; see
/// [`anchor`].
pub(crate) fn inspect_page(page: &Page, index: usize, tagged: bool) -> OutputProfile {
    let mut profile = OutputProfile::new(format!("Page {}", index + 1));

    let annotations = page.annotations();
    profile.set_feature(Feature::Annotations, !annotations.is_empty());
    for annot in annotations {
        if !annot.has_appearance && !matches!(annot.kind, AnnotationKind::Link) {
            profile.set_feature(Feature::AnnotationWithoutAppearance, true);
        }
        if annot.is_hidden() {
            profile.set_feature(Feature::AnnotationHidden, true);
        } else if !annot.is_printable() {
            profile.set_feature(Feature::AnnotationNotPrintable, true);
        }
        if !annot.is_widget() && annot.contents.as_deref().map_or(true, |c| c.trim().is_empty()) {
            profile.set_feature(Feature::AnnotationWithoutContents, true);
        }
        for color in annot.colors() {
            for space in color.spaces() {
                match space {
                    ColorSpace::DeviceRGB => profile.set_feature(Feature::AnnotationColorSpaceDeviceRGB, true),
                    ColorSpace::DeviceCMYK => profile.set_feature(Feature::AnnotationColorSpaceDeviceCMYK, true),
                    _ => {},
                }
            }
        }
        for file in annot.files() {
            record_file(&mut profile, file, FileOwner::Annotation(index));
        }
        record_actions(&mut profile, annot.actions.values());
    }

    let mut depth = 0usize;
    for op in page.content() {
        match op {
            ContentOp::BeginTag { .. } => depth += 1,
            ContentOp::EndTag => depth = depth.saturating_sub(1),
            ContentOp::Text { text, style, .. } => {
                profile.record_font(style.font.name(), style.font.is_embedded(), index);
                if !style.font.is_embedded() {
                    profile.set_feature(Feature::FontUnembedded, true);
                }
                if text.chars().any(lacks_unicode) {
                    profile.set_feature(Feature::TextWithoutUnicode, true);
                }
                record_style(&mut profile, style);
            },
            ContentOp::Rectangle { style, .. } | ContentOp::Line { style, .. } => {
                record_style(&mut profile, style);
            },
            ContentOp::Image { image, alpha, .. } => {
                record_space(&mut profile, &image.color_space);
                match image.filter {
                    ImageFilter::Lzw => profile.set_feature(Feature::ImageLZW, true),
                    ImageFilter::Jpx => profile.set_feature(Feature::ImageJPEG2000, true),
                    _ => {},
                }
                if *alpha < 1.0 || image.soft_mask {
                    profile.set_feature(Feature::Transparency, true);
                }
            },
            ContentOp::Save | ContentOp::Restore | ContentOp::BeginLayer(_) | ContentOp::EndLayer => {},
        }
        if tagged && depth == 0 && op.is_drawing() {
            profile.set_feature(Feature::UntaggedContent, true);
        }
    }
    profile
}

/// Set the unanchored device color features of a measured profile from
/// the output intents that would apply. DeviceRGB needs an RGB intent,
/// DeviceCMYK a CMYK intent, and DeviceGray any intent.
pub(crate) fn anchor(profile: &mut OutputProfile, intents: &[OutputIntent]) {
    let has = |model: ColorModel| intents.iter().any(|i| i.model() == Some(model));
    let rgb = profile.is_set(Feature::ColorSpaceDeviceRGB) && !has(ColorModel::Rgb);
    let cmyk = profile.is_set(Feature::ColorSpaceDeviceCMYK) && !has(ColorModel::Cmyk);
    let gray = profile.is_set(Feature::ColorSpaceDeviceGray) && intents.is_empty();
    profile.set_feature(Feature::UnanchoredDeviceRGB, rgb);
    profile.set_feature(Feature::UnanchoredDeviceCMYK, cmyk);
    profile.set_feature(Feature::UnanchoredDeviceGray, gray);
}

fn lacks_unicode(ch: char) -> bool {
    ('\u{E000}'..='\u{F8FF}').contains(&ch) || ch == '\u{FFFD}' || (ch.is_control() && ch != '\t')
}

fn record_actions<'a>(profile: &mut OutputProfile, actions: impl IntoIterator<Item = &'a Action>) {
    for action in actions {
        if action.is_javascript() {
            profile.set_feature(Feature::JavaScript, true);
        }
        if action.is_launch() {
            profile.set_feature(Feature::LaunchAction, true);
        }
    }
}

fn record_file(profile: &mut OutputProfile, file: &EmbeddedFile, owner: FileOwner) {
    profile.set_feature(Feature::EmbeddedFiles, true);
    if !file.is_pdf() {
        profile.set_feature(Feature::EmbeddedFileNotPDF, true);
    }
    if file.af_relationship.is_none() {
        profile.set_feature(Feature::AssociatedFileWithoutRelationship, true);
    }
    profile.record_file(AssociatedFileInfo {
        name: file.name.clone(),
        relationship: file.af_relationship,
        is_pdf: file.is_pdf(),
        owner,
    });
}

fn record_style(profile: &mut OutputProfile, style: &Style) {
    for paint in style.paints() {
        for color in paint.colors() {
            record_space(profile, &color.space);
        }
    }
    if style.overprint {
        profile.set_feature(Feature::Overprint, true);
    }
    if style.is_transparent() {
        profile.set_feature(Feature::Transparency, true);
    }
}

fn record_space(profile: &mut OutputProfile, space: &ColorSpace) {
    match space {
        ColorSpace::DeviceGray => profile.set_feature(Feature::ColorSpaceDeviceGray, true),
        ColorSpace::DeviceRGB => profile.set_feature(Feature::ColorSpaceDeviceRGB, true),
        ColorSpace::DeviceCMYK => profile.set_feature(Feature::ColorSpaceDeviceCMYK, true),
        ColorSpace::CalRGB { .. } => profile.set_feature(Feature::ColorSpaceCalibrated, true),
        ColorSpace::Lab { .. } => profile.set_feature(Feature::ColorSpaceLab, true),
        ColorSpace::IccBased(icc) => {
            profile.set_feature(Feature::ColorSpaceICC, true);
            if icc.version() >= 4 {
                profile.set_feature(Feature::ColorSpaceICCVersion4, true);
            }
            profile.record_icc(icc);
        },
        ColorSpace::Spot { name, fallback } | ColorSpace::Separation { name, fallback } => {
            profile.set_feature(Feature::ColorSpaceSeparation, true);
            profile.record_separation(name, fallback);
            record_space(profile, &fallback.space);
        },
        ColorSpace::DeviceN { colorants, process } => {
            profile.set_feature(Feature::ColorSpaceDeviceN, true);
            if **process == ColorSpace::DeviceCMYK {
                profile.set_feature(Feature::NChannelProcessDeviceCMYK, true);
            }
            for colorant in colorants {
                profile.record_separation(&colorant.name, &colorant.fallback);
                record_space(profile, &colorant.fallback.space);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color, Colorant, IccProfile};
    use crate::geometry::{PageSize, Rect};
    use crate::model::{Annotation, AnnotationFlags, EncryptionSettings, ImageRef, Locale};
    use indexmap::IndexMap;
    use std::sync::Arc;

    #[test]
    fn test_empty_document() {
        let doc = Document::new();
        let profile = inspect(&doc);
        assert!(profile.is_set(Feature::RegularCompression));
        assert!(!profile.is_set(Feature::Linearized));
        assert!(!profile.is_set(Feature::TaggedPDF));
        assert_eq!(profile.features().len(), 1);
    }

    #[test]
    fn test_inspection_is_repeatable() {
        let mut doc = Document::new();
        let page = doc.new_page(PageSize::A4);
        page.set_style(&Style::new().with_fill(Color::rgb(1.0, 0.0, 0.0)));
        page.draw_rectangle(0.0, 0.0, 10.0, 10.0);
        assert_eq!(inspect(&doc), inspect(&doc));
    }

    #[test]
    fn test_document_level_features() {
        let mut doc = Document::new();
        doc.set_encryption(Some(EncryptionSettings::new("secret")));
        doc.set_info("Title", Some("Report"));
        doc.set_locale(Some(Locale::new("en", Some("GB"))));
        doc.javascript_mut().insert("init".into(), "app.alert(1)".into());
        doc.embedded_files_mut()
            .insert("a.txt".into(), EmbeddedFile::new("a.txt", b"hello".to_vec()));
        let profile = inspect(&doc);
        for f in [
            Feature::Encrypted,
            Feature::InfoTitle,
            Feature::Language,
            Feature::JavaScript,
            Feature::EmbeddedFiles,
            Feature::EmbeddedFileNotPDF,
            Feature::AssociatedFileWithoutRelationship,
        ] {
            assert!(profile.is_set(f), "{}", f);
        }
        assert_eq!(profile.associated_files()[0].owner, FileOwner::Document);
    }

    #[test]
    fn test_unanchored_colors_follow_intents() {
        let mut doc = Document::new();
        let page = doc.new_page(PageSize::A4);
        page.set_style(&Style::new().with_fill(Color::rgb(0.0, 0.0, 1.0)));
        page.draw_rectangle(0.0, 0.0, 10.0, 10.0);
        let profile = inspect(&doc);
        assert!(profile.is_set(Feature::UnanchoredDeviceRGB));

        doc.output_intents_mut().push(OutputIntent::srgb(GTS_PDFA1));
        let profile = inspect(&doc);
        assert!(profile.is_set(Feature::ColorSpaceDeviceRGB));
        assert!(!profile.is_set(Feature::UnanchoredDeviceRGB));
        assert!(profile.is_set(Feature::OutputIntentPDFA));
    }

    #[test]
    fn test_named_inks_are_recorded() {
        let mut doc = Document::new();
        let page = doc.new_page(PageSize::A4);
        let cyan = Colorant {
            name: "Cyan".into(),
            fallback: Color::cmyk(1.0, 0.0, 0.0, 0.0),
        };
        let devn = Color::new(
            ColorSpace::DeviceN {
                colorants: vec![cyan],
                process: Box::new(ColorSpace::DeviceCMYK),
            },
            vec![0.5],
        )
        .unwrap();
        page.set_style(&Style::new().with_fill(devn));
        page.draw_rectangle(0.0, 0.0, 10.0, 10.0);
        let profile = inspect(&doc);
        assert!(profile.is_set(Feature::ColorSpaceDeviceN));
        assert!(profile.is_set(Feature::NChannelProcessDeviceCMYK));
        assert!(profile.separations().contains_key("Cyan"));
    }

    #[test]
    fn test_annotations() {
        let mut doc = Document::new();
        let page = doc.new_page(PageSize::A4);
        let mut hidden = Annotation::note(Rect::default(), "x");
        hidden.flags = AnnotationFlags::HIDDEN;
        page.add_annotation(hidden);
        let mut silent = Annotation::note(Rect::default(), "");
        silent.flags = AnnotationFlags::empty();
        silent.has_appearance = false;
        silent.color = Some(Color::cmyk(0.0, 1.0, 0.0, 0.0));
        page.add_annotation(silent);
        let profile = inspect(&doc);
        for f in [
            Feature::Annotations,
            Feature::AnnotationHidden,
            Feature::AnnotationNotPrintable,
            Feature::AnnotationWithoutContents,
            Feature::AnnotationWithoutAppearance,
            Feature::AnnotationColorSpaceDeviceCMYK,
        ] {
            assert!(profile.is_set(f), "{}", f);
        }
        assert!(!profile.is_set(Feature::ColorSpaceDeviceCMYK));
    }

    #[test]
    fn test_untagged_content_in_tagged_document() {
        let mut doc = Document::new();
        let page = doc.new_page(PageSize::A4);
        page.begin_tag("P", IndexMap::new());
        page.draw_text("tagged", 0.0, 0.0);
        page.end_tag().unwrap();
        let profile = inspect(&doc);
        assert!(profile.is_set(Feature::TaggedPDF));
        assert!(!profile.is_set(Feature::UntaggedContent));

        doc.pages_mut()[0].draw_text("loose", 0.0, 0.0);
        assert!(inspect(&doc).is_set(Feature::UntaggedContent));
    }

    #[test]
    fn test_images_and_icc() {
        let mut doc = Document::new();
        let v4 = Arc::new(IccProfile::new("Coated v4", ColorModel::Cmyk, 4));
        let image = ImageRef::new(1, 1, ColorSpace::IccBased(v4), ImageFilter::Jpx, vec![0; 4]);
        let page = doc.new_page(PageSize::A4);
        page.set_style(&Style::new().with_alpha(0.5));
        page.draw_image(&image, 0.0, 0.0, 10.0, 10.0);
        let profile = inspect(&doc);
        assert!(profile.is_set(Feature::ImageJPEG2000));
        assert!(profile.is_set(Feature::ColorSpaceICCVersion4));
        assert!(profile.is_set(Feature::Transparency));
        assert_eq!(profile.icc_profiles().len(), 1);
    }

    #[test]
    fn test_private_use_text() {
        let mut doc = Document::new();
        doc.new_page(PageSize::A4).draw_text("\u{E001}", 0.0, 0.0);
        let profile = inspect(&doc);
        assert!(profile.is_set(Feature::TextWithoutUnicode));
        assert_eq!(profile.fonts()[0].name, "Helvetica");
        assert!(!profile.fonts()[0].embedded);
    }
}
