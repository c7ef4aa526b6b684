//! Integration tests for output profiles, conversion and packages.

use pdf_folio::color::{Color, ColorDescription};
use pdf_folio::config::{ConversionConfig, ProfilerConfig};
use pdf_folio::geometry::{PageSize, Rect};
use pdf_folio::io::{render_file, PasswordHandler, Reader};
use pdf_folio::model::{Annotation, Document, EmbeddedFile, EncryptionSettings, FormElement};
use pdf_folio::profile::{
    inspect, verify, ConversionState, Feature, OutputProfile, PdfAConversion,
};
use pdf_folio::style::Style;
use pdf_folio::Error;
use tempfile::tempdir;

fn busy_document() -> Document {
    let mut doc = Document::new();
    doc.set_info("Title", Some("Busy"));
    doc.options_mut().linearize = true;
    doc.xmp_mut().present = true;

    let page = doc.new_page(PageSize::A4);
    page.set_style(&Style::new().with_fill(Color::cmyk(0.0, 1.0, 1.0, 0.0)));
    page.draw_rectangle(50.0, 50.0, 200.0, 120.0);
    page.set_style(&Style::new().with_fill(Color::spot("Gold", 0.8, Color::cmyk(0.0, 0.2, 0.8, 0.1))));
    page.draw_text("Golden", 72.0, 700.0);
    page.add_annotation(Annotation::note(Rect::new(10.0, 10.0, 20.0, 20.0), "check this"));

    doc.new_page(PageSize::Letter).draw_text("Second page", 72.0, 700.0);
    doc.javascript_mut().insert("init".into(), "app.alert('hi')".into());
    doc.embedded_files_mut()
        .insert("data.csv".into(), EmbeddedFile::new("data.csv", b"a,b\n1,2\n".to_vec()));
    doc.add_layer("Draft").visible(false);
    doc.form_mut().add_element("Name", FormElement::text()).unwrap();
    doc
}

#[test]
fn test_linearized_required_encrypted_denied() {
    let mut target = OutputProfile::new("Web");
    target.set_required(Feature::Linearized);
    target.set_denied(Feature::Encrypted);

    let mut measured = OutputProfile::new("measured");
    measured.set_feature(Feature::Linearized, true);
    assert_eq!(measured.is_compatible_with(&target), None);

    measured.set_feature(Feature::Encrypted, true);
    assert_eq!(measured.is_compatible_with(&target), Some(vec![Feature::Encrypted]));
}

#[test]
fn test_missing_requirement_is_the_only_mismatch() {
    let mut target = OutputProfile::new("Tagged");
    target.set_required(Feature::TaggedPDF);
    let measured = OutputProfile::new("measured");
    assert_eq!(measured.is_compatible_with(&target), Some(vec![Feature::TaggedPDF]));
}

#[test]
fn test_conflicting_merge_leaves_inputs_alone() {
    let mut a = OutputProfile::new("A");
    a.set_required(Feature::Transparency);
    let mut b = OutputProfile::new("B");
    b.set_denied(Feature::Transparency);
    b.set_required(Feature::XMPMetaData);
    let (a_before, b_before) = (a.clone(), b.clone());

    let err = a.merge(&b, None).unwrap_err();
    assert_eq!(err.feature(), Feature::Transparency);
    assert_eq!(a, a_before);
    assert_eq!(b, b_before);
}

#[test]
fn test_spot_with_lab_fallback_nests_description() {
    let color = Color::spot("PANTONE Reflex Blue C", 1.0, Color::lab(24.0, 18.0, -60.0));
    match color.describe() {
        ColorDescription::Spot { name, tint, fallback } => {
            assert_eq!(name, "PANTONE Reflex Blue C");
            assert_eq!(tint, 1.0);
            assert!(matches!(*fallback, ColorDescription::Lab { .. }));
        },
        other => panic!("unexpected {:?}", other),
    }
    let text = color.describe().to_string();
    assert!(text.starts_with("spot(\"PANTONE Reflex Blue C\"=1 lab("));
}

#[test]
fn test_profile_survives_package_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("busy.folio");

    let mut doc = busy_document();
    doc.set_encryption(Some(EncryptionSettings::new("pw")));
    render_file(&doc, &path).unwrap();

    let loaded = Reader::new()
        .with_decryption(PasswordHandler::new("pw"))
        .load_file(&path)
        .unwrap();
    let before = inspect(&doc);
    let after = inspect(&loaded);
    assert_eq!(after.features(), before.features());
    assert!(after.is_set(Feature::Linearized));
    assert!(after.is_set(Feature::Encrypted));
    assert!(after.is_set(Feature::JavaScript));
}

#[test]
fn test_wrong_password_fails_per_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("locked.folio");
    let mut doc = busy_document();
    doc.set_encryption(Some(EncryptionSettings::new("right")));
    render_file(&doc, &path).unwrap();

    let result = Reader::new().with_decryption(PasswordHandler::new("wrong")).load_file(&path);
    assert!(matches!(result, Err(Error::Load(_))));
}

#[test]
fn test_conversion_end_to_end() {
    let mut doc = Document::new();
    let page = doc.new_page(PageSize::A4);
    page.set_style(&Style::new().with_fill(Color::rgb(0.1, 0.4, 0.8)));
    page.draw_rectangle(50.0, 50.0, 200.0, 120.0);
    page.draw_text("Quarterly report", 72.0, 700.0);
    page.add_annotation(Annotation::note(Rect::new(10.0, 10.0, 20.0, 20.0), "check this"));
    doc.javascript_mut().insert("init".into(), "app.alert('hi')".into());

    let config = ConversionConfig::any_pdfa().with_profiler(ProfilerConfig::new().with_raster_dpi(18.0));
    let mut conversion = PdfAConversion::new(config);

    let state = conversion.run(&mut doc).unwrap();
    assert_eq!(state, ConversionState::FixedWithRasterization);
    let used = conversion.used_target().unwrap();
    assert!(used.is_pdfa());
    assert!(doc.javascript().is_empty());
    assert_eq!(verify(&doc, &used.profile()), None);

    let again = conversion.run(&mut doc);
    assert!(matches!(again, Err(Error::StateMisuse(_))));
}
