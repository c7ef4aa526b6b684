//! Rewriting colors a target does not accept.
//!
//! A [`ColorAction`] converts colors into the model of the document's
//! output intent, or into an ICC based space from its pool when device
//! colors are not acceptable either. Named inks keep their names where
//! the target allows them and only their fallbacks are converted.

use std::sync::Arc;

use super::feature::Feature;
use super::intent::{OutputIntent, GTS_PDFA1};
use super::output_profile::OutputProfile;
use crate::color::{Color, ColorModel, ColorSpace, Colorant, IccProfile};
use crate::error::Result;
use crate::model::{ContentOp, Document, ImageRef, Page};

/// Converts colors into spaces the target accepts.
#[derive(Debug, Clone, Default)]
pub struct ColorAction {
    pool: Vec<Arc<IccProfile>>,
}

/// What the target accepts, given the document's output intents.
struct Acceptance<'a> {
    target: &'a OutputProfile,
    intent_model: Option<ColorModel>,
    rgb_anchored: bool,
    cmyk_anchored: bool,
    has_intent: bool,
}

impl<'a> Acceptance<'a> {
    fn new(target: &'a OutputProfile, intents: &[OutputIntent]) -> Self {
        let primary = intents
            .iter()
            .find(|i| i.intent_type == GTS_PDFA1)
            .or_else(|| intents.first());
        Self {
            target,
            intent_model: primary.and_then(|i| i.model()),
            rgb_anchored: intents.iter().any(|i| i.model() == Some(ColorModel::Rgb)),
            cmyk_anchored: intents.iter().any(|i| i.model() == Some(ColorModel::Cmyk)),
            has_intent: !intents.is_empty(),
        }
    }

    fn denied(&self, feature: Feature) -> bool {
        self.target.is_denied(feature)
    }

    /// Whether the space itself, ignoring named ink fallbacks, is accepted.
    fn accepts(&self, space: &ColorSpace) -> bool {
        match space {
            ColorSpace::DeviceGray => {
                !self.denied(Feature::ColorSpaceDeviceGray)
                    && (self.has_intent || !self.denied(Feature::UnanchoredDeviceGray))
            },
            ColorSpace::DeviceRGB => {
                !self.denied(Feature::ColorSpaceDeviceRGB)
                    && (self.rgb_anchored || !self.denied(Feature::UnanchoredDeviceRGB))
            },
            ColorSpace::DeviceCMYK => {
                !self.denied(Feature::ColorSpaceDeviceCMYK)
                    && (self.cmyk_anchored || !self.denied(Feature::UnanchoredDeviceCMYK))
            },
            ColorSpace::CalRGB { .. } => !self.denied(Feature::ColorSpaceCalibrated),
            ColorSpace::Lab { .. } => !self.denied(Feature::ColorSpaceLab),
            ColorSpace::IccBased(icc) => self.accepts_icc(icc),
            ColorSpace::Spot { .. } | ColorSpace::Separation { .. } => {
                !self.denied(Feature::ColorSpaceSeparation)
            },
            ColorSpace::DeviceN { process, .. } => {
                !self.denied(Feature::ColorSpaceDeviceN)
                    && !(**process == ColorSpace::DeviceCMYK && self.denied(Feature::NChannelProcessDeviceCMYK))
            },
        }
    }

    fn accepts_icc(&self, icc: &IccProfile) -> bool {
        !self.denied(Feature::ColorSpaceICC)
            && !(icc.version() >= 4 && self.denied(Feature::ColorSpaceICCVersion4))
    }
}

impl ColorAction {
    /// Create an action that may convert into any of `pool`.
    pub fn new(pool: impl IntoIterator<Item = Arc<IccProfile>>) -> Self {
        let mut action = Self { pool: Vec::new() };
        for profile in pool {
            if !action.pool.iter().any(|p| p.as_ref() == profile.as_ref()) {
                action.pool.push(profile);
            }
        }
        action
    }

    /// First RGB profile of the pool.
    pub fn device_rgb(&self) -> Option<&Arc<IccProfile>> {
        self.pool.iter().find(|p| p.model() == ColorModel::Rgb)
    }

    /// First CMYK profile of the pool.
    pub fn device_cmyk(&self) -> Option<&Arc<IccProfile>> {
        self.pool.iter().find(|p| p.model() == ColorModel::Cmyk)
    }

    /// Space unacceptable colors are converted into: the device space of
    /// the intent model if accepted, else a pool profile.
    fn destination(&self, accept: &Acceptance<'_>) -> Option<ColorSpace> {
        let device = match accept.intent_model {
            Some(ColorModel::Gray) => Some(ColorSpace::DeviceGray),
            Some(ColorModel::Rgb) => Some(ColorSpace::DeviceRGB),
            Some(ColorModel::Cmyk) => Some(ColorSpace::DeviceCMYK),
            Some(ColorModel::Lab) | None => None,
        };
        if let Some(space) = device.filter(|s| accept.accepts(s)) {
            return Some(space);
        }
        let preferred = accept.intent_model.unwrap_or(ColorModel::Rgb);
        let usable = |p: &&Arc<IccProfile>| accept.accepts_icc(p) && p.model() != ColorModel::Lab;
        self.pool
            .iter()
            .filter(usable)
            .find(|p| p.model() == preferred)
            .or_else(|| self.pool.iter().find(usable))
            .map(|p| ColorSpace::IccBased(Arc::clone(p)))
    }

    /// Convert a color in place. Returns whether it changed; colors that
    /// cannot be converted are left as they are.
    fn fix_color(&self, color: &mut Color, accept: &Acceptance<'_>) -> bool {
        if accept.accepts(&color.space) {
            return match &mut color.space {
                ColorSpace::Spot { fallback, .. } | ColorSpace::Separation { fallback, .. } => {
                    self.fix_color(fallback, accept)
                },
                ColorSpace::DeviceN { colorants, .. } => {
                    let mut changed = false;
                    for Colorant { fallback, .. } in colorants.iter_mut() {
                        changed |= self.fix_color(fallback, accept);
                    }
                    changed
                },
                _ => false,
            };
        }
        match self.destination(accept) {
            Some(space) => {
                let components = convert_components(color, space.model());
                *color = Color {
                    space,
                    components,
                    alpha: color.alpha,
                };
                true
            },
            None => false,
        }
    }

    /// Convert an image's samples. Returns `Ok(None)` when the image is
    /// already acceptable or cannot be converted.
    fn fix_image(&self, image: &ImageRef, accept: &Acceptance<'_>) -> Result<Option<ImageRef>> {
        let mut sample = match Color::new(image.color_space.clone(), vec![0.0; image.color_space.num_components()]) {
            Ok(c) => c,
            Err(_) => return Ok(None),
        };
        if !self.fix_color(&mut sample, accept) {
            return Ok(None);
        }
        if accept.accepts(&image.color_space) {
            // Only a named ink's fallback changed; the tints stay.
            let mut fixed = image.clone();
            fixed.color_space = sample.space;
            return Ok(Some(fixed));
        }
        if image.bits_per_component != 8 {
            log::warn!("cannot convert {} bit image samples", image.bits_per_component);
            return Ok(None);
        }
        let samples = match image.samples() {
            Ok(s) => s,
            Err(e) => {
                log::warn!("image colors not converted: {}", e);
                return Ok(None);
            },
        };
        let space = sample.space;
        let model = space.model();
        let n = image.color_space.num_components();
        let mut source = Color {
            space: image.color_space.clone(),
            components: vec![0.0; n],
            alpha: 1.0,
        };
        let mut out = Vec::with_capacity(samples.len() / n.max(1) * model.components());
        for pixel in samples.chunks_exact(n.max(1)) {
            for (c, v) in source.components.iter_mut().zip(pixel) {
                *c = f32::from(*v) / 255.0;
            }
            for v in convert_components(&source, model) {
                out.push((v.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }
        image.with_samples(space, &out).map(Some)
    }

    /// Rewrite every unacceptable color of one page: content styles,
    /// images and, when their features are denied, annotation colors.
    pub(crate) fn fix_page(&self, page: &mut Page, target: &OutputProfile, intents: &[OutputIntent]) -> Result<usize> {
        let accept = Acceptance::new(target, intents);
        let mut changed = 0;
        for op in page.content_mut().iter_mut() {
            match op {
                ContentOp::Image { image, .. } => {
                    if let Some(fixed) = self.fix_image(image, &accept)? {
                        *image = fixed;
                        changed += 1;
                    }
                },
                _ => {
                    if let Some(style) = op.style_mut() {
                        for paint in style.paints_mut() {
                            for color in paint.colors_mut() {
                                if self.fix_color(color, &accept) {
                                    changed += 1;
                                }
                            }
                        }
                    }
                },
            }
        }

        let rgb_denied = target.is_denied(Feature::AnnotationColorSpaceDeviceRGB);
        let cmyk_denied = target.is_denied(Feature::AnnotationColorSpaceDeviceCMYK);
        if rgb_denied || cmyk_denied {
            for annot in page.annotations_mut() {
                for color in annot.colors_mut() {
                    let model = match color.space {
                        ColorSpace::DeviceRGB if rgb_denied => ColorModel::Cmyk,
                        ColorSpace::DeviceCMYK if cmyk_denied => ColorModel::Rgb,
                        _ => continue,
                    };
                    let space = match model {
                        ColorModel::Cmyk => ColorSpace::DeviceCMYK,
                        _ => ColorSpace::DeviceRGB,
                    };
                    color.components = convert_components(color, model);
                    color.space = space;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    /// Rewrite every page of a document against `target`, using the
    /// document's own output intents to decide what is anchored.
    pub fn apply(&self, doc: &mut Document, target: &OutputProfile) -> Result<usize> {
        let intents = doc.output_intents().to_vec();
        let mut changed = 0;
        for page in doc.pages_mut() {
            changed += self.fix_page(page, target, &intents)?;
        }
        log::debug!("remapped {} colors", changed);
        Ok(changed)
    }
}

fn convert_components(color: &Color, model: ColorModel) -> Vec<f32> {
    match model {
        ColorModel::Gray => vec![color.to_gray_value()],
        ColorModel::Rgb => color.to_rgb().to_vec(),
        ColorModel::Cmyk => color.to_cmyk_values().to_vec(),
        // Lab destinations are never chosen.
        ColorModel::Lab => color.to_rgb().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PageSize, Rect};
    use crate::model::{Annotation, ImageFilter};
    use crate::profile::StandardProfile;
    use crate::style::{Paint, Style};

    fn fill(page: &Page) -> Color {
        match page.content()[0].style().and_then(|s| s.fill.clone()) {
            Some(Paint::Color(c)) => c,
            other => panic!("unexpected {:?}", other),
        }
    }

    fn fogra() -> Arc<IccProfile> {
        Arc::new(IccProfile::new("Coated FOGRA39", ColorModel::Cmyk, 2))
    }

    #[test]
    fn test_rgb_converted_to_cmyk_intent() {
        let mut doc = Document::new();
        doc.output_intents_mut().push(OutputIntent::new(GTS_PDFA1, fogra()));
        let page = doc.new_page(PageSize::A4);
        page.set_style(&Style::new().with_fill(Color::rgb(1.0, 0.0, 0.0)));
        page.draw_rectangle(0.0, 0.0, 10.0, 10.0);

        let target = StandardProfile::PdfA2b.profile();
        let changed = ColorAction::new(vec![]).apply(&mut doc, &target).unwrap();
        assert_eq!(changed, 1);
        let c = fill(&doc.pages()[0]);
        assert_eq!(c.space, ColorSpace::DeviceCMYK);
        assert!((c.components[1] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_anchored_color_untouched() {
        let mut doc = Document::new();
        doc.output_intents_mut().push(OutputIntent::srgb(GTS_PDFA1));
        let page = doc.new_page(PageSize::A4);
        page.set_style(&Style::new().with_fill(Color::rgb(0.2, 0.4, 0.6)));
        page.draw_rectangle(0.0, 0.0, 10.0, 10.0);
        let target = StandardProfile::PdfA2b.profile();
        assert_eq!(ColorAction::new(vec![]).apply(&mut doc, &target).unwrap(), 0);
    }

    #[test]
    fn test_spot_keeps_name_and_converts_fallback() {
        let mut doc = Document::new();
        doc.output_intents_mut().push(OutputIntent::new(GTS_PDFA1, fogra()));
        let page = doc.new_page(PageSize::A4);
        let spot = Color::spot("PANTONE 300 C", 0.8, Color::rgb(0.0, 0.4, 0.7));
        page.set_style(&Style::new().with_fill(spot));
        page.draw_rectangle(0.0, 0.0, 10.0, 10.0);
        ColorAction::new(vec![])
            .apply(&mut doc, &StandardProfile::PdfA2b.profile())
            .unwrap();
        match fill(&doc.pages()[0]).space {
            ColorSpace::Spot { name, fallback } => {
                assert_eq!(name, "PANTONE 300 C");
                assert_eq!(fallback.space, ColorSpace::DeviceCMYK);
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_pool_used_when_device_denied() {
        let mut target = OutputProfile::new("no device");
        target.set_denied(Feature::ColorSpaceDeviceRGB);
        let mut doc = Document::new();
        let page = doc.new_page(PageSize::A4);
        page.set_style(&Style::new().with_fill(Color::rgb(0.0, 1.0, 0.0)));
        page.draw_line(0.0, 0.0, 10.0, 10.0);
        let srgb = Arc::new(IccProfile::srgb());
        let action = ColorAction::new(vec![Arc::clone(&srgb), fogra()]);
        assert!(action.device_rgb().is_some() && action.device_cmyk().is_some());
        action.apply(&mut doc, &target).unwrap();
        assert_eq!(fill(&doc.pages()[0]).space, ColorSpace::IccBased(srgb));
    }

    #[test]
    fn test_image_samples_converted() {
        let mut doc = Document::new();
        doc.output_intents_mut().push(OutputIntent::new(GTS_PDFA1, fogra()));
        let image = ImageRef::from_rgb8(2, 1, &[255, 255, 255, 0, 0, 0]).unwrap();
        doc.new_page(PageSize::A4).draw_image(&image, 0.0, 0.0, 2.0, 1.0);
        ColorAction::new(vec![])
            .apply(&mut doc, &StandardProfile::PdfA1b.profile())
            .unwrap();
        match &doc.pages()[0].content()[0] {
            ContentOp::Image { image, .. } => {
                assert_eq!(image.color_space, ColorSpace::DeviceCMYK);
                assert_eq!(image.filter, ImageFilter::Flate);
                assert_eq!(image.samples().unwrap(), vec![0, 0, 0, 0, 0, 0, 0, 255]);
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_annotation_colors_only_when_denied() {
        let mut doc = Document::new();
        let page = doc.new_page(PageSize::A4);
        let mut note = Annotation::note(Rect::default(), "x");
        note.color = Some(Color::rgb(1.0, 1.0, 0.0));
        page.add_annotation(note);
        let action = ColorAction::new(vec![]);
        assert_eq!(action.apply(&mut doc, &OutputProfile::new("none")).unwrap(), 0);

        let mut target = OutputProfile::new("cmyk annotations");
        target.set_denied(Feature::AnnotationColorSpaceDeviceRGB);
        assert_eq!(action.apply(&mut doc, &target).unwrap(), 1);
        let color = doc.pages()[0].annotations()[0].color.clone().unwrap();
        assert_eq!(color.space, ColorSpace::DeviceCMYK);
    }
}
