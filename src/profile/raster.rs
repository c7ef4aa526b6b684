//! Flattening pages to images.
//!
//! Rasterization is the last resort of a repair: a page whose content
//! still has a denied feature after every other pass is replaced by an
//! image of itself.

use std::fmt;

use image::{Rgb, RgbImage};

use crate::color::Color;
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};
use crate::model::{ContentOp, ImageRef, Page};
use crate::style::{Paint, Style};

/// Turns a page into an image.
///
/// Implementations must be thread safe; pages may be rasterized in
/// parallel on the profiler's thread pool.
pub trait PageRasterizer: Send + Sync + fmt::Debug {
    /// Render the page's media box at `dpi` into a DeviceRGB image.
    fn rasterize(&self, page: &Page, dpi: f32) -> Result<ImageRef>;
}

/// Paints rectangles, lines and decodable images onto an RGB canvas.
/// Text is drawn as solid bars the height of its x-height.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorRasterizer;

impl VectorRasterizer {
    /// Create the rasterizer.
    pub fn new() -> Self {
        Self
    }
}

/// Maps page space onto the canvas, y down.
struct Canvas {
    img: RgbImage,
    scale: f32,
    origin: Point,
    height: f32,
}

impl Canvas {
    fn to_px(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.origin.x) * self.scale, (self.height - (y - self.origin.y)) * self.scale)
    }

    fn blend(&mut self, x: i64, y: i64, rgb: [f32; 3], alpha: f32) {
        if x < 0 || y < 0 || x >= i64::from(self.img.width()) || y >= i64::from(self.img.height()) {
            return;
        }
        let px = self.img.get_pixel_mut(x as u32, y as u32);
        for (dst, src) in px.0.iter_mut().zip(rgb.iter()) {
            let v = f32::from(*dst) * (1.0 - alpha) + src * 255.0 * alpha;
            *dst = v.round().clamp(0.0, 255.0) as u8;
        }
    }

    fn fill_rect(&mut self, rect: &Rect, rgb: [f32; 3], alpha: f32) {
        let (x0, y0) = self.to_px(rect.left(), rect.top());
        let (x1, y1) = self.to_px(rect.right(), rect.bottom());
        for y in y0.floor() as i64..y1.ceil() as i64 {
            for x in x0.floor() as i64..x1.ceil() as i64 {
                self.blend(x, y, rgb, alpha);
            }
        }
    }

    fn stroke_line(&mut self, from: Point, to: Point, width: f32, rgb: [f32; 3], alpha: f32) {
        let (x0, y0) = self.to_px(from.x, from.y);
        let (x1, y1) = self.to_px(to.x, to.y);
        let half = (width * self.scale / 2.0).max(0.5);
        let steps = ((x1 - x0).abs().max((y1 - y0).abs()).ceil() as usize).max(1);
        let mut last = None;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let (cx, cy) = (x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
            let key = (cx.round() as i64, cy.round() as i64);
            if last == Some(key) {
                continue;
            }
            last = Some(key);
            let r = half.ceil() as i64;
            for dy in -r..r.max(1) {
                for dx in -r..r.max(1) {
                    self.blend(key.0 + dx, key.1 + dy, rgb, alpha);
                }
            }
        }
    }

    fn draw_image(&mut self, rect: &Rect, image: &ImageRef, alpha: f32) {
        let samples = match (image.bits_per_component, image.samples()) {
            (8, Ok(s)) => s,
            _ => {
                log::debug!("{:?} image drawn as a placeholder", image.filter);
                self.fill_rect(rect, [0.5, 0.5, 0.5], alpha);
                return;
            },
        };
        let n = image.color_space.num_components().max(1);
        let mut color = Color {
            space: image.color_space.clone(),
            components: vec![0.0; n],
            alpha: 1.0,
        };
        let (x0, y0) = self.to_px(rect.left(), rect.top());
        let (x1, y1) = self.to_px(rect.right(), rect.bottom());
        let (w, h) = ((x1 - x0).max(1.0), (y1 - y0).max(1.0));
        for y in y0.floor() as i64..y1.ceil() as i64 {
            for x in x0.floor() as i64..x1.ceil() as i64 {
                let sx = (((x as f32 - x0) / w) * image.width as f32) as usize;
                let sy = (((y as f32 - y0) / h) * image.height as f32) as usize;
                let sx = sx.min(image.width.saturating_sub(1) as usize);
                let sy = sy.min(image.height.saturating_sub(1) as usize);
                let offset = (sy * image.width as usize + sx) * n;
                let Some(pixel) = samples.get(offset..offset + n) else {
                    continue;
                };
                for (c, v) in color.components.iter_mut().zip(pixel) {
                    *c = f32::from(*v) / 255.0;
                }
                self.blend(x, y, color.to_rgb(), alpha);
            }
        }
    }
}

fn paint_rgb(paint: &Paint) -> [f32; 3] {
    match paint {
        Paint::Color(c) => c.to_rgb(),
        Paint::Gradient { from, to, .. } => {
            let (a, b) = (from.to_rgb(), to.to_rgb());
            [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0, (a[2] + b[2]) / 2.0]
        },
        Paint::Pattern { colors, .. } => colors.first().map(|c| c.to_rgb()).unwrap_or([0.5; 3]),
    }
}

fn paint_alpha(style: &Style, paint: &Paint) -> f32 {
    let color_alpha = paint.colors().first().map_or(1.0, |c| c.alpha);
    style.alpha * color_alpha
}

impl PageRasterizer for VectorRasterizer {
    fn rasterize(&self, page: &Page, dpi: f32) -> Result<ImageRef> {
        let media = page.media_box();
        let scale = dpi / 72.0;
        let width = (media.width * scale).ceil().max(1.0) as u32;
        let height = (media.height * scale).ceil().max(1.0) as u32;
        let mut canvas = Canvas {
            img: RgbImage::from_pixel(width, height, Rgb([255, 255, 255])),
            scale,
            origin: Point::new(media.x, media.y),
            height: media.height,
        };

        for op in page.content() {
            match op {
                ContentOp::Rectangle { rect, style } => {
                    if let Some(fill) = &style.fill {
                        canvas.fill_rect(rect, paint_rgb(fill), paint_alpha(style, fill));
                    }
                    if let Some(stroke) = &style.stroke {
                        let (rgb, a) = (paint_rgb(stroke), paint_alpha(style, stroke));
                        let corners = [
                            Point::new(rect.left(), rect.bottom()),
                            Point::new(rect.right(), rect.bottom()),
                            Point::new(rect.right(), rect.top()),
                            Point::new(rect.left(), rect.top()),
                        ];
                        for i in 0..4 {
                            canvas.stroke_line(corners[i], corners[(i + 1) % 4], style.line_width, rgb, a);
                        }
                    }
                },
                ContentOp::Line { from, to, style } => {
                    if let Some(paint) = style.stroke.as_ref().or(style.fill.as_ref()) {
                        canvas.stroke_line(*from, *to, style.line_width, paint_rgb(paint), paint_alpha(style, paint));
                    }
                },
                ContentOp::Text { x, y, text, style } => {
                    if let Some(fill) = &style.fill {
                        let bar = Rect::new(*x, *y, style.text_width(text), style.font_size * 0.5);
                        canvas.fill_rect(&bar, paint_rgb(fill), paint_alpha(style, fill) * 0.6);
                    }
                },
                ContentOp::Image { rect, image, alpha } => canvas.draw_image(rect, image, *alpha),
                _ => {},
            }
        }

        let img = canvas.img;
        ImageRef::from_rgb8(img.width(), img.height(), img.as_raw())
            .map_err(|e| Error::Conversion(format!("rasterizing page {}: {}", page.id(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageSize;

    #[test]
    fn test_rasterizes_media_box() {
        let mut page = Page::new(PageSize::Custom(72.0, 144.0));
        page.set_style(&Style::new().with_fill(Color::rgb(1.0, 0.0, 0.0)));
        page.draw_rectangle(0.0, 0.0, 36.0, 72.0);
        let image = VectorRasterizer::new().rasterize(&page, 72.0).unwrap();
        assert_eq!((image.width, image.height), (72, 144));

        let samples = image.samples().unwrap();
        let at = |x: usize, y: usize| {
            let i = (y * 72 + x) * 3;
            [samples[i], samples[i + 1], samples[i + 2]]
        };
        // Bottom left quarter is red, top right stays white.
        assert_eq!(at(10, 130), [255, 0, 0]);
        assert_eq!(at(60, 10), [255, 255, 255]);
    }

    #[test]
    fn test_undecodable_images_are_placeholders() {
        let mut page = Page::new(PageSize::Custom(10.0, 10.0));
        let jpeg = ImageRef::new(4, 4, crate::color::ColorSpace::DeviceRGB, crate::model::ImageFilter::Dct, vec![0xFF, 0xD8]);
        page.draw_image(&jpeg, 0.0, 0.0, 10.0, 10.0);
        let image = VectorRasterizer::new().rasterize(&page, 72.0).unwrap();
        assert_eq!(&image.samples().unwrap()[..3], &[128, 128, 128]);
    }
}
