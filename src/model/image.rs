//! Raster images placed on pages.

use std::io::{Read, Write};
use std::sync::Arc;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::color::ColorSpace;
use crate::error::{Error, Result};

/// Compression of the stored image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFilter {
    /// Zlib/deflate
    Flate,
    /// Baseline JPEG
    Dct,
    /// JPEG 2000
    Jpx,
    /// LZW
    Lzw,
    /// JBIG2 bilevel
    Jbig2,
    /// CCITT fax
    CcittFax,
    /// Uncompressed samples
    Raw,
}

/// An image XObject: samples plus the color space they are expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bits per color component
    pub bits_per_component: u8,
    /// Color space of the samples
    pub color_space: ColorSpace,
    /// Compression of `data`
    pub filter: ImageFilter,
    /// Whether the image carries a soft mask
    pub soft_mask: bool,
    /// Alternate description
    pub alt_text: Option<String>,
    /// Encoded samples
    #[serde(with = "crate::io::base64_bytes")]
    pub data: Arc<Vec<u8>>,
}

impl ImageRef {
    /// Wrap already encoded data.
    pub fn new(
        width: u32,
        height: u32,
        color_space: ColorSpace,
        filter: ImageFilter,
        data: Vec<u8>,
    ) -> Self {
        Self {
            width,
            height,
            bits_per_component: 8,
            color_space,
            filter,
            soft_mask: false,
            alt_text: None,
            data: Arc::new(data),
        }
    }

    /// Deflate 8-bit RGB samples into a DeviceRGB image.
    pub fn from_rgb8(width: u32, height: u32, pixels: &[u8]) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(Error::Image(format!(
                "expected {} bytes of RGB samples for {}x{}, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(pixels)?;
        let data = encoder.finish()?;
        Ok(Self::new(width, height, ColorSpace::DeviceRGB, ImageFilter::Flate, data))
    }

    /// Decode a PNG file into a DeviceRGB image. An alpha channel becomes
    /// a soft mask.
    pub fn from_png(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .map_err(|e| Error::Image(format!("PNG decode failed: {}", e)))?;
        let has_alpha = decoded.color().has_alpha();
        let rgb = decoded.to_rgb8();
        let mut img = Self::from_rgb8(rgb.width(), rgb.height(), rgb.as_raw())?;
        img.soft_mask = has_alpha;
        Ok(img)
    }

    /// Set the alternate description.
    pub fn with_alt_text(mut self, alt: impl Into<String>) -> Self {
        self.alt_text = Some(alt.into());
        self
    }

    /// Decoded samples. Only Flate, LZW and raw data can be decoded.
    pub fn samples(&self) -> Result<Vec<u8>> {
        match self.filter {
            ImageFilter::Raw => Ok(self.data.as_ref().clone()),
            ImageFilter::Flate => {
                let mut out = Vec::new();
                ZlibDecoder::new(self.data.as_slice()).read_to_end(&mut out)?;
                Ok(out)
            },
            ImageFilter::Lzw => decode_lzw(&self.data),
            other => Err(Error::Image(format!("cannot decode {:?} image data", other))),
        }
    }

    /// Same image with new 8-bit samples in another space, Flate encoded.
    pub fn with_samples(&self, color_space: ColorSpace, samples: &[u8]) -> Result<Self> {
        let expected = self.width as usize * self.height as usize * color_space.num_components();
        if samples.len() != expected {
            return Err(Error::Image(format!(
                "expected {} bytes of samples, got {}",
                expected,
                samples.len()
            )));
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(samples)?;
        Ok(Self {
            bits_per_component: 8,
            color_space,
            filter: ImageFilter::Flate,
            data: Arc::new(encoder.finish()?),
            ..self.clone()
        })
    }

    /// Re-encode LZW data with Flate, leaving the samples unchanged.
    pub fn reencode_flate(&self) -> Result<Self> {
        let samples = self.samples()?;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&samples)?;
        Ok(Self {
            filter: ImageFilter::Flate,
            data: Arc::new(encoder.finish()?),
            ..self.clone()
        })
    }
}

/// PDF's default LZW variant switches code size one code early, like TIFF.
fn decode_lzw(input: &[u8]) -> Result<Vec<u8>> {
    use weezl::{decode::Decoder, BitOrder};

    match Decoder::with_tiff_size_switch(BitOrder::Msb, 8).decode(input) {
        Ok(out) => Ok(out),
        Err(first) => {
            log::debug!("early-change LZW decode failed ({:?}), retrying without", first);
            Decoder::new(BitOrder::Msb, 8)
                .decode(input)
                .map_err(|e| Error::Image(format!("LZW decode error: {:?}", e)))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgb8_checks_length() {
        assert!(ImageRef::from_rgb8(2, 2, &[0u8; 12]).is_ok());
        assert!(matches!(ImageRef::from_rgb8(2, 2, &[0u8; 11]), Err(Error::Image(_))));
    }

    #[test]
    fn test_from_png() {
        let mut png = Vec::new();
        let img = image::RgbImage::from_pixel(3, 2, image::Rgb([255, 0, 0]));
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let decoded = ImageRef::from_png(&png).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.filter, ImageFilter::Flate);
        assert!(!decoded.soft_mask);
        assert!(ImageRef::from_png(b"not a png").is_err());
    }

    #[test]
    fn test_lzw_reencoded_as_flate() {
        use weezl::{encode::Encoder, BitOrder};

        let pixels: Vec<u8> = (0..48).map(|i| (i * 5) as u8).collect();
        let lzw = Encoder::with_tiff_size_switch(BitOrder::Msb, 8)
            .encode(&pixels)
            .unwrap();
        let img = ImageRef::new(4, 4, ColorSpace::DeviceRGB, ImageFilter::Lzw, lzw);
        let flate = img.reencode_flate().unwrap();
        assert_eq!(flate.filter, ImageFilter::Flate);
        assert_eq!(flate.samples().unwrap(), pixels);
    }

    #[test]
    fn test_with_samples_checks_length() {
        let img = ImageRef::from_rgb8(1, 1, &[10, 20, 30]).unwrap();
        assert_eq!(img.samples().unwrap(), vec![10, 20, 30]);
        let cmyk = img.with_samples(ColorSpace::DeviceCMYK, &[0, 0, 0, 255]).unwrap();
        assert_eq!(cmyk.color_space, ColorSpace::DeviceCMYK);
        assert!(img.with_samples(ColorSpace::DeviceCMYK, &[0, 0, 0]).is_err());
        let jpx = ImageRef::new(1, 1, ColorSpace::DeviceRGB, ImageFilter::Jpx, vec![0]);
        assert!(jpx.samples().is_err());
    }
}
