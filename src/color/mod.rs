//! Color spaces and color values.
//!
//! [`ColorSpace`] is a closed set of variants; everything that needs to
//! treat colors differently per family matches on it exhaustively. A
//! [`Color`] pairs a space with its components and an alpha value.

mod describe;
mod icc;

pub use describe::ColorDescription;
pub use icc::{ColorModel, IccProfile};

#[cfg(test)]
pub(crate) use icc::tests::synthetic_profile;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// D50 reference white, used by Lab spaces unless told otherwise.
pub const D50: [f32; 3] = [0.9642, 1.0, 0.8249];

/// One named ink of a DeviceN space together with its appearance at full tint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colorant {
    /// Ink name, e.g. "Cyan" or "PANTONE 123 C"
    pub name: String,
    /// Appearance of the ink at tint 1.0
    pub fallback: Color,
}

/// A color space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColorSpace {
    /// Device gray
    DeviceGray,
    /// Device RGB
    DeviceRGB,
    /// Device CMYK
    DeviceCMYK,
    /// Calibrated RGB
    CalRGB {
        /// Reference white
        white_point: [f32; 3],
        /// Per-channel gamma
        gamma: [f32; 3],
    },
    /// CIE L*a*b*
    Lab {
        /// Reference white
        white_point: [f32; 3],
    },
    /// ICC based
    IccBased(Arc<IccProfile>),
    /// Spot ink with a single tint component
    Spot {
        /// Ink name
        name: String,
        /// Color at full tint in another space
        fallback: Box<Color>,
    },
    /// Separation with a single tint component
    Separation {
        /// Colorant name
        name: String,
        /// Color at full tint in another space
        fallback: Box<Color>,
    },
    /// Multiple named inks
    DeviceN {
        /// Colorants in component order
        colorants: Vec<Colorant>,
        /// Process space the colorants are expressed in
        process: Box<ColorSpace>,
    },
}

impl ColorSpace {
    /// Standard Lab space with D50 white.
    pub fn lab() -> Self {
        ColorSpace::Lab { white_point: D50 }
    }

    /// Number of components a color in this space carries.
    pub fn num_components(&self) -> usize {
        match self {
            ColorSpace::DeviceGray => 1,
            ColorSpace::DeviceRGB | ColorSpace::CalRGB { .. } | ColorSpace::Lab { .. } => 3,
            ColorSpace::DeviceCMYK => 4,
            ColorSpace::IccBased(icc) => icc.components(),
            ColorSpace::Spot { .. } | ColorSpace::Separation { .. } => 1,
            ColorSpace::DeviceN { colorants, .. } => colorants.len(),
        }
    }

    /// Model the components are expressed in. Named inks report their
    /// fallback's model.
    pub fn model(&self) -> ColorModel {
        match self {
            ColorSpace::DeviceGray => ColorModel::Gray,
            ColorSpace::DeviceRGB | ColorSpace::CalRGB { .. } => ColorModel::Rgb,
            ColorSpace::DeviceCMYK => ColorModel::Cmyk,
            ColorSpace::Lab { .. } => ColorModel::Lab,
            ColorSpace::IccBased(icc) => icc.model(),
            ColorSpace::Spot { fallback, .. } | ColorSpace::Separation { fallback, .. } => {
                fallback.space.model()
            },
            ColorSpace::DeviceN { process, .. } => process.model(),
        }
    }

    /// Device dependent spaces need an output intent to be reproducible.
    pub fn is_device(&self) -> bool {
        matches!(
            self,
            ColorSpace::DeviceGray | ColorSpace::DeviceRGB | ColorSpace::DeviceCMYK
        )
    }

    /// Names of all inks referenced by this space.
    pub fn separation_names(&self) -> Vec<String> {
        match self {
            ColorSpace::Spot { name, .. } | ColorSpace::Separation { name, .. } => vec![name.clone()],
            ColorSpace::DeviceN { colorants, .. } => colorants.iter().map(|c| c.name.clone()).collect(),
            _ => Vec::new(),
        }
    }
}

/// A color value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Space the components are interpreted in
    pub space: ColorSpace,
    /// Components, one per channel of the space
    pub components: Vec<f32>,
    /// Opacity, 1.0 is opaque
    pub alpha: f32,
}

impl Color {
    /// Create a color, checking the component count.
    pub fn new(space: ColorSpace, components: Vec<f32>) -> Result<Self> {
        if components.len() != space.num_components() {
            return Err(Error::InvalidArgument(format!(
                "color space expects {} components, got {}",
                space.num_components(),
                components.len()
            )));
        }
        Ok(Self {
            space,
            components,
            alpha: 1.0,
        })
    }

    /// Device gray color.
    pub fn gray(value: f32) -> Self {
        Self::raw(ColorSpace::DeviceGray, vec![value])
    }

    /// Device RGB color with components in 0..=1.
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::raw(ColorSpace::DeviceRGB, vec![r, g, b])
    }

    /// Device CMYK color.
    pub fn cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self::raw(ColorSpace::DeviceCMYK, vec![c, m, y, k])
    }

    /// D50 Lab color.
    pub fn lab(l: f32, a: f32, b: f32) -> Self {
        Self::raw(ColorSpace::lab(), vec![l, a, b])
    }

    /// Color in an ICC based space.
    pub fn icc(profile: Arc<IccProfile>, components: Vec<f32>) -> Result<Self> {
        Self::new(ColorSpace::IccBased(profile), components)
    }

    /// Named spot ink at the given tint.
    pub fn spot(name: impl Into<String>, tint: f32, fallback: Color) -> Self {
        Self::raw(
            ColorSpace::Spot {
                name: name.into(),
                fallback: Box::new(fallback),
            },
            vec![tint],
        )
    }

    /// Separation colorant at the given tint.
    pub fn separation(name: impl Into<String>, tint: f32, fallback: Color) -> Self {
        Self::raw(
            ColorSpace::Separation {
                name: name.into(),
                fallback: Box::new(fallback),
            },
            vec![tint],
        )
    }

    /// Opaque black.
    pub fn black() -> Self {
        Self::gray(0.0)
    }

    /// Opaque white.
    pub fn white() -> Self {
        Self::gray(1.0)
    }

    fn raw(space: ColorSpace, components: Vec<f32>) -> Self {
        Self {
            space,
            components,
            alpha: 1.0,
        }
    }

    /// Same color with a different alpha.
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    fn component(&self, i: usize) -> f32 {
        self.components.get(i).copied().unwrap_or(0.0)
    }

    /// Approximate sRGB value with components in 0..=1.
    pub fn to_rgb(&self) -> [f32; 3] {
        let rgb = match &self.space {
            ColorSpace::DeviceGray => {
                let g = self.component(0);
                [g, g, g]
            },
            ColorSpace::DeviceRGB | ColorSpace::CalRGB { .. } => {
                [self.component(0), self.component(1), self.component(2)]
            },
            ColorSpace::DeviceCMYK => cmyk_to_rgb([
                self.component(0),
                self.component(1),
                self.component(2),
                self.component(3),
            ]),
            ColorSpace::Lab { white_point } => {
                lab_to_rgb([self.component(0), self.component(1), self.component(2)], *white_point)
            },
            ColorSpace::IccBased(icc) => match icc.model() {
                ColorModel::Gray => {
                    let g = self.component(0);
                    [g, g, g]
                },
                ColorModel::Rgb => [self.component(0), self.component(1), self.component(2)],
                ColorModel::Cmyk => cmyk_to_rgb([
                    self.component(0),
                    self.component(1),
                    self.component(2),
                    self.component(3),
                ]),
                ColorModel::Lab => {
                    lab_to_rgb([self.component(0), self.component(1), self.component(2)], D50)
                },
            },
            ColorSpace::Spot { fallback, .. } | ColorSpace::Separation { fallback, .. } => {
                let tint = self.component(0);
                let full = fallback.to_rgb();
                [
                    1.0 - tint * (1.0 - full[0]),
                    1.0 - tint * (1.0 - full[1]),
                    1.0 - tint * (1.0 - full[2]),
                ]
            },
            ColorSpace::DeviceN { colorants, .. } => {
                let mut ink = [0.0f32; 4];
                for (i, colorant) in colorants.iter().enumerate() {
                    let tint = self.component(i);
                    let full = colorant.fallback.to_cmyk_values();
                    for (acc, v) in ink.iter_mut().zip(full.iter()) {
                        *acc += tint * v;
                    }
                }
                cmyk_to_rgb(ink.map(|v| v.clamp(0.0, 1.0)))
            },
        };
        rgb.map(|v| v.clamp(0.0, 1.0))
    }

    /// Approximate CMYK values.
    pub fn to_cmyk_values(&self) -> [f32; 4] {
        match &self.space {
            ColorSpace::DeviceCMYK => [
                self.component(0),
                self.component(1),
                self.component(2),
                self.component(3),
            ],
            ColorSpace::IccBased(icc) if icc.model() == ColorModel::Cmyk => [
                self.component(0),
                self.component(1),
                self.component(2),
                self.component(3),
            ],
            _ => rgb_to_cmyk(self.to_rgb()),
        }
    }

    /// Approximate gray level.
    pub fn to_gray_value(&self) -> f32 {
        match &self.space {
            ColorSpace::DeviceGray => self.component(0),
            _ => {
                let [r, g, b] = self.to_rgb();
                (0.3 * r + 0.59 * g + 0.11 * b).clamp(0.0, 1.0)
            },
        }
    }

    /// Every space this color refers to, including fallbacks, depth first.
    pub fn spaces(&self) -> Vec<&ColorSpace> {
        let mut out = vec![&self.space];
        match &self.space {
            ColorSpace::Spot { fallback, .. } | ColorSpace::Separation { fallback, .. } => {
                out.extend(fallback.spaces());
            },
            ColorSpace::DeviceN { colorants, process } => {
                out.push(process);
                for c in colorants {
                    out.extend(c.fallback.spaces());
                }
            },
            _ => {},
        }
        out
    }

    /// Structured description of this color.
    pub fn describe(&self) -> ColorDescription {
        ColorDescription::of(self)
    }
}

/// Naive CMYK to RGB.
pub fn cmyk_to_rgb([c, m, y, k]: [f32; 4]) -> [f32; 3] {
    [(1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k)]
}

/// Naive RGB to CMYK with full black generation.
pub fn rgb_to_cmyk([r, g, b]: [f32; 3]) -> [f32; 4] {
    let k = 1.0 - r.max(g).max(b);
    if k >= 1.0 {
        return [0.0, 0.0, 0.0, 1.0];
    }
    let d = 1.0 - k;
    [(1.0 - r - k) / d, (1.0 - g - k) / d, (1.0 - b - k) / d, k]
}

/// Lab to sRGB through XYZ.
pub fn lab_to_rgb([l, a, b]: [f32; 3], white: [f32; 3]) -> [f32; 3] {
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    let finv = |t: f32| {
        if t > 6.0 / 29.0 {
            t * t * t
        } else {
            3.0 * (6.0f32 / 29.0).powi(2) * (t - 4.0 / 29.0)
        }
    };
    let x = white[0] * finv(fx);
    let y = white[1] * finv(fy);
    let z = white[2] * finv(fz);
    let lin = [
        3.1338561 * x - 1.6168667 * y - 0.4906146 * z,
        -0.9787684 * x + 1.9161415 * y + 0.0334540 * z,
        0.0719453 * x - 0.2289914 * y + 1.4052427 * z,
    ];
    lin.map(|v| {
        let v = v.clamp(0.0, 1.0);
        if v <= 0.0031308 {
            12.92 * v
        } else {
            1.055 * v.powf(1.0 / 2.4) - 0.055
        }
    })
}
