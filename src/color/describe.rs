//! Canonical, structured descriptions of colors.
//!
//! The `Display` form is the compact text used in reports, e.g.
//! `rgb(255 0 0)`, `cmyk(1 0.73 0 0.02)` or
//! `spot("PANTONE Reflex Blue C"=1 lab(26.18 18.64 -59.95))`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Color, ColorSpace};

/// Structured description of a [`Color`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColorDescription {
    /// Device gray
    Gray {
        /// Gray level
        value: f32,
    },
    /// Device RGB, components scaled to 0..=255
    Rgb {
        /// Red, green, blue
        values: [u8; 3],
    },
    /// Device CMYK
    Cmyk {
        /// Cyan, magenta, yellow, black
        values: [f32; 4],
    },
    /// Calibrated RGB
    CalRgb {
        /// Red, green, blue
        values: [f32; 3],
    },
    /// L*a*b*
    Lab {
        /// L*, a*, b*
        values: [f32; 3],
    },
    /// ICC based
    Icc {
        /// Profile description
        profile: String,
        /// Components
        values: Vec<f32>,
    },
    /// Spot ink
    Spot {
        /// Ink name
        name: String,
        /// Tint
        tint: f32,
        /// Description of the fallback at full tint
        fallback: Box<ColorDescription>,
    },
    /// Separation colorant
    Separation {
        /// Colorant name
        name: String,
        /// Tint
        tint: f32,
        /// Description of the fallback at full tint
        fallback: Box<ColorDescription>,
    },
    /// DeviceN inks
    DeviceN {
        /// Ink names and tints in component order
        inks: Vec<(String, f32)>,
    },
    /// Any of the above with non-opaque alpha
    Translucent {
        /// Opaque description
        color: Box<ColorDescription>,
        /// Alpha value
        alpha: f32,
    },
}

impl ColorDescription {
    /// Describe a color.
    pub fn of(color: &Color) -> Self {
        let c = &color.components;
        let at = |i: usize| c.get(i).copied().unwrap_or(0.0);
        let opaque = match &color.space {
            ColorSpace::DeviceGray => ColorDescription::Gray { value: at(0) },
            ColorSpace::DeviceRGB => ColorDescription::Rgb {
                values: [to_byte(at(0)), to_byte(at(1)), to_byte(at(2))],
            },
            ColorSpace::DeviceCMYK => ColorDescription::Cmyk {
                values: [at(0), at(1), at(2), at(3)],
            },
            ColorSpace::CalRGB { .. } => ColorDescription::CalRgb {
                values: [at(0), at(1), at(2)],
            },
            ColorSpace::Lab { .. } => ColorDescription::Lab {
                values: [at(0), at(1), at(2)],
            },
            ColorSpace::IccBased(icc) => ColorDescription::Icc {
                profile: icc.description().to_string(),
                values: c.clone(),
            },
            ColorSpace::Spot { name, fallback } => ColorDescription::Spot {
                name: name.clone(),
                tint: at(0),
                fallback: Box::new(ColorDescription::of(fallback)),
            },
            ColorSpace::Separation { name, fallback } => ColorDescription::Separation {
                name: name.clone(),
                tint: at(0),
                fallback: Box::new(ColorDescription::of(fallback)),
            },
            ColorSpace::DeviceN { colorants, .. } => ColorDescription::DeviceN {
                inks: colorants
                    .iter()
                    .enumerate()
                    .map(|(i, col)| (col.name.clone(), at(i)))
                    .collect(),
            },
        };
        if color.alpha < 1.0 {
            ColorDescription::Translucent {
                color: Box::new(opaque),
                alpha: color.alpha,
            }
        } else {
            opaque
        }
    }
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{}", v)?;
    }
    Ok(())
}

impl fmt::Display for ColorDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorDescription::Gray { value } => write!(f, "gray({})", value),
            ColorDescription::Rgb { values } => {
                f.write_str("rgb(")?;
                write_list(f, values)?;
                f.write_str(")")
            },
            ColorDescription::Cmyk { values } => {
                f.write_str("cmyk(")?;
                write_list(f, values)?;
                f.write_str(")")
            },
            ColorDescription::CalRgb { values } => {
                f.write_str("calrgb(")?;
                write_list(f, values)?;
                f.write_str(")")
            },
            ColorDescription::Lab { values } => {
                f.write_str("lab(")?;
                write_list(f, values)?;
                f.write_str(")")
            },
            ColorDescription::Icc { profile, values } => {
                write!(f, "icc(\"{}\" ", profile)?;
                write_list(f, values)?;
                f.write_str(")")
            },
            ColorDescription::Spot {
                name,
                tint,
                fallback,
            } => write!(f, "spot(\"{}\"={} {})", name, tint, fallback),
            ColorDescription::Separation {
                name,
                tint,
                fallback,
            } => write!(f, "separation(\"{}\"={} {})", name, tint, fallback),
            ColorDescription::DeviceN { inks } => {
                f.write_str("devicen(")?;
                for (i, (name, tint)) in inks.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "\"{}\"={}", name, tint)?;
                }
                f.write_str(")")
            },
            ColorDescription::Translucent { color, alpha } => {
                // "rgb(255 0 0)" becomes "rgb(255 0 0 / 0.5)"
                let inner = color.to_string();
                match inner.strip_suffix(')') {
                    Some(open) => write!(f, "{} / {})", open, alpha),
                    None => write!(f, "{} / {}", inner, alpha),
                }
            },
        }
    }
}
