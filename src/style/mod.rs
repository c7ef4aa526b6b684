//! Drawing and text styles.
//!
//! A [`Style`] is an ordinary value. Pages and layout boxes clone the style
//! they are given at the moment something is drawn or added, so changing a
//! style afterwards never alters content that already exists.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::fonts::{FontRef, StandardFont};
use crate::geometry::Point;

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlign {
    /// Align to the left edge
    #[default]
    Left,
    /// Align to the right edge
    Right,
    /// Center between the edges
    Center,
    /// Stretch inter-word gaps to fill the line
    Justify,
}

/// Vertical placement of text inside a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerticalAlign {
    /// Share a common baseline with the rest of the line
    #[default]
    Baseline,
    /// Sit on the bottom of the line, next to inline boxes
    Bottom,
}

/// Compositing blend modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Normal compositing
    #[default]
    Normal,
    /// Multiply
    Multiply,
    /// Screen
    Screen,
    /// Overlay
    Overlay,
    /// Darken
    Darken,
    /// Lighten
    Lighten,
}

/// Dash pattern for stroked lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDash {
    /// Alternating on and off lengths
    pub pattern: Vec<f32>,
    /// Offset into the pattern
    pub phase: f32,
}

/// How an area or glyph is painted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Paint {
    /// Flat color
    Color(Color),
    /// Axial gradient between two colors
    Gradient {
        /// Color at the start point
        from: Color,
        /// Color at the end point
        to: Color,
        /// Start point
        start: Point,
        /// End point
        end: Point,
    },
    /// Tiled pattern cell drawn in the given colors
    Pattern {
        /// Pattern name
        name: String,
        /// Colors used by the cell
        colors: Vec<Color>,
        /// Cell size
        cell: (f32, f32),
    },
}

impl Paint {
    /// Every color the paint refers to.
    pub fn colors(&self) -> Vec<&Color> {
        match self {
            Paint::Color(c) => vec![c],
            Paint::Gradient { from, to, .. } => vec![from, to],
            Paint::Pattern { colors, .. } => colors.iter().collect(),
        }
    }

    /// Mutable access to every color the paint refers to.
    pub fn colors_mut(&mut self) -> Vec<&mut Color> {
        match self {
            Paint::Color(c) => vec![c],
            Paint::Gradient { from, to, .. } => vec![from, to],
            Paint::Pattern { colors, .. } => colors.iter_mut().collect(),
        }
    }
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Paint::Color(color)
    }
}

/// Font, paint and text settings applied to drawing operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Font
    pub font: FontRef,
    /// Font size in points
    pub font_size: f32,
    /// Fill paint, `None` for no fill
    pub fill: Option<Paint>,
    /// Stroke paint, `None` for no stroke
    pub stroke: Option<Paint>,
    /// Stroke width in points
    pub line_width: f32,
    /// Dash pattern, `None` for solid
    pub dash: Option<LineDash>,
    /// Horizontal alignment of text
    pub text_align: TextAlign,
    /// Vertical alignment of text inside a line
    pub vertical_align: VerticalAlign,
    /// Extra space between characters in 1/1000 em
    pub track_kerning: f32,
    /// Line height as a multiple of the font size
    pub line_spacing: f32,
    /// Underline text
    pub underline: bool,
    /// Strike through text
    pub strikeout: bool,
    /// Overprint fill and stroke
    pub overprint: bool,
    /// Fill and stroke opacity
    pub alpha: f32,
    /// Blend mode
    pub blend_mode: BlendMode,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            font: FontRef::Standard(StandardFont::Helvetica),
            font_size: 12.0,
            fill: Some(Paint::Color(Color::black())),
            stroke: None,
            line_width: 1.0,
            dash: None,
            text_align: TextAlign::Left,
            vertical_align: VerticalAlign::Baseline,
            track_kerning: 0.0,
            line_spacing: 1.2,
            underline: false,
            strikeout: false,
            overprint: false,
            alpha: 1.0,
            blend_mode: BlendMode::Normal,
        }
    }
}

impl Style {
    /// Create the default style: 12pt Helvetica, black fill.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the font and size.
    pub fn with_font(mut self, font: impl Into<FontRef>, size: f32) -> Self {
        self.font = font.into();
        self.font_size = size;
        self
    }

    /// Set the fill paint.
    pub fn with_fill(mut self, paint: impl Into<Paint>) -> Self {
        self.fill = Some(paint.into());
        self
    }

    /// Set the stroke paint.
    pub fn with_stroke(mut self, paint: impl Into<Paint>) -> Self {
        self.stroke = Some(paint.into());
        self
    }

    /// Set text alignment.
    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.text_align = align;
        self
    }

    /// Set vertical alignment.
    pub fn with_vertical_align(mut self, align: VerticalAlign) -> Self {
        self.vertical_align = align;
        self
    }

    /// Set track kerning in 1/1000 em.
    pub fn with_track_kerning(mut self, kerning: f32) -> Self {
        self.track_kerning = kerning;
        self
    }

    /// Set line spacing factor.
    pub fn with_line_spacing(mut self, spacing: f32) -> Self {
        self.line_spacing = spacing;
        self
    }

    /// Set opacity.
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Enable or disable overprint.
    pub fn with_overprint(mut self, overprint: bool) -> Self {
        self.overprint = overprint;
        self
    }

    /// Width of text in points, including track kerning.
    pub fn text_width(&self, text: &str) -> f32 {
        let base = self.font.text_width(text, self.font_size);
        let count = text.chars().count() as f32;
        base + count * self.track_kerning * self.font_size / 1000.0
    }

    /// Height of one line of text in this style.
    pub fn line_height(&self) -> f32 {
        self.font_size * self.line_spacing
    }

    /// True when anything drawn with this style is partially transparent.
    pub fn is_transparent(&self) -> bool {
        self.alpha < 1.0
            || self.blend_mode != BlendMode::Normal
            || self
                .paints()
                .iter()
                .flat_map(|p| p.colors())
                .any(|c| c.alpha < 1.0)
    }

    /// Fill and stroke paints that are set.
    pub fn paints(&self) -> Vec<&Paint> {
        self.fill.iter().chain(self.stroke.iter()).collect()
    }

    /// Mutable fill and stroke paints that are set.
    pub fn paints_mut(&mut self) -> Vec<&mut Paint> {
        self.fill.iter_mut().chain(self.stroke.iter_mut()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_style() {
        let style = Style::new();
        assert_eq!(style.font_size, 12.0);
        assert_eq!(style.text_align, TextAlign::Left);
        assert!((style.line_height() - 14.4).abs() < 1e-4);
        assert!(!style.is_transparent());
    }

    #[test]
    fn test_track_kerning_widens_text() {
        let plain = Style::new();
        let tracked = Style::new().with_track_kerning(100.0);
        let diff = tracked.text_width("abcd") - plain.text_width("abcd");
        assert!((diff - 4.0 * 1.2).abs() < 1e-4);
    }

    #[test]
    fn test_transparency_detection() {
        assert!(Style::new().with_alpha(0.5).is_transparent());
        let translucent = Style::new().with_fill(Color::rgb(1.0, 0.0, 0.0).with_alpha(0.3));
        assert!(translucent.is_transparent());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut style = Style::new();
        let snapshot = style.clone();
        style.font_size = 30.0;
        assert_eq!(snapshot.font_size, 12.0);
    }
}
