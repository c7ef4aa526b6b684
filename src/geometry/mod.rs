//! Geometric primitives for page space.
//!
//! Page space follows PDF conventions: the origin is the bottom-left corner
//! of the page, x grows to the right and y grows upwards, units are points
//! (1/72 inch).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A 2D point in page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_folio::geometry::Point;
    ///
    /// let point = Point::new(10.0, 20.0);
    /// assert_eq!(point.x, 10.0);
    /// assert_eq!(point.y, 20.0);
    /// ```
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A rectangle in page space, anchored at its bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// X coordinate of the bottom-left corner
    pub x: f32,
    /// Y coordinate of the bottom-left corner
    pub y: f32,
    /// Width of rectangle
    pub width: f32,
    /// Height of rectangle
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_folio::geometry::Rect;
    ///
    /// let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.height, 50.0);
    /// ```
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two opposite corners, in any order.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_folio::geometry::Rect;
    ///
    /// let rect = Rect::from_points(110.0, 70.0, 10.0, 20.0);
    /// assert_eq!(rect.x, 10.0);
    /// assert_eq!(rect.y, 20.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.height, 50.0);
    /// ```
    pub fn from_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    /// Get the left edge x-coordinate.
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> f32 {
        self.y
    }

    /// Get the top edge y-coordinate.
    pub fn top(&self) -> f32 {
        self.y + self.height
    }
}

/// Named page size presets, or explicit dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    /// US Letter (8.5" x 11")
    Letter,
    /// US Legal (8.5" x 14")
    Legal,
    /// A3 (297mm x 420mm)
    A3,
    /// A4 (210mm x 297mm)
    A4,
    /// A5 (148mm x 210mm)
    A5,
    /// Custom dimensions in points (width, height)
    Custom(f32, f32),
}

impl PageSize {
    /// Get dimensions in points (1 inch = 72 points).
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::A3 => (842.0, 1190.0),
            PageSize::A4 => (595.0, 842.0),
            PageSize::A5 => (420.0, 595.0),
            PageSize::Custom(w, h) => (*w, *h),
        }
    }

    /// The same size with width and height swapped.
    pub fn landscape(&self) -> PageSize {
        let (w, h) = self.dimensions();
        PageSize::Custom(h, w)
    }

    /// Media box for a page of this size.
    pub fn to_rect(&self) -> Rect {
        let (w, h) = self.dimensions();
        Rect::new(0.0, 0.0, w, h)
    }
}

impl FromStr for PageSize {
    type Err = Error;

    /// Parses "A4", "letter", "A4-landscape" or "595x842".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (name, landscape) = match lower.strip_suffix("-landscape") {
            Some(name) => (name, true),
            None => (lower.as_str(), false),
        };
        let size = match name {
            "letter" => PageSize::Letter,
            "legal" => PageSize::Legal,
            "a3" => PageSize::A3,
            "a4" => PageSize::A4,
            "a5" => PageSize::A5,
            other => {
                let (w, h) = other
                    .split_once('x')
                    .ok_or_else(|| Error::InvalidArgument(format!("unknown page size '{}'", s)))?;
                let w: f32 = w
                    .trim()
                    .parse()
                    .map_err(|_| Error::InvalidArgument(format!("bad page width in '{}'", s)))?;
                let h: f32 = h
                    .trim()
                    .parse()
                    .map_err(|_| Error::InvalidArgument(format!("bad page height in '{}'", s)))?;
                if w <= 0.0 || h <= 0.0 {
                    return Err(Error::InvalidArgument(format!("page size '{}' is empty", s)));
                }
                PageSize::Custom(w, h)
            },
        };
        Ok(if landscape { size.landscape() } else { size })
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::Letter => write!(f, "Letter"),
            PageSize::Legal => write!(f, "Legal"),
            PageSize::A3 => write!(f, "A3"),
            PageSize::A4 => write!(f, "A4"),
            PageSize::A5 => write!(f, "A5"),
            PageSize::Custom(w, h) => write!(f, "{}x{}", w, h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.left(), 10.0);
        assert_eq!(rect.right(), 110.0);
        assert_eq!(rect.bottom(), 20.0);
        assert_eq!(rect.top(), 70.0);
    }

    #[test]
    fn test_page_size_parse() {
        assert_eq!("A4".parse::<PageSize>().unwrap(), PageSize::A4);
        assert_eq!("letter".parse::<PageSize>().unwrap(), PageSize::Letter);
        assert_eq!(
            "A4-landscape".parse::<PageSize>().unwrap().dimensions(),
            (842.0, 595.0)
        );
        assert_eq!("300x400".parse::<PageSize>().unwrap(), PageSize::Custom(300.0, 400.0));
        assert!("B7".parse::<PageSize>().is_err());
        assert!("0x400".parse::<PageSize>().is_err());
    }

    #[test]
    fn test_page_size_dimensions() {
        assert_eq!(PageSize::Letter.dimensions(), (612.0, 792.0));
        assert_eq!(PageSize::A4.to_rect(), Rect::new(0.0, 0.0, 595.0, 842.0));
        assert_eq!(PageSize::A5.landscape().dimensions(), (595.0, 420.0));
    }
}
