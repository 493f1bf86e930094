//! Size and crop-rectangle types used by the resize strategies and the
//! thumbnail pipeline.
//!
//! Two size types exist on purpose:
//!
//! - [`Size`] is a *request*: either dimension may be unset, letting the
//!   resize strategy derive the missing one from the original aspect ratio.
//! - [`Dimensions`] is a *fact*: a fully resolved width/height pair, as read
//!   from a decoded image or produced for a finished thumbnail.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GeometryError {
    #[error("at least one of width and height must be set and non-zero")]
    InvalidSize,
}

/// A fully resolved width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A requested thumbnail size. Either dimension may be unset; zero counts
/// as unset. At least one dimension is set on any value built through
/// [`Size::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Size {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Size {
    /// Build a size from optional dimensions. Zero values are normalized to
    /// unset; fails when that leaves neither dimension set.
    pub fn new(width: Option<u32>, height: Option<u32>) -> Result<Self, GeometryError> {
        let width = width.filter(|&w| w > 0);
        let height = height.filter(|&h| h > 0);
        if width.is_none() && height.is_none() {
            return Err(GeometryError::InvalidSize);
        }
        Ok(Self { width, height })
    }

    /// Multiply each set dimension by `factor`, rounding to the nearest
    /// integer and never going below 1. Unset dimensions stay unset.
    pub fn scale(&self, factor: f64) -> Size {
        let scale_dim = |d: Option<u32>| d.map(|v| (v as f64 * factor).round().max(1.0) as u32);
        Size {
            width: scale_dim(self.width),
            height: scale_dim(self.height),
        }
    }

    /// Strictly-smaller comparison. True only when all four values are set
    /// and *both* dimensions of `self` are smaller than `other`'s; a
    /// thumbnail matching the original in either dimension is not smaller.
    pub fn less_than(&self, other: &Size) -> bool {
        match (self.width, self.height, other.width, other.height) {
            (Some(w), Some(h), Some(ow), Some(oh)) => w < ow && h < oh,
            _ => false,
        }
    }

    /// Both dimensions, when fully resolved.
    pub fn dimensions(&self) -> Option<Dimensions> {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Some(Dimensions { width, height }),
            _ => None,
        }
    }
}

impl From<Dimensions> for Size {
    fn from(d: Dimensions) -> Self {
        Size {
            width: Some(d.width),
            height: Some(d.height),
        }
    }
}

/// A rectangular sub-region of a source image, in source pixel coordinates
/// with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageArea {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ImageArea {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The full rectangle of an image.
    pub fn full(dimensions: Dimensions) -> Self {
        Self {
            x: 0,
            y: 0,
            width: dimensions.width,
            height: dimensions.height,
        }
    }
}
