//! Resize policies: how a requested thumbnail size maps to a source crop
//! rectangle and a final output size.
//!
//! | Strategy | Aspect ratio | Crops | Output size |
//! |---|---|---|---|
//! | `stretch` | ignored | never | requested size verbatim |
//! | `fit` | preserved | never | fits inside the requested box |
//! | `fill` | exact requested | centered crop | requested size |
//! | `area` | preserved | never | matches requested pixel *area* |
//!
//! All four are pure dimension math; no pixels are touched here. For
//! `fit`, `fill`, and `area`, a request with only one dimension set is a
//! fully supported input: the missing dimension is derived from the
//! original aspect ratio.
//!
//! Strategy names are embedded in cache file names, so they are stable
//! lowercase identifiers and the set is closed: resolving a name is a
//! `match`, not a registry.

use crate::geometry::{Dimensions, GeometryError, ImageArea, Size};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StrategyError {
    #[error("resize strategy \"{0}\" isn't supported")]
    UnknownStrategy(String),
    #[error("{strategy} strategy needs at least one target dimension")]
    MissingDimensions { strategy: &'static str },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// A named policy determining crop region and output size for a thumbnail
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeStrategy {
    /// Scale to the requested size exactly, distorting if aspect ratios
    /// differ. Does not infer a missing dimension.
    Stretch,
    /// Scale to fit entirely within the requested box, preserving aspect
    /// ratio. No cropping.
    Fit,
    /// Center-crop the original to the requested aspect ratio, then scale
    /// to the requested size exactly.
    Fill,
    /// Scale so the output covers the same pixel area as the requested
    /// size, preserving the original aspect ratio. No cropping.
    Area,
}

impl ResizeStrategy {
    pub const ALL: [ResizeStrategy; 4] = [
        ResizeStrategy::Stretch,
        ResizeStrategy::Fit,
        ResizeStrategy::Fill,
        ResizeStrategy::Area,
    ];

    /// Stable identifier embedded in thumbnail cache file names.
    pub fn name(self) -> &'static str {
        match self {
            ResizeStrategy::Stretch => "stretch",
            ResizeStrategy::Fit => "fit",
            ResizeStrategy::Fill => "fill",
            ResizeStrategy::Area => "area",
        }
    }

    /// The region of the original image the thumbnail is derived from.
    ///
    /// Only `fill` with both target dimensions set ever crops; every other
    /// case uses the full original rectangle.
    pub fn source_area(self, original: Dimensions, requested: &Size) -> ImageArea {
        match self {
            ResizeStrategy::Stretch | ResizeStrategy::Fit | ResizeStrategy::Area => {
                ImageArea::full(original)
            }
            ResizeStrategy::Fill => fill_area(original, requested),
        }
    }

    /// The final pixel size of the thumbnail for a given request.
    ///
    /// May return a partially-set [`Size`] for `stretch` (which echoes the
    /// request verbatim); the caller's smaller-than-original gate rejects
    /// those. Fails when `fit`, `fill`, or `area` is given a request with
    /// neither dimension set.
    pub fn output_size(self, original: Dimensions, requested: &Size) -> Result<Size, StrategyError> {
        match self {
            ResizeStrategy::Stretch => Ok(requested.clone()),
            ResizeStrategy::Fit => fit_size(original, requested),
            ResizeStrategy::Fill => fill_size(original, requested),
            ResizeStrategy::Area => area_size(original, requested),
        }
    }
}

impl FromStr for ResizeStrategy {
    type Err = StrategyError;

    /// Case-insensitive lookup against the four known names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stretch" => Ok(ResizeStrategy::Stretch),
            "fit" => Ok(ResizeStrategy::Fit),
            "fill" => Ok(ResizeStrategy::Fill),
            "area" => Ok(ResizeStrategy::Area),
            _ => Err(StrategyError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for ResizeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn round(v: f64) -> u32 {
    v.round().max(0.0) as u32
}

/// Pick the binding dimension for `fit`: width binds when height is unset,
/// or when both are set and the rounded width downscale ratio is at least
/// the rounded height ratio.
fn fit_size(original: Dimensions, requested: &Size) -> Result<Size, StrategyError> {
    let (ow, oh) = (original.width as f64, original.height as f64);
    let width_binds = match (requested.width, requested.height) {
        (Some(w), Some(h)) => (ow / w as f64).round() >= (oh / h as f64).round(),
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (None, None) => return Err(StrategyError::MissingDimensions { strategy: "fit" }),
    };
    let size = if width_binds {
        let w = requested.width.unwrap_or(original.width);
        Size::new(Some(w), Some(round(oh * w as f64 / ow)))?
    } else {
        let h = requested.height.unwrap_or(original.height);
        Size::new(Some(round(ow * h as f64 / oh)), Some(h))?
    };
    Ok(size)
}

fn fill_size(original: Dimensions, requested: &Size) -> Result<Size, StrategyError> {
    let (ow, oh) = (original.width as f64, original.height as f64);
    match (requested.width, requested.height) {
        (Some(_), Some(_)) => Ok(requested.clone()),
        (Some(w), None) => Ok(Size::new(Some(w), Some(round(oh * w as f64 / ow)))?),
        (None, Some(h)) => Ok(Size::new(Some(round(ow * h as f64 / oh)), Some(h))?),
        (None, None) => Err(StrategyError::MissingDimensions { strategy: "fill" }),
    }
}

fn area_size(original: Dimensions, requested: &Size) -> Result<Size, StrategyError> {
    let (ow, oh) = (original.width as f64, original.height as f64);
    let ratio = match (requested.width, requested.height) {
        (Some(w), Some(h)) => ((ow * oh) / (w as f64 * h as f64)).sqrt(),
        (Some(w), None) => ow / w as f64,
        (None, Some(h)) => oh / h as f64,
        (None, None) => return Err(StrategyError::MissingDimensions { strategy: "area" }),
    };
    Ok(Size::new(Some(round(ow / ratio)), Some(round(oh / ratio)))?)
}

/// Centered crop matching the requested aspect ratio. With only one
/// requested dimension there is nothing to crop against, so the full
/// rectangle is used and `fill` degenerates to `fit`.
fn fill_area(original: Dimensions, requested: &Size) -> ImageArea {
    let (Some(rw), Some(rh)) = (requested.width, requested.height) else {
        return ImageArea::full(original);
    };
    let (ow, oh) = (original.width as f64, original.height as f64);
    if ow / oh < rw as f64 / rh as f64 {
        // Original is relatively narrower: keep full width, crop height
        let width = original.width;
        let height = round(rh as f64 * width as f64 / rw as f64);
        let y = round((oh - height as f64) / 2.0);
        ImageArea::new(0, y, width, height)
    } else {
        let height = original.height;
        let width = round(rw as f64 * height as f64 / rh as f64);
        let x = round((ow - width as f64) / 2.0);
        ImageArea::new(x, 0, width, height)
    }
}
