//! Pure Rust graphics engine over the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image` crate decoders |
//! | Crop | `DynamicImage::crop_imm` |
//! | Resample | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG/GIF/WebP | `DynamicImage::save_with_format` |
//!
//! Everything is statically linked; there is no system dependency to
//! install or version-match.

use super::backend::{Decoded, EngineError, GraphicsEngine, ImageKind, Quality};
use crate::geometry::{Dimensions, ImageArea};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::Path;

/// Pure Rust engine using the `image` crate ecosystem.
#[derive(Debug, Clone, Copy)]
pub struct RasterEngine {
    quality: Quality,
}

impl RasterEngine {
    pub fn new(quality: Quality) -> Self {
        Self { quality }
    }

    /// Whether the decoders this engine relies on are compiled in.
    pub fn is_installed() -> bool {
        ImageFormat::Jpeg.reading_enabled() && ImageFormat::Png.reading_enabled()
    }
}

impl Default for RasterEngine {
    fn default() -> Self {
        Self::new(Quality::default())
    }
}

/// Map a detected `image` crate format to the closed set of kinds this
/// crate handles. Shared with the source layer's header probing.
pub(crate) fn kind_from_format(format: ImageFormat) -> Option<ImageKind> {
    match format {
        ImageFormat::Jpeg => Some(ImageKind::Jpeg),
        ImageFormat::Png => Some(ImageKind::Png),
        ImageFormat::Gif => Some(ImageKind::Gif),
        ImageFormat::WebP => Some(ImageKind::Webp),
        _ => None,
    }
}

fn format_for_kind(kind: ImageKind) -> ImageFormat {
    match kind {
        ImageKind::Jpeg => ImageFormat::Jpeg,
        ImageKind::Png => ImageFormat::Png,
        ImageKind::Gif => ImageFormat::Gif,
        ImageKind::Webp => ImageFormat::WebP,
    }
}

fn decode_error(path: &Path, err: impl std::fmt::Display) -> EngineError {
    EngineError::Decode {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

impl GraphicsEngine for RasterEngine {
    type Resource = DynamicImage;

    fn load(&self, path: &Path) -> Result<Decoded<DynamicImage>, EngineError> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| EngineError::UnsupportedFormat(path.display().to_string()))?;
        let kind = kind_from_format(format)
            .ok_or_else(|| EngineError::UnsupportedFormat(format!("{format:?}")))?;
        let resource = reader.decode().map_err(|e| decode_error(path, e))?;
        Ok(Decoded { resource, kind })
    }

    fn load_from_bytes(&self, bytes: &[u8]) -> Result<Decoded<DynamicImage>, EngineError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| EngineError::UnsupportedFormat("<bytes>".to_string()))?;
        let kind = kind_from_format(format)
            .ok_or_else(|| EngineError::UnsupportedFormat(format!("{format:?}")))?;
        let resource = reader
            .decode()
            .map_err(|e| decode_error(Path::new("<bytes>"), e))?;
        Ok(Decoded { resource, kind })
    }

    fn save(
        &self,
        resource: &DynamicImage,
        path: &Path,
        kind: ImageKind,
    ) -> Result<(), EngineError> {
        let encode_error = |e: image::ImageError| EngineError::Encode {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        match kind {
            ImageKind::Jpeg => {
                // The JPEG encoder rejects alpha channels; flatten first.
                let file = File::create(path)?;
                let mut writer = BufWriter::new(file);
                let encoder =
                    JpegEncoder::new_with_quality(&mut writer, self.quality.value() as u8);
                DynamicImage::ImageRgb8(resource.to_rgb8())
                    .write_with_encoder(encoder)
                    .map_err(encode_error)
            }
            _ => resource
                .save_with_format(path, format_for_kind(kind))
                .map_err(encode_error),
        }
    }

    fn clone_resource(&self, resource: &DynamicImage) -> DynamicImage {
        resource.clone()
    }

    fn dimensions(&self, resource: &DynamicImage) -> Dimensions {
        Dimensions::new(resource.width(), resource.height())
    }

    fn crop(&self, resource: DynamicImage, area: ImageArea) -> Result<DynamicImage, EngineError> {
        Ok(resource.crop_imm(area.x, area.y, area.width, area.height))
    }

    fn resize(&self, resource: DynamicImage, to: Dimensions) -> Result<DynamicImage, EngineError> {
        Ok(resource.resize_exact(to.width, to.height, FilterType::Lanczos3))
    }

    fn crop_and_resize(
        &self,
        resource: DynamicImage,
        area: ImageArea,
        to: Dimensions,
    ) -> Result<DynamicImage, EngineError> {
        let cropped = resource.crop_imm(area.x, area.y, area.width, area.height);
        Ok(cropped.resize_exact(to.width, to.height, FilterType::Lanczos3))
    }
}
