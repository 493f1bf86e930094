//! The thumbnail derivation pipeline: per-scale geometry, cache freshness,
//! and generation.
//!
//! For every requested scale the maker computes the output geometry through
//! the resize strategy, then decides between three outcomes:
//!
//! 1. **Skip**: the thumbnail would not be strictly smaller than the
//!    original in both dimensions. Upscaled or same-size "thumbnails" are
//!    never produced; the scale is simply omitted from the result.
//! 2. **Cache hit**: a file already exists at the derived cache path and
//!    its mtime is at least the original's. The existing file is returned
//!    as a lazily-opened handle; no pixel is decoded.
//! 3. **Generate**: the original is crop-and-resized through the graphics
//!    engine (copy-on-transform, so the original handle survives every
//!    scale unchanged) and saved to the cache path.
//!
//! ## Cache layout
//!
//! Cache paths are deterministic so independent runs, and any pre-existing
//! cache, agree on the same files:
//!
//! ```text
//! <thumbnails_dir><relative-key-no-ext>-<strategy>-<width>x<height>.<ext>
//! ```
//!
//! The relative key is the original's path relative to the web root; for
//! files outside the web root, the path (or URL with its scheme stripped)
//! is used as-is. A stale thumbnail is overwritten in place; nothing here
//! ever deletes cache files.
//!
//! Scales are processed sequentially and share one decoded original; a
//! fatal error on one scale stops the remaining scales.

use crate::config::Config;
use crate::engine::GraphicsEngine;
use crate::geometry::{Dimensions, Size};
use crate::handle::ImageHandle;
use crate::source::{self, Source};
use crate::strategy::{ResizeStrategy, StrategyError};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("can't read source image {src}: {reason}")]
    SourceUnavailable { src: String, reason: String },
    #[error("can't write thumbnail {path}: {reason}")]
    WriteFailure { path: PathBuf, reason: String },
    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// One produced thumbnail variant.
pub struct Thumbnail<'e, E: GraphicsEngine> {
    /// The scale multiplier this variant was requested at.
    pub scale: f64,
    /// Whether an existing fresh cache file was reused.
    pub from_cache: bool,
    pub image: ImageHandle<'e, E>,
}

impl<'e, E: GraphicsEngine> std::fmt::Debug for Thumbnail<'e, E>
where
    E::Resource: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thumbnail")
            .field("scale", &self.scale)
            .field("from_cache", &self.from_cache)
            .field("image", &self.image)
            .finish()
    }
}

/// Derives cached thumbnails from original images.
pub struct ThumbnailsMaker<'e, E: GraphicsEngine> {
    engine: &'e E,
    config: &'e Config,
}

impl<'e, E: GraphicsEngine> ThumbnailsMaker<'e, E> {
    pub fn new(engine: &'e E, config: &'e Config) -> Self {
        Self { engine, config }
    }

    /// Thumbnails for `image`, one per distinct scale.
    ///
    /// A scale whose thumbnail would match or exceed the original size is
    /// omitted from the result. Duplicate scale values collapse to one
    /// entry. The original handle is never mutated: generation runs through
    /// copy-on-transform, so one decoded original feeds every scale.
    pub fn thumbnails(
        &self,
        image: &mut ImageHandle<'e, E>,
        target: &Size,
        strategy: ResizeStrategy,
        scales: &[f64],
    ) -> Result<Vec<Thumbnail<'e, E>>, ThumbnailError> {
        let source_mtime = image
            .modified()
            .map_err(|e| self.source_unavailable(image.identity(), e))?;
        let mut thumbnails: Vec<Thumbnail<'e, E>> = Vec::new();
        for &scale in scales {
            if thumbnails.iter().any(|t| t.scale == scale) {
                continue;
            }
            if let Some(thumbnail) =
                self.thumbnail_for_scale(image, target, strategy, scale, source_mtime)?
            {
                thumbnails.push(thumbnail);
            }
        }
        Ok(thumbnails)
    }

    fn thumbnail_for_scale(
        &self,
        image: &mut ImageHandle<'e, E>,
        target: &Size,
        strategy: ResizeStrategy,
        scale: f64,
        source_mtime: SystemTime,
    ) -> Result<Option<Thumbnail<'e, E>>, ThumbnailError> {
        let original = image
            .size()
            .map_err(|e| self.source_unavailable(image.identity(), e))?;
        let scaled = target.scale(scale);
        let out_size = strategy.output_size(original, &scaled)?;
        if !out_size.less_than(&Size::from(original)) {
            return Ok(None);
        }
        let Some(out) = out_size.dimensions() else {
            return Ok(None);
        };

        let path = self.thumbnail_path(image, out, strategy.name())?;
        if is_fresh(&path, source_mtime) {
            let cached = ImageHandle::open(
                self.engine,
                self.config,
                Source::from_local_path(&path, self.config),
            );
            return Ok(Some(Thumbnail {
                scale,
                from_cache: true,
                image: cached,
            }));
        }

        let area = strategy.source_area(original, &scaled);
        let mut thumbnail = image
            .crop_and_resized(area, out)
            .map_err(|e| self.source_unavailable(image.identity(), e))?;
        thumbnail
            .save(&path)
            .map_err(|e| ThumbnailError::WriteFailure {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Ok(Some(Thumbnail {
            scale,
            from_cache: false,
            image: thumbnail,
        }))
    }

    /// The deterministic cache path for a thumbnail of `image` at `out`
    /// pixels under `strategy_name`.
    fn thumbnail_path(
        &self,
        image: &ImageHandle<'e, E>,
        out: Dimensions,
        strategy_name: &str,
    ) -> Result<PathBuf, ThumbnailError> {
        let key = if let Some(path) = image.path() {
            match source::web_root_relative(path, self.config) {
                Some(relative) => relative,
                None => leading_slash(&path.to_string_lossy()),
            }
        } else if let Some(url) = image.url() {
            leading_slash(strip_scheme(url))
        } else {
            return Err(ThumbnailError::SourceUnavailable {
                src: image.identity().to_string(),
                reason: "no path or URL to derive a cache key from".to_string(),
            });
        };
        let (stem, ext) = match key.rfind('.') {
            Some(i) => (&key[..i], &key[i + 1..]),
            None => (key.as_str(), ""),
        };
        Ok(PathBuf::from(format!(
            "{}{}-{}-{}x{}.{}",
            self.config.thumbnails_dir.display(),
            stem,
            strategy_name,
            out.width,
            out.height,
            ext
        )))
    }

    fn source_unavailable(&self, src: &str, err: impl std::fmt::Display) -> ThumbnailError {
        ThumbnailError::SourceUnavailable {
            src: src.to_string(),
            reason: err.to_string(),
        }
    }
}

/// A cached thumbnail is fresh when it is at least as new as its original.
fn is_fresh(path: &Path, source_mtime: SystemTime) -> bool {
    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(thumb_mtime) => thumb_mtime >= source_mtime,
        Err(_) => false,
    }
}

fn strip_scheme(url: &str) -> &str {
    match url.split_once("://") {
        Some((scheme, rest))
            if !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            rest
        }
        _ => url,
    }
}

fn leading_slash(key: &str) -> String {
    if key.starts_with('/') {
        key.to_string()
    } else {
        format!("/{key}")
    }
}
