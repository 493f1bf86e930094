//! Image handles: identity plus lazily decoded pixels.
//!
//! A handle's identity is its source location (path/URL) or, for images
//! built from an in-memory buffer, the decoded pixels themselves. Nothing
//! is read from disk until first needed: [`ImageHandle::size`] probes file
//! headers only, and the full decode happens on the first transform or
//! save. A handle opened purely to report an existing file therefore never
//! touches the graphics engine.
//!
//! Transforms come in two flavors, and the copy decision is the method
//! choice:
//!
//! - `crop` / `resize` / `crop_and_resize` mutate the handle's own
//!   resource in place and invalidate the cached size.
//! - `cropped` / `resized` / `crop_and_resized` deep-copy the resource
//!   through the engine first and return a **new** handle, leaving the
//!   receiver's pixels untouched. The thumbnail pipeline uses these so one
//!   decoded original can feed every scale without cross-contamination.

use crate::config::Config;
use crate::engine::{Decoded, EngineError, GraphicsEngine, ImageKind};
use crate::geometry::{Dimensions, ImageArea};
use crate::source::{ImageInfo, Source, SourceError};
use std::path::Path;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HandleError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("image has neither a source location nor decoded pixels")]
    Detached,
}

/// A loaded or lazily-loadable image.
pub struct ImageHandle<'e, E: GraphicsEngine> {
    engine: &'e E,
    config: &'e Config,
    source: Option<Source>,
    decoded: Option<Decoded<E::Resource>>,
    size: Option<Dimensions>,
    kind: Option<ImageKind>,
}

impl<'e, E: GraphicsEngine> std::fmt::Debug for ImageHandle<'e, E>
where
    E::Resource: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHandle")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("decoded", &self.decoded)
            .field("size", &self.size)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<'e, E: GraphicsEngine> ImageHandle<'e, E> {
    /// A handle for a resolved source. Performs no I/O.
    pub fn open(engine: &'e E, config: &'e Config, source: Source) -> Self {
        Self {
            engine,
            config,
            source: Some(source),
            decoded: None,
            size: None,
            kind: None,
        }
    }

    /// A handle over an in-memory image. Decodes eagerly: the buffer is
    /// the identity, so there is nothing to defer to.
    pub fn from_bytes(engine: &'e E, config: &'e Config, bytes: &[u8]) -> Result<Self, HandleError> {
        let decoded = engine.load_from_bytes(bytes)?;
        Ok(Self {
            engine,
            config,
            source: None,
            kind: Some(decoded.kind),
            decoded: Some(decoded),
            size: None,
        })
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.source.as_ref().and_then(|s| s.path())
    }

    pub fn url(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.url())
    }

    /// The source string, for error messages.
    pub fn identity(&self) -> &str {
        self.source.as_ref().map_or("<memory>", |s| s.describe())
    }

    pub fn file_size(&self) -> Result<u64, HandleError> {
        let source = self.source.as_ref().ok_or(HandleError::Detached)?;
        Ok(source.file_size()?)
    }

    pub fn modified(&self) -> Result<SystemTime, HandleError> {
        let source = self.source.as_ref().ok_or(HandleError::Detached)?;
        Ok(source.modified()?)
    }

    /// Pixel dimensions. Cached; resolved from the decoded resource when
    /// present, otherwise by a header-only probe of the source file.
    pub fn size(&mut self) -> Result<Dimensions, HandleError> {
        if let Some(size) = self.size {
            return Ok(size);
        }
        let size = if let Some(decoded) = &self.decoded {
            self.engine.dimensions(&decoded.resource)
        } else {
            let info = self.probe()?;
            self.kind.get_or_insert(info.kind);
            info.dimensions
        };
        self.size = Some(size);
        Ok(size)
    }

    pub fn width(&mut self) -> Result<u32, HandleError> {
        Ok(self.size()?.width)
    }

    pub fn height(&mut self) -> Result<u32, HandleError> {
        Ok(self.size()?.height)
    }

    /// Declared image type, probed lazily like [`size`](Self::size).
    pub fn kind(&mut self) -> Result<ImageKind, HandleError> {
        if let Some(kind) = self.kind {
            return Ok(kind);
        }
        let info = self.probe()?;
        self.size.get_or_insert(info.dimensions);
        self.kind = Some(info.kind);
        Ok(info.kind)
    }

    /// Header-only identification through the source layer, deliberately
    /// engine-free so that reporting on existing files stays cheap.
    fn probe(&self) -> Result<ImageInfo, HandleError> {
        let source = self.source.as_ref().ok_or(HandleError::Detached)?;
        Ok(source.image_info()?)
    }

    fn ensure_decoded(&mut self) -> Result<(), HandleError> {
        if self.decoded.is_some() {
            return Ok(());
        }
        let source = self.source.as_ref().ok_or(HandleError::Detached)?;
        let path = source.path().ok_or_else(|| {
            HandleError::Source(SourceError::NoLocalFile(source.describe().to_string()))
        })?;
        let decoded = self.engine.load(path)?;
        self.kind = Some(decoded.kind);
        self.decoded = Some(decoded);
        Ok(())
    }

    // --- In-place transforms (mutable semantics) ---

    pub fn crop(&mut self, area: ImageArea) -> Result<(), HandleError> {
        self.transform_in_place(|engine, resource| engine.crop(resource, area))
    }

    pub fn resize(&mut self, to: Dimensions) -> Result<(), HandleError> {
        self.transform_in_place(|engine, resource| engine.resize(resource, to))
    }

    pub fn crop_and_resize(&mut self, area: ImageArea, to: Dimensions) -> Result<(), HandleError> {
        self.transform_in_place(|engine, resource| engine.crop_and_resize(resource, area, to))
    }

    fn transform_in_place(
        &mut self,
        transform: impl FnOnce(&E, E::Resource) -> Result<E::Resource, EngineError>,
    ) -> Result<(), HandleError> {
        self.ensure_decoded()?;
        let Some(decoded) = self.decoded.take() else {
            return Err(HandleError::Detached);
        };
        let resource = transform(self.engine, decoded.resource)?;
        self.decoded = Some(Decoded {
            resource,
            kind: decoded.kind,
        });
        self.size = None;
        Ok(())
    }

    // --- Copy-on-transform (immutable semantics) ---

    pub fn cropped(&mut self, area: ImageArea) -> Result<Self, HandleError> {
        self.derive(|engine, resource| engine.crop(resource, area))
    }

    pub fn resized(&mut self, to: Dimensions) -> Result<Self, HandleError> {
        self.derive(|engine, resource| engine.resize(resource, to))
    }

    pub fn crop_and_resized(
        &mut self,
        area: ImageArea,
        to: Dimensions,
    ) -> Result<Self, HandleError> {
        self.derive(|engine, resource| engine.crop_and_resize(resource, area, to))
    }

    /// Deep-copy the decoded resource, transform the copy, and wrap it in a
    /// new handle sharing this handle's identity. `&mut self` only because
    /// the first transform may have to decode; the receiver's pixels are
    /// never altered.
    fn derive(
        &mut self,
        transform: impl FnOnce(&E, E::Resource) -> Result<E::Resource, EngineError>,
    ) -> Result<Self, HandleError> {
        self.ensure_decoded()?;
        let engine = self.engine;
        let Some(decoded) = self.decoded.as_ref() else {
            return Err(HandleError::Detached);
        };
        let kind = decoded.kind;
        let copy = engine.clone_resource(&decoded.resource);
        let resource = transform(engine, copy)?;
        Ok(Self {
            engine,
            config: self.config,
            source: self.source.clone(),
            decoded: Some(Decoded { resource, kind }),
            size: None,
            kind: Some(kind),
        })
    }

    /// Persist the image, creating missing parent directories, then point
    /// this handle's identity at the written file.
    pub fn save(&mut self, path: &Path) -> Result<(), HandleError> {
        self.ensure_decoded()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(EngineError::from)?;
        }
        let Some(decoded) = self.decoded.as_ref() else {
            return Err(HandleError::Detached);
        };
        self.engine.save(&decoded.resource, path, decoded.kind)?;
        self.source = Some(Source::from_local_path(path, self.config));
        Ok(())
    }
}
