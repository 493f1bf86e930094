//! The crate's facade: configuration plus a selected engine, handing out
//! image handles and thumbnail sets.
//!
//! Strategy names and target sizes are validated before any file is
//! touched, so a bad request fails fast without probing or decoding
//! anything.

use crate::config::Config;
use crate::engine::{self, EngineError, GraphicsEngine, RasterEngine};
use crate::generator::{Thumbnail, ThumbnailError, ThumbnailsMaker};
use crate::geometry::{GeometryError, Size};
use crate::handle::{HandleError, ImageHandle};
use crate::source::{Source, SourceError};
use crate::strategy::{ResizeStrategy, StrategyError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactoryError {
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Handle(#[from] HandleError),
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),
}

/// An original image together with its per-scale thumbnails.
pub struct ImageWithThumbnails<'e, E: GraphicsEngine> {
    pub image: ImageHandle<'e, E>,
    pub thumbnails: Vec<Thumbnail<'e, E>>,
}

impl<'e, E: GraphicsEngine> std::fmt::Debug for ImageWithThumbnails<'e, E>
where
    E::Resource: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageWithThumbnails")
            .field("image", &self.image)
            .field("thumbnails", &self.thumbnails)
            .finish()
    }
}

/// Creates image handles and thumbnail sets against one configuration and
/// one graphics engine.
///
/// The factory holds no per-image state: independent workers can share one
/// factory (the engine is stateless) or build their own.
pub struct ImageFactory<E: GraphicsEngine = RasterEngine> {
    config: Config,
    engine: E,
}

impl ImageFactory<RasterEngine> {
    /// A factory over the first available engine from the configured
    /// priority list.
    pub fn new(config: Config) -> Result<Self, EngineError> {
        let engine = engine::create_engine(&config.graphics)?;
        Ok(Self { config, engine })
    }
}

impl<E: GraphicsEngine> ImageFactory<E> {
    pub fn with_engine(config: Config, engine: E) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A lazy handle for a path or URL.
    pub fn create(&self, src: &str) -> Result<ImageHandle<'_, E>, FactoryError> {
        let source = Source::resolve(src, &self.config)?;
        Ok(ImageHandle::open(&self.engine, &self.config, source))
    }

    /// A handle over in-memory image bytes.
    pub fn create_from_bytes(&self, bytes: &[u8]) -> Result<ImageHandle<'_, E>, FactoryError> {
        Ok(ImageHandle::from_bytes(&self.engine, &self.config, bytes)?)
    }

    /// The primary handle for `src` plus one thumbnail per distinct scale.
    ///
    /// `width`/`height` may each be omitted (strategy-dependent inference);
    /// `strategy` is resolved case-insensitively and rejected before any
    /// image I/O happens.
    pub fn create_with_thumbnails(
        &self,
        src: &str,
        width: Option<u32>,
        height: Option<u32>,
        strategy: &str,
        scales: &[f64],
    ) -> Result<ImageWithThumbnails<'_, E>, FactoryError> {
        let strategy: ResizeStrategy = strategy.parse()?;
        let target = Size::new(width, height)?;
        let mut image = self.create(src)?;
        let maker = ThumbnailsMaker::new(&self.engine, &self.config);
        let thumbnails = maker.thumbnails(&mut image, &target, strategy, scales)?;
        Ok(ImageWithThumbnails { image, thumbnails })
    }
}
