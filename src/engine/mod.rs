//! Pixel work behind a capability trait.
//!
//! The module is split into:
//! - **Backend**: the [`GraphicsEngine`] trait, shared types, and the
//!   recording mock used by tests
//! - **Raster**: the production pure-Rust engine over the `image` crate
//!
//! Engines are selected by the priority list in `[graphics]` configuration;
//! [`create_engine`] walks the list and returns the first engine whose
//! decoders are compiled in, or [`EngineError::NotInstalled`].

pub mod backend;
pub mod raster;

pub use backend::{
    Decoded, EngineError, GraphicsEngine, ImageKind, Quality, SUPPORTED_EXTENSIONS,
};
pub use raster::RasterEngine;

use crate::config::GraphicsConfig;

/// Resolve the configured engine priority list to a usable engine.
pub fn create_engine(config: &GraphicsConfig) -> Result<RasterEngine, EngineError> {
    for name in &config.engines {
        if name == "raster" && RasterEngine::is_installed() {
            return Ok(RasterEngine::new(Quality::new(config.quality)));
        }
    }
    Err(EngineError::NotInstalled(config.engines.join(", ")))
}
