//! # thumbcache
//!
//! Cached thumbnail derivation for web images. Given an original image (a
//! path or a URL on the configured site), a target size, a resize strategy,
//! and a list of scale multipliers, thumbcache computes the crop/scale
//! geometry, reuses fresh on-disk thumbnails, and generates the rest
//! through a pluggable graphics engine.
//!
//! # Architecture
//!
//! ```text
//! ImageFactory ── resolves source, validates request
//!      │
//!      ▼
//! ThumbnailsMaker ── per scale: geometry → freshness check → generate
//!      │                        │                │
//!      ▼                        ▼                ▼
//! ResizeStrategy           cache path      ImageHandle (copy-on-transform)
//! (stretch|fit|fill|area)  + mtime check        │
//!                                               ▼
//!                                         GraphicsEngine (decode/crop/
//!                                         resample/encode)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | `Size`, `Dimensions`, `ImageArea`: the dimension math vocabulary |
//! | [`strategy`] | The four resize policies: pure functions from sizes to crop + output geometry |
//! | [`engine`] | `GraphicsEngine` trait and the pure-Rust `RasterEngine` over the `image` crate |
//! | [`source`] | Path↔URL resolution against the web root, file metadata, header-only identification |
//! | [`handle`] | Lazy image handles with in-place and copy-on-transform operations |
//! | [`generator`] | `ThumbnailsMaker`, the caching derivation pipeline |
//! | [`factory`] | `ImageFactory` facade tying config + engine together |
//! | [`config`] | `thumbcache.toml` loading, validation, stock config |
//! | [`output`] | CLI result formatting and run statistics |
//!
//! # Design Decisions
//!
//! ## Freshness by mtime, keyed by name
//!
//! A thumbnail cache entry is just a file at a deterministic path
//! (`<thumbnails_dir><relative-key>-<strategy>-<WxH>.<ext>`); it is fresh
//! while its mtime is at least the original's. No manifest, no hashes:
//! the scheme interoperates bit-exactly with any pre-existing cache using
//! the same naming, and a web server can serve the files directly.
//!
//! ## The engine never runs on a cache hit
//!
//! Header identification (dimensions, declared type) lives in the source
//! layer, not the engine. Deciding that a thumbnail is fresh takes two
//! stat calls and one header read; decoding only happens when pixels are
//! actually produced.
//!
//! ## Copy-on-transform handles
//!
//! Deriving several scales from one original must not consume or corrupt
//! it. Handles expose paired operations: `crop`/`resize`/`crop_and_resize`
//! mutate in place, while `cropped`/`resized`/`crop_and_resized` deep-copy
//! the decoded resource through the engine and return a new handle. The
//! pipeline uses the copying flavor, so one decode feeds every scale.
//!
//! ## Closed strategy set
//!
//! Strategy names resolve through a `match` over a four-variant enum, not
//! a registry. The names are part of the cache file format, so an open
//! set would buy flexibility nobody can use without breaking cache
//! compatibility.
//!
//! ## Single-threaded core, parallel host
//!
//! Every operation blocks until complete and the core holds no shared
//! mutable state; the `batch` CLI command parallelizes across images with
//! rayon instead. Two workers racing on the same cache path both produce
//! a correct file (last writer wins); accepted, not locked against.

pub mod config;
pub mod engine;
pub mod factory;
pub mod generator;
pub mod geometry;
pub mod handle;
pub mod output;
pub mod source;
pub mod strategy;

pub use config::Config;
pub use engine::{GraphicsEngine, ImageKind, RasterEngine};
pub use factory::{ImageFactory, ImageWithThumbnails};
pub use generator::{Thumbnail, ThumbnailsMaker};
pub use geometry::{Dimensions, ImageArea, Size};
pub use handle::ImageHandle;
pub use strategy::ResizeStrategy;
