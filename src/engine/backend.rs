//! Graphics-engine capability trait and shared types.
//!
//! The [`GraphicsEngine`] trait is the seam between the thumbnail pipeline
//! (which decides *what* to derive) and pixel work (decode, crop, resample,
//! encode). The production implementation is
//! [`RasterEngine`](super::raster::RasterEngine); tests use the recording
//! [`MockEngine`](tests::MockEngine) so cache behavior can be asserted
//! without decoding anything.
//!
//! Transforms take the resource *by value* and return the transformed
//! resource. Whether the caller keeps working on the same image or on a
//! copy is decided in the handle layer, which clones through
//! [`GraphicsEngine::clone_resource`] before a copy-on-transform operation.
//! Resource cleanup is `Drop`.

use crate::geometry::{Dimensions, ImageArea};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no configured graphics engine is available (tried: {0})")]
    NotInstalled(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("failed to encode {path}: {message}")]
    Encode { path: String, message: String },
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Declared image type, preserved from source to derived thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "gif" => Some(ImageKind::Gif),
            "webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }
}

/// File extensions the batch walker treats as thumbnail sources.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// A decoded resource and its declared type, carried as one unit.
#[derive(Debug)]
pub struct Decoded<R> {
    pub resource: R,
    pub kind: ImageKind,
}

/// Capability interface over an image-processing backend.
///
/// Deliberately pixel-only: header identification (dimensions, declared
/// type) lives in the source layer, so a cache hit never needs an engine.
pub trait GraphicsEngine {
    /// Backend-specific decoded image representation.
    type Resource;

    /// Decode an image from disk.
    fn load(&self, path: &Path) -> Result<Decoded<Self::Resource>, EngineError>;

    /// Decode an image from an in-memory buffer.
    fn load_from_bytes(&self, bytes: &[u8]) -> Result<Decoded<Self::Resource>, EngineError>;

    /// Encode and persist a resource. The caller is responsible for parent
    /// directories.
    fn save(&self, resource: &Self::Resource, path: &Path, kind: ImageKind)
    -> Result<(), EngineError>;

    /// Deep-copy a resource so a transform can leave the source untouched.
    fn clone_resource(&self, resource: &Self::Resource) -> Self::Resource;

    fn dimensions(&self, resource: &Self::Resource) -> Dimensions;

    fn crop(&self, resource: Self::Resource, area: ImageArea)
    -> Result<Self::Resource, EngineError>;

    fn resize(&self, resource: Self::Resource, to: Dimensions)
    -> Result<Self::Resource, EngineError>;

    /// Crop then resample as one operation, the whole thumbnail derivation
    /// in a single backend call.
    fn crop_and_resize(
        &self,
        resource: Self::Resource,
        area: ImageArea,
        to: Dimensions,
    ) -> Result<Self::Resource, EngineError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock engine that records operations without touching pixels.
    ///
    /// `save` writes a small placeholder file so that cache-freshness checks
    /// against the filesystem behave as they would with real output. Uses
    /// Mutex (not RefCell) so shared references work across rayon workers.
    #[derive(Default)]
    pub struct MockEngine {
        pub load_results: Mutex<Vec<(Dimensions, ImageKind)>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    /// Lightweight stand-in for a decoded image.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MockResource {
        pub width: u32,
        pub height: u32,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Load(String),
        LoadBytes,
        Save {
            path: String,
            kind: ImageKind,
        },
        Clone,
        Crop {
            area: ImageArea,
        },
        Resize {
            to: Dimensions,
        },
        CropAndResize {
            area: ImageArea,
            to: Dimensions,
        },
    }

    impl MockEngine {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue dimensions returned by subsequent `load` calls (popped
        /// from the end).
        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                load_results: Mutex::new(dims.into_iter().map(|d| (d, ImageKind::Jpeg)).collect()),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }

        fn next_load(&self) -> Result<(Dimensions, ImageKind), EngineError> {
            self.load_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| EngineError::Decode {
                    path: "<mock>".to_string(),
                    message: "no mock dimensions queued".to_string(),
                })
        }
    }

    impl GraphicsEngine for MockEngine {
        type Resource = MockResource;

        fn load(&self, path: &Path) -> Result<Decoded<MockResource>, EngineError> {
            self.record(RecordedOp::Load(path.to_string_lossy().to_string()));
            let (dims, kind) = self.next_load()?;
            Ok(Decoded {
                resource: MockResource {
                    width: dims.width,
                    height: dims.height,
                },
                kind,
            })
        }

        fn load_from_bytes(&self, _bytes: &[u8]) -> Result<Decoded<MockResource>, EngineError> {
            self.record(RecordedOp::LoadBytes);
            let (dims, kind) = self.next_load()?;
            Ok(Decoded {
                resource: MockResource {
                    width: dims.width,
                    height: dims.height,
                },
                kind,
            })
        }

        fn save(
            &self,
            _resource: &MockResource,
            path: &Path,
            kind: ImageKind,
        ) -> Result<(), EngineError> {
            self.record(RecordedOp::Save {
                path: path.to_string_lossy().to_string(),
                kind,
            });
            std::fs::write(path, b"mock image data")?;
            Ok(())
        }

        fn clone_resource(&self, resource: &MockResource) -> MockResource {
            self.record(RecordedOp::Clone);
            *resource
        }

        fn dimensions(&self, resource: &MockResource) -> Dimensions {
            Dimensions::new(resource.width, resource.height)
        }

        fn crop(
            &self,
            _resource: MockResource,
            area: ImageArea,
        ) -> Result<MockResource, EngineError> {
            self.record(RecordedOp::Crop { area });
            Ok(MockResource {
                width: area.width,
                height: area.height,
            })
        }

        fn resize(
            &self,
            _resource: MockResource,
            to: Dimensions,
        ) -> Result<MockResource, EngineError> {
            self.record(RecordedOp::Resize { to });
            Ok(MockResource {
                width: to.width,
                height: to.height,
            })
        }

        fn crop_and_resize(
            &self,
            _resource: MockResource,
            area: ImageArea,
            to: Dimensions,
        ) -> Result<MockResource, EngineError> {
            self.record(RecordedOp::CropAndResize { area, to });
            Ok(MockResource {
                width: to.width,
                height: to.height,
            })
        }
    }

    #[test]
    fn kind_round_trips_through_extensions() {
        assert_eq!(ImageKind::from_extension("JPG"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_extension("jpeg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_extension("webp"), Some(ImageKind::Webp));
        assert_eq!(ImageKind::from_extension("bmp"), None);
        assert_eq!(ImageKind::Png.extension(), "png");
    }

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn mock_records_and_sizes_transforms() {
        let engine = MockEngine::with_dimensions(vec![Dimensions::new(800, 600)]);
        let decoded = engine.load(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(engine.dimensions(&decoded.resource), Dimensions::new(800, 600));

        let out = engine
            .crop_and_resize(
                decoded.resource,
                ImageArea::new(0, 0, 800, 600),
                Dimensions::new(100, 75),
            )
            .unwrap();
        assert_eq!(engine.dimensions(&out), Dimensions::new(100, 75));

        let ops = engine.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], RecordedOp::Load(p) if p == "/test/image.jpg"));
    }
}
