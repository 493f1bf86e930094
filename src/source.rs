//! Source resolution: mapping between the strings callers hand us (paths,
//! absolute URLs, site-relative URLs) and canonical filesystem paths / URLs.
//!
//! The mapping is defined by the `base_url` / `web_root` pair from
//! configuration: a file under the web root has both a path and a URL; an
//! absolute URL on the site's own host maps back to a path under the web
//! root. A URL on a foreign host resolves with no local path, and all file
//! metadata accessors then fail; fetching remote pixels is not this
//! crate's job.
//!
//! URL strings are split with a small hand-rolled parser; the handful of
//! pieces needed here (scheme, host, path, query) doesn't warrant a URL
//! crate.

use crate::config::Config;
use crate::engine::ImageKind;
use crate::engine::raster::kind_from_format;
use crate::geometry::Dimensions;
use image::ImageReader;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("\"{0}\" is not recognized as a path or URL")]
    Unrecognized(String),
    #[error("URL \"{0}\" can't be converted to a path")]
    UrlOutsideBase(String),
    #[error("can't normalize path \"{0}\"")]
    BadPath(String),
    #[error("source \"{0}\" has no local file")]
    NoLocalFile(String),
    #[error("can't identify image \"{0}\": {1}")]
    Probe(String, String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Header-only identification of an image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub dimensions: Dimensions,
    pub kind: ImageKind,
}

/// A resolved image source: the original string plus whichever of a
/// canonical path and a canonical URL apply to it.
#[derive(Debug, Clone)]
pub struct Source {
    src: String,
    path: Option<PathBuf>,
    url: Option<String>,
}

impl Source {
    /// Resolve a caller-supplied string against the configured web root and
    /// base URL.
    pub fn resolve(src: &str, config: &Config) -> Result<Self, SourceError> {
        if src.starts_with("http://") || src.starts_with("https://") {
            let path = if is_local_url(src, &config.base_url) {
                url_to_path(src, config)?
            } else {
                None
            };
            Ok(Source {
                src: src.to_string(),
                path,
                url: Some(src.to_string()),
            })
        } else if Path::new(src).exists() {
            let abs = std::path::absolute(Path::new(src))?;
            let url = path_to_url(&abs, config);
            Ok(Source {
                src: src.to_string(),
                path: Some(abs),
                url,
            })
        } else if !has_scheme(src) {
            let url = relative_to_absolute(src, &config.base_url)?;
            let path = url_to_path(&url, config)?;
            Ok(Source {
                src: src.to_string(),
                path,
                url: Some(url),
            })
        } else {
            Err(SourceError::Unrecognized(src.to_string()))
        }
    }

    /// Build a source for a file this process just wrote (no existence or
    /// scheme sniffing needed).
    pub fn from_local_path(path: &Path, config: &Config) -> Self {
        let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let url = path_to_url(&abs, config);
        Source {
            src: path.display().to_string(),
            path: Some(abs),
            url,
        }
    }

    /// The string this source was resolved from, for error messages.
    pub fn describe(&self) -> &str {
        &self.src
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn local_path(&self) -> Result<&Path, SourceError> {
        self.path
            .as_deref()
            .ok_or_else(|| SourceError::NoLocalFile(self.src.clone()))
    }

    pub fn file_size(&self) -> Result<u64, SourceError> {
        Ok(std::fs::metadata(self.local_path()?)?.len())
    }

    pub fn modified(&self) -> Result<SystemTime, SourceError> {
        Ok(std::fs::metadata(self.local_path()?)?.modified()?)
    }

    /// Pixel dimensions and declared type, read from file headers only.
    ///
    /// Identification is independent of the selected graphics engine, so
    /// callers that merely compare sizes (the cache-freshness path) never
    /// pay for a decode.
    pub fn image_info(&self) -> Result<ImageInfo, SourceError> {
        let path = self.local_path()?;
        let probe_error =
            |msg: String| SourceError::Probe(path.display().to_string(), msg);
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| probe_error("unknown format".to_string()))?;
        let kind = kind_from_format(format)
            .ok_or_else(|| probe_error(format!("unsupported format {format:?}")))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| probe_error(e.to_string()))?;
        Ok(ImageInfo {
            dimensions: Dimensions::new(width, height),
            kind,
        })
    }
}

/// The web-root-relative key for a local path, with a leading slash.
/// `None` when the path is not under the web root.
pub fn web_root_relative(path: &Path, config: &Config) -> Option<String> {
    let web_root = std::path::absolute(&config.web_root).ok()?;
    let abs = std::path::absolute(path).ok()?;
    let rel = abs.strip_prefix(&web_root).ok()?;
    Some(format!("/{}", rel.display()))
}

/// Whether the string starts with a `scheme://` prefix.
fn has_scheme(s: &str) -> bool {
    s.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

struct UrlParts<'a> {
    scheme: &'a str,
    host: &'a str,
    path: &'a str,
    query: Option<&'a str>,
}

fn split_url(url: &str) -> Option<UrlParts<'_>> {
    let (scheme, rest) = url.split_once("://")?;
    if scheme.is_empty() {
        return None;
    }
    let (host_and_path, query) = match rest.split_once('?') {
        Some((hp, q)) => (hp, Some(q)),
        None => (rest, None),
    };
    let (host, path) = match host_and_path.find('/') {
        Some(i) => (&host_and_path[..i], &host_and_path[i..]),
        None => (host_and_path, ""),
    };
    Some(UrlParts {
        scheme,
        host,
        path,
        query,
    })
}

fn host_without_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Whether an absolute URL points into the configured site: same host
/// (ignoring a `www.` prefix) and a path under the base URL's path.
fn is_local_url(url: &str, base_url: &str) -> bool {
    let (Some(u), Some(b)) = (split_url(url), split_url(base_url)) else {
        return false;
    };
    host_without_www(u.host) == host_without_www(b.host) && u.path.starts_with(b.path)
}

/// Map an absolute URL to a filesystem path under the web root.
///
/// URLs with a query string never map to a path (the query selects a
/// dynamic variant the filesystem doesn't have).
fn url_to_path(url: &str, config: &Config) -> Result<Option<PathBuf>, SourceError> {
    let parts = split_url(url).ok_or_else(|| SourceError::Unrecognized(url.to_string()))?;
    if parts.query.is_some_and(|q| !q.is_empty()) {
        return Ok(None);
    }
    let base_path = split_url(&config.base_url).map_or("", |b| b.path);
    if !base_path.is_empty() && !parts.path.starts_with(base_path) {
        return Err(SourceError::UrlOutsideBase(url.to_string()));
    }
    Ok(Some(PathBuf::from(format!(
        "{}{}",
        config.web_root.display(),
        &parts.path[base_path.len()..]
    ))))
}

/// Map an absolute path to a URL. `None` when the path is outside the web
/// root (the file exists but the site doesn't serve it).
fn path_to_url(path: &Path, config: &Config) -> Option<String> {
    let rel = web_root_relative(path, config)?;
    Some(format!("{}{}", config.base_url, rel))
}

/// Resolve a site-relative URL against the base URL.
fn relative_to_absolute(src: &str, base_url: &str) -> Result<String, SourceError> {
    if let Some(rest) = src.strip_prefix('/') {
        let parts =
            split_url(base_url).ok_or_else(|| SourceError::Unrecognized(base_url.to_string()))?;
        Ok(format!(
            "{}://{}/{}",
            parts.scheme,
            parts.host,
            normalize_path(rest)?
        ))
    } else {
        Ok(format!("{}/{}", base_url, normalize_path(src)?))
    }
}

/// Collapse `.` and `..` segments. Fails when `..` would step above the
/// root.
fn normalize_path(path: &str) -> Result<String, SourceError> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "." => {}
            ".." => match parts.last() {
                None | Some(&"") => return Err(SourceError::BadPath(path.to_string())),
                Some(_) => {
                    parts.pop();
                }
            },
            p => parts.push(p),
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_with(web_root: &Path, base_url: &str) -> Config {
        Config {
            base_url: base_url.to_string(),
            web_root: web_root.to_path_buf(),
            ..Config::default()
        }
    }

    // =========================================================================
    // Absolute URLs
    // =========================================================================

    #[test]
    fn local_absolute_url_maps_to_path() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com/shop");

        let source =
            Source::resolve("https://example.com/shop/images/a.jpg", &config).unwrap();
        assert_eq!(
            source.path(),
            Some(tmp.path().join("images/a.jpg").as_path())
        );
        assert_eq!(source.url(), Some("https://example.com/shop/images/a.jpg"));
    }

    #[test]
    fn www_prefix_is_ignored_for_host_match() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let source = Source::resolve("https://www.example.com/images/a.jpg", &config).unwrap();
        assert!(source.path().is_some());
    }

    #[test]
    fn foreign_host_url_has_no_path() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let source = Source::resolve("https://other.org/images/a.jpg", &config).unwrap();
        assert_eq!(source.path(), None);
        assert_eq!(source.url(), Some("https://other.org/images/a.jpg"));
    }

    #[test]
    fn query_string_blocks_path_mapping() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let source = Source::resolve("https://example.com/images/a.jpg?v=2", &config).unwrap();
        assert_eq!(source.path(), None);
    }

    #[test]
    fn same_host_url_outside_base_path_is_treated_as_remote() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com/shop");

        let source = Source::resolve("https://example.com/blog/a.jpg", &config).unwrap();
        assert_eq!(source.path(), None);
        assert_eq!(source.url(), Some("https://example.com/blog/a.jpg"));
    }

    #[test]
    fn site_relative_url_outside_base_path_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com/shop");

        let err = Source::resolve("/blog/a.jpg", &config).unwrap_err();
        assert!(matches!(err, SourceError::UrlOutsideBase(_)));
    }

    // =========================================================================
    // Relative URLs
    // =========================================================================

    #[test]
    fn relative_url_resolves_against_base() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com/shop");

        let source = Source::resolve("images/a.jpg", &config).unwrap();
        assert_eq!(source.url(), Some("https://example.com/shop/images/a.jpg"));
        assert_eq!(
            source.path(),
            Some(tmp.path().join("images/a.jpg").as_path())
        );
    }

    #[test]
    fn leading_slash_url_resolves_against_host() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let source = Source::resolve("/images/a.jpg", &config).unwrap();
        assert_eq!(source.url(), Some("https://example.com/images/a.jpg"));
    }

    #[test]
    fn dot_segments_are_collapsed() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let source = Source::resolve("images/./sub/../a.jpg", &config).unwrap();
        assert_eq!(source.url(), Some("https://example.com/images/a.jpg"));
    }

    #[test]
    fn dot_dot_above_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let err = Source::resolve("../a.jpg", &config).unwrap_err();
        assert!(matches!(err, SourceError::BadPath(_)));
    }

    // =========================================================================
    // Filesystem paths
    // =========================================================================

    #[test]
    fn existing_path_gets_url_under_web_root() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("images")).unwrap();
        let file = tmp.path().join("images/a.jpg");
        std::fs::write(&file, b"jpeg").unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let source = Source::resolve(file.to_str().unwrap(), &config).unwrap();
        assert_eq!(source.path(), Some(file.as_path()));
        assert_eq!(source.url(), Some("https://example.com/images/a.jpg"));
    }

    #[test]
    fn existing_path_outside_web_root_has_no_url() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let file = outside.path().join("a.jpg");
        std::fs::write(&file, b"jpeg").unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let source = Source::resolve(file.to_str().unwrap(), &config).unwrap();
        assert_eq!(source.path(), Some(file.as_path()));
        assert_eq!(source.url(), None);
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let err = Source::resolve("ftp://example.com/a.jpg", &config).unwrap_err();
        assert!(matches!(err, SourceError::Unrecognized(_)));
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    #[test]
    fn file_size_and_mtime_for_local_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.jpg");
        std::fs::write(&file, b"12345").unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let source = Source::resolve(file.to_str().unwrap(), &config).unwrap();
        assert_eq!(source.file_size().unwrap(), 5);
        assert!(source.modified().is_ok());
    }

    #[test]
    fn metadata_fails_without_local_file() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let source = Source::resolve("https://other.org/a.jpg", &config).unwrap();
        assert!(matches!(
            source.file_size(),
            Err(SourceError::NoLocalFile(_))
        ));
        assert!(matches!(source.modified(), Err(SourceError::NoLocalFile(_))));
    }

    #[test]
    fn image_info_reads_headers() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.png");
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(32, 16));
        img.save_with_format(&file, image::ImageFormat::Png).unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let source = Source::resolve(file.to_str().unwrap(), &config).unwrap();
        let info = source.image_info().unwrap();
        assert_eq!(info.dimensions, Dimensions::new(32, 16));
        assert_eq!(info.kind, ImageKind::Png);
    }

    #[test]
    fn image_info_rejects_non_image_content() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.png");
        std::fs::write(&file, b"this is not an image").unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let source = Source::resolve(file.to_str().unwrap(), &config).unwrap();
        assert!(matches!(source.image_info(), Err(SourceError::Probe(_, _))));
    }

    // =========================================================================
    // web_root_relative
    // =========================================================================

    #[test]
    fn web_root_relative_keeps_leading_slash() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        let rel = web_root_relative(&tmp.path().join("images/a.jpg"), &config);
        assert_eq!(rel.as_deref(), Some("/images/a.jpg"));
    }

    #[test]
    fn web_root_relative_none_outside_root() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(tmp.path(), "https://example.com");

        assert_eq!(web_root_relative(Path::new("/etc/passwd"), &config), None);
    }
}
