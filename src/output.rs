//! CLI output formatting: per-source result lines and run summaries.
//!
//! The pipeline reports results through plain data records so formatting
//! (and the `--json` machine-readable mode) stays free of image handles
//! and filesystem access.

use serde::Serialize;
use std::fmt;

/// One produced thumbnail variant, flattened for display.
#[derive(Debug, Clone, Serialize)]
pub struct ThumbReport {
    pub scale: f64,
    pub path: String,
    pub url: Option<String>,
    pub width: u32,
    pub height: u32,
    pub from_cache: bool,
}

/// Results for one source image.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub thumbnails: Vec<ThumbReport>,
    /// Scales omitted because the thumbnail would not be smaller than the
    /// original.
    pub skipped: u32,
}

/// Format one source's results as indented lines.
pub fn format_source_report(report: &SourceReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {}x{}",
        report.source, report.width, report.height
    )];
    for thumb in &report.thumbnails {
        let note = if thumb.from_cache { "cached" } else { "generated" };
        lines.push(format!(
            "  {}x -> {} {}x{} ({})",
            thumb.scale, thumb.path, thumb.width, thumb.height, note
        ));
    }
    if report.skipped > 0 {
        lines.push(format!(
            "  {} scale{} skipped (not smaller than original)",
            report.skipped,
            if report.skipped == 1 { "" } else { "s" }
        ));
    }
    lines
}

/// Summary of a run: how many thumbnails were generated, reused, skipped,
/// and how many sources failed.
#[derive(Debug, Default)]
pub struct RunStats {
    pub generated: u32,
    pub cached: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl RunStats {
    pub fn add_report(&mut self, report: &SourceReport) {
        for thumb in &report.thumbnails {
            if thumb.from_cache {
                self.cached += 1;
            } else {
                self.generated += 1;
            }
        }
        self.skipped += report.skipped;
    }

    pub fn total(&self) -> u32 {
        self.generated + self.cached + self.skipped
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cached > 0 || self.skipped > 0 {
            write!(
                f,
                "{} generated, {} cached, {} skipped ({} total)",
                self.generated,
                self.cached,
                self.skipped,
                self.total()
            )?;
        } else {
            write!(f, "{} generated", self.generated)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}
