use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thumbcache::engine::SUPPORTED_EXTENSIONS;
use thumbcache::output::{RunStats, SourceReport, ThumbReport, format_source_report};
use thumbcache::{Config, GraphicsEngine, ImageFactory, config};
use walkdir::WalkDir;

/// Shared flags for commands that produce thumbnails.
#[derive(clap::Args, Clone)]
struct RequestArgs {
    /// Target width in pixels; 0 derives it from the aspect ratio
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels; 0 derives it from the aspect ratio
    #[arg(long)]
    height: Option<u32>,

    /// Resize strategy: stretch, fit, fill, or area
    #[arg(long)]
    strategy: Option<String>,

    /// Comma-separated scale multipliers, e.g. 1,2 for a high-DPI variant
    #[arg(long, value_delimiter = ',')]
    scales: Option<Vec<f64>>,

    /// Emit machine-readable JSON instead of text
    #[arg(long)]
    json: bool,
}

/// A fully resolved thumbnail request (CLI flags over config defaults).
struct Request {
    width: Option<u32>,
    height: Option<u32>,
    strategy: String,
    scales: Vec<f64>,
}

impl Request {
    fn resolve(args: &RequestArgs, config: &Config) -> Self {
        let nonzero = |v: u32| (v > 0).then_some(v);
        Self {
            width: args.width.or(nonzero(config.thumbnails.width)),
            height: args.height.or(nonzero(config.thumbnails.height)),
            strategy: args
                .strategy
                .clone()
                .unwrap_or_else(|| config.thumbnails.strategy.clone()),
            scales: args
                .scales
                .clone()
                .unwrap_or_else(|| config.thumbnails.scales.clone()),
        }
    }

    fn distinct_scales(&self) -> usize {
        let mut seen: Vec<f64> = Vec::new();
        for &scale in &self.scales {
            if !seen.contains(&scale) {
                seen.push(scale);
            }
        }
        seen.len()
    }
}

#[derive(Parser)]
#[command(name = "thumbcache")]
#[command(about = "Cached thumbnail generation for web images")]
#[command(long_about = "\
Cached thumbnail generation for web images

Sources are paths or URLs on the configured site. For each source and scale,
the target geometry is computed by the chosen resize strategy and the result
is written to a deterministic cache path:

  <thumbnails_dir><relative-path>-<strategy>-<width>x<height>.<ext>

A thumbnail is reused without any image decoding while its modification time
is at least the original's; touching the original regenerates its thumbnails
on the next run. Thumbnails that would match or exceed the original size are
never produced.

Strategies:
  stretch   exact requested size, aspect ratio ignored
  fit       fits inside the requested box, aspect ratio preserved
  fill      exact requested size via a centered crop
  area      matches the requested pixel area, aspect ratio preserved

Run 'thumbcache gen-config' to generate a documented thumbcache.toml.")]
#[command(version)]
struct Cli {
    /// Config file (optional; defaults apply when absent)
    #[arg(long, default_value = "thumbcache.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create thumbnails for one or more sources (paths or URLs)
    Make {
        /// Source images: paths, site URLs, or site-relative URLs
        #[arg(required = true)]
        sources: Vec<String>,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Walk the web root and create thumbnails for every supported image
    Batch {
        /// Directory to walk (defaults to the configured web root)
        #[arg(long)]
        root: Option<PathBuf>,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Print a stock thumbcache.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Make { sources, request } => {
            let site_config = Config::load_or_default(&cli.config)?;
            let factory = ImageFactory::new(site_config)?;
            let resolved = Request::resolve(&request, factory.config());

            let mut stats = RunStats::default();
            let mut reports = Vec::new();
            for src in &sources {
                match generate_one(&factory, src, &resolved) {
                    Ok(report) => {
                        stats.add_report(&report);
                        reports.push(report);
                    }
                    Err(message) => {
                        stats.failed += 1;
                        eprintln!("{src}: {message}");
                    }
                }
            }
            finish(&reports, &stats, request.json)?;
        }
        Command::Batch { root, request } => {
            let site_config = Config::load_or_default(&cli.config)?;
            init_thread_pool(&site_config.processing);
            let factory = ImageFactory::new(site_config)?;
            let resolved = Request::resolve(&request, factory.config());

            let root = root.unwrap_or_else(|| factory.config().web_root.clone());
            let files = collect_sources(&root, &factory.config().thumbnails_dir)?;
            println!(
                "==> Processing {} image{} under {}",
                files.len(),
                if files.len() == 1 { "" } else { "s" },
                root.display()
            );

            let results: Vec<Result<SourceReport, (PathBuf, String)>> = files
                .par_iter()
                .map(|path| {
                    generate_one(&factory, &path.display().to_string(), &resolved)
                        .map_err(|message| (path.clone(), message))
                })
                .collect();

            let mut stats = RunStats::default();
            let mut reports = Vec::new();
            for result in results {
                match result {
                    Ok(report) => {
                        stats.add_report(&report);
                        reports.push(report);
                    }
                    Err((path, message)) => {
                        stats.failed += 1;
                        eprintln!("{}: {message}", path.display());
                    }
                }
            }
            finish(&reports, &stats, request.json)?;
        }
    }

    Ok(())
}

/// Produce one source's thumbnails and flatten the result for reporting.
fn generate_one<E: GraphicsEngine>(
    factory: &ImageFactory<E>,
    src: &str,
    request: &Request,
) -> Result<SourceReport, String> {
    let mut result = factory
        .create_with_thumbnails(
            src,
            request.width,
            request.height,
            &request.strategy,
            &request.scales,
        )
        .map_err(|e| e.to_string())?;

    let original = result.image.size().map_err(|e| e.to_string())?;
    let skipped = (request.distinct_scales() - result.thumbnails.len()) as u32;

    let mut thumbnails = Vec::new();
    for thumb in &mut result.thumbnails {
        let dims = thumb.image.size().map_err(|e| e.to_string())?;
        thumbnails.push(ThumbReport {
            scale: thumb.scale,
            path: thumb
                .image
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            url: thumb.image.url().map(String::from),
            width: dims.width,
            height: dims.height,
            from_cache: thumb.from_cache,
        });
    }

    Ok(SourceReport {
        source: src.to_string(),
        width: original.width,
        height: original.height,
        thumbnails,
        skipped,
    })
}

/// Walk `root` for source images, excluding anything already under the
/// thumbnails directory.
fn collect_sources(root: &Path, thumbnails_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let thumbnails_dir = std::path::absolute(thumbnails_dir)?;
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_supported_extension(path))
        .filter(|path| {
            std::path::absolute(path)
                .map(|abs| !abs.starts_with(&thumbnails_dir))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn finish(
    reports: &[SourceReport],
    stats: &RunStats,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
    } else {
        for report in reports {
            for line in format_source_report(report) {
                println!("{line}");
            }
        }
    }
    println!("Thumbnails: {stats}");
    if stats.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    rayon::ThreadPoolBuilder::new()
        .num_threads(config::effective_workers(processing))
        .build_global()
        .ok();
}
