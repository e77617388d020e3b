use clap::{Parser, Subcommand};
use pagezoom::collection::{self, DEFAULT_COLLECTION_NAME};
use pagezoom::combine::{self, CombineSettings};
use pagezoom::composite::{self, CompositeSettings, DEFAULT_COMPOSITE_NAME};
use pagezoom::config::{self, PagezoomConfig};
use pagezoom::imaging::{OutputFormat, RustBackend};
use pagezoom::output;
use pagezoom::strips::{self, StripSettings};
use pagezoom::types::StageEvent;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Tiling flags shared by the commands that write pyramids.
#[derive(clap::Args, Clone)]
struct TileArgs {
    /// Tile edge in pixels [config: pyramid.tile_size, default 256]
    #[arg(long)]
    tile_size: Option<u32>,
    /// Overlap recorded in manifests [config: pyramid.overlap, default 1]
    #[arg(long)]
    overlap: Option<u32>,
    /// Tile format: jpg or png [config: pyramid.format, default jpg]
    #[arg(long)]
    format: Option<OutputFormat>,
    /// JPEG quality 1-100 [config: pyramid.quality, default 90]
    #[arg(long)]
    quality: Option<u32>,
}

impl TileArgs {
    fn apply(&self, config: &mut PagezoomConfig) {
        if let Some(tile_size) = self.tile_size {
            config.pyramid.tile_size = tile_size;
        }
        if let Some(overlap) = self.overlap {
            config.pyramid.overlap = overlap;
        }
        if let Some(format) = self.format {
            config.pyramid.format = format;
        }
        if let Some(quality) = self.quality {
            config.pyramid.quality = quality;
        }
    }
}

#[derive(Parser)]
#[command(name = "pagezoom")]
#[command(version)]
#[command(about = "Build Deep Zoom pyramids from scanned newspaper pages")]
#[command(long_about = "\
Build Deep Zoom pyramids from scanned newspaper pages

Input is a directory with one subdirectory per issue, each holding page
images whose names sort in page order:

  scans/
  ├── 1951-03-02/
  │   ├── 001.jpg
  │   └── 002.jpg
  └── 1951-03-09/
      └── 001.jpg

Stages:
  make-strips          scans/    → strips/{issue}.png        (pages side by side)
  combine              strips/   → canvases/page_NNNN.png    (strips stacked)
  make-collection      canvases/ → out/*.dzi + collection.dzc
  make-single-pyramid  canvases/ → out/composite.dzi         (one image)

'build' runs all stages. Run 'pagezoom gen-config' for a documented
pagezoom.toml; set RUST_LOG to change log filtering.")]
struct Cli {
    /// Config file [default: ./pagezoom.toml if present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge each issue's pages into one horizontal strip
    MakeStrips {
        /// Directory of issue subdirectories
        base_dir: PathBuf,
        /// Where strips are written
        out_dir: PathBuf,
    },
    /// Stack strips into canvases below a maximum height
    Combine {
        strips_dir: PathBuf,
        out_dir: PathBuf,
        /// Canvas height ceiling [config: canvas.max_height, default 20000]
        #[arg(long)]
        max_height: Option<u32>,
    },
    /// Tile every canvas and write a collection manifest
    MakeCollection {
        canvases_dir: PathBuf,
        out_dir: PathBuf,
        #[command(flatten)]
        tiles: TileArgs,
        /// Collection manifest name, without extension
        #[arg(long, default_value = DEFAULT_COLLECTION_NAME)]
        name: String,
    },
    /// Stack every canvas into one image and tile it once
    MakeSinglePyramid {
        canvases_dir: PathBuf,
        out_dir: PathBuf,
        #[command(flatten)]
        tiles: TileArgs,
        /// Composite height ceiling [config: composite.max_height, default 50000]
        #[arg(long)]
        max_height: Option<u32>,
        /// Pyramid name, without extension
        #[arg(long, default_value = DEFAULT_COMPOSITE_NAME)]
        name: String,
    },
    /// Run the full pipeline: strips → combine → collection (or single pyramid)
    Build {
        base_dir: PathBuf,
        out_dir: PathBuf,
        /// Directory for strips/ and canvases/
        #[arg(long, default_value = "pagezoom-work")]
        work_dir: PathBuf,
        /// Produce one pyramid instead of a collection
        #[arg(long)]
        single: bool,
        /// Canvas height ceiling [config: canvas.max_height, default 20000]
        #[arg(long)]
        canvas_max_height: Option<u32>,
        #[command(flatten)]
        tiles: TileArgs,
        /// Name of the collection manifest or single pyramid
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a stock pagezoom.toml with all options documented
    GenConfig,
}

fn main() -> CliResult {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.as_deref();
    let load = || config::load_config(config_path, Path::new("."));

    match cli.command {
        Command::MakeStrips { base_dir, out_dir } => {
            let config = load()?;
            run_strips(&config, &base_dir, &out_dir)?;
        }
        Command::Combine {
            strips_dir,
            out_dir,
            max_height,
        } => {
            let mut config = load()?;
            if let Some(max_height) = max_height {
                config.canvas.max_height = max_height;
            }
            config.validate()?;
            run_combine(&config, &strips_dir, &out_dir)?;
        }
        Command::MakeCollection {
            canvases_dir,
            out_dir,
            tiles,
            name,
        } => {
            let mut config = load()?;
            tiles.apply(&mut config);
            config.validate()?;
            init_thread_pool(&config.processing);
            run_collection(&config, &canvases_dir, &out_dir, &name)?;
        }
        Command::MakeSinglePyramid {
            canvases_dir,
            out_dir,
            tiles,
            max_height,
            name,
        } => {
            let mut config = load()?;
            tiles.apply(&mut config);
            if let Some(max_height) = max_height {
                config.composite.max_height = max_height;
            }
            config.validate()?;
            init_thread_pool(&config.processing);
            run_single_pyramid(&config, &canvases_dir, &out_dir, &name)?;
        }
        Command::Build {
            base_dir,
            out_dir,
            work_dir,
            single,
            canvas_max_height,
            tiles,
            name,
        } => {
            let mut config = load()?;
            tiles.apply(&mut config);
            if let Some(max_height) = canvas_max_height {
                config.canvas.max_height = max_height;
            }
            config.validate()?;
            init_thread_pool(&config.processing);

            let strips_dir = work_dir.join("strips");
            let canvases_dir = work_dir.join("canvases");

            println!("==> Stage 1: Assembling strips → {}", strips_dir.display());
            run_strips(&config, &base_dir, &strips_dir)?;

            println!("==> Stage 2: Packing canvases → {}", canvases_dir.display());
            run_combine(&config, &strips_dir, &canvases_dir)?;

            println!("==> Stage 3: Tiling → {}", out_dir.display());
            if single {
                let name = name.as_deref().unwrap_or(DEFAULT_COMPOSITE_NAME);
                run_single_pyramid(&config, &canvases_dir, &out_dir, name)?;
            } else {
                let name = name.as_deref().unwrap_or(DEFAULT_COLLECTION_NAME);
                run_collection(&config, &canvases_dir, &out_dir, name)?;
            }

            println!("==> Build complete: {}", out_dir.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run_strips(config: &PagezoomConfig, base_dir: &Path, out_dir: &Path) -> CliResult {
    let backend = RustBackend::with_max_pixels(config.limits.max_pixels);
    let settings = StripSettings {
        encoding: config.strip_encoding(),
        max_pixels: config.limits.max_pixels,
    };
    let report =
        with_printer(|tx| strips::make_strips(&backend, base_dir, out_dir, &settings, Some(tx)))?;
    output::print_strips_summary(&report);
    Ok(())
}

fn run_combine(config: &PagezoomConfig, strips_dir: &Path, out_dir: &Path) -> CliResult {
    let backend = RustBackend::with_max_pixels(config.limits.max_pixels);
    let settings = CombineSettings {
        max_height: config.canvas.max_height,
        encoding: config.canvas_encoding(),
        max_pixels: config.limits.max_pixels,
    };
    let report =
        with_printer(|tx| combine::combine(&backend, strips_dir, out_dir, &settings, Some(tx)))?;
    output::print_combine_summary(&report);
    Ok(())
}

fn run_collection(
    config: &PagezoomConfig,
    canvases_dir: &Path,
    out_dir: &Path,
    name: &str,
) -> CliResult {
    let backend = RustBackend::with_max_pixels(config.limits.max_pixels);
    let settings = config.tile_settings();
    let report = with_printer(|tx| {
        collection::make_collection(&backend, canvases_dir, out_dir, &settings, name, Some(tx))
    })?;
    output::print_collection_summary(&report);
    Ok(())
}

fn run_single_pyramid(
    config: &PagezoomConfig,
    canvases_dir: &Path,
    out_dir: &Path,
    name: &str,
) -> CliResult {
    let backend = RustBackend::with_max_pixels(config.limits.max_pixels);
    let settings = CompositeSettings {
        tile: config.tile_settings(),
        max_height: config.composite.max_height,
        max_pixels: config.limits.max_pixels,
    };
    let report = with_printer(|tx| {
        composite::make_single_pyramid(&backend, canvases_dir, out_dir, &settings, name, Some(tx))
    })?;
    output::print_composite_summary(&report);
    Ok(())
}

/// Run a stage while a printer thread renders its progress events.
///
/// The stage owns the sender, so the printer drains and exits once the
/// stage returns.
fn with_printer<T>(stage: impl FnOnce(Sender<StageEvent>) -> T) -> T {
    let (tx, rx) = mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = stage(tx);
    printer.join().ok();
    result
}

/// Logs go to stderr so stdout carries only progress and summaries.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "pagezoom=debug"
    } else {
        "pagezoom=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
