//! zgrid CLI - IDW interpolation of Z-valued vector data

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use zgrid_algorithms::interpolation::{
    idw_z_layers, Feedback, IdwZParams, InputType, LayerInput, SearchStrategy, VertexSource,
    WriteOutcome,
};
use zgrid_core::io::{read_features_geojson, AsciiGridSink, GeoTiffSink, RasterSink};
use zgrid_core::vector::FeatureCollection;
use zgrid_core::Extent;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "zgrid")]
#[command(author, version, about = "IDW interpolation of Z-valued vector data", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a GeoJSON layer
    Info {
        /// Input GeoJSON file
        input: PathBuf,
        /// How geometries are read
        #[arg(long, value_enum, default_value = "points")]
        layer_type: LayerType,
    },
    /// Interpolate Z values onto a grid (.asc or .tif)
    Idw(IdwArgs),
}

#[derive(clap::Args)]
struct IdwArgs {
    /// Input GeoJSON file with Z coordinates
    input: PathBuf,
    /// Output grid: ESRI ASCII (.asc) or GeoTIFF (.tif)
    output: PathBuf,
    /// How the input geometries are read
    #[arg(long, value_enum)]
    layer_type: Option<LayerType>,
    /// Additional break-line layers (GeoJSON)
    #[arg(long)]
    breaklines: Vec<PathBuf>,
    /// Distance coefficient, 0 to 99.99
    #[arg(short = 'p', long)]
    coefficient: Option<f64>,
    /// Number of columns
    #[arg(long)]
    columns: Option<usize>,
    /// Number of rows
    #[arg(long)]
    rows: Option<usize>,
    /// Cell width; overrides --columns
    #[arg(long)]
    cellsize_x: Option<f64>,
    /// Cell height; overrides --rows
    #[arg(long)]
    cellsize_y: Option<f64>,
    /// Output extent as xmin,xmax,ymin,ymax (default: input bounds)
    #[arg(long)]
    extent: Option<Extent>,
    /// Use at most this many nearest samples per cell
    #[arg(long)]
    max_points: Option<usize>,
    /// Ignore samples farther than this from a cell center
    #[arg(long)]
    radius: Option<f64>,
    /// Return a sample's Z when a cell center is this close to it
    #[arg(long)]
    snap: Option<f64>,
    /// Densify structure and break lines to this vertex spacing
    #[arg(long)]
    densify: Option<f64>,
    /// No-data value of the output
    #[arg(long)]
    nodata: Option<f64>,
    /// JSON file with base parameters; flags override its values
    #[arg(long)]
    params: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayerType {
    Points,
    StructureLines,
    BreakLines,
}

impl From<LayerType> for InputType {
    fn from(value: LayerType) -> Self {
        match value {
            LayerType::Points => InputType::Points,
            LayerType::StructureLines => InputType::StructureLines,
            LayerType::BreakLines => InputType::BreakLines,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set default subscriber")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

/// Progress bar over the fraction of rows written
struct BarFeedback {
    bar: ProgressBar,
}

const PROGRESS_STEPS: u64 = 1000;

impl BarFeedback {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(PROGRESS_STEPS);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Interpolating [{bar:40.cyan/blue}] {percent}% ({eta})")?
                .progress_chars("=> "),
        );
        Ok(Self { bar })
    }
}

impl Feedback for BarFeedback {
    fn set_progress(&self, fraction: f64) {
        self.bar.set_position((fraction * PROGRESS_STEPS as f64).round() as u64);
    }
}

fn read_layer(path: &Path) -> Result<FeatureCollection> {
    let pb = spinner("Reading features...")?;
    let features = read_features_geojson(path)
        .with_context(|| format!("Failed to read features from {}", path.display()))?;
    pb.finish_and_clear();
    info!("{}: {} features", path.display(), features.len());
    Ok(features)
}

fn load_params(args: &IdwArgs) -> Result<IdwZParams> {
    let mut params = match &args.params {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid parameter file {}", path.display()))?
        }
        None => IdwZParams::default(),
    };

    if let Some(layer_type) = args.layer_type {
        params.layer_type = layer_type.into();
    }
    if let Some(p) = args.coefficient {
        params.distance_coefficient = p;
    }
    if let Some(columns) = args.columns {
        params.columns = columns;
    }
    if let Some(rows) = args.rows {
        params.rows = rows;
    }
    if let Some(cs) = args.cellsize_x {
        params.cell_size_x = cs;
    }
    if let Some(cs) = args.cellsize_y {
        params.cell_size_y = cs;
    }
    if let Some(extent) = args.extent {
        params.extent = Some(extent);
    }
    if let Some(snap) = args.snap {
        params.snap_distance = snap;
    }
    if let Some(spacing) = args.densify {
        params.densify_spacing = Some(spacing);
    }
    if let Some(nodata) = args.nodata {
        params.nodata = nodata;
    }
    match (args.max_points, args.radius) {
        (Some(k), Some(radius)) => params.search = SearchStrategy::RadiusNearest { radius, k },
        (Some(k), None) => params.search = SearchStrategy::Nearest(k),
        (None, Some(radius)) => params.search = SearchStrategy::Radius(radius),
        (None, None) => {}
    }

    params.validate().context("Invalid parameters")?;
    Ok(params)
}

fn open_sink(path: &Path, nodata: f64) -> Result<Box<dyn RasterSink>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let sink: Box<dyn RasterSink> = match ext.as_deref() {
        Some("asc") => Box::new(
            AsciiGridSink::create(path, nodata)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        Some("tif") | Some("tiff") => Box::new(GeoTiffSink::new(path, nodata)),
        _ => anyhow::bail!(
            "Unsupported output format: {}. Use .asc or .tif",
            path.display()
        ),
    };
    Ok(sink)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Commands ───────────────────────────────────────────────────────────

fn run_info(input: &Path, layer_type: InputType) -> Result<()> {
    let features = read_layer(input)?;
    println!("File: {}", input.display());
    println!("Features: {}", features.len());

    if let Some(index) = features.first_without_z() {
        println!("Z values: missing (first at feature {})", index);
        return Ok(());
    }

    let vertices = VertexSource::new()
        .extract(&features, layer_type)
        .context("Failed to extract vertices")?;
    println!("Vertices: {}", vertices.len());
    if !vertices.breaks().is_empty() {
        println!("Break segments: {}", vertices.breaks().len());
    }

    if let Ok(extent) = vertices.extent(0.0) {
        println!("Bounds: {}", extent);
    }
    let (z_min, z_max) = vertices
        .vertices()
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v.z), hi.max(v.z)));
    if z_min <= z_max {
        println!("Z range: {:.4} - {:.4}", z_min, z_max);
    }
    Ok(())
}

fn run_idw(args: IdwArgs) -> Result<()> {
    let params = load_params(&args)?;
    let input = read_layer(&args.input)?;
    let breaklines = args
        .breaklines
        .iter()
        .map(|path| read_layer(path))
        .collect::<Result<Vec<_>>>()?;

    let mut layers = vec![LayerInput::new(&input, params.layer_type)];
    layers.extend(
        breaklines
            .iter()
            .map(|features| LayerInput::new(features, InputType::BreakLines)),
    );

    let start = Instant::now();
    let feedback = BarFeedback::new()?;
    let mut sink = open_sink(&args.output, params.nodata)?;
    let result = idw_z_layers(&layers, &params, sink.as_mut(), &feedback);
    feedback.bar.finish_and_clear();
    drop(sink);

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            // Partial output is not a valid grid
            if args.output.exists() {
                std::fs::remove_file(&args.output).ok();
            }
            return Err(e).context("Interpolation failed");
        }
    };

    match outcome {
        WriteOutcome::Completed(summary) => {
            info!(
                "{} x {} cells, {} without data",
                summary.layout.columns, summary.layout.rows, summary.nodata_cells
            );
            done("IDW grid", &args.output, start.elapsed());
        }
        WriteOutcome::Cancelled { rows_written } => {
            anyhow::bail!("Interpolation cancelled after {} rows", rows_written);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input, layer_type } => run_info(&input, layer_type.into()),
        Commands::Idw(args) => run_idw(args),
    }
}
