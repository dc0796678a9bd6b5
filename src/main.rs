use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

#[allow(unused_imports)]
use log::{Level, trace, debug, info, warn, error};

use slidescope::build_info::{BuildInfo, BUILD};
use slidescope::config::{Config, APP_NAME};
use slidescope::detection::{self, InferenceRecord};
use slidescope::hub;
use slidescope::loader;
use slidescope::logging;
use slidescope::settings::UserSettings;
use slidescope::viewer::{ViewerController, ViewerEvent, ViewerMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Pan/zoom/rotate viewport
    DeepZoom,
    /// Static image scaled to fit the viewer
    Scaled,
}

impl From<Mode> for ViewerMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::DeepZoom => ViewerMode::DeepZoom,
            Mode::Scaled => ViewerMode::Scaled,
        }
    }
}

/// Render a slide with its cell detections
#[derive(Debug, Parser)]
#[command(name = "slidescope", version = BuildInfo::version())]
struct Args {
    /// Inference record JSON
    record: PathBuf,

    /// Slide image; defaults to <images-dir>/<record filename>
    #[arg(long)]
    image: Option<PathBuf>,

    /// Base directory for the record's filename
    #[arg(long)]
    images_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Mode::DeepZoom)]
    mode: Mode,

    /// Zoom relative to the home view (1.0 shows the whole slide)
    #[arg(long)]
    zoom: Option<f64>,

    /// View centre in image pixels, "X,Y"
    #[arg(long, value_parser = parse_point)]
    center: Option<(f64, f64)>,

    /// Clockwise rotation in degrees
    #[arg(long)]
    rotation: Option<f64>,

    /// Viewer size, "WIDTHxHEIGHT"
    #[arg(long, value_parser = parse_size)]
    viewer: Option<(u32, u32)>,

    /// Output PNG for the main viewer
    #[arg(long, default_value = "view.png")]
    out: PathBuf,

    /// Output PNG for the overview thumbnail with the viewport indicator
    #[arg(long)]
    hub_out: Option<PathBuf>,

    #[arg(long)]
    hub_width: Option<u32>,

    /// Settings YAML; defaults to the per-user settings file
    #[arg(long)]
    settings: Option<String>,

    /// Write the effective settings back to the default settings file
    #[arg(long)]
    write_settings: bool,

    /// Print patient information and detection counts
    #[arg(long)]
    summary: bool,

    /// Export buffered log lines to the log directory on exit
    #[arg(long)]
    export_logs: bool,
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("invalid width '{}': {}", w, e))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("invalid height '{}': {}", h, e))?;
    if w == 0 || h == 0 {
        return Err("viewer size must be non-zero".to_string());
    }
    Ok((w, h))
}

fn parse_point(value: &str) -> Result<(f64, f64), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{}'", value))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("invalid x '{}': {}", x, e))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("invalid y '{}': {}", y, e))?;
    Ok((x, y))
}

fn resolve_image_path(args: &Args, config: &Config, filename: &str) -> Option<PathBuf> {
    if let Some(image) = &args.image {
        return Some(image.clone());
    }
    if filename.is_empty() {
        return None;
    }
    let base = args
        .images_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.images_dir));
    Some(base.join(filename))
}

fn print_summary(parsed: &detection::ParsedDetectionResults) {
    let summary = detection::summarize(&parsed.detections);
    println!("Patient ID:   {}", parsed.patient_id);
    println!("Sample type:  {}", parsed.sample_type);
    println!("Date:         {}", parsed.date);
    println!("File:         {}", parsed.filename);
    println!("Detections:   {}", summary.total);
    println!("Cell types:   {}", summary.unique_labels.len());
    for (label, count) in &summary.counts {
        println!("  {:>6}  {}", count, label);
    }
}

fn save_png(image: &image::RgbaImage, path: &Path) -> Result<(), String> {
    image
        .save(path)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    info!("Wrote {}", path.display());
    Ok(())
}

async fn run(args: &Args) -> Result<(), String> {
    let settings = UserSettings::load(args.settings.as_deref());
    if args.write_settings {
        settings.save()?;
    }
    let config = Config::from(&settings);

    let record = InferenceRecord::from_file(&args.record)?;
    let parsed = detection::parse_detection_results(&record);
    if args.summary {
        print_summary(&parsed);
    }

    // A record that failed to parse has no filename; fall back to the raw one
    let filename = if parsed.filename.is_empty() { &record.filename } else { &parsed.filename };
    let image_path = resolve_image_path(args, &config, filename)
        .ok_or_else(|| "No image given and the record has no filename".to_string())?;

    let (width, height) = args.viewer.unwrap_or((config.viewer_width, config.viewer_height));
    let mut viewer = ViewerController::new(args.mode.into(), width, height)
        .with_style(settings.overlay_style())
        .with_limits(settings.zoom_limits());
    viewer.handle(ViewerEvent::DetectionsChanged(parsed.detections));

    let ticket = viewer.request_image(image_path.to_string_lossy());
    let outcome = loader::load_image(ticket, &image_path).await;
    viewer.handle(ViewerEvent::ImageLoaded(outcome));

    if let Some(home) = viewer.viewport() {
        if args.zoom.is_some() || args.center.is_some() || args.rotation.is_some() {
            let mut view = home.with_zoom(home.zoom * args.zoom.unwrap_or(1.0));
            if let Some((x, y)) = args.center {
                view = view.with_center(x / home.image_width, y / home.image_width);
            }
            if let Some(rotation) = args.rotation {
                view = view.with_rotation(rotation);
            }
            viewer.handle(ViewerEvent::ViewChanged(view));
        }
    } else if viewer.mode() == ViewerMode::Scaled && (args.zoom.is_some() || args.center.is_some() || args.rotation.is_some()) {
        warn!("--zoom, --center and --rotation only apply to the deep-zoom mode");
    }

    let frame = viewer
        .render_frame()
        .ok_or_else(|| format!("Nothing to render: {} did not load", image_path.display()))?;
    save_png(&frame, &args.out)?;

    if let (Some(hub_out), Some(image)) = (&args.hub_out, viewer.image()) {
        let mut thumbnail = hub::make_thumbnail(&image.pixels, args.hub_width.unwrap_or(config.hub_width));
        hub::paint_indicator(&mut thumbnail, &viewer.hub_indicator());
        save_png(&thumbnail, hub_out)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_ring = logging::init();
    logging::install_panic_hook(APP_NAME, log_ring.clone());
    debug!("slidescope {}", BUILD.describe());

    let status = match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    };

    if args.export_logs {
        match logging::export_debug_logs(APP_NAME, &log_ring) {
            Ok(path) => println!("Debug logs exported to: {}", path.display()),
            Err(e) => eprintln!("Failed to export debug logs: {}", e),
        }
    }

    status
}
