use clap::Parser;
use std::path::PathBuf;

use caries_detector::config::{AppConfig, DEFAULT_CAMERA_DEVICE, DEFAULT_STORE_FILE};
use caries_detector::detection::{RtenYoloDetector, YoloParams};
use caries_detector::gui;

#[derive(Parser)]
#[command(name = "caries-detector")]
#[command(about = "Screen dental images, videos and camera feeds for caries")]
struct Cli {
    /// Detection model converted to .rten
    #[arg(short, long, value_name = "MODEL", env = "CARIES_MODEL")]
    model: PathBuf,

    /// Patient store (SQLite file, created if absent)
    #[arg(long, value_name = "FILE", env = "CARIES_STORE", default_value = DEFAULT_STORE_FILE)]
    store: PathBuf,

    /// Folder that receives the per-patient result folders
    #[arg(long, value_name = "DIR", env = "CARIES_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Camera device used by "Start Camera"
    #[arg(long, value_name = "DEVICE", env = "CARIES_CAMERA", default_value = DEFAULT_CAMERA_DEVICE)]
    camera: String,

    /// Class names in model output order (comma separated)
    #[arg(long, value_delimiter = ',')]
    classes: Option<Vec<String>>,

    /// Minimum confidence for a detection to be kept
    #[arg(long, default_value_t = YoloParams::default().conf_threshold)]
    confidence: f32,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = AppConfig::new(args.model);
    config.store_path = args.store;
    config.output_root = args.output_dir;
    config.camera_device = args.camera;
    config.yolo.conf_threshold = args.confidence;
    if let Some(classes) = args.classes {
        config.class_names = classes;
    }
    let config = config.resolve()?;

    // Load before the window opens so a bad model aborts with a diagnostic.
    let detector = RtenYoloDetector::load(
        &config.model_path,
        config.class_names.clone(),
        config.yolo,
    )?;

    gui::run(config, Box::new(detector))
}
