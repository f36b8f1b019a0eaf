use std::path::PathBuf;

use clap::Parser;

use caries_detector::training::{DEFAULT_TRAINER, TrainConfig};

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train the caries detection model with the external YOLO trainer")]
struct Cli {
    /// Dataset config (data.yaml)
    #[arg(long, value_name = "FILE", default_value = "data.yaml")]
    data: PathBuf,

    /// Pretrained weights to start from
    #[arg(long, default_value = "yolo11n.pt")]
    model: String,

    #[arg(long, default_value_t = 50)]
    epochs: u32,

    #[arg(long, default_value_t = 16)]
    batch: u32,

    #[arg(long, default_value_t = 640)]
    imgsz: u32,

    /// Training device (`cuda` or `cpu`)
    #[arg(long, default_value = "cuda")]
    device: String,

    /// Trainer executable
    #[arg(long, default_value = DEFAULT_TRAINER)]
    trainer: String,

    /// Print the trainer command without running it
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = TrainConfig {
        data: args.data,
        model: args.model,
        epochs: args.epochs,
        batch: args.batch,
        imgsz: args.imgsz,
        device: args.device,
        trainer: args.trainer,
    };

    if args.dry_run {
        println!("{}", config.command_line());
        return Ok(());
    }

    let status = config.run()?;
    if !status.success() {
        anyhow::bail!("Training failed ({})", status);
    }
    Ok(())
}
