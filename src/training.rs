//! Launcher for the external YOLO trainer.
//!
//! Training itself happens in the `yolo` CLI; this only assembles the
//! invocation from a fixed set of hyperparameters and waits for it.

use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use anyhow::Context;

pub const DEFAULT_TRAINER: &str = "yolo";

#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Dataset description (`data.yaml`) listing image folders and class names.
    pub data: PathBuf,
    /// Pretrained weights to start from.
    pub model: String,
    pub epochs: u32,
    pub batch: u32,
    pub imgsz: u32,
    /// `cuda`, `cpu`, or a device index.
    pub device: String,
    pub trainer: String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("data.yaml"),
            model: "yolo11n.pt".to_string(),
            epochs: 50,
            batch: 16,
            imgsz: 640,
            device: "cuda".to_string(),
            trainer: DEFAULT_TRAINER.to_string(),
        }
    }
}

impl TrainConfig {
    /// Trainer arguments after the executable name.
    pub fn args(&self) -> Vec<String> {
        vec![
            "detect".to_string(),
            "train".to_string(),
            format!("data={}", self.data.display()),
            format!("model={}", self.model),
            format!("epochs={}", self.epochs),
            format!("batch={}", self.batch),
            format!("imgsz={}", self.imgsz),
            format!("device={}", self.device),
        ]
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.trainer);
        command.args(self.args());
        command
    }

    /// The invocation as one shell-style line, for `--dry-run` and logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.trainer.clone())
            .chain(self.args())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the trainer to completion with inherited stdio.
    pub fn run(&self) -> anyhow::Result<ExitStatus> {
        if !self.data.is_file() {
            anyhow::bail!("Dataset config {} not found", self.data.display());
        }
        log::info!("Starting training: {}", self.command_line());
        let status = self
            .command()
            .status()
            .with_context(|| format!("Failed to launch trainer {:?}", self.trainer))?;
        log::info!("Trainer exited with {}", status);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_arguments_carry_fixed_hyperparameters() {
        let args = TrainConfig::default().args();
        assert_eq!(&args[..2], ["detect", "train"]);
        for expected in [
            "data=data.yaml",
            "model=yolo11n.pt",
            "epochs=50",
            "batch=16",
            "imgsz=640",
            "device=cuda",
        ] {
            assert!(args.iter().any(|a| a == expected), "missing {}", expected);
        }
    }

    #[test]
    fn command_line_starts_with_trainer() {
        let config = TrainConfig {
            device: "cpu".to_string(),
            ..Default::default()
        };
        let line = config.command_line();
        assert!(line.starts_with("yolo detect train "));
        assert!(line.ends_with("device=cpu"));
    }

    #[test]
    fn missing_dataset_is_reported_before_launch() {
        let config = TrainConfig {
            data: PathBuf::from("/nonexistent/data.yaml"),
            trainer: "/nonexistent/yolo".to_string(),
            ..Default::default()
        };
        let err = config.run().unwrap_err();
        assert!(err.to_string().contains("data.yaml"));
    }
}
