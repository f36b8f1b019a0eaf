use std::path::PathBuf;
use std::time::Duration;

use crate::detection::{YoloParams, default_class_names};

pub const DEFAULT_STORE_FILE: &str = "caries_patients.db";
pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video1";

/// Interval between capture ticks while a video or camera is running.
pub const TICK_INTERVAL: Duration = Duration::from_millis(30);

/// Settings resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub class_names: Vec<String>,
    pub store_path: PathBuf,
    /// Parent of every `<Name>_result/` folder.
    pub output_root: PathBuf,
    pub camera_device: String,
    pub tick_interval: Duration,
    pub yolo: YoloParams,
}

impl AppConfig {
    pub fn new(model_path: PathBuf) -> Self {
        Self {
            model_path,
            class_names: default_class_names(),
            store_path: PathBuf::from(DEFAULT_STORE_FILE),
            output_root: PathBuf::from("."),
            camera_device: DEFAULT_CAMERA_DEVICE.to_string(),
            tick_interval: TICK_INTERVAL,
            yolo: YoloParams::default(),
        }
    }

    /// Check everything that would otherwise fail after the window opens.
    pub fn resolve(self) -> anyhow::Result<Self> {
        if !self.model_path.is_file() {
            anyhow::bail!(
                "Detection model not found at {}.\n\
                 Pass --model <PATH> or set CARIES_MODEL to a converted .rten model.",
                self.model_path.display()
            );
        }
        if self.class_names.is_empty() {
            anyhow::bail!("At least one class name is required");
        }
        if !self.output_root.is_dir() {
            anyhow::bail!(
                "Output folder {} does not exist",
                self.output_root.display()
            );
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_fails_fast() {
        let err = AppConfig::new(PathBuf::from("/nonexistent/caries.rten"))
            .resolve()
            .unwrap_err();
        assert!(err.to_string().contains("CARIES_MODEL"));
    }

    #[test]
    fn existing_model_resolves_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("caries.rten");
        std::fs::write(&model, b"stub").unwrap();

        let config = AppConfig::new(model).resolve().unwrap();
        assert_eq!(config.class_names, default_class_names());
        assert_eq!(config.store_path, PathBuf::from(DEFAULT_STORE_FILE));
        assert_eq!(config.tick_interval, Duration::from_millis(30));
    }
}
