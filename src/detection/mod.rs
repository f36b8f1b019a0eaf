pub mod annotate;
pub mod postprocess;
pub mod yolo;

use image::RgbImage;

use crate::models::{CariesClass, Choice, FrameResult};

pub use postprocess::{Letterbox, YoloParams};
pub use yolo::RtenYoloDetector;

/// The inference service. Constructed once at startup and handed to the
/// capture session, so tests can substitute a scripted implementation.
pub trait CariesDetector {
    /// Name table that class indices in a `FrameResult` resolve through.
    fn class_names(&self) -> &[String];

    /// Run the model on one frame.
    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<FrameResult>;
}

impl std::fmt::Debug for dyn CariesDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CariesDetector")
            .field("class_names", &self.class_names())
            .finish()
    }
}

/// Class names in the order the bundled model was trained with.
pub fn default_class_names() -> Vec<String> {
    CariesClass::ALL
        .iter()
        .map(|class| class.label().to_string())
        .collect()
}
