use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use caries_detector::capture::FrameSequence;
use caries_detector::core::db::PatientDb;
use caries_detector::detection::{CariesDetector, default_class_names};
use caries_detector::intake::IntakeForm;
use caries_detector::models::{
    BoundingBox, BrushingHabit, Detection, FrameResult, Gender, LastDentalVisit, SmokingStatus,
};
use image::{ImageBuffer, Rgb, RgbImage};

/// Detector that answers each call with the next scripted list of class
/// indices, and with no detections once the script runs out.
pub struct ScriptedDetector {
    class_names: Vec<String>,
    script: Vec<Vec<usize>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Vec<usize>>) -> Self {
        Self {
            class_names: default_class_names(),
            script,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_class_names(mut self, names: &[&str]) -> Self {
        self.class_names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Shared counter of `detect` calls, readable after the detector is boxed.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl CariesDetector for ScriptedDetector {
    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<FrameResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let detections = self
            .script
            .get(call)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|class_id| Detection {
                class_id,
                confidence: 0.9,
                bbox: BoundingBox {
                    x1: 1.0,
                    y1: 1.0,
                    x2: 5.0,
                    y2: 5.0,
                },
            })
            .collect();
        Ok(FrameResult {
            detections,
            annotated: frame.clone(),
        })
    }
}

/// Creates a solid test frame.
pub fn test_frame(shade: u8) -> RgbImage {
    ImageBuffer::from_fn(32, 24, |_, _| Rgb([shade, shade, shade]))
}

/// An in-memory video of `count` frames at `fps`.
pub fn test_video(count: usize, fps: f64) -> FrameSequence {
    let frames = (0..count).map(|i| test_frame((i % 256) as u8)).collect();
    FrameSequence::new(frames, fps).with_name("test video")
}

/// Creates a PatientDb in a temporary directory.
/// Returns both the store and the temp directory (which must be kept alive).
pub async fn create_test_store() -> (PatientDb, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("patients.db");
    let store = PatientDb::new(&path)
        .await
        .expect("Failed to create test store");
    (store, dir)
}

/// A fully filled-in intake form.
pub fn make_complete_form(name: &str) -> IntakeForm {
    IntakeForm {
        name: name.to_string(),
        gender: Some(Gender::Female),
        age: 34,
        brushing_habit: Some(BrushingHabit::TwiceADay),
        smoking_status: Some(SmokingStatus::NonSmoker),
        last_dental_visit: Some(LastDentalVisit::LessThanAYear),
        notes: "Sensitive lower molars".to_string(),
        ..IntakeForm::new()
    }
}
