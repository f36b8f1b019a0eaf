use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::RgbaImage;

use crate::models::{CariesClass, Choice, FrameResult, PatientRecord, SourceMode, result_dir};

/// File name of the saved summary view inside the patient folder.
pub const SNAPSHOT_FILE_NAME: &str = "analysis_result_fullpage.png";

/// Per-class detection counts across every processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassTally {
    counts: [u64; 4],
}

impl ClassTally {
    /// Resolve every detection's class index through `class_names` and count
    /// it. Labels outside the four known classes are dropped without error.
    pub fn from_results(results: &[FrameResult], class_names: &[String]) -> Self {
        let mut tally = Self::default();
        for class_id in results.iter().flat_map(FrameResult::class_ids) {
            let class = class_names
                .get(class_id)
                .and_then(|label| CariesClass::from_label(label));
            match class {
                Some(class) => tally.counts[class.index()] += 1,
                None => log::debug!("Dropping detection with unknown class index {}", class_id),
            }
        }
        tally
    }

    pub fn count(&self, class: CariesClass) -> u64 {
        self.counts[class.index()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Share of all detections, 0.0 for every class when nothing was detected.
    pub fn percentage(&self, class: CariesClass) -> f64 {
        let total = self.total().max(1);
        self.count(class) as f64 / total as f64 * 100.0
    }
}

/// The read-only result of aggregating one capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub mode: SourceMode,
    pub tally: ClassTally,
    pub frames: usize,
}

impl Summary {
    pub fn new(results: &[FrameResult], class_names: &[String], mode: SourceMode) -> Self {
        Self {
            mode,
            tally: ClassTally::from_results(results, class_names),
            frames: results.len(),
        }
    }

    /// Raw counts are only comparable for a single image.
    pub fn shows_quantities(&self) -> bool {
        self.mode == SourceMode::Image
    }

    /// Slice labels for the pie chart, e.g. `Healthy (50.0%)`.
    pub fn pie_labels(&self) -> Vec<String> {
        CariesClass::ALL
            .iter()
            .map(|&class| format!("{} ({:.1}%)", class, self.tally.percentage(class)))
            .collect()
    }

    pub fn table_headers(&self) -> Vec<&'static str> {
        if self.shows_quantities() {
            vec!["Class", "Quantity", "Percentage (%)"]
        } else {
            vec!["Class", "Percentage (%)"]
        }
    }

    pub fn table_rows(&self) -> Vec<Vec<String>> {
        CariesClass::ALL
            .iter()
            .map(|&class| {
                let percentage = format!("{:.2}", self.tally.percentage(class));
                if self.shows_quantities() {
                    vec![class.to_string(), self.tally.count(class).to_string(), percentage]
                } else {
                    vec![class.to_string(), percentage]
                }
            })
            .collect()
    }
}

/// `Key: Value` lines for the patient detail panel.
pub fn patient_details(record: &PatientRecord) -> Vec<String> {
    record
        .fields()
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect()
}

/// Save a captured RGBA snapshot of the summary view to
/// `<output_root>/<name>_result/analysis_result_fullpage.png`.
pub fn save_snapshot(
    output_root: &Path,
    patient_name: &str,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
) -> anyhow::Result<PathBuf> {
    let image = RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| anyhow::anyhow!("Snapshot buffer does not match {}x{}", width, height))?;

    let dir = result_dir(output_root, patient_name);
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create output folder {:?}", dir))?;
    let path = dir.join(SNAPSHOT_FILE_NAME);
    image
        .save(&path)
        .with_context(|| format!("Failed to save snapshot {:?}", path))?;
    log::info!("Saved analysis snapshot to {}", path.display());
    Ok(path)
}
