//! Integration tests for result aggregation and the summary view data.

mod common;

use caries_detector::detection::CariesDetector;
use caries_detector::models::{BoundingBox, Detection, FrameResult};
use caries_detector::report::{self, ClassTally, SNAPSHOT_FILE_NAME, Summary};
use common::*;

fn frame_with(class_ids: &[usize]) -> FrameResult {
    FrameResult {
        detections: class_ids
            .iter()
            .map(|&class_id| Detection {
                class_id,
                confidence: 0.8,
                bbox: BoundingBox {
                    x1: 0.0,
                    y1: 0.0,
                    x2: 4.0,
                    y2: 4.0,
                },
            })
            .collect(),
        annotated: test_frame(0),
    }
}

fn names() -> Vec<String> {
    caries_detector::detection::default_class_names()
}

#[test]
fn test_percentages_across_frames() {
    // Healthy x2, Initial x1, Moderate x1, Extensive x0.
    let results = vec![frame_with(&[0, 1]), frame_with(&[0]), frame_with(&[2])];
    let summary = Summary::new(&results, &names(), SourceMode::Video);

    assert_eq!(summary.tally.total(), 4);
    assert_eq!(summary.tally.percentage(CariesClass::Healthy), 50.0);
    assert_eq!(summary.tally.percentage(CariesClass::Initial), 25.0);
    assert_eq!(summary.tally.percentage(CariesClass::Moderate), 25.0);
    assert_eq!(summary.tally.percentage(CariesClass::Extensive), 0.0);

    assert_eq!(
        summary.pie_labels(),
        vec![
            "Healthy (50.0%)",
            "Initial (25.0%)",
            "Moderate (25.0%)",
            "Extensive (0.0%)"
        ]
    );
}

#[test]
fn test_video_table_has_no_quantities() {
    let results = vec![frame_with(&[0, 1, 0, 2])];
    let summary = Summary::new(&results, &names(), SourceMode::Camera);

    assert_eq!(summary.table_headers(), vec!["Class", "Percentage (%)"]);
    assert_eq!(summary.table_rows()[0], vec!["Healthy", "50.00"]);
    assert_eq!(summary.table_rows()[3], vec!["Extensive", "0.00"]);
}

#[test]
fn test_image_table_includes_quantities() {
    let results = vec![frame_with(&[3, 3, 1])];
    let summary = Summary::new(&results, &names(), SourceMode::Image);

    assert!(summary.shows_quantities());
    assert_eq!(
        summary.table_headers(),
        vec!["Class", "Quantity", "Percentage (%)"]
    );
    assert_eq!(summary.table_rows()[1], vec!["Initial", "1", "33.33"]);
    assert_eq!(summary.table_rows()[3], vec!["Extensive", "2", "66.67"]);
}

#[test]
fn test_no_detections_gives_zero_shares() {
    let results = vec![frame_with(&[]), frame_with(&[])];
    let summary = Summary::new(&results, &names(), SourceMode::Video);

    assert_eq!(summary.frames, 2);
    assert_eq!(summary.tally.total(), 0);
    for class in [
        CariesClass::Healthy,
        CariesClass::Initial,
        CariesClass::Moderate,
        CariesClass::Extensive,
    ] {
        assert_eq!(summary.tally.percentage(class), 0.0);
    }
}

#[test]
fn test_unknown_labels_are_dropped() {
    let names: Vec<String> = ["Healthy", "Plaque", "Moderate"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    // Index 1 resolves to an unknown label, index 7 to nothing at all.
    let results = vec![frame_with(&[0, 1, 2, 7])];
    let tally = ClassTally::from_results(&results, &names);

    assert_eq!(tally.total(), 2);
    assert_eq!(tally.percentage(CariesClass::Healthy), 50.0);
    assert_eq!(tally.percentage(CariesClass::Moderate), 50.0);
}

#[test]
fn test_custom_name_order_is_respected() {
    let detector = ScriptedDetector::new(vec![]).with_class_names(&[
        "Extensive",
        "Moderate",
        "Initial",
        "Healthy",
    ]);
    let results = vec![frame_with(&[0, 0, 3])];
    let tally = ClassTally::from_results(&results, detector.class_names());

    assert_eq!(tally.count(CariesClass::Extensive), 2);
    assert_eq!(tally.count(CariesClass::Healthy), 1);
}

#[test]
fn test_patient_details_lists_every_field() {
    let record = make_complete_form("Kim").validate().unwrap();
    let lines = report::patient_details(&record);

    assert_eq!(lines.len(), 8);
    assert_eq!(lines[1], "Name: Kim");
    assert_eq!(lines[2], "Gender: Female");
    assert_eq!(lines[7], "Notes: Sensitive lower molars");
}

#[test]
fn test_snapshot_saved_in_patient_folder() -> anyhow::Result<()> {
    let output = tempfile::TempDir::new()?;
    let rgba = vec![255u8; 8 * 6 * 4];

    let path = report::save_snapshot(output.path(), "Lee", 8, 6, rgba)?;
    assert_eq!(
        path,
        output.path().join("Lee_result").join(SNAPSHOT_FILE_NAME)
    );
    let saved = image::open(&path)?;
    assert_eq!((saved.width(), saved.height()), (8, 6));

    Ok(())
}

#[test]
fn test_snapshot_with_wrong_buffer_size_fails() {
    let output = tempfile::TempDir::new().unwrap();
    assert!(report::save_snapshot(output.path(), "Lee", 8, 6, vec![0; 10]).is_err());
}
