//! Integration tests for the patient store and intake submission.

mod common;

use caries_detector::intake::{IntakeError, IntakeForm};
use common::*;

#[tokio::test]
async fn test_empty_store() -> anyhow::Result<()> {
    let (store, _temp_dir) = create_test_store().await;

    assert_eq!(store.count_patients().await?, 0);
    assert!(store.get_patients().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_submit_appends_one_row() -> anyhow::Result<()> {
    let (store, _temp_dir) = create_test_store().await;
    let form = make_complete_form("Alice");

    let record = form.submit(&store).await?;
    assert_eq!(store.count_patients().await?, 1);

    let rows = store.get_patients().await?;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].id > 0);
    assert_eq!(rows[0].record, record);
    assert_eq!(rows[0].record.name, "Alice");
    assert_eq!(rows[0].record.gender, Gender::Female);
    assert_eq!(rows[0].record.age, 34);
    assert_eq!(rows[0].record.brushing_habit, BrushingHabit::TwiceADay);
    assert_eq!(rows[0].record.smoking_status, SmokingStatus::NonSmoker);
    assert_eq!(rows[0].record.last_dental_visit, LastDentalVisit::LessThanAYear);
    assert_eq!(rows[0].record.notes, "Sensitive lower molars");

    Ok(())
}

#[tokio::test]
async fn test_invalid_form_leaves_store_unchanged() -> anyhow::Result<()> {
    let (store, _temp_dir) = create_test_store().await;
    make_complete_form("Existing").submit(&store).await?;

    let mut form = make_complete_form("Bob");
    form.smoking_status = None;
    let err = form.submit(&store).await.unwrap_err();

    let intake_err = err.downcast_ref::<IntakeError>().expect("expected IntakeError");
    assert_eq!(
        *intake_err,
        IntakeError::Incomplete {
            missing: vec!["Smoking Status"]
        }
    );
    assert_eq!(store.count_patients().await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_patients_are_allowed() -> anyhow::Result<()> {
    let (store, _temp_dir) = create_test_store().await;
    let form = make_complete_form("Carol");

    form.submit(&store).await?;
    form.submit(&store).await?;

    let rows = store.get_patients().await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].record, rows[1].record);
    assert!(rows[0].id < rows[1].id);

    Ok(())
}

#[tokio::test]
async fn test_name_is_stored_as_typed() -> anyhow::Result<()> {
    let (store, _temp_dir) = create_test_store().await;
    let form = make_complete_form(" Dana  Ruiz ");

    form.submit(&store).await?;

    let rows = store.get_patients().await?;
    assert_eq!(rows[0].record.name, " Dana  Ruiz ");

    Ok(())
}

#[tokio::test]
async fn test_store_persists_across_reopen() -> anyhow::Result<()> {
    let (store, temp_dir) = create_test_store().await;
    let path = store.path().to_path_buf();
    make_complete_form("Dana").submit(&store).await?;
    store.close().await?;

    let reopened = PatientDb::new(&path).await?;
    let rows = reopened.get_patients().await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record.name, "Dana");

    drop(temp_dir);
    Ok(())
}

#[tokio::test]
async fn test_missing_parent_directory_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("missing").join("patients.db");

    assert!(PatientDb::new(&path).await.is_err());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_blank_form_lists_every_missing_field() {
    let (store, _temp_dir) = create_test_store().await;
    let mut form = IntakeForm::new();
    form.name = "   ".to_string();

    let err = form.submit(&store).await.unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Please fill in all required fields"));
    for field in [
        "Patient Name",
        "Gender",
        "Brushing Habit",
        "Smoking Status",
        "Last Dental Appointment",
    ] {
        assert!(message.contains(field), "{} not listed in {:?}", field, message);
    }
}
