//! Validation rules of the intake form.

mod common;

use caries_detector::intake::{IntakeError, IntakeForm, MAX_AGE};
use common::*;

#[test]
fn test_new_form_is_dated_and_unselected() {
    let form = IntakeForm::new();

    assert_eq!(form.date.len(), 10);
    assert_eq!(&form.date[4..5], "-");
    assert_eq!(&form.date[7..8], "-");
    assert!(form.gender.is_none());
    assert!(form.brushing_habit.is_none());
    assert!(form.smoking_status.is_none());
    assert!(form.last_dental_visit.is_none());
}

#[test]
fn test_complete_form_builds_record() {
    let form = make_complete_form("  Eve  ");
    let record = form.validate().unwrap();

    assert_eq!(record.name, "  Eve  ");
    assert_eq!(record.date, form.date);
    assert_eq!(record.gender, Gender::Female);
}

#[test]
fn test_sentinel_choice_is_rejected() {
    let mut form = make_complete_form("Frank");
    form.gender = None;
    form.last_dental_visit = None;

    assert_eq!(
        form.validate(),
        Err(IntakeError::Incomplete {
            missing: vec!["Gender", "Last Dental Appointment"]
        })
    );
}

#[test]
fn test_age_is_clamped() {
    let mut form = make_complete_form("Gus");
    form.set_age(200);
    assert_eq!(form.age, MAX_AGE);

    form.set_age(0);
    assert_eq!(form.validate().unwrap().age, 0);
}

#[test]
fn test_record_fields_follow_store_columns() {
    let record = make_complete_form("Hana").validate().unwrap();
    let fields = record.fields();

    assert_eq!(fields[1], ("Name", "Hana".to_string()));
    assert_eq!(fields[3], ("Age", "34".to_string()));
    assert_eq!(fields[4], ("Brushing Habit", "Twice a day".to_string()));
    assert_eq!(fields[5], ("Smoking Status", "Non-Smoker".to_string()));
    assert_eq!(fields[6], ("Last Dental Appointment", "Less than a year".to_string()));
}
