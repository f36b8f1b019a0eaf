use std::fmt;

use time::OffsetDateTime;

use crate::core::db::PatientRepository;
use crate::models::{BrushingHabit, Gender, LastDentalVisit, PatientRecord, SmokingStatus};

pub const MAX_AGE: u8 = 120;

/// Intake form contents. `None` in a choice field is the "Select" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeForm {
    pub date: String,
    pub name: String,
    pub gender: Option<Gender>,
    pub age: u8,
    pub brushing_habit: Option<BrushingHabit>,
    pub smoking_status: Option<SmokingStatus>,
    pub last_dental_visit: Option<LastDentalVisit>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    /// Required fields left empty or at the sentinel.
    Incomplete { missing: Vec<&'static str> },
}

impl fmt::Display for IntakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntakeError::Incomplete { missing } => write!(
                f,
                "Please fill in all required fields (missing: {}).",
                missing.join(", ")
            ),
        }
    }
}

impl std::error::Error for IntakeError {}

impl IntakeForm {
    /// Empty form dated today.
    pub fn new() -> Self {
        Self {
            date: today(),
            ..Default::default()
        }
    }

    pub fn set_age(&mut self, age: u8) {
        self.age = age.min(MAX_AGE);
    }

    /// Build the patient record, or report which required fields are missing.
    pub fn validate(&self) -> Result<PatientRecord, IntakeError> {
        let mut missing = Vec::new();
        if self.name.is_empty() {
            missing.push("Patient Name");
        }
        if self.gender.is_none() {
            missing.push("Gender");
        }
        if self.brushing_habit.is_none() {
            missing.push("Brushing Habit");
        }
        if self.smoking_status.is_none() {
            missing.push("Smoking Status");
        }
        if self.last_dental_visit.is_none() {
            missing.push("Last Dental Appointment");
        }

        match (
            self.gender,
            self.brushing_habit,
            self.smoking_status,
            self.last_dental_visit,
        ) {
            (Some(gender), Some(brushing_habit), Some(smoking_status), Some(last_dental_visit))
                if missing.is_empty() =>
            {
                Ok(PatientRecord {
                    date: self.date.clone(),
                    name: self.name.clone(),
                    gender,
                    age: self.age.min(MAX_AGE),
                    brushing_habit,
                    smoking_status,
                    last_dental_visit,
                    notes: self.notes.clone(),
                })
            }
            _ => Err(IntakeError::Incomplete { missing }),
        }
    }

    /// Validate, then append exactly one row to the store.
    /// An invalid form leaves the store untouched.
    pub async fn submit<R>(&self, store: &R) -> anyhow::Result<PatientRecord>
    where
        R: PatientRepository + Sync,
    {
        let record = self.validate()?;
        store.append_patient(&record).await?;
        Ok(record)
    }
}

/// Local calendar date as `yyyy-MM-dd`.
pub fn today() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let date = now.date();
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}
