mod patient;
mod state;

use std::{path::Path, sync::Arc};

use anyhow::Context;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use state::StoreState;

use crate::models::{
    BrushingHabit, Choice, Gender, LastDentalVisit, PATIENT_COLUMNS, PatientRecord, SmokingStatus,
};

pub use patient::{PatientRepository, StoredPatient};

/// Tabular patient store backed by a single SQLite file.
#[derive(Debug, Clone)]
pub struct PatientDb {
    state: Arc<StoreState>,
}

impl PatientDb {
    pub async fn new<P: AsRef<Path>>(store_file: P) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StoreState::open(store_file).await?),
        })
    }

    pub fn path(&self) -> &Path {
        self.state.path()
    }

    /// Explicitly flush and close the store.
    /// Required before reopening the same file in tests.
    pub async fn close(&self) -> anyhow::Result<()> {
        self.state.close().await
    }
}

impl PatientRepository for PatientDb {
    async fn append_patient(&self, record: &PatientRecord) -> anyhow::Result<i64> {
        let id = sqlx::query(
            r#"INSERT INTO patients
            ("Date", "Name", "Gender", "Age", "Brushing Habit", "Smoking Status", "Last Dental Appointment", "Notes")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(&record.date)
        .bind(&record.name)
        .bind(record.gender.label())
        .bind(i64::from(record.age))
        .bind(record.brushing_habit.label())
        .bind(record.smoking_status.label())
        .bind(record.last_dental_visit.label())
        .bind(&record.notes)
        .execute(&self.state.pool)
        .await
        .with_context(|| format!("Failed to save patient {:?}", record.name))?
        .last_insert_rowid();
        log::info!("Saved patient {:?} as row {}", record.name, id);
        Ok(id)
    }

    async fn get_patients(&self) -> anyhow::Result<Vec<StoredPatient>> {
        sqlx::query(
            r#"SELECT id, "Date", "Name", "Gender", "Age", "Brushing Habit", "Smoking Status",
            "Last Dental Appointment", "Notes" FROM patients ORDER BY id ASC"#,
        )
        .fetch_all(&self.state.pool)
        .await?
        .iter()
        .map(|row| -> anyhow::Result<StoredPatient> {
            Ok(StoredPatient {
                id: row.try_get("id")?,
                record: record_from_row(row)?,
            })
        })
        .collect()
    }

    async fn count_patients(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
            .fetch_one(&self.state.pool)
            .await?;
        Ok(count as u64)
    }
}

fn record_from_row(row: &SqliteRow) -> anyhow::Result<PatientRecord> {
    let text = |column: &str| -> anyhow::Result<String> {
        row.try_get::<String, _>(column)
            .with_context(|| format!("Missing column {:?}", column))
    };
    let age: i64 = row.try_get(PATIENT_COLUMNS[3])?;
    Ok(PatientRecord {
        date: text(PATIENT_COLUMNS[0])?,
        name: text(PATIENT_COLUMNS[1])?,
        gender: parse_choice::<Gender>(&text(PATIENT_COLUMNS[2])?)?,
        age: u8::try_from(age).with_context(|| format!("Age out of range: {}", age))?,
        brushing_habit: parse_choice::<BrushingHabit>(&text(PATIENT_COLUMNS[4])?)?,
        smoking_status: parse_choice::<SmokingStatus>(&text(PATIENT_COLUMNS[5])?)?,
        last_dental_visit: parse_choice::<LastDentalVisit>(&text(PATIENT_COLUMNS[6])?)?,
        notes: text(PATIENT_COLUMNS[7])?,
    })
}

fn parse_choice<T: Choice>(label: &str) -> anyhow::Result<T> {
    T::from_label(label).ok_or_else(|| anyhow::anyhow!("Unknown value in patient store: {:?}", label))
}
