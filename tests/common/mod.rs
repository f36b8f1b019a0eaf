mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from caries_detector for tests
pub use caries_detector::core::db::{PatientDb, PatientRepository, StoredPatient};
pub use caries_detector::models::{
    BrushingHabit, CariesClass, Gender, LastDentalVisit, PatientRecord, SmokingStatus, SourceMode,
};
