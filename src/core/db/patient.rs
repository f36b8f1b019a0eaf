use std::future::Future;

use crate::models::PatientRecord;

/// A row read back from the patient store.
#[derive(Debug, Clone)]
pub struct StoredPatient {
    pub id: i64,
    pub record: PatientRecord,
}

/// Append-only access to the patient table. There is no update or delete path.
pub trait PatientRepository {
    fn append_patient(
        &self,
        record: &PatientRecord,
    ) -> impl Future<Output = anyhow::Result<i64>> + Send;
    fn get_patients(&self) -> impl Future<Output = anyhow::Result<Vec<StoredPatient>>> + Send;
    fn count_patients(&self) -> impl Future<Output = anyhow::Result<u64>> + Send;
}
