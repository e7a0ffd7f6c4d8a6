// src/matching/db.rs - Patient record lookups for the matching engine
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tokio_postgres::Row as PgRow;

use crate::models::PatientRecord;
use crate::utils::db_connect::{get_pool_status, PgPool};

/// Where patient rows come from. The engine only needs lookup by record id and by
/// issuing hospital.
#[allow(async_fn_in_trait)]
pub trait PatientSource {
    async fn fetch_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>>;
    async fn fetch_by_hospital(&self, hospital_id: &str) -> Result<Vec<PatientRecord>>;
}

/// Reads a JSON array of patient records.
pub fn load_records(path: &Path) -> Result<Vec<PatientRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read patient records from {}", path.display()))?;
    let records: Vec<PatientRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Expected a JSON array of patient records in {}", path.display()))?;
    let unnamed = records.iter().filter(|r| !r.has_name()).count();
    if unnamed > 0 {
        warn!("{} record(s) in {} have no name", unnamed, path.display());
    }
    Ok(records)
}

/// Reads a single patient record object.
pub fn load_record(path: &Path) -> Result<PatientRecord> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read patient record from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Expected a patient record object in {}", path.display()))
}

/// Records held in memory, indexed by record id.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPatientSource {
    records: Vec<PatientRecord>,
    by_id: HashMap<String, usize>,
}

impl InMemoryPatientSource {
    pub fn new(records: Vec<PatientRecord>) -> Self {
        let mut by_id = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            if let Some(id) = record.patient_id() {
                if by_id.insert(id.to_string(), idx).is_some() {
                    warn!("Duplicate patient_id '{}'; keeping the later record", id);
                }
            }
        }
        Self { records, by_id }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let records = load_records(path)?;
        info!("Loaded {} patient records from {}", records.len(), path.display());
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }
}

impl PatientSource for InMemoryPatientSource {
    async fn fetch_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>> {
        Ok(self
            .by_id
            .get(patient_id.trim())
            .map(|&idx| self.records[idx].clone()))
    }

    async fn fetch_by_hospital(&self, hospital_id: &str) -> Result<Vec<PatientRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.hospital_id() == Some(hospital_id.trim()))
            .cloned()
            .collect())
    }
}

const PATIENT_COLUMNS: &str = "patient_id, hospital_id, name, dob::text AS dob, mobile, gender, \
     abha_number, aadhaar_number, address, state";

/// `patients` table over a bb8 pool.
#[derive(Clone)]
pub struct PgPatientSource {
    pool: PgPool,
}

impl PgPatientSource {
    pub fn new(pool: PgPool) -> Self {
        let (connections, idle) = get_pool_status(&pool);
        debug!("Patient source pool: {} connections ({} idle)", connections, idle);
        Self { pool }
    }

    fn row_to_record(row: &PgRow) -> Result<PatientRecord> {
        Ok(PatientRecord {
            patient_id: row.try_get("patient_id")?,
            hospital_id: row.try_get("hospital_id")?,
            name: row
                .try_get::<_, Option<String>>("name")?
                .unwrap_or_default(),
            dob: row.try_get("dob")?,
            mobile: row.try_get("mobile")?,
            gender: row.try_get("gender")?,
            abha_number: row.try_get("abha_number")?,
            aadhaar_number: row.try_get("aadhaar_number")?,
            address: row.try_get("address")?,
            state: row.try_get("state")?,
        })
    }
}

impl PatientSource for PgPatientSource {
    async fn fetch_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for fetch_patient")?;
        let query = format!("SELECT {} FROM patients WHERE patient_id = $1", PATIENT_COLUMNS);
        let row = conn
            .query_opt(query.as_str(), &[&patient_id])
            .await
            .with_context(|| format!("Failed to query patient {}", patient_id))?;
        match row {
            Some(row) => {
                let record = Self::row_to_record(&row)
                    .with_context(|| format!("Failed to decode patient row {}", patient_id))?;
                Ok(Some(record))
            }
            None => {
                debug!("Patient {} not found", patient_id);
                Ok(None)
            }
        }
    }

    async fn fetch_by_hospital(&self, hospital_id: &str) -> Result<Vec<PatientRecord>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for fetch_by_hospital")?;
        let query = format!(
            "SELECT {} FROM patients WHERE hospital_id = $1 ORDER BY patient_id",
            PATIENT_COLUMNS
        );
        let rows = conn
            .query(query.as_str(), &[&hospital_id])
            .await
            .with_context(|| format!("Failed to query patients for hospital {}", hospital_id))?;

        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for row in &rows {
            match Self::row_to_record(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping undecodable patient row: {}", e);
                    skipped += 1;
                }
            }
        }
        info!(
            "Fetched {} patients for hospital {} ({} skipped)",
            records.len(),
            hospital_id,
            skipped
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> InMemoryPatientSource {
        InMemoryPatientSource::new(vec![
            PatientRecord::new("Ramesh Singh").with_id("HA001", "hospital_a"),
            PatientRecord::new("Ramehs Singh").with_id("HB001", "hospital_b"),
            PatientRecord::new("Priya Sharma").with_id("HA002", "hospital_a"),
        ])
    }

    #[tokio::test]
    async fn test_fetch_patient_by_id() {
        let source = source();
        let record = source.fetch_patient("HB001").await.unwrap().unwrap();
        assert_eq!(record.name, "Ramehs Singh");
        assert!(source.fetch_patient("HZ999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_by_hospital() {
        let records = source().fetch_by_hospital("hospital_a").await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.hospital_id() == Some("hospital_a")));
    }

    #[test]
    fn test_load_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        fs::write(
            &path,
            r#"[{"patient_id": "HA001", "name": "Ramesh Singh", "mobile": 9876543210},
                {"patient_id": "HA002", "name": "Priya Sharma", "abha_number": null}]"#,
        )
        .unwrap();
        let source = InMemoryPatientSource::from_json_file(&path).unwrap();
        assert_eq!(source.records().len(), 2);
        assert_eq!(source.records()[0].mobile(), Some("9876543210"));
    }
}
