// src/models/patient.rs
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// One hospital's view of a person.
///
/// Only `name` is required. Every other field may be absent, blank, or malformed;
/// the matchers treat all of those as "missing" rather than as errors. Records decoded
/// from request bodies are often partial, and loosely typed sources sometimes send
/// phone numbers or identifiers as JSON numbers, so optional fields accept any scalar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub patient_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hospital_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dob: Option<String>,
    #[serde(default, alias = "phone", deserialize_with = "lenient_string")]
    pub mobile: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gender: Option<String>,
    #[serde(default, alias = "health_id", deserialize_with = "lenient_string")]
    pub abha_number: Option<String>,
    #[serde(default, alias = "civil_id", deserialize_with = "lenient_string")]
    pub aadhaar_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(s)) => Some(s),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        Some(JsonValue::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Trimmed, non-empty view of an optional field.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl PatientRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, patient_id: &str, hospital_id: &str) -> Self {
        self.patient_id = Some(patient_id.to_string());
        self.hospital_id = Some(hospital_id.to_string());
        self
    }

    pub fn with_dob(mut self, dob: &str) -> Self {
        self.dob = Some(dob.to_string());
        self
    }

    pub fn with_mobile(mut self, mobile: &str) -> Self {
        self.mobile = Some(mobile.to_string());
        self
    }

    pub fn with_gender(mut self, gender: &str) -> Self {
        self.gender = Some(gender.to_string());
        self
    }

    pub fn with_abha(mut self, abha_number: &str) -> Self {
        self.abha_number = Some(abha_number.to_string());
        self
    }

    pub fn with_aadhaar(mut self, aadhaar_number: &str) -> Self {
        self.aadhaar_number = Some(aadhaar_number.to_string());
        self
    }

    pub fn patient_id(&self) -> Option<&str> {
        present(&self.patient_id)
    }

    pub fn hospital_id(&self) -> Option<&str> {
        present(&self.hospital_id)
    }

    pub fn dob(&self) -> Option<&str> {
        present(&self.dob)
    }

    pub fn mobile(&self) -> Option<&str> {
        present(&self.mobile)
    }

    pub fn gender(&self) -> Option<&str> {
        present(&self.gender)
    }

    pub fn abha_number(&self) -> Option<&str> {
        present(&self.abha_number)
    }

    pub fn aadhaar_number(&self) -> Option<&str> {
        present(&self.aadhaar_number)
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Identifier used in verdicts and logs.
    pub fn display_id(&self) -> &str {
        self.patient_id().unwrap_or("UNKNOWN")
    }
}
