use serde::{Deserialize, Serialize};

use crate::api::types::{AccountRecord, NurseProfileRecord, PatientRecord};

/// Role string the platform gives to patients' relatives.
pub const RELATIVES_ROLE: &str = "relatives";

/// Logged-in account, persisted between launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    pub role: String,
    pub full_name: String,
    pub phone_number: String,
    pub email: Option<String>,
}

impl AccountInfo {
    /// Relatives book visits from the family app; this client is nurse-only.
    pub fn is_relative(&self) -> bool {
        self.role.eq_ignore_ascii_case(RELATIVES_ROLE)
    }
}

impl From<AccountRecord> for AccountInfo {
    fn from(record: AccountRecord) -> Self {
        AccountInfo {
            id: record.id,
            role: record.role,
            full_name: record.full_name.unwrap_or_default(),
            phone_number: record.phone_number.unwrap_or_default(),
            email: record.email.filter(|e| !e.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurseProfile {
    pub account_id: String,
    pub nurse_id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: String,
    pub picture: Option<String>,
    pub gender_male: Option<bool>,
    pub date_of_birth: Option<String>,
    pub address: String,
    pub current_work_place: Option<String>,
    pub education_level: Option<String>,
    pub experience: Option<String>,
    pub certificate: Option<String>,
    pub slogan: Option<String>,
    pub rate: Option<String>,
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

impl From<NurseProfileRecord> for NurseProfile {
    fn from(record: NurseProfileRecord) -> Self {
        let address = [record.address, record.ward, record.district, record.city]
            .into_iter()
            .flatten()
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        NurseProfile {
            account_id: record.id,
            nurse_id: record.nurse_id.unwrap_or_default(),
            full_name: record
                .nurse_name
                .filter(|n| !n.trim().is_empty())
                .or(record.full_name)
                .unwrap_or_default(),
            email: non_blank(record.email),
            phone_number: record.phone_number.unwrap_or_default(),
            picture: non_blank(record.nurse_picture),
            gender_male: record.gender,
            date_of_birth: non_blank(record.dob),
            address,
            current_work_place: non_blank(record.current_work_place),
            education_level: non_blank(record.education_level),
            experience: non_blank(record.experience),
            certificate: non_blank(record.certificate),
            slogan: non_blank(record.slogan),
            rate: non_blank(record.rate),
        }
    }
}

/// Patient summary shown on the visit screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl From<PatientRecord> for PatientSummary {
    fn from(record: PatientRecord) -> Self {
        PatientSummary {
            id: record.id,
            full_name: record.full_name.unwrap_or_default(),
            phone_number: non_blank(record.phone_number),
            address: non_blank(record.address),
        }
    }
}
