use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::{AppointmentStatus, PaymentStatus};
use super::task::{map_tasks, Task};
use crate::api::types::{parse_timestamp, AppointmentDetailRecord, AppointmentRecord, PackageRecord};
use crate::api::ApiError;
use crate::geo::Coordinate;

/// A scheduled visit between a nurse and a patient for a service package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub package_id: String,
    pub service_id: String,
    pub nurse_id: String,
    pub patient_id: String,
    pub patient_address: Option<String>,
    pub location: Option<Coordinate>,
    pub scheduled_at: NaiveDateTime,
    pub actual_at: Option<NaiveDateTime>,
    pub status: AppointmentStatus,
    pub payment: PaymentStatus,
    pub total_est_duration: u32,
    pub created_at: Option<NaiveDateTime>,
}

impl Appointment {
    pub fn scheduled_date(&self) -> NaiveDate {
        self.scheduled_at.date()
    }

    pub fn is_paid(&self) -> bool {
        self.payment == PaymentStatus::Paid
    }
}

/// Service package bought by the patient; tasks hang off it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePackage {
    pub id: String,
    pub name: String,
    pub total_fee: i64,
    pub paid_amount: i64,
    pub unpaid_amount: i64,
    pub payment_status: String,
    pub created_at: Option<NaiveDateTime>,
}

/// Package plus its tasks, ordered by `task-order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDetail {
    pub package: ServicePackage,
    pub tasks: Vec<Task>,
}

fn optional_timestamp(raw: &Option<String>) -> Option<NaiveDateTime> {
    raw.as_deref()
        .filter(|s| !s.trim().is_empty())
        .and_then(parse_timestamp)
}

impl TryFrom<AppointmentRecord> for Appointment {
    type Error = ApiError;

    fn try_from(record: AppointmentRecord) -> Result<Self, Self::Error> {
        let scheduled_at = parse_timestamp(&record.est_date).ok_or_else(|| {
            ApiError::Mapping(format!(
                "appointment {}: unreadable est-date '{}'",
                record.id, record.est_date
            ))
        })?;

        let location = match record.patient_lat_lng.as_deref() {
            Some(raw) if !raw.trim().is_empty() => match raw.parse::<Coordinate>() {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::warn!(appointment = %record.id, error = %e, "Ignoring bad patient GPS");
                    None
                }
            },
            _ => None,
        };

        Ok(Appointment {
            status: AppointmentStatus::from_wire(&record.status),
            payment: PaymentStatus::from_paid_flag(record.is_paid),
            actual_at: optional_timestamp(&record.act_date),
            created_at: optional_timestamp(&record.created_at),
            id: record.id,
            package_id: record.cuspackage_id,
            service_id: record.service_id,
            nurse_id: record.nursing_id.unwrap_or_default(),
            patient_id: record.patient_id,
            patient_address: record.patient_address.filter(|a| !a.trim().is_empty()),
            location,
            scheduled_at,
            total_est_duration: record.total_est_duration,
        })
    }
}

impl From<PackageRecord> for ServicePackage {
    fn from(record: PackageRecord) -> Self {
        ServicePackage {
            created_at: optional_timestamp(&record.created_at),
            id: record.id,
            name: record.name,
            total_fee: record.total_fee,
            paid_amount: record.paid_amount,
            unpaid_amount: record.unpaid_amount,
            payment_status: record.payment_status,
        }
    }
}

impl TryFrom<AppointmentDetailRecord> for AppointmentDetail {
    type Error = ApiError;

    fn try_from(record: AppointmentDetailRecord) -> Result<Self, Self::Error> {
        let tasks = map_tasks(&record.tasks)?;
        Ok(AppointmentDetail {
            package: record.package.into(),
            tasks,
        })
    }
}

/// Map a list of wire records, failing on the first unreadable one.
pub fn map_appointments(records: Vec<AppointmentRecord>) -> Result<Vec<Appointment>, ApiError> {
    records.into_iter().map(Appointment::try_from).collect()
}
