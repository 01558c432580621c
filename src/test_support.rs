//! Shared fixtures for unit tests.

use chrono::{NaiveDate, NaiveDateTime};

use crate::geo::Coordinate;
use crate::models::{
    AccountInfo, Appointment, AppointmentDetail, AppointmentStatus, MedicalReport, PaymentStatus,
    ReportStatus, ServicePackage, Task, TaskStatus,
};

pub const NURSE_ID: &str = "nurse-1";
pub const PACKAGE_ID: &str = "pkg-1";

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

pub fn appointment(id: &str, status: AppointmentStatus, paid: bool) -> Appointment {
    appointment_at(id, status, paid, at(2025, 3, 8, 8, 0))
}

pub fn appointment_at(
    id: &str,
    status: AppointmentStatus,
    paid: bool,
    scheduled_at: NaiveDateTime,
) -> Appointment {
    Appointment {
        id: id.into(),
        package_id: PACKAGE_ID.into(),
        service_id: "svc-1".into(),
        nurse_id: NURSE_ID.into(),
        patient_id: "pat-1".into(),
        patient_address: Some("12 Le Loi, District 1".into()),
        location: Some(Coordinate::new(10.7769, 106.7009).unwrap()),
        scheduled_at,
        actual_at: None,
        status,
        payment: PaymentStatus::from_paid_flag(paid),
        total_est_duration: 60,
        created_at: None,
    }
}

pub fn task(id: &str, order: i32, status: TaskStatus) -> Task {
    Task {
        id: id.into(),
        name: format!("Task {id}"),
        order,
        est_duration_minutes: 15,
        unit: "times".into(),
        total_unit: 1,
        client_note: None,
        staff_advice: None,
        scheduled_at: None,
        status,
    }
}

pub fn detail(package_id: &str, tasks: Vec<Task>) -> AppointmentDetail {
    AppointmentDetail {
        package: ServicePackage {
            id: package_id.into(),
            name: "Home wound care".into(),
            total_fee: 450_000,
            paid_amount: 450_000,
            unpaid_amount: 0,
            payment_status: "paid".into(),
            created_at: None,
        },
        tasks,
    }
}

pub fn report(id: &str, text: Option<&str>, status: ReportStatus) -> MedicalReport {
    MedicalReport {
        id: id.into(),
        package_id: PACKAGE_ID.into(),
        patient_id: "pat-1".into(),
        nursing_report: text.map(str::to_string),
        staff_confirmation: None,
        status,
        created_at: None,
    }
}

pub fn nurse_account() -> AccountInfo {
    AccountInfo {
        id: NURSE_ID.into(),
        role: "nurse".into(),
        full_name: "Nguyen Thi Lan".into(),
        phone_number: "0901234567".into(),
        email: Some("lan@example.vn".into()),
    }
}
