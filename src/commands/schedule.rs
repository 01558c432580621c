use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tauri::State;

use super::{blocking, today_or};
use crate::core_state::CoreState;
use crate::lifecycle::{available_actions, AppointmentAction};
use crate::models::{Appointment, PatientSummary};

/// Two-week calendar keyed by visit date.
#[tauri::command]
pub async fn get_schedule(
    state: State<'_, Arc<CoreState>>,
    today: Option<NaiveDate>,
) -> Result<BTreeMap<NaiveDate, Vec<Appointment>>, String> {
    let today = today_or(today);
    blocking(state, move |core| {
        let book = core.schedule(today)?;
        Ok(book
            .dates()
            .into_iter()
            .map(|date| (date, book.for_date(date).to_vec()))
            .collect())
    })
    .await
}

#[tauri::command]
pub async fn get_home_agenda(
    state: State<'_, Arc<CoreState>>,
    today: Option<NaiveDate>,
) -> Result<Vec<Appointment>, String> {
    let today = today_or(today);
    blocking(state, move |core| core.home_agenda(today)).await
}

#[tauri::command]
pub async fn get_history(
    state: State<'_, Arc<CoreState>>,
    date: Option<NaiveDate>,
) -> Result<Vec<Appointment>, String> {
    blocking(state, move |core| core.history(date)).await
}

#[derive(serde::Serialize)]
pub struct AppointmentScreen {
    pub appointment: Appointment,
    pub actions: Vec<AppointmentAction>,
}

#[tauri::command]
pub async fn get_appointment(
    state: State<'_, Arc<CoreState>>,
    appointment_id: String,
) -> Result<AppointmentScreen, String> {
    blocking(state, move |core| {
        let appointment = core.appointment(&appointment_id)?;
        let actions = available_actions(&appointment);
        Ok(AppointmentScreen { appointment, actions })
    })
    .await
}

#[tauri::command]
pub async fn get_patient(
    state: State<'_, Arc<CoreState>>,
    patient_id: String,
) -> Result<PatientSummary, String> {
    blocking(state, move |core| core.patient(&patient_id)).await
}
