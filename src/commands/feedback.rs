use std::sync::Arc;

use tauri::State;

use super::blocking;
use crate::core_state::CoreState;
use crate::feedback::{FeedbackSummary, RatingFilter};
use crate::models::Feedback;

#[tauri::command]
pub async fn get_appointment_feedback(
    state: State<'_, Arc<CoreState>>,
    appointment_id: String,
) -> Result<Option<Feedback>, String> {
    blocking(state, move |core| core.appointment_feedback(&appointment_id)).await
}

#[tauri::command]
pub async fn get_nurse_feedback(
    state: State<'_, Arc<CoreState>>,
    filter: Option<RatingFilter>,
) -> Result<FeedbackSummary, String> {
    blocking(state, move |core| core.nurse_feedback(filter.unwrap_or_default())).await
}
