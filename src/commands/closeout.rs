use std::sync::Arc;

use tauri::State;
use uuid::Uuid;

use super::blocking;
use crate::closeout::CloseoutView;
use crate::core_state::{CoreState, RefreshedCloseout};

#[tauri::command]
pub async fn open_closeout(
    state: State<'_, Arc<CoreState>>,
    appointment_id: String,
) -> Result<CloseoutView, String> {
    blocking(state, move |core| core.open_closeout(&appointment_id)).await
}

#[tauri::command]
pub fn close_closeout(state: State<'_, Arc<CoreState>>, screen: Uuid) -> Result<(), String> {
    state.close_closeout(screen).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_closeout(state: State<'_, Arc<CoreState>>, screen: Uuid) -> Result<CloseoutView, String> {
    state.closeout_view(screen).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn refresh_closeout(
    state: State<'_, Arc<CoreState>>,
    screen: Uuid,
) -> Result<RefreshedCloseout, String> {
    blocking(state, move |core| core.refresh_closeout(screen)).await
}

#[tauri::command]
pub async fn complete_task(
    state: State<'_, Arc<CoreState>>,
    screen: Uuid,
    index: usize,
) -> Result<CloseoutView, String> {
    blocking(state, move |core| core.complete_task(screen, index)).await
}

#[tauri::command]
pub fn uncomplete_task(
    state: State<'_, Arc<CoreState>>,
    screen: Uuid,
    index: usize,
) -> Result<CloseoutView, String> {
    state.uncomplete_task(screen, index).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn submit_report(
    state: State<'_, Arc<CoreState>>,
    screen: Uuid,
    text: String,
) -> Result<CloseoutView, String> {
    blocking(state, move |core| core.submit_report(screen, &text)).await
}
