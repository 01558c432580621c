pub mod closeout;
pub mod feedback;
pub mod leave;
pub mod schedule;
pub mod session;
pub mod trip;

use std::sync::Arc;

use chrono::NaiveDate;
use tauri::State;

use crate::core_state::{CoreError, CoreState};

/// Liveness check for the webview.
#[tauri::command]
pub fn health_check() -> String {
    tracing::debug!("Health check called");
    "ok".to_string()
}

/// Run a `CoreState` operation on a blocking thread. Every operation may
/// make HTTP calls, which must not freeze the UI.
pub(crate) async fn blocking<T, F>(state: State<'_, Arc<CoreState>>, op: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&CoreState) -> Result<T, CoreError> + Send + 'static,
{
    let state = state.inner().clone();
    tauri::async_runtime::spawn_blocking(move || op(&state).map_err(|e| e.to_string()))
        .await
        .map_err(|e| format!("Task failed: {e}"))?
}

/// The caller's date when given, else the local calendar date.
pub(crate) fn today_or(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| chrono::Local::now().date_naive())
}
