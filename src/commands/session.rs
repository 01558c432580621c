use std::sync::Arc;

use tauri::State;

use super::blocking;
use crate::core_state::CoreState;
use crate::models::{AccountInfo, NurseProfile};
use crate::session::{FieldError, LoginForm};

/// Field-level problems with the login form, checked before any network
/// call so the screen can mark the inputs.
#[tauri::command]
pub fn validate_login(form: LoginForm) -> Vec<FieldError> {
    form.validate().err().unwrap_or_default()
}

#[tauri::command]
pub async fn login(
    state: State<'_, Arc<CoreState>>,
    form: LoginForm,
) -> Result<AccountInfo, String> {
    blocking(state, move |core| core.login(&form)).await
}

/// Resume the stored session on launch. `None` means show the login screen.
#[tauri::command]
pub async fn restore_session(
    state: State<'_, Arc<CoreState>>,
) -> Result<Option<AccountInfo>, String> {
    blocking(state, |core| core.restore()).await
}

#[tauri::command]
pub async fn logout(state: State<'_, Arc<CoreState>>) -> Result<(), String> {
    blocking(state, |core| core.logout()).await
}

#[tauri::command]
pub async fn get_profile(state: State<'_, Arc<CoreState>>) -> Result<NurseProfile, String> {
    blocking(state, |core| core.profile()).await
}
