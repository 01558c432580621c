use std::sync::Arc;

use tauri::State;

use super::blocking;
use crate::core_state::{CoreError, CoreState};
use crate::geo::{Coordinate, RouteSummary};
use crate::models::Appointment;

/// Coordinates from the webview skip range checks on deserialize.
fn checked(location: Coordinate) -> Result<Coordinate, CoreError> {
    Ok(Coordinate::new(location.latitude, location.longitude)?)
}

/// `location` is `None` when the device denied location access.
#[tauri::command]
pub async fn start_trip(
    state: State<'_, Arc<CoreState>>,
    appointment_id: String,
    location: Option<Coordinate>,
) -> Result<Appointment, String> {
    blocking(state, move |core| {
        let location = location.map(checked).transpose()?;
        core.start_trip(&appointment_id, location)
    })
    .await
}

#[tauri::command]
pub async fn get_route(
    state: State<'_, Arc<CoreState>>,
    appointment_id: String,
    origin: Coordinate,
) -> Result<RouteSummary, String> {
    blocking(state, move |core| core.route_to(&appointment_id, checked(origin)?)).await
}
