pub mod api;
pub mod closeout;
#[cfg(feature = "app")]
pub mod commands;
pub mod config;
pub mod core_state;
pub mod db;
pub mod directions;
pub mod feedback;
pub mod geo;
pub mod leave;
pub mod lifecycle;
pub mod models;
pub mod schedule;
pub mod session;

#[cfg(test)]
mod test_support;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the default filter.
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

#[cfg(feature = "app")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use std::sync::Arc;

    init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let state = match config::AppConfig::load()
        .map_err(core_state::CoreError::from)
        .and_then(core_state::CoreState::new)
    {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            std::process::exit(1);
        }
    };
    tracing::info!(base_url = %state.config.api.base_url, "Backend configured");

    let result = tauri::Builder::default()
        .manage(Arc::new(state))
        .invoke_handler(tauri::generate_handler![
            commands::health_check,
            // Session
            commands::session::validate_login,
            commands::session::login,
            commands::session::restore_session,
            commands::session::logout,
            commands::session::get_profile,
            // Schedule
            commands::schedule::get_schedule,
            commands::schedule::get_home_agenda,
            commands::schedule::get_history,
            commands::schedule::get_appointment,
            commands::schedule::get_patient,
            // Trip
            commands::trip::start_trip,
            commands::trip::get_route,
            // Visit close-out
            commands::closeout::open_closeout,
            commands::closeout::get_closeout,
            commands::closeout::refresh_closeout,
            commands::closeout::close_closeout,
            commands::closeout::complete_task,
            commands::closeout::uncomplete_task,
            commands::closeout::submit_report,
            // Feedback
            commands::feedback::get_appointment_feedback,
            commands::feedback::get_nurse_feedback,
            // Leave
            commands::leave::get_leave_types,
            commands::leave::check_leave_request,
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        tracing::error!(error = %e, "Application exited with error");
    }
}
