use super::state::AppState;
use crate::config::{EngineConfig, MeetConfig, SessionConfig};
use tauri::{command, State};

/// Get the current configuration
#[command]
pub async fn get_config(state: State<'_, AppState>) -> Result<MeetConfig, String> {
    Ok(state.config())
}

/// Update configuration
#[command]
pub async fn update_config(state: State<'_, AppState>, new_config: MeetConfig) -> Result<(), String> {
    state.update_config(new_config).map_err(|e| e.to_string())
}

/// Reset configuration to defaults
#[command]
pub async fn reset_config(state: State<'_, AppState>) -> Result<MeetConfig, String> {
    state.reset_config().map_err(|e| e.to_string())
}

/// Get engine configuration
#[command]
pub async fn get_engine_config(state: State<'_, AppState>) -> Result<EngineConfig, String> {
    Ok(state.config().engine)
}

/// Get session timing configuration
#[command]
pub async fn get_session_config(state: State<'_, AppState>) -> Result<SessionConfig, String> {
    Ok(state.config().session)
}
