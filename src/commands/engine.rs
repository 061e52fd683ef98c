//! Inbound half of the webview engine bridge
use super::state::AppState;
use crate::engine::RawEngineEvent;
use serde_json::Value;
use tauri::{command, State};

/// Engine event observed by the frontend embed
#[command]
pub async fn forward_engine_event(
    state: State<'_, AppState>,
    embed_id: String,
    event: RawEngineEvent,
) -> Result<bool, String> {
    let bridge = state.bridge().map_err(|e| e.to_string())?;
    Ok(bridge.forward_event(&embed_id, event))
}

/// Embed constructed (`error` is `None`) or failed to load
#[command]
pub async fn report_embed_loaded(
    state: State<'_, AppState>,
    embed_id: String,
    error: Option<String>,
) -> Result<bool, String> {
    let bridge = state.bridge().map_err(|e| e.to_string())?;
    Ok(bridge.report_loaded(&embed_id, error))
}

/// Answer to a `unio-meet://query` request
#[command]
pub async fn resolve_engine_query(
    state: State<'_, AppState>,
    request_id: String,
    value: Value,
) -> Result<bool, String> {
    let bridge = state.bridge().map_err(|e| e.to_string())?;
    Ok(bridge.resolve_query(&request_id, value))
}
