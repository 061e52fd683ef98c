use super::state::AppState;
use crate::preferences::Identity;
use crate::preview::{MediaPreviewState, PreviewOutcome};
use tauri::{command, State};

/// Request camera and microphone access for the lobby preview. Passing the
/// identity seeds the preview mutes from its stored preferences.
#[command]
pub async fn start_preview(
    state: State<'_, AppState>,
    identity: Option<Identity>,
) -> Result<PreviewOutcome, String> {
    Ok(state.start_preview(identity.as_ref()).await)
}

/// Flip the preview microphone. `None` when there is no stream to act on.
#[command]
pub async fn toggle_preview_audio(state: State<'_, AppState>) -> Result<Option<bool>, String> {
    Ok(state.toggle_preview_audio().await)
}

#[command]
pub async fn toggle_preview_video(state: State<'_, AppState>) -> Result<Option<bool>, String> {
    Ok(state.toggle_preview_video().await)
}

#[command]
pub async fn get_preview_state(state: State<'_, AppState>) -> Result<MediaPreviewState, String> {
    Ok(state.preview_state().await)
}

/// Release the preview devices (cancel, navigate away)
#[command]
pub async fn stop_preview(state: State<'_, AppState>) -> Result<(), String> {
    state.stop_preview().await;
    Ok(())
}
