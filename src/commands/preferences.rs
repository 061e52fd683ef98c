use super::state::AppState;
use crate::preferences::{suggest_display_name, Identity, IdentityPreferences, PartialPreferences};
use crate::types::RoomName;
use tauri::{command, State};

#[command]
pub async fn resolve_preferences(
    state: State<'_, AppState>,
    identity: Identity,
    explicit: Option<PartialPreferences>,
) -> Result<IdentityPreferences, String> {
    Ok(state
        .resolve_preferences(&identity, &explicit.unwrap_or_default())
        .await)
}

/// Store preferences for the identity's tier. Registered writes complete in
/// the background.
#[command]
pub async fn save_preferences(
    state: State<'_, AppState>,
    identity: Identity,
    preferences: IdentityPreferences,
) -> Result<(), String> {
    state
        .save_preferences(&identity, &preferences)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Random lobby display name
#[command]
pub async fn suggest_name() -> Result<String, String> {
    Ok(suggest_display_name())
}

/// Fresh numeric room name for "start a meeting"
#[command]
pub async fn generate_room_name() -> Result<String, String> {
    Ok(RoomName::generate().to_string())
}
