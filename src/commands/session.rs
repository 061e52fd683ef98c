use super::state::AppState;
use crate::preferences::{Identity, PartialPreferences};
use crate::session::{CommandOutcome, EndReason, SessionSnapshot};
use crate::toolbar::{ToolbarAction, ToolbarView};
use serde_json::json;
use tauri::{command, AppHandle, Emitter, Runtime, State};

/// Snapshot updates for the session UI
pub const STATE_EVENT: &str = "unio-meet://state";
/// Fired once when the session ends
pub const ENDED_EVENT: &str = "unio-meet://session-ended";

/// Release the lobby devices and join `room`. Session state is then pushed
/// to the frontend as `unio-meet://state` events.
#[command]
pub async fn join_meeting<R: Runtime>(
    app: AppHandle<R>,
    state: State<'_, AppState>,
    room: String,
    identity: Identity,
    explicit: Option<PartialPreferences>,
) -> Result<SessionSnapshot, String> {
    log::info!("Joining meeting {}", room);

    let end_app = app.clone();
    let on_end = move |reason: EndReason| {
        if let Err(e) = end_app.emit(ENDED_EVENT, json!({ "reason": reason })) {
            log::warn!("Failed to emit session end: {}", e);
        }
    };

    let (session, _) = state
        .join_meeting(&room, &identity, explicit.unwrap_or_default(), on_end)
        .await
        .map_err(|e| e.user_message())?;

    let mut updates = session.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if let Err(e) = app.emit(STATE_EVENT, &snapshot) {
                log::warn!("Failed to emit session state: {}", e);
            }
            if snapshot.is_ended() {
                break;
            }
        }
    });

    Ok(session.snapshot())
}

#[command]
pub async fn get_session_state(state: State<'_, AppState>) -> Result<Option<SessionSnapshot>, String> {
    Ok(state.snapshot())
}

#[command]
pub async fn get_toolbar(
    state: State<'_, AppState>,
    sidebar_open: Option<bool>,
) -> Result<Option<ToolbarView>, String> {
    Ok(state.toolbar_view(sidebar_open.unwrap_or(false)))
}

/// Toolbar button press
#[command]
pub async fn toolbar_action(
    state: State<'_, AppState>,
    action: ToolbarAction,
) -> Result<CommandOutcome, String> {
    Ok(state.dispatch(action))
}

/// Tear the session down on unmount
#[command]
pub async fn leave_meeting(state: State<'_, AppState>) -> Result<(), String> {
    state.leave_meeting();
    Ok(())
}

#[command]
pub async fn get_invite_link(state: State<'_, AppState>, room: String) -> Result<String, String> {
    state.invite_link(&room).map_err(|e| e.to_string())
}
