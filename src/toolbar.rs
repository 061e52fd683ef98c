//! Toolbar contract between the session UI and the controller
//!
//! `ToolbarView` is what the UI renders; `ToolbarCommandDispatcher` turns
//! button presses into controller calls. Every control is disabled before
//! the session is joined and after it ends.

use crate::errors::SessionError;
use crate::session::{CommandOutcome, MeetingSessionController, SessionSnapshot};
use crate::types::{ReactionKind, RoomName};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "reaction", rename_all = "snake_case")]
pub enum ToolbarAction {
    ToggleAudio,
    ToggleVideo,
    ToggleScreenShare,
    ToggleTileView,
    React(ReactionKind),
    HangUp,
}

/// One rendered button
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarButton {
    pub label: &'static str,
    pub enabled: bool,
    pub active: bool,
}

impl ToolbarButton {
    fn new(label: &'static str, enabled: bool, active: bool) -> Self {
        Self {
            label,
            enabled,
            active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarView {
    pub audio: ToolbarButton,
    pub video: ToolbarButton,
    pub screen_share: ToolbarButton,
    pub tile_view: ToolbarButton,
    pub reactions_enabled: bool,
    pub hang_up: ToolbarButton,
    pub participants: ToolbarButton,
    pub participant_count: usize,
}

impl ToolbarView {
    pub fn from_snapshot(snapshot: &SessionSnapshot, sidebar_open: bool) -> Self {
        let enabled = snapshot.is_joined();
        let controls = &snapshot.controls;

        Self {
            audio: ToolbarButton::new(
                if controls.audio_muted { "Unmute" } else { "Mute" },
                enabled,
                controls.audio_muted,
            ),
            video: ToolbarButton::new(
                if controls.video_muted { "Start Video" } else { "Stop Video" },
                enabled,
                controls.video_muted,
            ),
            screen_share: ToolbarButton::new(
                if controls.screen_sharing { "Stop Sharing" } else { "Share Screen" },
                enabled,
                controls.screen_sharing,
            ),
            tile_view: ToolbarButton::new(
                if controls.tile_view_enabled {
                    "Switch to Speaker View"
                } else {
                    "Switch to Tile View"
                },
                enabled,
                controls.tile_view_enabled,
            ),
            reactions_enabled: enabled,
            hang_up: ToolbarButton::new(
                "Leave Meeting",
                enabled && !snapshot.hang_up_requested,
                snapshot.hang_up_requested,
            ),
            participants: ToolbarButton::new(
                if sidebar_open { "Hide Participants" } else { "Show Participants" },
                enabled,
                sidebar_open,
            ),
            participant_count: snapshot.roster.len(),
        }
    }

    pub fn allows(&self, action: ToolbarAction) -> bool {
        match action {
            ToolbarAction::ToggleAudio => self.audio.enabled,
            ToolbarAction::ToggleVideo => self.video.enabled,
            ToolbarAction::ToggleScreenShare => self.screen_share.enabled,
            ToolbarAction::ToggleTileView => self.tile_view.enabled,
            ToolbarAction::React(_) => self.reactions_enabled,
            ToolbarAction::HangUp => self.hang_up.enabled,
        }
    }
}

/// Routes toolbar presses to the controller, honouring the enabled flags
pub struct ToolbarCommandDispatcher<'a> {
    session: &'a MeetingSessionController,
}

impl<'a> ToolbarCommandDispatcher<'a> {
    pub fn new(session: &'a MeetingSessionController) -> Self {
        Self { session }
    }

    pub fn view(&self, sidebar_open: bool) -> ToolbarView {
        ToolbarView::from_snapshot(&self.session.snapshot(), sidebar_open)
    }

    pub fn dispatch(&self, action: ToolbarAction) -> CommandOutcome {
        if !self.view(false).allows(action) {
            log::debug!("Toolbar action {:?} pressed while disabled", action);
            return CommandOutcome::Ignored;
        }
        match action {
            ToolbarAction::ToggleAudio => self.session.toggle_audio(),
            ToolbarAction::ToggleVideo => self.session.toggle_video(),
            ToolbarAction::ToggleScreenShare => self.session.toggle_screen_share(),
            ToolbarAction::ToggleTileView => self.session.toggle_tile_view(),
            ToolbarAction::React(kind) => self.session.send_reaction(kind),
            ToolbarAction::HangUp => self.session.hang_up(),
        }
    }
}

/// Shareable lobby link for a room: `<base>/lobby/<room>`.
pub fn invite_link(base_url: &str, room: &RoomName) -> Result<String, SessionError> {
    let mut url = url::Url::parse(base_url)
        .map_err(|e| SessionError::Config(format!("invalid invite base URL {}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| SessionError::Config(format!("invite base URL cannot hold a path: {}", base_url)))?
        .pop_if_empty()
        .push("lobby")
        .push(room.as_str());
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}
