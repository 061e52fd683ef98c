use crate::roster::ParticipantRoster;
use crate::types::RoomName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Initializing,
    Ready,
    Joined,
    Ended,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Initializing => "initializing",
            LifecycleState::Ready => "ready",
            LifecycleState::Joined => "joined",
            LifecycleState::Ended => "ended",
        }
    }

    /// Commands can reach the engine directly.
    pub fn accepts_commands(&self) -> bool {
        matches!(self, LifecycleState::Ready | LifecycleState::Joined)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last confirmed engine toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlState {
    pub audio_muted: bool,
    pub video_muted: bool,
    pub screen_sharing: bool,
    pub tile_view_enabled: bool,
}

/// Why the session reached `Ended`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The engine signalled termination
    EngineTerminated,
    /// Hang-up was not confirmed in time
    TerminationTimeout,
    /// The join confirmation never arrived
    JoinTimeout,
}

/// Result of issuing a command through the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    Sent,
    Queued,
    Ignored,
}

/// Everything the UI may observe about a session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub room: Option<RoomName>,
    pub lifecycle: LifecycleState,
    pub controls: ControlState,
    pub roster: ParticipantRoster,
    /// Persistent error state, e.g. the engine failed to load
    pub error: Option<String>,
    /// Hang-up issued, waiting for termination
    pub hang_up_requested: bool,
    pub end_reason: Option<EndReason>,
    /// When the join was confirmed
    pub joined_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub fn is_joined(&self) -> bool {
        self.lifecycle == LifecycleState::Joined
    }

    pub fn is_ended(&self) -> bool {
        self.lifecycle == LifecycleState::Ended
    }

    /// Still waiting on the engine, with no error to show.
    pub fn is_loading(&self) -> bool {
        self.error.is_none()
            && matches!(self.lifecycle, LifecycleState::Initializing | LifecycleState::Ready)
    }
}
