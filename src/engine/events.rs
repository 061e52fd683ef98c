//! Engine event and command vocabulary.
//!
//! Engine payloads are untyped JSON. Each consumed event name maps to one
//! fixed payload shape; anything that does not match is rejected with
//! `SessionError::InvalidPayload` and dropped by the session.

use crate::errors::SessionError;
use crate::roster::RosterDelta;
use crate::types::ReactionKind;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Event names the session subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineEventName {
    #[serde(rename = "videoConferenceJoined")]
    JoinConfirmed,
    #[serde(rename = "readyToClose")]
    TerminationRequested,
    #[serde(rename = "participantJoined")]
    ParticipantJoined,
    #[serde(rename = "participantLeft")]
    ParticipantLeft,
    #[serde(rename = "participantKickedOut")]
    ParticipantKicked,
    #[serde(rename = "displayNameChange")]
    ParticipantRenamed,
    #[serde(rename = "avatarChanged")]
    AvatarChanged,
    #[serde(rename = "participantRoleChanged")]
    RoleChanged,
    #[serde(rename = "audioMuteStatusChanged")]
    AudioMuteChanged,
    #[serde(rename = "videoMuteStatusChanged")]
    VideoMuteChanged,
    #[serde(rename = "tileViewChanged")]
    TileViewChanged,
    #[serde(rename = "screenSharingStatusChanged")]
    ScreenShareChanged,
}

impl EngineEventName {
    pub const ALL: [EngineEventName; 12] = [
        EngineEventName::JoinConfirmed,
        EngineEventName::TerminationRequested,
        EngineEventName::ParticipantJoined,
        EngineEventName::ParticipantLeft,
        EngineEventName::ParticipantKicked,
        EngineEventName::ParticipantRenamed,
        EngineEventName::AvatarChanged,
        EngineEventName::RoleChanged,
        EngineEventName::AudioMuteChanged,
        EngineEventName::VideoMuteChanged,
        EngineEventName::TileViewChanged,
        EngineEventName::ScreenShareChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineEventName::JoinConfirmed => "videoConferenceJoined",
            EngineEventName::TerminationRequested => "readyToClose",
            EngineEventName::ParticipantJoined => "participantJoined",
            EngineEventName::ParticipantLeft => "participantLeft",
            EngineEventName::ParticipantKicked => "participantKickedOut",
            EngineEventName::ParticipantRenamed => "displayNameChange",
            EngineEventName::AvatarChanged => "avatarChanged",
            EngineEventName::RoleChanged => "participantRoleChanged",
            EngineEventName::AudioMuteChanged => "audioMuteStatusChanged",
            EngineEventName::VideoMuteChanged => "videoMuteStatusChanged",
            EngineEventName::TileViewChanged => "tileViewChanged",
            EngineEventName::ScreenShareChanged => "screenSharingStatusChanged",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|n| n.as_str() == name)
    }
}

impl std::fmt::Display for EngineEventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event as delivered by the engine, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEngineEvent {
    pub name: String,
    #[serde(default)]
    pub payload: Value,
}

impl RawEngineEvent {
    pub fn new(name: EngineEventName, payload: Value) -> Self {
        Self {
            name: name.as_str().to_string(),
            payload,
        }
    }
}

/// A participant record as reported by the engine's participant listing
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedParticipant {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, alias = "avatarURL")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub local: Option<bool>,
}

impl ReportedParticipant {
    pub fn remote(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: Some(display_name.to_string()),
            ..Default::default()
        }
    }

    pub fn local(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: Some(display_name.to_string()),
            local: Some(true),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinedPayload {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdPayload {
    id: String,
    #[serde(default, alias = "displayname", alias = "formattedDisplayName")]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct KickedPayload {
    kicked: IdPayload,
}

#[derive(Deserialize)]
struct AvatarPayload {
    id: String,
    #[serde(default, alias = "avatarURL", alias = "avatarUrl")]
    avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct RolePayload {
    id: String,
    role: String,
}

#[derive(Deserialize)]
struct MutedPayload {
    muted: bool,
}

#[derive(Deserialize)]
struct EnabledPayload {
    enabled: bool,
}

#[derive(Deserialize)]
struct SharingPayload {
    on: bool,
}

/// A validated engine event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    JoinConfirmed {
        local_id: Option<String>,
        display_name: Option<String>,
    },
    TerminationRequested,
    Roster(RosterDelta),
    AudioMuteChanged { muted: bool },
    VideoMuteChanged { muted: bool },
    TileViewChanged { enabled: bool },
    ScreenShareChanged { on: bool },
}

fn payload<T: serde::de::DeserializeOwned>(
    name: EngineEventName,
    value: &Value,
) -> Result<T, SessionError> {
    T::deserialize(value).map_err(|e| {
        SessionError::InvalidPayload(format!("{} payload rejected: {}", name, e))
    })
}

impl EngineEvent {
    pub fn parse(raw: &RawEngineEvent) -> Result<Self, SessionError> {
        let name = EngineEventName::parse(&raw.name)
            .ok_or_else(|| SessionError::InvalidPayload(format!("unknown event: {}", raw.name)))?;
        let value = &raw.payload;

        let event = match name {
            EngineEventName::JoinConfirmed => {
                // Some engine builds send no payload at all.
                let p: JoinedPayload = if value.is_null() {
                    JoinedPayload {
                        id: None,
                        display_name: None,
                    }
                } else {
                    payload(name, value)?
                };
                EngineEvent::JoinConfirmed {
                    local_id: p.id.filter(|id| !id.is_empty()),
                    display_name: p.display_name,
                }
            }
            EngineEventName::TerminationRequested => EngineEvent::TerminationRequested,
            EngineEventName::ParticipantJoined => {
                let p: IdPayload = payload(name, value)?;
                EngineEvent::Roster(RosterDelta::Upsert {
                    id: p.id,
                    display_name: p.display_name,
                })
            }
            EngineEventName::ParticipantLeft => {
                let p: IdPayload = payload(name, value)?;
                EngineEvent::Roster(RosterDelta::Remove { id: p.id })
            }
            EngineEventName::ParticipantKicked => {
                let p: KickedPayload = payload(name, value)?;
                EngineEvent::Roster(RosterDelta::Remove { id: p.kicked.id })
            }
            EngineEventName::ParticipantRenamed => {
                let p: IdPayload = payload(name, value)?;
                EngineEvent::Roster(RosterDelta::Rename {
                    id: p.id,
                    display_name: p.display_name,
                })
            }
            EngineEventName::AvatarChanged => {
                let p: AvatarPayload = payload(name, value)?;
                EngineEvent::Roster(RosterDelta::Avatar {
                    id: p.id,
                    avatar_url: p.avatar_url,
                })
            }
            EngineEventName::RoleChanged => {
                let p: RolePayload = payload(name, value)?;
                EngineEvent::Roster(RosterDelta::Role {
                    id: p.id,
                    role: p.role,
                })
            }
            EngineEventName::AudioMuteChanged => {
                let p: MutedPayload = payload(name, value)?;
                EngineEvent::AudioMuteChanged { muted: p.muted }
            }
            EngineEventName::VideoMuteChanged => {
                let p: MutedPayload = payload(name, value)?;
                EngineEvent::VideoMuteChanged { muted: p.muted }
            }
            EngineEventName::TileViewChanged => {
                let p: EnabledPayload = payload(name, value)?;
                EngineEvent::TileViewChanged { enabled: p.enabled }
            }
            EngineEventName::ScreenShareChanged => {
                let p: SharingPayload = payload(name, value)?;
                EngineEvent::ScreenShareChanged { on: p.on }
            }
        };
        Ok(event)
    }
}

/// Commands the session issues to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineCommand {
    ToggleAudio,
    ToggleVideo,
    ToggleShareScreen,
    ToggleTileView,
    Hangup,
    DisplayName(String),
    SendReaction(ReactionKind),
}

impl EngineCommand {
    /// Engine command name
    pub fn name(&self) -> &'static str {
        match self {
            EngineCommand::ToggleAudio => "toggleAudio",
            EngineCommand::ToggleVideo => "toggleVideo",
            EngineCommand::ToggleShareScreen => "toggleShareScreen",
            EngineCommand::ToggleTileView => "toggleTileView",
            EngineCommand::Hangup => "hangup",
            EngineCommand::DisplayName(_) => "displayName",
            EngineCommand::SendReaction(_) => "sendReaction",
        }
    }

    /// Positional command arguments
    pub fn args(&self) -> Vec<Value> {
        match self {
            EngineCommand::DisplayName(name) => vec![json!(name)],
            EngineCommand::SendReaction(kind) => vec![json!(kind.wire_name())],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: EngineEventName, payload: Value) -> RawEngineEvent {
        RawEngineEvent::new(name, payload)
    }

    #[test]
    fn test_event_names_round_trip() {
        for name in EngineEventName::ALL {
            assert_eq!(EngineEventName::parse(name.as_str()), Some(name));
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
        }
        assert_eq!(EngineEventName::parse("somethingElse"), None);
    }

    #[test]
    fn test_parse_mute_events() {
        let ev = EngineEvent::parse(&raw(EngineEventName::AudioMuteChanged, json!({"muted": true})))
            .unwrap();
        assert_eq!(ev, EngineEvent::AudioMuteChanged { muted: true });

        let ev = EngineEvent::parse(&raw(EngineEventName::ScreenShareChanged, json!({"on": false})))
            .unwrap();
        assert_eq!(ev, EngineEvent::ScreenShareChanged { on: false });
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let err = EngineEvent::parse(&raw(EngineEventName::AudioMuteChanged, json!({"muted": "yes"})))
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidPayload(_)));

        let err = EngineEvent::parse(&raw(EngineEventName::ParticipantJoined, json!([1, 2]))).unwrap_err();
        assert!(matches!(err, SessionError::InvalidPayload(_)));

        let unknown = RawEngineEvent {
            name: "incomingMessage".to_string(),
            payload: json!({}),
        };
        assert!(EngineEvent::parse(&unknown).is_err());
    }

    #[test]
    fn test_parse_join_without_payload() {
        let ev = EngineEvent::parse(&raw(EngineEventName::JoinConfirmed, Value::Null)).unwrap();
        assert_eq!(
            ev,
            EngineEvent::JoinConfirmed {
                local_id: None,
                display_name: None
            }
        );
    }

    #[test]
    fn test_parse_kicked_and_rename() {
        let ev = EngineEvent::parse(&raw(
            EngineEventName::ParticipantKicked,
            json!({"kicked": {"id": "p2", "local": false}, "kicker": {"id": "p1"}}),
        ))
        .unwrap();
        assert_eq!(ev, EngineEvent::Roster(RosterDelta::Remove { id: "p2".into() }));

        let ev = EngineEvent::parse(&raw(
            EngineEventName::ParticipantRenamed,
            json!({"id": "p3", "displayname": "Ana"}),
        ))
        .unwrap();
        assert_eq!(
            ev,
            EngineEvent::Roster(RosterDelta::Rename {
                id: "p3".into(),
                display_name: Some("Ana".into())
            })
        );
    }

    #[test]
    fn test_reported_participant_accepts_engine_keys() {
        let p: ReportedParticipant = serde_json::from_value(json!({
            "id": "abc",
            "displayName": "Luis",
            "avatarURL": "https://example.org/a.png",
            "role": "moderator",
            "formattedDisplayName": "Luis (me)"
        }))
        .unwrap();
        assert_eq!(p.avatar_url.as_deref(), Some("https://example.org/a.png"));
        assert_eq!(p.local, None);
    }

    #[test]
    fn test_command_wire_form() {
        assert_eq!(EngineCommand::ToggleTileView.name(), "toggleTileView");
        assert!(EngineCommand::Hangup.args().is_empty());
        assert_eq!(
            EngineCommand::SendReaction(ReactionKind::Clap).args(),
            vec![json!("clap")]
        );
        assert_eq!(
            EngineCommand::DisplayName("Ana".into()).args(),
            vec![json!("Ana")]
        );
    }
}
