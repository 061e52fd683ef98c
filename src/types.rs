//! Shared session data types: room names, participants, reactions.

use crate::errors::SessionError;
use rand::Rng;
use serde::{Deserialize, Serialize};

const MAX_ROOM_NAME_LEN: usize = 200;

/// Opaque, validated room identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomName(String);

impl RoomName {
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SessionError::InvalidRoomName(
                "room name must not be empty".to_string(),
            ));
        }
        if trimmed.chars().count() > MAX_ROOM_NAME_LEN {
            return Err(SessionError::InvalidRoomName(format!(
                "room name longer than {} characters",
                MAX_ROOM_NAME_LEN
            )));
        }
        if trimmed.contains('/') {
            return Err(SessionError::InvalidRoomName(format!(
                "room name must not contain '/': {}",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Random 10-digit numeric room name.
    pub fn generate() -> Self {
        let n: u64 = rand::thread_rng().gen_range(1_000_000_000..10_000_000_000);
        Self(n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomName {
    type Error = SessionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RoomName::parse(&value)
    }
}

impl From<RoomName> for String {
    fn from(value: RoomName) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    #[default]
    Participant,
    Moderator,
}

impl ParticipantRole {
    /// Engine role strings other than `moderator` are plain participants.
    pub fn from_engine(role: Option<&str>) -> Self {
        match role {
            Some(r) if r.eq_ignore_ascii_case("moderator") => ParticipantRole::Moderator,
            _ => ParticipantRole::Participant,
        }
    }
}

/// A roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: ParticipantRole,
    pub is_local: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Love,
    Clap,
    Laugh,
    Celebrate,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 5] = [
        ReactionKind::Like,
        ReactionKind::Love,
        ReactionKind::Clap,
        ReactionKind::Laugh,
        ReactionKind::Celebrate,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Love => "love",
            ReactionKind::Clap => "clap",
            ReactionKind::Laugh => "laugh",
            ReactionKind::Celebrate => "celebrate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_name_trims() {
        let room = RoomName::parse("  team-sync ").unwrap();
        assert_eq!(room.as_str(), "team-sync");
    }

    #[test]
    fn test_room_name_rejects_invalid() {
        assert!(RoomName::parse("").is_err());
        assert!(RoomName::parse("   ").is_err());
        assert!(RoomName::parse("a/b").is_err());
        assert!(RoomName::parse(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_generated_room_is_ten_digits() {
        for _ in 0..50 {
            let room = RoomName::generate();
            assert_eq!(room.as_str().len(), 10);
            assert!(room.as_str().chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_room_name_serde() {
        let room: RoomName = serde_json::from_str("\"weekly\"").unwrap();
        assert_eq!(room.as_str(), "weekly");
        assert!(serde_json::from_str::<RoomName>("\"\"").is_err());
    }

    #[test]
    fn test_role_from_engine() {
        assert_eq!(ParticipantRole::from_engine(Some("moderator")), ParticipantRole::Moderator);
        assert_eq!(ParticipantRole::from_engine(Some("none")), ParticipantRole::Participant);
        assert_eq!(ParticipantRole::from_engine(None), ParticipantRole::Participant);
    }
}
