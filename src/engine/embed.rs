use crate::config::EngineConfig;
use crate::preferences::IdentityPreferences;
use crate::types::RoomName;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default DOM container the frontend mounts the embed into.
pub const DEFAULT_PARENT_CONTAINER: &str = "unio-meet-container";

/// Identity the engine announces for the local participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub display_name: String,
    #[serde(rename = "avatarURL", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Construction parameters for an engine embed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedOptions {
    pub room_name: String,
    pub parent_container: String,
    pub width: String,
    pub height: String,
    pub config_overwrite: Map<String, Value>,
    pub interface_config_overwrite: Map<String, Value>,
    pub user_info: UserInfo,
}

impl EmbedOptions {
    /// Combine deployment config with resolved preferences. The start-muted
    /// flags always come from the preferences, overriding anything in the
    /// configured overrides.
    pub fn build(engine: &EngineConfig, room: &RoomName, prefs: &IdentityPreferences) -> Self {
        let mut config_overwrite = engine.config_overwrite.clone();
        config_overwrite.insert(
            "startWithAudioMuted".to_string(),
            Value::Bool(prefs.default_audio_muted),
        );
        config_overwrite.insert(
            "startWithVideoMuted".to_string(),
            Value::Bool(prefs.default_video_muted),
        );

        Self {
            room_name: room.as_str().to_string(),
            parent_container: DEFAULT_PARENT_CONTAINER.to_string(),
            width: engine.width.clone(),
            height: engine.height.clone(),
            config_overwrite,
            interface_config_overwrite: engine.interface_config_overwrite.clone(),
            user_info: UserInfo {
                display_name: prefs.display_name.clone(),
                avatar_url: prefs.avatar_url.clone(),
            },
        }
    }

    pub fn start_audio_muted(&self) -> Option<bool> {
        self.config_overwrite.get("startWithAudioMuted").and_then(Value::as_bool)
    }

    pub fn start_video_muted(&self) -> Option<bool> {
        self.config_overwrite.get("startWithVideoMuted").and_then(Value::as_bool)
    }
}
