//! Configuration management for unio-meet
//!
//! Provides configuration loading, saving, and management for the embedded
//! conferencing engine, session timeouts, device preview defaults, the
//! anonymous preference store and invite links.

use crate::errors::SessionError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `UNIO_MEET__ENGINE__DOMAIN`.
pub const ENV_PREFIX: &str = "UNIO_MEET";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MeetConfig {
    pub engine: EngineConfig,
    pub session: SessionConfig,
    pub preview: PreviewConfig,
    pub storage: StorageConfig,
    pub invite: InviteConfig,
}

/// Embedded conferencing engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine deployment domain
    pub domain: String,
    /// Embed width (CSS length)
    pub width: String,
    /// Embed height (CSS length)
    pub height: String,
    /// Engine configuration overrides passed verbatim to the embed
    pub config_overwrite: Map<String, Value>,
    /// Engine interface overrides passed verbatim to the embed
    pub interface_config_overwrite: Map<String, Value>,
}

/// Session lifecycle timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Bounded wait for a termination event after hang-up
    pub termination_timeout_ms: u64,
    /// Bounded wait for the join confirmation after the embed is ready
    pub join_timeout_ms: u64,
    /// Bounded wait for the engine script/embed to load
    pub load_timeout_ms: u64,
    /// Bounded wait for engine query round-trips
    pub query_timeout_ms: u64,
    /// Commands held while the embed is not ready yet
    pub max_pending_commands: usize,
}

/// Lobby device preview defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Bounded wait for the device capture request
    pub request_timeout_ms: u64,
    /// Preview starts with the microphone muted
    pub start_audio_muted: bool,
    /// Preview starts with the camera muted
    pub start_video_muted: bool,
}

/// Anonymous preference storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Fixed key of the anonymous preference blob
    pub anonymous_key: String,
    /// Directory holding the anonymous store
    pub anonymous_dir: String,
}

/// Invite link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InviteConfig {
    /// Public base URL of the application
    pub base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            domain: "call.unio.my".to_string(),
            width: "100%".to_string(),
            height: "100%".to_string(),
            config_overwrite: default_config_overwrite(),
            interface_config_overwrite: default_interface_config_overwrite(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            termination_timeout_ms: 5_000,
            join_timeout_ms: 30_000,
            load_timeout_ms: 15_000,
            query_timeout_ms: 3_000,
            max_pending_commands: 32,
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 20_000,
            start_audio_muted: true,
            start_video_muted: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            anonymous_key: "unio-user-settings".to_string(),
            anonymous_dir: "./unio-meet-data".to_string(),
        }
    }
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://iglesia.unio.my".to_string(),
        }
    }
}

fn default_config_overwrite() -> Map<String, Value> {
    let value = json!({
        "prejoinPageEnabled": false,
        "prejoinConfig": { "enabled": false },
        "disableDeepLinking": true,
        "enableWelcomePage": false,
        "transcribingEnabled": false,
        "recordingService": { "enabled": false },
        "liveStreaming": { "enabled": false },
        "fileRecordingsEnabled": false,
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn default_interface_config_overwrite() -> Map<String, Value> {
    let value = json!({
        "BRAND_WATERMARK_LINK": "https://iglesia.unio.my",
        "DEFAULT_REMOTE_DISPLAY_NAME": "Fellow Unio User",
        "JITSI_WATERMARK_LINK": "https://iglesia.unio.my",
        "TOOLBAR_BUTTONS": [],
        "SETTINGS_SECTIONS": ["devices", "language", "profile", "moderator"],
        "SHOW_JITSI_WATERMARK": false,
        "SHOW_WATERMARK_FOR_GUESTS": false,
        "SHOW_BRAND_WATERMARK": false,
        "SHOW_POWERED_BY_WATERMARK": false,
        "SHOW_CHROME_EXTENSION_BANNER": false,
        "TILE_VIEW_MAX_COLUMNS": 5,
        "TOOLBAR_ALWAYS_VISIBLE": false,
        "DISABLE_VIDEO_BACKGROUND": false,
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl SessionConfig {
    pub fn termination_timeout(&self) -> Duration {
        Duration::from_millis(self.termination_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl PreviewConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl MeetConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("Failed to read config file: {}", e)))?;

        let config: MeetConfig = toml::from_str(&contents)
            .map_err(|e| SessionError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from a TOML file, then apply `UNIO_MEET__*` environment overrides
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides()?;
        config.validate().map_err(SessionError::Config)?;
        Ok(config)
    }

    /// Apply scalar overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), SessionError> {
        let env = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| SessionError::Config(format!("Failed to read environment: {}", e)))?;

        if let Ok(v) = env.get_string("engine.domain") {
            self.engine.domain = v;
        }
        if let Ok(v) = env.get::<u64>("session.termination_timeout_ms") {
            self.session.termination_timeout_ms = v;
        }
        if let Ok(v) = env.get::<u64>("session.join_timeout_ms") {
            self.session.join_timeout_ms = v;
        }
        if let Ok(v) = env.get::<u64>("session.load_timeout_ms") {
            self.session.load_timeout_ms = v;
        }
        if let Ok(v) = env.get::<u64>("session.query_timeout_ms") {
            self.session.query_timeout_ms = v;
        }
        if let Ok(v) = env.get::<u64>("preview.request_timeout_ms") {
            self.preview.request_timeout_ms = v;
        }
        if let Ok(v) = env.get_string("storage.anonymous_dir") {
            self.storage.anonymous_dir = v;
        }
        if let Ok(v) = env.get_string("invite.base_url") {
            self.invite.base_url = v;
        }
        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SessionError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    SessionError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| SessionError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| SessionError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("unio-meet.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_layered(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.engine.domain.trim().is_empty() {
            return Err("Engine domain must not be empty".to_string());
        }
        if self.session.termination_timeout_ms == 0 {
            return Err("Termination timeout must be greater than zero".to_string());
        }
        if self.session.join_timeout_ms == 0 {
            return Err("Join timeout must be greater than zero".to_string());
        }
        if self.session.load_timeout_ms == 0 {
            return Err("Load timeout must be greater than zero".to_string());
        }
        if self.session.query_timeout_ms == 0 {
            return Err("Query timeout must be greater than zero".to_string());
        }
        if self.session.max_pending_commands == 0 {
            return Err("Pending command capacity must be at least 1".to_string());
        }
        if self.preview.request_timeout_ms == 0 {
            return Err("Device request timeout must be greater than zero".to_string());
        }
        if self.storage.anonymous_key.trim().is_empty() {
            return Err("Anonymous storage key must not be empty".to_string());
        }
        if url::Url::parse(&self.invite.base_url).is_err() {
            return Err(format!("Invalid invite base URL: {}", self.invite.base_url));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MeetConfig::default();
        assert_eq!(config.engine.domain, "call.unio.my");
        assert_eq!(config.session.termination_timeout_ms, 5_000);
        assert!(config.preview.start_audio_muted);
        assert!(!config.preview.start_video_muted);
        assert_eq!(config.storage.anonymous_key, "unio-user-settings");
        assert_eq!(
            config.engine.config_overwrite.get("prejoinPageEnabled"),
            Some(&Value::Bool(false))
        );
    }

    #[test]
    fn test_config_validation() {
        let config = MeetConfig::default();
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.session.termination_timeout_ms = 0;
        assert!(bad.validate().is_err());

        let mut bad = MeetConfig::default();
        bad.engine.domain = "  ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = MeetConfig::default();
        bad.session.max_pending_commands = 0;
        assert!(bad.validate().is_err());

        let mut bad = MeetConfig::default();
        bad.invite.base_url = "not a url".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("unio-meet.toml");

        let mut config = MeetConfig::default();
        config.session.termination_timeout_ms = 2_500;
        config.save_to_file(&config_path).unwrap();

        let loaded = MeetConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("partial.toml");
        fs::write(&config_path, "[session]\nquery_timeout_ms = 750\n").unwrap();

        let loaded = MeetConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.session.query_timeout_ms, 750);
        assert_eq!(loaded.session.termination_timeout_ms, 5_000);
        assert_eq!(loaded.engine.domain, "call.unio.my");
    }

    #[test]
    fn test_config_toml_format() {
        let config = MeetConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[engine]"));
        assert!(toml_string.contains("[session]"));
        assert!(toml_string.contains("[preview]"));
        assert!(toml_string.contains("[storage]"));
        assert!(toml_string.contains("termination_timeout_ms"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = MeetConfig::load_from_file("nonexistent_unio_meet.toml");
        assert!(result.is_ok());
        assert_eq!(result.unwrap().session.join_timeout_ms, 30_000);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("broken.toml");
        fs::write(&config_path, "[session\n").unwrap();

        let result = MeetConfig::load_from_file(&config_path);
        assert!(matches!(result, Err(SessionError::Config(_))));
    }
}
