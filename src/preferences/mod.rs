//! Identity preference resolution
//!
//! Effective display name, avatar and start-muted flags come from, per field
//! and in order: explicit values from the lobby form, the store of the
//! identity's tier, the tier defaults. Tiers are never mixed: an anonymous
//! session never reads the profile store, a registered one never reads the
//! local blob.

pub mod store;

pub use store::{EphemeralStore, FileEphemeralStore, FileProfileStore, ProfileStore};

use crate::config::StorageConfig;
use crate::errors::SessionError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub const DEFAULT_ANONYMOUS_NAME: &str = "Guest";
pub const DEFAULT_REGISTERED_NAME: &str = "User";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityTier {
    Anonymous,
    Registered,
}

/// Who is joining
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "lowercase")]
pub enum Identity {
    Anonymous,
    Registered {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(default)]
        email: Option<String>,
    },
}

impl Identity {
    pub fn tier(&self) -> IdentityTier {
        match self {
            Identity::Anonymous => IdentityTier::Anonymous,
            Identity::Registered { .. } => IdentityTier::Registered,
        }
    }
}

/// Effective preferences for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPreferences {
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub default_audio_muted: bool,
    pub default_video_muted: bool,
    pub tier: IdentityTier,
}

/// A stored document or a set of explicit overrides. Absent, empty and
/// whitespace-only values all count as missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialPreferences {
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, alias = "avatar", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_audio_muted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_video_muted: Option<bool>,
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl PartialPreferences {
    pub fn normalized(&self) -> Self {
        Self {
            display_name: clean(&self.display_name),
            avatar_url: clean(&self.avatar_url),
            default_audio_muted: self.default_audio_muted,
            default_video_muted: self.default_video_muted,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normalized() == Self::default()
    }
}

impl From<&IdentityPreferences> for PartialPreferences {
    fn from(prefs: &IdentityPreferences) -> Self {
        Self {
            display_name: Some(prefs.display_name.clone()),
            avatar_url: prefs.avatar_url.clone(),
            default_audio_muted: Some(prefs.default_audio_muted),
            default_video_muted: Some(prefs.default_video_muted),
        }
    }
}

fn tier_defaults(identity: &Identity) -> IdentityPreferences {
    match identity {
        Identity::Anonymous => IdentityPreferences {
            display_name: DEFAULT_ANONYMOUS_NAME.to_string(),
            avatar_url: None,
            default_audio_muted: true,
            default_video_muted: false,
            tier: IdentityTier::Anonymous,
        },
        Identity::Registered { email, .. } => {
            let local_part = email
                .as_deref()
                .and_then(|e| e.split('@').next())
                .map(str::trim)
                .filter(|s| !s.is_empty());
            IdentityPreferences {
                display_name: local_part.unwrap_or(DEFAULT_REGISTERED_NAME).to_string(),
                avatar_url: None,
                default_audio_muted: false,
                default_video_muted: false,
                tier: IdentityTier::Registered,
            }
        }
    }
}

/// Merge explicit values, the tier's stored document and the tier defaults.
/// Pure and deterministic.
pub fn resolve(
    identity: &Identity,
    stored_registered: Option<&PartialPreferences>,
    stored_anonymous: Option<&PartialPreferences>,
    explicit: &PartialPreferences,
) -> IdentityPreferences {
    let defaults = tier_defaults(identity);
    let stored = match identity.tier() {
        IdentityTier::Registered => stored_registered,
        IdentityTier::Anonymous => stored_anonymous,
    }
    .map(PartialPreferences::normalized)
    .unwrap_or_default();
    let explicit = explicit.normalized();

    IdentityPreferences {
        display_name: explicit
            .display_name
            .or(stored.display_name)
            .unwrap_or(defaults.display_name),
        avatar_url: explicit.avatar_url.or(stored.avatar_url).or(defaults.avatar_url),
        default_audio_muted: explicit
            .default_audio_muted
            .or(stored.default_audio_muted)
            .unwrap_or(defaults.default_audio_muted),
        default_video_muted: explicit
            .default_video_muted
            .or(stored.default_video_muted)
            .unwrap_or(defaults.default_video_muted),
        tier: defaults.tier,
    }
}

/// How a `persist` call was carried out
#[derive(Debug)]
pub enum PersistOutcome {
    /// Local write completed
    Written,
    /// Remote write running in the background; failures are only logged
    Dispatched(JoinHandle<()>),
}

/// Loads, resolves and writes back preferences for a given identity
#[derive(Clone)]
pub struct PreferenceResolver {
    profiles: Arc<dyn ProfileStore>,
    ephemeral: Arc<dyn EphemeralStore>,
    anonymous_key: String,
}

impl PreferenceResolver {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        ephemeral: Arc<dyn EphemeralStore>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            profiles,
            ephemeral,
            anonymous_key: config.anonymous_key.clone(),
        }
    }

    /// Stored document for the identity's tier. Read failures and unreadable
    /// blobs are logged and treated as "nothing stored".
    pub async fn load(&self, identity: &Identity) -> Option<PartialPreferences> {
        match identity {
            Identity::Registered { user_id, .. } => match self.profiles.read(user_id).await {
                Ok(doc) => doc,
                Err(e) => {
                    log::warn!("Profile read for {} failed, using defaults: {}", user_id, e);
                    None
                }
            },
            Identity::Anonymous => {
                let raw = match self.ephemeral.get(&self.anonymous_key) {
                    Ok(raw) => raw?,
                    Err(e) => {
                        log::warn!("Local preference read failed, using defaults: {}", e);
                        return None;
                    }
                };
                match serde_json::from_str::<PartialPreferences>(&raw) {
                    Ok(prefs) => Some(prefs),
                    Err(e) => {
                        log::warn!("Ignoring unreadable local preferences: {}", e);
                        None
                    }
                }
            }
        }
    }

    pub async fn resolve_for(
        &self,
        identity: &Identity,
        explicit: &PartialPreferences,
    ) -> IdentityPreferences {
        let stored = self.load(identity).await;
        match identity.tier() {
            IdentityTier::Registered => resolve(identity, stored.as_ref(), None, explicit),
            IdentityTier::Anonymous => resolve(identity, None, stored.as_ref(), explicit),
        }
    }

    /// Write preferences back to the tier's store. Anonymous writes finish
    /// before returning; registered writes are dispatched and not awaited.
    pub fn persist(
        &self,
        identity: &Identity,
        prefs: &IdentityPreferences,
    ) -> Result<PersistOutcome, SessionError> {
        if prefs.tier != identity.tier() {
            return Err(SessionError::Storage(format!(
                "{:?} preferences cannot be stored for a {:?} identity",
                prefs.tier,
                identity.tier()
            )));
        }
        let doc = PartialPreferences::from(prefs);

        match identity {
            Identity::Anonymous => {
                let blob = serde_json::to_string(&doc)?;
                self.ephemeral.set(&self.anonymous_key, &blob)?;
                log::debug!("Saved local preferences under {}", self.anonymous_key);
                Ok(PersistOutcome::Written)
            }
            Identity::Registered { user_id, .. } => {
                let profiles = self.profiles.clone();
                let user_id = user_id.clone();
                let handle = tokio::spawn(async move {
                    match profiles.write(&user_id, &doc).await {
                        Ok(()) => log::debug!("Saved profile preferences for {}", user_id),
                        Err(e) => log::warn!("Profile preference write for {} failed: {}", user_id, e),
                    }
                });
                Ok(PersistOutcome::Dispatched(handle))
            }
        }
    }
}

const ADJECTIVES: &[&str] = &[
    "Happy", "Brave", "Calm", "Clever", "Gentle", "Jolly", "Kind", "Lucky", "Swift", "Witty",
];
const COLORS: &[&str] = &[
    "Red", "Blue", "Green", "Golden", "Purple", "Orange", "Silver", "Teal", "Amber", "Coral",
];
const ANIMALS: &[&str] = &[
    "Fox", "Owl", "Panda", "Tiger", "Dolphin", "Falcon", "Koala", "Otter", "Lion", "Rabbit",
];

/// Random "Adjective Colour Animal" name for the lobby form.
pub fn suggest_display_name() -> String {
    suggest_display_name_with(&mut rand::thread_rng())
}

pub fn suggest_display_name_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(&mut *rng).copied().unwrap_or("Happy");
    let color = COLORS.choose(&mut *rng).copied().unwrap_or("Blue");
    let animal = ANIMALS.choose(&mut *rng).copied().unwrap_or("Fox");
    format!("{} {} {}", adjective, color, animal)
}
