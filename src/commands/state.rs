//! Plugin-managed state behind the Tauri commands
//!
//! Everything a window needs lives in one `AppState` owned by the app
//! instead of process-wide globals: the lobby preview, the preference
//! resolver, the engine factory and the current meeting session. The
//! methods here carry the logic; the `#[command]` functions only adapt
//! arguments and stringify errors.

use crate::config::MeetConfig;
use crate::engine::{EngineFactory, WebviewBridge};
use crate::errors::SessionError;
use crate::preferences::{
    FileEphemeralStore, FileProfileStore, Identity, IdentityPreferences, PartialPreferences,
    PersistOutcome, PreferenceResolver,
};
use crate::preview::{
    DeviceCapture, JoinOverrides, MediaPreviewController, MediaPreviewState, NativeDeviceCapture,
    PreviewOutcome,
};
use crate::session::{CommandOutcome, EndReason, MeetingSessionController, SessionSnapshot};
use crate::toolbar::{invite_link, ToolbarAction, ToolbarCommandDispatcher, ToolbarView};
use crate::types::RoomName;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

pub struct AppState {
    config: RwLock<MeetConfig>,
    config_path: PathBuf,
    preview: tokio::sync::Mutex<MediaPreviewController>,
    resolver: PreferenceResolver,
    factory: Arc<dyn EngineFactory>,
    bridge: Option<WebviewBridge>,
    session: Mutex<Option<Arc<MeetingSessionController>>>,
}

impl AppState {
    pub fn new(
        config: MeetConfig,
        config_path: PathBuf,
        capture: Arc<dyn DeviceCapture>,
        resolver: PreferenceResolver,
        factory: Arc<dyn EngineFactory>,
    ) -> Self {
        let preview = MediaPreviewController::new(capture, &config.preview);
        Self {
            config: RwLock::new(config),
            config_path,
            preview: tokio::sync::Mutex::new(preview),
            resolver,
            factory,
            bridge: None,
            session: Mutex::new(None),
        }
    }

    /// State wired to the webview engine bridge, native device capture and
    /// file-backed preference stores.
    pub fn with_bridge(config: MeetConfig, config_path: PathBuf, bridge: WebviewBridge) -> Self {
        let dir = Path::new(&config.storage.anonymous_dir);
        let resolver = PreferenceResolver::new(
            Arc::new(FileProfileStore::new(dir.join("profiles"))),
            Arc::new(FileEphemeralStore::new(dir)),
            &config.storage,
        );
        let mut state = Self::new(
            config,
            config_path,
            Arc::new(NativeDeviceCapture::new()),
            resolver,
            Arc::new(bridge.clone()),
        );
        state.bridge = Some(bridge);
        state
    }

    pub fn bridge(&self) -> Result<&WebviewBridge, SessionError> {
        self.bridge
            .as_ref()
            .ok_or_else(|| SessionError::Bridge("no webview bridge installed".to_string()))
    }

    // Configuration

    pub fn config(&self) -> MeetConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Validate, apply and persist a new configuration. Running sessions
    /// keep the configuration they started with.
    pub fn update_config(&self, new_config: MeetConfig) -> Result<(), SessionError> {
        new_config.validate().map_err(SessionError::Config)?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = new_config.clone();
        new_config.save_to_file(&self.config_path)
    }

    pub fn reset_config(&self) -> Result<MeetConfig, SessionError> {
        let defaults = MeetConfig::default();
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = defaults.clone();
        defaults.save_to_file(&self.config_path)?;
        Ok(defaults)
    }

    // Lobby preview

    /// Start the lobby preview. With a known identity the preview mutes
    /// are seeded from that identity's stored preferences first.
    pub async fn start_preview(&self, identity: Option<&Identity>) -> PreviewOutcome {
        let prefs = match identity {
            Some(identity) => Some(
                self.resolver
                    .resolve_for(identity, &PartialPreferences::default())
                    .await,
            ),
            None => None,
        };
        let mut preview = self.preview.lock().await;
        if let Some(prefs) = &prefs {
            preview.apply_preferences(prefs);
        }
        preview.start().await
    }

    pub async fn toggle_preview_audio(&self) -> Option<bool> {
        self.preview.lock().await.toggle_local_audio()
    }

    pub async fn toggle_preview_video(&self) -> Option<bool> {
        self.preview.lock().await.toggle_local_video()
    }

    pub async fn preview_state(&self) -> MediaPreviewState {
        self.preview.lock().await.state()
    }

    pub async fn stop_preview(&self) {
        self.preview.lock().await.stop();
    }

    // Preferences

    pub async fn resolve_preferences(
        &self,
        identity: &Identity,
        explicit: &PartialPreferences,
    ) -> IdentityPreferences {
        self.resolver.resolve_for(identity, explicit).await
    }

    pub fn save_preferences(
        &self,
        identity: &Identity,
        prefs: &IdentityPreferences,
    ) -> Result<PersistOutcome, SessionError> {
        self.resolver.persist(identity, prefs)
    }

    // Session

    fn current(&self) -> MutexGuard<'_, Option<Arc<MeetingSessionController>>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn session(&self) -> Option<Arc<MeetingSessionController>> {
        self.current().clone()
    }

    /// Leave the lobby and join `room`.
    ///
    /// The preview releases its devices first. A device that is denied or
    /// missing joins muted whatever the lobby form says, and a mute the user
    /// toggled on the preview overrides the form. Untouched devices keep
    /// the resolved preference.
    pub async fn join_meeting<F>(
        &self,
        room: &str,
        identity: &Identity,
        explicit: PartialPreferences,
        on_end: F,
    ) -> Result<(Arc<MeetingSessionController>, IdentityPreferences), SessionError>
    where
        F: FnOnce(EndReason) + Send + 'static,
    {
        let room = RoomName::parse(room)?;
        let overrides: JoinOverrides = self.preview.lock().await.release_for_join();
        let explicit = PartialPreferences {
            default_audio_muted: overrides.audio_muted.or(explicit.default_audio_muted),
            default_video_muted: overrides.video_muted.or(explicit.default_video_muted),
            ..explicit
        };
        let prefs = self.resolver.resolve_for(identity, &explicit).await;

        let session = Arc::new(MeetingSessionController::new(self.factory.clone(), &self.config()));
        session.on_session_end(on_end);
        let previous = self.current().replace(session.clone());
        if let Some(previous) = previous {
            log::info!("Replacing previous session");
            previous.dispose();
        }

        session.start(room, &prefs).await?;
        Ok((session, prefs))
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.session().map(|s| s.snapshot())
    }

    pub fn toolbar_view(&self, sidebar_open: bool) -> Option<ToolbarView> {
        self.session()
            .map(|s| ToolbarCommandDispatcher::new(&s).view(sidebar_open))
    }

    pub fn dispatch(&self, action: ToolbarAction) -> CommandOutcome {
        match self.session() {
            Some(session) => ToolbarCommandDispatcher::new(&session).dispatch(action),
            None => {
                log::debug!("Toolbar action {:?} with no session", action);
                CommandOutcome::Ignored
            }
        }
    }

    /// Dispose the current session, if any. Used on unmount.
    pub fn leave_meeting(&self) {
        if let Some(session) = self.current().take() {
            session.dispose();
        }
    }

    pub fn invite_link(&self, room: &str) -> Result<String, SessionError> {
        let room = RoomName::parse(room)?;
        invite_link(&self.config().invite.base_url, &room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::EphemeralStore;
    use crate::session::LifecycleState;
    use crate::testing::{FakeDeviceCapture, FakeEngine, MemoryEphemeralStore, MemoryProfileStore};

    fn state_with(capture: FakeDeviceCapture, engine: &FakeEngine, dir: &Path) -> AppState {
        state_with_store(capture, engine, dir, MemoryEphemeralStore::new())
    }

    fn state_with_store(
        capture: FakeDeviceCapture,
        engine: &FakeEngine,
        dir: &Path,
        ephemeral: MemoryEphemeralStore,
    ) -> AppState {
        let config = MeetConfig::default();
        let resolver = PreferenceResolver::new(
            Arc::new(MemoryProfileStore::new()),
            Arc::new(ephemeral),
            &config.storage,
        );
        AppState::new(
            config,
            dir.join("unio-meet.toml"),
            Arc::new(capture),
            resolver,
            Arc::new(engine.clone()),
        )
    }

    #[tokio::test]
    async fn test_denied_camera_joins_video_muted() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::new();
        let state = state_with(FakeDeviceCapture::denied(), &engine, dir.path());

        assert!(matches!(state.start_preview(None).await, PreviewOutcome::Denied { .. }));
        let explicit = PartialPreferences {
            display_name: Some("Ana".into()),
            default_video_muted: Some(false),
            ..Default::default()
        };
        let (session, prefs) = state
            .join_meeting("1234567890", &Identity::Anonymous, explicit, |_| {})
            .await
            .unwrap();

        assert!(prefs.default_video_muted);
        assert!(prefs.default_audio_muted);
        assert_eq!(engine.created_options()[0].start_video_muted(), Some(true));
        assert_eq!(session.lifecycle(), LifecycleState::Ready);
    }

    fn stored_video_muted() -> MemoryEphemeralStore {
        let store = MemoryEphemeralStore::new();
        store
            .set(
                &MeetConfig::default().storage.anonymous_key,
                r#"{"defaultAudioMuted":false,"defaultVideoMuted":true}"#,
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_stored_mutes_reach_the_join() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::new();
        let state = state_with_store(
            FakeDeviceCapture::granted(),
            &engine,
            dir.path(),
            stored_video_muted(),
        );

        assert!(matches!(
            state.start_preview(Some(&Identity::Anonymous)).await,
            PreviewOutcome::Granted { .. }
        ));
        let preview = state.preview_state().await;
        assert!(!preview.local_audio_muted);
        assert!(preview.local_video_muted);

        let (_, prefs) = state
            .join_meeting("1234567890", &Identity::Anonymous, PartialPreferences::default(), |_| {})
            .await
            .unwrap();
        assert!(!prefs.default_audio_muted);
        assert!(prefs.default_video_muted);
        assert_eq!(engine.created_options()[0].start_video_muted(), Some(true));
    }

    #[tokio::test]
    async fn test_stored_mutes_apply_without_seeded_preview() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::new();
        let state = state_with_store(
            FakeDeviceCapture::granted(),
            &engine,
            dir.path(),
            stored_video_muted(),
        );

        state.start_preview(None).await;
        state
            .join_meeting("1234567890", &Identity::Anonymous, PartialPreferences::default(), |_| {})
            .await
            .unwrap();
        assert_eq!(engine.created_options()[0].start_video_muted(), Some(true));
    }

    #[tokio::test]
    async fn test_preview_toggle_overrides_stored_mute() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::new();
        let state = state_with_store(
            FakeDeviceCapture::granted(),
            &engine,
            dir.path(),
            stored_video_muted(),
        );

        state.start_preview(Some(&Identity::Anonymous)).await;
        assert_eq!(state.toggle_preview_video().await, Some(false));
        let (_, prefs) = state
            .join_meeting("1234567890", &Identity::Anonymous, PartialPreferences::default(), |_| {})
            .await
            .unwrap();
        assert!(!prefs.default_video_muted);
        assert_eq!(engine.created_options()[0].start_video_muted(), Some(false));
    }

    #[tokio::test]
    async fn test_join_replaces_and_disposes_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::new();
        let state = state_with(FakeDeviceCapture::granted(), &engine, dir.path());

        let (first, _) = state
            .join_meeting("room-a", &Identity::Anonymous, PartialPreferences::default(), |_| {})
            .await
            .unwrap();
        state
            .join_meeting("room-b", &Identity::Anonymous, PartialPreferences::default(), |_| {})
            .await
            .unwrap();
        assert!(first.is_disposed());

        state.leave_meeting();
        assert!(state.session().is_none());
        assert_eq!(state.dispatch(ToolbarAction::ToggleAudio), CommandOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(FakeDeviceCapture::granted(), &FakeEngine::new(), dir.path());

        let mut bad = MeetConfig::default();
        bad.engine.domain.clear();
        assert!(matches!(state.update_config(bad), Err(SessionError::Config(_))));

        let mut good = MeetConfig::default();
        good.session.termination_timeout_ms = 1_000;
        state.update_config(good.clone()).unwrap();
        assert_eq!(state.config(), good);
        assert_eq!(MeetConfig::load_from_file(dir.path().join("unio-meet.toml")).unwrap(), good);

        assert_eq!(state.reset_config().unwrap(), MeetConfig::default());
    }
}
