use crate::engine::{
    EmbedOptions, EngineCommand, EngineEventName, EngineFactory, EngineHandle, EventSink,
    RawEngineEvent, ReportedParticipant,
};
use crate::errors::SessionError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct State {
    load_error: Option<String>,
    hang_load: bool,
    created: Vec<EmbedOptions>,
    sinks: Vec<(EngineEventName, EventSink)>,
    commands: Vec<EngineCommand>,
    participants: Vec<ReportedParticipant>,
    audio_muted: bool,
    video_muted: bool,
    tile_view: bool,
    sharing: bool,
    fail_queries: bool,
    hang_queries: bool,
    close_on_hangup: bool,
    echo_toggles: bool,
    dispose_count: usize,
}

impl State {
    fn deliver(&self, name: EngineEventName, payload: Value) -> bool {
        let event = RawEngineEvent::new(name, payload);
        let mut delivered = false;
        for (_, sink) in self.sinks.iter().filter(|(n, _)| *n == name) {
            delivered |= sink.send(event.clone()).is_ok();
        }
        delivered
    }

    fn upsert(&mut self, participant: ReportedParticipant) {
        match self.participants.iter_mut().find(|p| p.id == participant.id) {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }
    }
}

/// Scriptable conferencing engine.
///
/// Clones share state, so a test keeps one clone to drive events while the
/// controller owns another as its factory. Only one embed is live at a time.
#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<State>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed construction fails with `reason`.
    pub fn failing_load(reason: &str) -> Self {
        let engine = Self::new();
        engine.state().load_error = Some(reason.to_string());
        engine
    }

    /// Embed construction never completes.
    pub fn hanging_load() -> Self {
        let engine = Self::new();
        engine.state().hang_load = true;
        engine
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer `hangup` with `readyToClose`.
    pub fn close_on_hangup(&self) -> &Self {
        self.state().close_on_hangup = true;
        self
    }

    /// Answer toggle commands with the matching confirmation event.
    pub fn echo_toggles(&self) -> &Self {
        self.state().echo_toggles = true;
        self
    }

    /// Queries fail from now on.
    pub fn fail_queries(&self) -> &Self {
        self.state().fail_queries = true;
        self
    }

    /// Queries never answer from now on.
    pub fn hang_queries(&self) -> &Self {
        self.state().hang_queries = true;
        self
    }

    pub fn set_mute_state(&self, audio_muted: bool, video_muted: bool) {
        let mut state = self.state();
        state.audio_muted = audio_muted;
        state.video_muted = video_muted;
    }

    /// Replace the participant listing without emitting anything.
    pub fn set_participants(&self, participants: Vec<ReportedParticipant>) {
        self.state().participants = participants;
    }

    /// Emit a raw event to the subscribers of `name`.
    pub fn emit(&self, name: EngineEventName, payload: Value) -> bool {
        self.state().deliver(name, payload)
    }

    /// Confirm the join: the local record enters the listing, unflagged.
    pub fn join(&self, local_id: &str, display_name: &str) -> bool {
        let mut state = self.state();
        state.upsert(ReportedParticipant {
            id: local_id.to_string(),
            display_name: Some(display_name.to_string()),
            ..Default::default()
        });
        state.deliver(
            EngineEventName::JoinConfirmed,
            json!({ "id": local_id, "displayName": display_name, "roomName": "fake" }),
        )
    }

    pub fn add_participant(&self, id: &str, display_name: &str) -> bool {
        let mut state = self.state();
        state.upsert(ReportedParticipant::remote(id, display_name));
        state.deliver(
            EngineEventName::ParticipantJoined,
            json!({ "id": id, "displayName": display_name }),
        )
    }

    pub fn remove_participant(&self, id: &str) -> bool {
        let mut state = self.state();
        state.participants.retain(|p| p.id != id);
        state.deliver(EngineEventName::ParticipantLeft, json!({ "id": id }))
    }

    pub fn terminate(&self) -> bool {
        self.emit(EngineEventName::TerminationRequested, json!({}))
    }

    pub fn commands(&self) -> Vec<EngineCommand> {
        self.state().commands.clone()
    }

    pub fn created_options(&self) -> Vec<EmbedOptions> {
        self.state().created.clone()
    }

    pub fn subscription_count(&self) -> usize {
        self.state().sinks.len()
    }

    pub fn dispose_count(&self) -> usize {
        self.state().dispose_count
    }
}

#[async_trait]
impl EngineFactory for FakeEngine {
    async fn create_embed(
        &self,
        _domain: &str,
        options: EmbedOptions,
    ) -> Result<Arc<dyn EngineHandle>, SessionError> {
        let (hang, error) = {
            let state = self.state();
            (state.hang_load, state.load_error.clone())
        };
        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(reason) = error {
            return Err(SessionError::EngineLoadFailure(reason));
        }

        let mut state = self.state();
        state.created.push(options);
        state.sinks.clear();
        Ok(Arc::new(FakeEngineHandle {
            engine: self.clone(),
            disposed: Mutex::new(false),
        }))
    }
}

struct FakeEngineHandle {
    engine: FakeEngine,
    disposed: Mutex<bool>,
}

impl FakeEngineHandle {
    fn is_disposed(&self) -> bool {
        *self.disposed.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn check(&self) -> Result<(), SessionError> {
        let hang = self.engine.state().hang_queries;
        if hang {
            std::future::pending::<()>().await;
        }
        if self.is_disposed() {
            return Err(SessionError::Bridge("fake embed disposed".to_string()));
        }
        if self.engine.state().fail_queries {
            return Err(SessionError::Bridge("fake query failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EngineHandle for FakeEngineHandle {
    fn on(&self, name: EngineEventName, sink: EventSink) {
        if !self.is_disposed() {
            self.engine.state().sinks.push((name, sink));
        }
    }

    fn execute_command(&self, command: &EngineCommand) -> Result<(), SessionError> {
        if self.is_disposed() {
            return Err(SessionError::Bridge("fake embed disposed".to_string()));
        }
        let mut state = self.engine.state();
        state.commands.push(command.clone());

        if state.echo_toggles {
            match command {
                EngineCommand::ToggleAudio => {
                    state.audio_muted = !state.audio_muted;
                    let muted = state.audio_muted;
                    state.deliver(EngineEventName::AudioMuteChanged, json!({ "muted": muted }));
                }
                EngineCommand::ToggleVideo => {
                    state.video_muted = !state.video_muted;
                    let muted = state.video_muted;
                    state.deliver(EngineEventName::VideoMuteChanged, json!({ "muted": muted }));
                }
                EngineCommand::ToggleTileView => {
                    state.tile_view = !state.tile_view;
                    let enabled = state.tile_view;
                    state.deliver(EngineEventName::TileViewChanged, json!({ "enabled": enabled }));
                }
                EngineCommand::ToggleShareScreen => {
                    state.sharing = !state.sharing;
                    let on = state.sharing;
                    state.deliver(EngineEventName::ScreenShareChanged, json!({ "on": on }));
                }
                _ => {}
            }
        }
        if state.close_on_hangup && *command == EngineCommand::Hangup {
            state.deliver(EngineEventName::TerminationRequested, json!({}));
        }
        Ok(())
    }

    async fn participants_info(&self) -> Result<Vec<ReportedParticipant>, SessionError> {
        self.check().await?;
        Ok(self.engine.state().participants.clone())
    }

    async fn is_audio_muted(&self) -> Result<bool, SessionError> {
        self.check().await?;
        Ok(self.engine.state().audio_muted)
    }

    async fn is_video_muted(&self) -> Result<bool, SessionError> {
        self.check().await?;
        Ok(self.engine.state().video_muted)
    }

    fn dispose(&self) {
        *self.disposed.lock().unwrap_or_else(|e| e.into_inner()) = true;
        let mut state = self.engine.state();
        state.dispose_count += 1;
        state.sinks.clear();
    }
}
