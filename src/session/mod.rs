//! Meeting session controller
//!
//! Owns one engine embed for one room and turns the engine's asynchronous
//! events into a reactive `SessionSnapshot`:
//!
//! ```text
//! Initializing --embed loaded--> Ready --join confirmed--> Joined
//!       \                          |                          |
//!        `---- hang-up timeout ----+---- termination / timeout -> Ended
//! ```
//!
//! Control state is only ever written by engine confirmations; the toggle
//! methods just send commands. Every engine event goes through one channel
//! and one pump task, so events are applied in delivery order.

pub mod state;

pub use state::{
    CommandOutcome, ControlState, EndReason, LifecycleState, SessionSnapshot,
};

use crate::config::{EngineConfig, MeetConfig, SessionConfig};
use crate::engine::{
    EmbedOptions, EngineCommand, EngineEvent, EngineEventName, EngineFactory, EngineHandle,
    RawEngineEvent, ReportedParticipant,
};
use crate::errors::SessionError;
use crate::preferences::IdentityPreferences;
use crate::roster::{reconcile, ParticipantRoster, RosterDelta};
use crate::types::{ReactionKind, RoomName};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::error::Elapsed;

type EndCallback = Box<dyn FnOnce(EndReason) + Send>;

#[derive(Default)]
struct Inner {
    room: Option<RoomName>,
    lifecycle: LifecycleState,
    handle: Option<Arc<dyn EngineHandle>>,
    pending: VecDeque<EngineCommand>,
    controls: ControlState,
    roster: ParticipantRoster,
    /// Last engine listing, patched by roster events in between refreshes
    reported: Vec<ReportedParticipant>,
    local_name: String,
    local_id: Option<String>,
    error: Option<String>,
    load_failed: bool,
    hang_up_requested: bool,
    disposed: bool,
    end_reason: Option<EndReason>,
    joined_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Bumped by every confirmation event; a query issued before the bump is stale
    controls_epoch: u64,
    /// Bumped by every roster event
    roster_epoch: u64,
    tasks: Vec<JoinHandle<()>>,
}

impl Inner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            room: self.room.clone(),
            lifecycle: self.lifecycle,
            controls: self.controls,
            roster: self.roster.clone(),
            error: self.error.clone(),
            hang_up_requested: self.hang_up_requested,
            end_reason: self.end_reason,
            joined_at: self.joined_at,
        }
    }

    fn is_live(&self) -> bool {
        !self.disposed && self.lifecycle != LifecycleState::Ended
    }

    fn is_joined(&self) -> bool {
        self.is_live() && self.lifecycle == LifecycleState::Joined
    }

    fn track(&mut self, task: JoinHandle<()>) {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(task);
    }

    /// Re-derive the roster from the cached listing.
    fn reconcile_roster(&mut self) {
        if let Some(local_id) = self.local_id.clone() {
            match self.reported.iter_mut().find(|r| r.id == local_id) {
                Some(record) => record.local = Some(true),
                None => self.reported.push(ReportedParticipant {
                    id: local_id,
                    display_name: Some(self.local_name.clone()),
                    local: Some(true),
                    ..Default::default()
                }),
            }
        }
        self.roster = reconcile(&self.roster, &self.reported, &self.local_name);
    }
}

struct Shared {
    config: SessionConfig,
    engine: EngineConfig,
    factory: Arc<dyn EngineFactory>,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionSnapshot>,
    on_end: Mutex<Option<EndCallback>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, inner: &Inner) {
        self.state_tx.send_replace(inner.snapshot());
    }

    fn take_end_callback(&self) -> Option<EndCallback> {
        self.on_end.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    fn fail_load(&self, error: SessionError) -> SessionError {
        let mut inner = self.lock();
        if inner.disposed {
            return error;
        }
        log::error!("{}", error);
        inner.load_failed = true;
        inner.error = Some(error.user_message());
        let dropped = inner.pending.len();
        inner.pending.clear();
        if dropped > 0 {
            log::warn!("Discarded {} queued command(s) after load failure", dropped);
        }
        self.publish(&inner);
        error
    }

    fn issue(&self, command: EngineCommand) -> CommandOutcome {
        let mut inner = self.lock();
        let rejection = if inner.disposed {
            Some("session disposed")
        } else if inner.lifecycle == LifecycleState::Ended {
            Some("session ended")
        } else if inner.load_failed {
            Some("engine not loaded")
        } else {
            None
        };
        if let Some(reason) = rejection {
            log::warn!(
                "{}",
                SessionError::EngineCommandIgnored(format!("{} ({})", command.name(), reason))
            );
            return CommandOutcome::Ignored;
        }

        if let (Some(handle), true) = (inner.handle.clone(), inner.lifecycle.accepts_commands()) {
            return match handle.execute_command(&command) {
                Ok(()) => {
                    log::debug!("Sent {} to engine", command.name());
                    CommandOutcome::Sent
                }
                Err(e) => {
                    log::warn!("Command {} not delivered: {}", command.name(), e);
                    CommandOutcome::Ignored
                }
            };
        }

        if inner.pending.len() >= self.config.max_pending_commands {
            log::warn!(
                "{}",
                SessionError::EngineCommandIgnored(format!(
                    "{} (queue full at {})",
                    command.name(),
                    self.config.max_pending_commands
                ))
            );
            return CommandOutcome::Ignored;
        }
        log::debug!("Queued {} until the engine is ready", command.name());
        inner.pending.push_back(command);
        CommandOutcome::Queued
    }

    fn update_controls(&self, apply: impl FnOnce(&mut ControlState)) {
        let mut inner = self.lock();
        if !inner.is_live() {
            return;
        }
        apply(&mut inner.controls);
        inner.controls_epoch += 1;
        self.publish(&inner);
    }

    /// Apply the post-join mute query unless a confirmation event arrived
    /// after it was issued.
    fn apply_queried_controls(&self, epoch: u64, audio: Option<bool>, video: Option<bool>) {
        let mut inner = self.lock();
        if !inner.is_joined() {
            return;
        }
        if inner.controls_epoch != epoch {
            log::debug!("Mute query superseded by confirmation events");
            return;
        }
        if let Some(muted) = audio {
            inner.controls.audio_muted = muted;
        }
        if let Some(muted) = video {
            inner.controls.video_muted = muted;
        }
        self.publish(&inner);
    }

    fn apply_listing(&self, epoch: u64, listing: Vec<ReportedParticipant>) {
        let mut inner = self.lock();
        if !inner.is_joined() {
            return;
        }
        if inner.roster_epoch != epoch {
            log::debug!("Participant listing superseded by roster events");
            return;
        }
        inner.reported = listing;
        inner.reconcile_roster();
        self.publish(&inner);
    }

    /// Transition to `Ended`. Runs at most once per session; later calls and
    /// calls after `dispose` do nothing.
    fn end(&self, reason: EndReason) {
        let handle = {
            let mut inner = self.lock();
            if !inner.is_live() {
                return;
            }
            inner.lifecycle = LifecycleState::Ended;
            inner.end_reason = Some(reason);
            inner.pending.clear();
            self.publish(&inner);
            inner.handle.take()
        };
        log::info!("Session ended ({:?})", reason);

        if let Some(handle) = handle {
            handle.dispose();
        }
        if let Some(callback) = self.take_end_callback() {
            callback(reason);
        }
    }

    fn dispose(&self) {
        let (handle, tasks) = {
            let mut inner = self.lock();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.pending.clear();
            (inner.handle.take(), std::mem::take(&mut inner.tasks))
        };
        self.take_end_callback();

        if let Some(handle) = handle {
            handle.dispose();
        }
        for task in tasks {
            task.abort();
        }
        log::info!("Session disposed");
    }

    /// Apply one engine event. Returns false once no further events matter.
    fn handle_event(self: &Arc<Self>, raw: RawEngineEvent) -> bool {
        if !self.lock().is_live() {
            return false;
        }
        let event = match EngineEvent::parse(&raw) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Dropping engine event: {}", e);
                return true;
            }
        };
        log::debug!("Engine event {}", raw.name);

        match event {
            EngineEvent::JoinConfirmed { local_id, .. } => self.on_joined(local_id),
            EngineEvent::TerminationRequested => {
                self.end(EndReason::EngineTerminated);
                return false;
            }
            EngineEvent::Roster(delta) => self.on_roster(delta),
            EngineEvent::AudioMuteChanged { muted } => self.update_controls(|c| c.audio_muted = muted),
            EngineEvent::VideoMuteChanged { muted } => self.update_controls(|c| c.video_muted = muted),
            EngineEvent::TileViewChanged { enabled } => {
                self.update_controls(|c| c.tile_view_enabled = enabled)
            }
            EngineEvent::ScreenShareChanged { on } => self.update_controls(|c| c.screen_sharing = on),
        }
        true
    }

    fn on_joined(self: &Arc<Self>, local_id: Option<String>) {
        let mut inner = self.lock();
        if inner.lifecycle != LifecycleState::Ready {
            log::debug!("Ignoring join confirmation while {}", inner.lifecycle);
            return;
        }
        inner.lifecycle = LifecycleState::Joined;
        inner.joined_at = Some(chrono::Utc::now());
        inner.error = None;
        inner.local_id = local_id;
        inner.reconcile_roster();
        self.publish(&inner);
        log::info!("Joined meeting as {}", inner.local_name);

        let Some(handle) = inner.handle.clone() else {
            return;
        };
        let name = EngineCommand::DisplayName(inner.local_name.clone());
        if let Err(e) = handle.execute_command(&name) {
            log::warn!("Could not announce display name: {}", e);
        }
        // Queries run off the pump so later events are never held up.
        let task = tokio::spawn(query_after_join(
            Arc::downgrade(self),
            handle,
            self.config.query_timeout(),
            inner.controls_epoch,
            inner.roster_epoch,
        ));
        inner.track(task);
    }

    fn on_roster(self: &Arc<Self>, delta: RosterDelta) {
        let mut inner = self.lock();
        delta.apply(&mut inner.reported);
        inner.roster_epoch += 1;
        if inner.lifecycle != LifecycleState::Joined {
            return;
        }
        inner.reconcile_roster();
        self.publish(&inner);

        if let Some(handle) = inner.handle.clone() {
            let task = tokio::spawn(refresh_roster(
                Arc::downgrade(self),
                handle,
                self.config.query_timeout(),
                inner.roster_epoch,
            ));
            inner.track(task);
        }
    }
}

fn settled<T>(what: &str, result: Result<Result<T, SessionError>, Elapsed>) -> Option<T> {
    match result {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            log::warn!("{} query failed: {}", what, e);
            None
        }
        Err(_) => {
            log::warn!("{} query timed out", what);
            None
        }
    }
}

/// Read the authoritative mute flags, then refresh the roster.
async fn query_after_join(
    shared: Weak<Shared>,
    handle: Arc<dyn EngineHandle>,
    timeout: Duration,
    controls_epoch: u64,
    roster_epoch: u64,
) {
    let (audio, video) = tokio::join!(
        tokio::time::timeout(timeout, handle.is_audio_muted()),
        tokio::time::timeout(timeout, handle.is_video_muted()),
    );
    let audio = settled("Audio mute", audio);
    let video = settled("Video mute", video);
    if let Some(shared) = shared.upgrade() {
        shared.apply_queried_controls(controls_epoch, audio, video);
    }
    refresh_roster(shared, handle, timeout, roster_epoch).await;
}

/// Replace the cached listing with the engine's own. On failure the
/// event-derived roster stays in place.
async fn refresh_roster(
    shared: Weak<Shared>,
    handle: Arc<dyn EngineHandle>,
    timeout: Duration,
    epoch: u64,
) {
    let listing = tokio::time::timeout(timeout, handle.participants_info()).await;
    let Some(listing) = settled("Participant listing", listing) else {
        return;
    };
    if let Some(shared) = shared.upgrade() {
        shared.apply_listing(epoch, listing);
    }
}

async fn run_event_pump(shared: Weak<Shared>, mut events: mpsc::UnboundedReceiver<RawEngineEvent>) {
    while let Some(raw) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        if !shared.handle_event(raw) {
            break;
        }
    }
    log::debug!("Engine event pump stopped");
}

async fn run_join_watchdog(shared: Weak<Shared>, timeout: Duration) {
    tokio::time::sleep(timeout).await;
    let Some(shared) = shared.upgrade() else {
        return;
    };
    {
        let mut inner = shared.lock();
        if !inner.is_live() || inner.lifecycle != LifecycleState::Ready {
            return;
        }
        let error = SessionError::EngineLoadFailure(format!(
            "join not confirmed within {}ms",
            timeout.as_millis()
        ));
        log::error!("{}", error);
        inner.error = Some(error.user_message());
    }
    shared.end(EndReason::JoinTimeout);
}

/// Controller for one meeting session. Dropping it disposes the session.
pub struct MeetingSessionController {
    shared: Arc<Shared>,
}

impl MeetingSessionController {
    pub fn new(factory: Arc<dyn EngineFactory>, config: &MeetConfig) -> Self {
        let (state_tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                config: config.session.clone(),
                engine: config.engine.clone(),
                factory,
                inner: Mutex::new(Inner::default()),
                state_tx,
                on_end: Mutex::new(None),
            }),
        }
    }

    /// Construct the embed for `room` and subscribe to its events.
    ///
    /// Calling again for the same room while starting, ready or joined is a
    /// no-op. A load failure leaves a persistent error in the snapshot and
    /// is also returned.
    pub async fn start(&self, room: RoomName, prefs: &IdentityPreferences) -> Result<(), SessionError> {
        {
            let mut inner = self.shared.lock();
            if inner.disposed {
                return Err(SessionError::EngineCommandIgnored(
                    "start on a disposed session".to_string(),
                ));
            }
            if inner.lifecycle == LifecycleState::Ended || inner.load_failed {
                return Err(SessionError::EngineCommandIgnored(
                    "start on a finished session".to_string(),
                ));
            }
            if let Some(current) = &inner.room {
                if *current == room {
                    log::debug!("Session for room {} already started", room);
                    return Ok(());
                }
                return Err(SessionError::EngineCommandIgnored(format!(
                    "session already bound to room {}",
                    current
                )));
            }
            inner.room = Some(room.clone());
            inner.local_name = prefs.display_name.clone();
            inner.controls = ControlState {
                audio_muted: prefs.default_audio_muted,
                video_muted: prefs.default_video_muted,
                ..ControlState::default()
            };
            self.shared.publish(&inner);
        }

        log::info!("Loading engine for room {}", room);
        let options = EmbedOptions::build(&self.shared.engine, &room, prefs);
        let load_timeout = self.shared.config.load_timeout();
        let created = tokio::time::timeout(
            load_timeout,
            self.shared.factory.create_embed(&self.shared.engine.domain, options),
        )
        .await;
        let handle = match created {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => return Err(self.shared.fail_load(e)),
            Err(_) => {
                return Err(self.shared.fail_load(SessionError::EngineLoadFailure(format!(
                    "embed not constructed within {}ms",
                    load_timeout.as_millis()
                ))))
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        for name in EngineEventName::ALL {
            handle.on(name, tx.clone());
        }
        drop(tx);

        let mut inner = self.shared.lock();
        if !inner.is_live() {
            drop(inner);
            log::info!("Session closed while the engine was loading");
            handle.dispose();
            return Ok(());
        }
        inner.handle = Some(handle.clone());
        inner.lifecycle = LifecycleState::Ready;

        // Flush under the lock so nothing issued meanwhile can overtake.
        let queued: Vec<EngineCommand> = inner.pending.drain(..).collect();
        for command in &queued {
            if let Err(e) = handle.execute_command(command) {
                log::warn!("Queued command {} not delivered: {}", command.name(), e);
            }
        }

        let weak = Arc::downgrade(&self.shared);
        inner.tasks.push(tokio::spawn(run_event_pump(weak.clone(), rx)));
        inner
            .tasks
            .push(tokio::spawn(run_join_watchdog(weak, self.shared.config.join_timeout())));
        self.shared.publish(&inner);
        log::info!("Engine ready, flushed {} queued command(s)", queued.len());
        Ok(())
    }

    pub fn toggle_audio(&self) -> CommandOutcome {
        self.shared.issue(EngineCommand::ToggleAudio)
    }

    pub fn toggle_video(&self) -> CommandOutcome {
        self.shared.issue(EngineCommand::ToggleVideo)
    }

    pub fn toggle_screen_share(&self) -> CommandOutcome {
        self.shared.issue(EngineCommand::ToggleShareScreen)
    }

    pub fn toggle_tile_view(&self) -> CommandOutcome {
        self.shared.issue(EngineCommand::ToggleTileView)
    }

    pub fn send_reaction(&self, kind: ReactionKind) -> CommandOutcome {
        self.shared.issue(EngineCommand::SendReaction(kind))
    }

    /// Ask the engine to leave. If no termination event follows within the
    /// termination timeout the session ends locally.
    pub fn hang_up(&self) -> CommandOutcome {
        let outcome = self.shared.issue(EngineCommand::Hangup);
        if outcome == CommandOutcome::Ignored {
            return outcome;
        }

        let mut inner = self.shared.lock();
        if inner.hang_up_requested {
            return outcome;
        }
        inner.hang_up_requested = true;
        self.shared.publish(&inner);

        let weak = Arc::downgrade(&self.shared);
        let timeout = self.shared.config.termination_timeout();
        inner.tasks.push(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(shared) = weak.upgrade() {
                if shared.lock().is_live() {
                    log::warn!(
                        "{}",
                        SessionError::TerminationTimeout(format!(
                            "no termination event {}ms after hang-up, ending locally",
                            timeout.as_millis()
                        ))
                    );
                    shared.end(EndReason::TerminationTimeout);
                }
            }
        }));
        outcome
    }

    /// Release the embed and every subscription. Idempotent; the session-end
    /// callback does not fire.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    /// Register the callback fired once when the session reaches `Ended`.
    /// Fires immediately if the session already ended.
    pub fn on_session_end<F>(&self, callback: F)
    where
        F: FnOnce(EndReason) + Send + 'static,
    {
        *self.shared.on_end.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(callback));

        let ended = {
            let inner = self.shared.lock();
            inner.end_reason.filter(|_| inner.lifecycle == LifecycleState::Ended && !inner.disposed)
        };
        if let Some(reason) = ended {
            if let Some(callback) = self.shared.take_end_callback() {
                callback(reason);
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.state_tx.borrow().clone()
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.shared.lock().lifecycle
    }

    pub fn controls(&self) -> ControlState {
        self.shared.lock().controls
    }

    pub fn roster(&self) -> ParticipantRoster {
        self.shared.lock().roster.clone()
    }

    pub fn room(&self) -> Option<RoomName> {
        self.shared.lock().room.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }
}

impl Drop for MeetingSessionController {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::IdentityTier;
    use crate::testing::FakeEngine;
    use serde_json::json;

    fn prefs() -> IdentityPreferences {
        IdentityPreferences {
            display_name: "Luis".into(),
            avatar_url: None,
            default_audio_muted: true,
            default_video_muted: false,
            tier: IdentityTier::Anonymous,
        }
    }

    fn room() -> RoomName {
        RoomName::parse("1234567890").unwrap()
    }

    #[tokio::test]
    async fn test_start_is_idempotent_for_same_room() {
        let engine = FakeEngine::new();
        let session = MeetingSessionController::new(Arc::new(engine.clone()), &MeetConfig::default());

        session.start(room(), &prefs()).await.unwrap();
        session.start(room(), &prefs()).await.unwrap();
        assert_eq!(engine.created_options().len(), 1);
        assert_eq!(session.lifecycle(), LifecycleState::Ready);

        let other = RoomName::parse("other").unwrap();
        assert!(session.start(other, &prefs()).await.is_err());
    }

    #[tokio::test]
    async fn test_embed_gets_resolved_identity() {
        let engine = FakeEngine::new();
        let session = MeetingSessionController::new(Arc::new(engine.clone()), &MeetConfig::default());
        session.start(room(), &prefs()).await.unwrap();

        let options = engine.created_options();
        assert_eq!(options[0].user_info.display_name, "Luis");
        assert_eq!(options[0].start_audio_muted(), Some(true));
        assert_eq!(engine.subscription_count(), EngineEventName::ALL.len());
    }

    #[tokio::test]
    async fn test_malformed_event_is_dropped() {
        let engine = FakeEngine::new();
        let session = MeetingSessionController::new(Arc::new(engine.clone()), &MeetConfig::default());
        session.start(room(), &prefs()).await.unwrap();
        let mut state = session.subscribe();

        engine.emit(EngineEventName::TileViewChanged, json!({"enabled": "yes"}));
        engine.emit(EngineEventName::TileViewChanged, json!({"enabled": true}));
        state
            .wait_for(|s| s.controls.tile_view_enabled)
            .await
            .unwrap();
        assert_eq!(session.lifecycle(), LifecycleState::Ready);
    }

    #[tokio::test]
    async fn test_dispose_without_join_releases_embed() {
        let engine = FakeEngine::new();
        let session = MeetingSessionController::new(Arc::new(engine.clone()), &MeetConfig::default());
        session.start(room(), &prefs()).await.unwrap();

        session.dispose();
        session.dispose();
        assert_eq!(engine.dispose_count(), 1);
        assert_eq!(session.toggle_audio(), CommandOutcome::Ignored);
    }

    async fn joined_session(engine: &FakeEngine) -> MeetingSessionController {
        engine.hang_queries();
        let session = MeetingSessionController::new(Arc::new(engine.clone()), &MeetConfig::default());
        session.start(room(), &prefs()).await.unwrap();
        let mut state = session.subscribe();
        engine.join("me", "Luis");
        state.wait_for(|s| s.is_joined()).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_mute_query_older_than_confirmation_is_dropped() {
        let engine = FakeEngine::new();
        let session = joined_session(&engine).await;
        let epoch = session.shared.lock().controls_epoch;

        session.shared.update_controls(|c| c.audio_muted = false);
        session.shared.apply_queried_controls(epoch, Some(true), Some(true));
        assert!(!session.snapshot().controls.audio_muted);
        assert!(!session.snapshot().controls.video_muted);

        let epoch = session.shared.lock().controls_epoch;
        session.shared.apply_queried_controls(epoch, None, Some(true));
        assert!(session.snapshot().controls.video_muted);
    }

    #[tokio::test]
    async fn test_listing_older_than_roster_event_is_dropped() {
        let engine = FakeEngine::new();
        let session = joined_session(&engine).await;
        let epoch = session.shared.lock().roster_epoch;

        let mut state = session.subscribe();
        engine.add_participant("p1", "Ana");
        state.wait_for(|s| s.roster.len() == 2).await.unwrap();

        session.shared.apply_listing(epoch, vec![ReportedParticipant::remote("ghost", "Old")]);
        assert!(session.snapshot().roster.get("ghost").is_none());

        let epoch = session.shared.lock().roster_epoch;
        session.shared.apply_listing(epoch, vec![ReportedParticipant::remote("p2", "Marta")]);
        assert_eq!(session.snapshot().roster.ids(), vec!["me", "p2"]);
    }
}
