//! Engine bridge over the Tauri webview
//!
//! The conferencing engine runs as a script inside the application webview.
//! Outbound traffic (embed construction, commands, queries, dispose) leaves
//! as emitted events; inbound traffic (engine events, load acknowledgements,
//! query answers) arrives through the `commands::engine` Tauri commands and
//! is routed here.

use super::{
    EmbedOptions, EngineCommand, EngineEventName, EngineFactory, EngineHandle, EventSink,
    RawEngineEvent, ReportedParticipant,
};
use crate::config::SessionConfig;
use crate::errors::SessionError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::oneshot;

pub const EMBED_EVENT: &str = "unio-meet://embed";
pub const COMMAND_EVENT: &str = "unio-meet://command";
pub const QUERY_EVENT: &str = "unio-meet://query";
pub const DISPOSE_EVENT: &str = "unio-meet://dispose";

/// Sends a named event with a JSON payload to the frontend.
pub type Emitter = Arc<dyn Fn(&str, Value) -> Result<(), SessionError> + Send + Sync>;

type LoadAck = Result<(), String>;

#[derive(Default)]
struct Pending {
    loads: HashMap<String, oneshot::Sender<LoadAck>>,
    queries: HashMap<String, oneshot::Sender<Value>>,
    embeds: HashMap<String, Weak<BridgeHandle>>,
}

struct BridgeInner {
    emit: Emitter,
    load_timeout: Duration,
    query_timeout: Duration,
    pending: Mutex<Pending>,
}

impl BridgeInner {
    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn query(&self, embed_id: &str, method: &str) -> Result<Value, SessionError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending().queries.insert(request_id.clone(), tx);

        let sent = (self.emit)(
            QUERY_EVENT,
            json!({ "embedId": embed_id, "requestId": request_id, "method": method }),
        );
        if let Err(e) = sent {
            self.pending().queries.remove(&request_id);
            return Err(e);
        }

        let result = tokio::time::timeout(self.query_timeout, rx).await;
        self.pending().queries.remove(&request_id);
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(SessionError::Bridge(format!("{} query dropped", method))),
            Err(_) => Err(SessionError::Bridge(format!(
                "{} query unanswered after {}ms",
                method,
                self.query_timeout.as_millis()
            ))),
        }
    }
}

/// Engine factory whose embeds live in the webview
#[derive(Clone)]
pub struct WebviewBridge {
    inner: Arc<BridgeInner>,
}

impl WebviewBridge {
    pub fn new(emit: Emitter, config: &SessionConfig) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                emit,
                load_timeout: config.load_timeout(),
                query_timeout: config.query_timeout(),
                pending: Mutex::new(Pending::default()),
            }),
        }
    }

    /// Bridge backed by a Tauri app handle.
    pub fn from_app<R: tauri::Runtime>(app: tauri::AppHandle<R>, config: &SessionConfig) -> Self {
        use tauri::Emitter as _;
        let emit: Emitter = Arc::new(move |event: &str, payload: Value| {
            app.emit(event, payload)
                .map_err(|e| SessionError::Bridge(format!("emit {} failed: {}", event, e)))
        });
        Self::new(emit, config)
    }

    /// Frontend acknowledgement of an embed request.
    pub fn report_loaded(&self, embed_id: &str, error: Option<String>) -> bool {
        let sender = self.inner.pending().loads.remove(embed_id);
        match sender {
            Some(tx) => tx.send(error.map_or(Ok(()), Err)).is_ok(),
            None => {
                log::warn!("Load acknowledgement for unknown embed {}", embed_id);
                false
            }
        }
    }

    /// Frontend answer to a query. Late answers are dropped.
    pub fn resolve_query(&self, request_id: &str, value: Value) -> bool {
        let sender = self.inner.pending().queries.remove(request_id);
        match sender {
            Some(tx) => tx.send(value).is_ok(),
            None => {
                log::debug!("Answer for expired query {}", request_id);
                false
            }
        }
    }

    /// Route an engine event to the subscribers of its embed. Returns whether
    /// at least one subscriber received it.
    pub fn forward_event(&self, embed_id: &str, event: RawEngineEvent) -> bool {
        let handle = self
            .inner
            .pending()
            .embeds
            .get(embed_id)
            .and_then(Weak::upgrade);
        match handle {
            Some(handle) => handle.deliver(event),
            None => {
                log::debug!("Event {} for unknown or disposed embed {}", event.name, embed_id);
                false
            }
        }
    }

    pub fn active_embeds(&self) -> usize {
        self.inner
            .pending()
            .embeds
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

#[async_trait]
impl EngineFactory for WebviewBridge {
    async fn create_embed(
        &self,
        domain: &str,
        options: EmbedOptions,
    ) -> Result<Arc<dyn EngineHandle>, SessionError> {
        let embed_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.inner.pending().loads.insert(embed_id.clone(), tx);

        let payload = json!({ "embedId": embed_id, "domain": domain, "options": options });
        if let Err(e) = (self.inner.emit)(EMBED_EVENT, payload) {
            self.inner.pending().loads.remove(&embed_id);
            return Err(SessionError::EngineLoadFailure(e.to_string()));
        }

        let ack = tokio::time::timeout(self.inner.load_timeout, rx).await;
        self.inner.pending().loads.remove(&embed_id);
        match ack {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(reason))) => return Err(SessionError::EngineLoadFailure(reason)),
            Ok(Err(_)) => {
                return Err(SessionError::EngineLoadFailure(
                    "embed request abandoned".to_string(),
                ))
            }
            Err(_) => {
                return Err(SessionError::EngineLoadFailure(format!(
                    "engine at {} did not load within {}ms",
                    domain,
                    self.inner.load_timeout.as_millis()
                )))
            }
        }

        let handle = Arc::new(BridgeHandle {
            embed_id: embed_id.clone(),
            bridge: self.inner.clone(),
            subscriptions: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        });
        self.inner
            .pending()
            .embeds
            .insert(embed_id.clone(), Arc::downgrade(&handle));
        log::info!("Engine embed {} loaded from {}", embed_id, domain);
        Ok(handle)
    }
}

/// Handle to one embed living in the webview
pub struct BridgeHandle {
    embed_id: String,
    bridge: Arc<BridgeInner>,
    subscriptions: Mutex<Vec<(EngineEventName, EventSink)>>,
    disposed: AtomicBool,
}

impl BridgeHandle {
    pub fn embed_id(&self) -> &str {
        &self.embed_id
    }

    fn subscriptions(&self) -> MutexGuard<'_, Vec<(EngineEventName, EventSink)>> {
        self.subscriptions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn deliver(&self, event: RawEngineEvent) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            return false;
        }
        let Some(name) = EngineEventName::parse(&event.name) else {
            log::debug!("Unsubscribed engine event {}", event.name);
            return false;
        };
        let sinks: Vec<EventSink> = self
            .subscriptions()
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, sink)| sink.clone())
            .collect();
        let mut delivered = false;
        for sink in sinks {
            delivered |= sink.send(event.clone()).is_ok();
        }
        delivered
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(SessionError::Bridge(format!("embed {} disposed", self.embed_id)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EngineHandle for BridgeHandle {
    fn on(&self, name: EngineEventName, sink: EventSink) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        self.subscriptions().push((name, sink));
    }

    fn execute_command(&self, command: &EngineCommand) -> Result<(), SessionError> {
        self.ensure_live()?;
        (self.bridge.emit)(
            COMMAND_EVENT,
            json!({
                "embedId": self.embed_id,
                "name": command.name(),
                "args": command.args(),
            }),
        )
    }

    async fn participants_info(&self) -> Result<Vec<ReportedParticipant>, SessionError> {
        self.ensure_live()?;
        let value = self.bridge.query(&self.embed_id, "getParticipantsInfo").await?;
        serde_json::from_value(value).map_err(SessionError::from)
    }

    async fn is_audio_muted(&self) -> Result<bool, SessionError> {
        self.ensure_live()?;
        let value = self.bridge.query(&self.embed_id, "isAudioMuted").await?;
        value
            .as_bool()
            .ok_or_else(|| SessionError::InvalidPayload(format!("isAudioMuted returned {}", value)))
    }

    async fn is_video_muted(&self) -> Result<bool, SessionError> {
        self.ensure_live()?;
        let value = self.bridge.query(&self.embed_id, "isVideoMuted").await?;
        value
            .as_bool()
            .ok_or_else(|| SessionError::InvalidPayload(format!("isVideoMuted returned {}", value)))
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.subscriptions().clear();
        self.bridge.pending().embeds.remove(&self.embed_id);
        if let Err(e) = (self.bridge.emit)(DISPOSE_EVENT, json!({ "embedId": self.embed_id })) {
            log::warn!("Failed to dispose embed {}: {}", self.embed_id, e);
        }
        log::info!("Engine embed {} disposed", self.embed_id);
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        EngineHandle::dispose(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::preferences::{IdentityPreferences, IdentityTier};
    use crate::types::RoomName;
    use tokio::sync::mpsc;

    type Sent = Arc<Mutex<Vec<(String, Value)>>>;

    fn recording_bridge() -> (WebviewBridge, Sent) {
        let sent: Sent = Arc::new(Mutex::new(Vec::new()));
        let log = sent.clone();
        let emit: Emitter = Arc::new(move |event: &str, payload: Value| {
            log.lock().unwrap().push((event.to_string(), payload));
            Ok(())
        });
        (WebviewBridge::new(emit, &SessionConfig::default()), sent)
    }

    fn options() -> EmbedOptions {
        let prefs = IdentityPreferences {
            display_name: "Ana".into(),
            avatar_url: None,
            default_audio_muted: true,
            default_video_muted: false,
            tier: IdentityTier::Anonymous,
        };
        EmbedOptions::build(
            &EngineConfig::default(),
            &RoomName::parse("1234567890").unwrap(),
            &prefs,
        )
    }

    async fn wait_for(sent: &Sent, event: &str, key: &str) -> String {
        loop {
            let found = sent
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(name, _)| name == event)
                .and_then(|(_, payload)| payload[key].as_str().map(str::to_string));
            if let Some(id) = found {
                return id;
            }
            tokio::task::yield_now().await;
        }
    }

    async fn loaded_handle(bridge: &WebviewBridge, sent: &Sent) -> Arc<dyn EngineHandle> {
        let factory = bridge.clone();
        let task = tokio::spawn(async move { factory.create_embed("call.unio.my", options()).await });
        let embed_id = wait_for(sent, EMBED_EVENT, "embedId").await;
        assert!(bridge.report_loaded(&embed_id, None));
        task.await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_load_failure_reported_by_frontend() {
        let (bridge, sent) = recording_bridge();
        let factory = bridge.clone();
        let task = tokio::spawn(async move { factory.create_embed("call.unio.my", options()).await });
        let embed_id = wait_for(&sent, EMBED_EVENT, "embedId").await;
        bridge.report_loaded(&embed_id, Some("script blocked".into()));

        let err = task.await.unwrap().err().unwrap();
        assert_eq!(err, SessionError::EngineLoadFailure("script blocked".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_times_out() {
        let (bridge, _sent) = recording_bridge();
        let result = bridge.create_embed("call.unio.my", options()).await;
        assert!(matches!(result, Err(SessionError::EngineLoadFailure(_))));
    }

    #[tokio::test]
    async fn test_events_routed_until_dispose() {
        let (bridge, sent) = recording_bridge();
        let handle = loaded_handle(&bridge, &sent).await;
        let embed_id = wait_for(&sent, EMBED_EVENT, "embedId").await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.on(EngineEventName::AudioMuteChanged, tx);

        let event = RawEngineEvent::new(EngineEventName::AudioMuteChanged, json!({"muted": true}));
        assert!(bridge.forward_event(&embed_id, event.clone()));
        assert_eq!(rx.recv().await.unwrap(), event);

        // Not subscribed.
        let other = RawEngineEvent::new(EngineEventName::TileViewChanged, json!({"enabled": true}));
        assert!(!bridge.forward_event(&embed_id, other));

        handle.dispose();
        handle.dispose();
        assert!(!bridge.forward_event(&embed_id, event));
        assert_eq!(bridge.active_embeds(), 0);
        let disposals = sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == DISPOSE_EVENT)
            .count();
        assert_eq!(disposals, 1);
        assert!(handle.execute_command(&EngineCommand::Hangup).is_err());
    }

    #[tokio::test]
    async fn test_command_and_query_round_trip() {
        let (bridge, sent) = recording_bridge();
        let handle = loaded_handle(&bridge, &sent).await;

        handle
            .execute_command(&EngineCommand::DisplayName("Ana".into()))
            .unwrap();
        {
            let log = sent.lock().unwrap();
            let (_, payload) = log.iter().find(|(n, _)| n == COMMAND_EVENT).unwrap();
            assert_eq!(payload["name"], "displayName");
            assert_eq!(payload["args"], json!(["Ana"]));
        }

        let querying = handle.clone();
        let task = tokio::spawn(async move { querying.participants_info().await });
        let request_id = wait_for(&sent, QUERY_EVENT, "requestId").await;
        assert!(bridge.resolve_query(
            &request_id,
            json!([{ "id": "p1", "displayName": "Luis" }])
        ));
        let listing = task.await.unwrap().unwrap();
        assert_eq!(listing, vec![ReportedParticipant::remote("p1", "Luis")]);
        assert!(!bridge.resolve_query(&request_id, json!(null)));
    }
}
