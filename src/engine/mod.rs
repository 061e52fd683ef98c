//! Conferencing engine boundary
//!
//! The engine is an external runtime reached only through an opaque factory
//! and handle: subscribe to named events, execute named commands, run a few
//! async queries, dispose. Session logic is written against these traits so
//! it can be driven by `testing::FakeEngine` or by the webview bridge.

pub mod bridge;
pub mod embed;
pub mod events;

pub use bridge::WebviewBridge;
pub use embed::{EmbedOptions, UserInfo};
pub use events::{EngineCommand, EngineEvent, EngineEventName, RawEngineEvent, ReportedParticipant};

use crate::errors::SessionError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Receiving end registered with `EngineHandle::on`. All subscriptions of a
/// session share one channel so delivery order is preserved across names.
pub type EventSink = mpsc::UnboundedSender<RawEngineEvent>;

/// Builds engine embeds
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Load the engine runtime for `domain` and construct an embed. Resolves
    /// once the embed exists; failures are `EngineLoadFailure`.
    async fn create_embed(
        &self,
        domain: &str,
        options: EmbedOptions,
    ) -> Result<Arc<dyn EngineHandle>, SessionError>;
}

/// A constructed engine embed
#[async_trait]
pub trait EngineHandle: Send + Sync {
    /// Route events with this name into `sink`.
    fn on(&self, name: EngineEventName, sink: EventSink);

    /// Fire-and-forget command. An error means the command never left.
    fn execute_command(&self, command: &EngineCommand) -> Result<(), SessionError>;

    async fn participants_info(&self) -> Result<Vec<ReportedParticipant>, SessionError>;

    async fn is_audio_muted(&self) -> Result<bool, SessionError>;

    async fn is_video_muted(&self) -> Result<bool, SessionError>;

    /// Tear down the embed and drop every subscription synchronously.
    fn dispose(&self);
}
