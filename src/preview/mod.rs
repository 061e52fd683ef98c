//! Lobby device preview
//!
//! Acquires the local camera and microphone before a meeting is joined, lets
//! the user mute either device on the preview, and releases every track on
//! each path out of the lobby (join, cancel, drop).

pub mod device;

pub use device::{
    DeviceCapture, DeviceHandle, MediaAccessError, MediaConstraints, MediaStream, MediaTrack,
    NativeDeviceCapture, TrackKind,
};

use crate::config::PreviewConfig;
use crate::preferences::IdentityPreferences;
use crate::permissions::{PermissionInfo, PermissionState};
use std::sync::Arc;
use std::time::Duration;

/// Tagged result of `MediaPreviewController::start`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreviewOutcome {
    Granted { has_audio: bool, has_video: bool },
    Denied { cause: String },
    DeviceMissing { cause: String },
}

/// Snapshot of the preview for rendering
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MediaPreviewState {
    pub permission_state: PermissionState,
    pub message: String,
    pub local_audio_muted: bool,
    pub local_video_muted: bool,
    pub has_audio: bool,
    pub has_video: bool,
}

/// Mute values the preview imposes on the join. `None` leaves the
/// resolved preference in charge; a device that is not live is always
/// `Some(true)` and a device the user toggled carries its toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinOverrides {
    pub audio_muted: Option<bool>,
    pub video_muted: Option<bool>,
}

pub struct MediaPreviewController {
    capture: Arc<dyn DeviceCapture>,
    stream: Option<MediaStream>,
    permission: PermissionInfo,
    local_audio_muted: bool,
    local_video_muted: bool,
    audio_toggled: bool,
    video_toggled: bool,
    request_timeout: Duration,
}

impl MediaPreviewController {
    pub fn new(capture: Arc<dyn DeviceCapture>, config: &PreviewConfig) -> Self {
        Self {
            capture,
            stream: None,
            permission: PermissionInfo::unrequested(),
            local_audio_muted: config.start_audio_muted,
            local_video_muted: config.start_video_muted,
            audio_toggled: false,
            video_toggled: false,
            request_timeout: config.request_timeout(),
        }
    }

    /// Seed the preview mutes from resolved preferences. A kind the user
    /// already toggled keeps the toggle.
    pub fn apply_preferences(&mut self, prefs: &IdentityPreferences) {
        if !self.audio_toggled {
            self.local_audio_muted = prefs.default_audio_muted;
        }
        if !self.video_toggled {
            self.local_video_muted = prefs.default_video_muted;
        }
        if let Some(stream) = &self.stream {
            stream.set_kind_enabled(TrackKind::Audio, !self.local_audio_muted);
            stream.set_kind_enabled(TrackKind::Video, !self.local_video_muted);
        }
    }

    /// Request camera and microphone access. Never fails: every outcome,
    /// including a timed-out request, resolves to a tagged result.
    pub async fn start(&mut self) -> PreviewOutcome {
        // Only one holder of device tracks at a time.
        self.stop();

        log::info!("Requesting camera and microphone access");
        let result = match self.request(MediaConstraints::AUDIO_VIDEO).await {
            Err(MediaAccessError::DeviceNotFound(cause)) => {
                log::info!("Combined request found no devices ({}), trying single devices", cause);
                match self.request(MediaConstraints::AUDIO_ONLY).await {
                    Ok(stream) => Ok(stream),
                    Err(denied @ MediaAccessError::PermissionDenied(_)) => Err(denied),
                    Err(_) => match self.request(MediaConstraints::VIDEO_ONLY).await {
                        Ok(stream) => Ok(stream),
                        Err(denied @ MediaAccessError::PermissionDenied(_)) => Err(denied),
                        Err(_) => Err(MediaAccessError::DeviceNotFound(cause)),
                    },
                }
            }
            other => other,
        };

        match result {
            Ok(stream) => {
                stream.set_kind_enabled(TrackKind::Audio, !self.local_audio_muted);
                stream.set_kind_enabled(TrackKind::Video, !self.local_video_muted);
                let has_audio = stream.has_kind(TrackKind::Audio);
                let has_video = stream.has_kind(TrackKind::Video);
                self.permission = PermissionInfo::granted(has_audio, has_video);
                self.stream = Some(stream);
                log::info!("{}", self.permission.message);
                PreviewOutcome::Granted {
                    has_audio,
                    has_video,
                }
            }
            Err(e) => {
                self.permission = PermissionInfo::from_access_error(&e);
                log::warn!("{}", self.permission.message);
                match e {
                    MediaAccessError::DeviceNotFound(cause) => PreviewOutcome::DeviceMissing { cause },
                    MediaAccessError::PermissionDenied(cause) | MediaAccessError::Aborted(cause) => {
                        PreviewOutcome::Denied { cause }
                    }
                }
            }
        }
    }

    async fn request(&self, constraints: MediaConstraints) -> Result<MediaStream, MediaAccessError> {
        match tokio::time::timeout(self.request_timeout, self.capture.request_media(constraints)).await {
            Ok(result) => result,
            Err(_) => Err(MediaAccessError::Aborted(format!(
                "no response within {}ms",
                self.request_timeout.as_millis()
            ))),
        }
    }

    /// Flip the microphone mute on the preview. Returns the new muted flag,
    /// or `None` when there is no granted stream to act on.
    pub fn toggle_local_audio(&mut self) -> Option<bool> {
        self.toggle(TrackKind::Audio)
    }

    /// Flip the camera mute on the preview. Returns the new muted flag, or
    /// `None` when there is no granted stream to act on.
    pub fn toggle_local_video(&mut self) -> Option<bool> {
        self.toggle(TrackKind::Video)
    }

    fn toggle(&mut self, kind: TrackKind) -> Option<bool> {
        self.detect_revocation();
        let stream = self.stream.as_ref()?;
        if !self.permission.state.is_granted() || !stream.has_kind(kind) {
            return None;
        }

        let muted = match kind {
            TrackKind::Audio => {
                self.audio_toggled = true;
                self.local_audio_muted = !self.local_audio_muted;
                self.local_audio_muted
            }
            TrackKind::Video => {
                self.video_toggled = true;
                self.local_video_muted = !self.local_video_muted;
                self.local_video_muted
            }
        };
        stream.set_kind_enabled(kind, !muted);
        log::debug!("Preview {:?} muted = {}", kind, muted);
        Some(muted)
    }

    /// A track that ended without `stop()` means the device was revoked or
    /// unplugged mid-preview.
    fn detect_revocation(&mut self) {
        let revoked = self.stream.as_ref().is_some_and(|s| s.has_ended_track());
        if revoked {
            log::warn!("Device track ended unexpectedly, treating access as revoked");
            self.stop();
            self.permission = PermissionInfo {
                state: PermissionState::Denied,
                message: "Camera/Mic access was revoked".to_string(),
                can_retry: true,
            };
        }
    }

    /// Stop every track. Safe to call any number of times.
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop_all();
            log::info!("Preview stream stopped");
        }
    }

    fn is_live(&self, kind: TrackKind) -> bool {
        self.permission.state.is_granted()
            && self
                .stream
                .as_ref()
                .is_some_and(|s| s.tracks_of(kind).any(|t| t.is_live()))
    }

    /// What the preview imposes on the join mutes.
    pub fn join_overrides(&self) -> JoinOverrides {
        let force = |kind: TrackKind, toggled: bool, muted: bool| {
            if !self.is_live(kind) {
                Some(true)
            } else if toggled {
                Some(muted)
            } else {
                None
            }
        };
        JoinOverrides {
            audio_muted: force(TrackKind::Audio, self.audio_toggled, self.local_audio_muted),
            video_muted: force(TrackKind::Video, self.video_toggled, self.local_video_muted),
        }
    }

    /// Compute the join overrides and hand the devices over by releasing them.
    pub fn release_for_join(&mut self) -> JoinOverrides {
        self.detect_revocation();
        let overrides = self.join_overrides();
        self.stop();
        overrides
    }

    pub fn state(&mut self) -> MediaPreviewState {
        self.detect_revocation();
        let (has_audio, has_video) = self
            .stream
            .as_ref()
            .map(|s| (s.has_kind(TrackKind::Audio), s.has_kind(TrackKind::Video)))
            .unwrap_or((false, false));
        MediaPreviewState {
            permission_state: self.permission.state,
            message: self.permission.message.clone(),
            local_audio_muted: self.local_audio_muted,
            local_video_muted: self.local_video_muted,
            has_audio,
            has_video,
        }
    }

    pub fn permission(&self) -> &PermissionInfo {
        &self.permission
    }

    pub fn active_track_count(&self) -> usize {
        self.stream.as_ref().map_or(0, |s| s.live_track_count())
    }
}

impl Drop for MediaPreviewController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDeviceCapture;

    fn controller(capture: Arc<FakeDeviceCapture>) -> MediaPreviewController {
        MediaPreviewController::new(capture, &PreviewConfig::default())
    }

    #[tokio::test]
    async fn test_granted_applies_initial_mutes() {
        let capture = Arc::new(FakeDeviceCapture::granted());
        let mut preview = controller(capture.clone());

        let outcome = preview.start().await;
        assert_eq!(
            outcome,
            PreviewOutcome::Granted {
                has_audio: true,
                has_video: true
            }
        );
        let state = preview.state();
        assert!(state.local_audio_muted);
        assert!(!state.local_video_muted);
        assert_eq!(capture.live_tracks(), 2);
    }

    #[tokio::test]
    async fn test_toggle_before_start_is_noop() {
        let mut preview = controller(Arc::new(FakeDeviceCapture::granted()));
        assert_eq!(preview.toggle_local_audio(), None);
        assert_eq!(preview.toggle_local_video(), None);
    }

    #[tokio::test]
    async fn test_restart_releases_previous_stream() {
        let capture = Arc::new(FakeDeviceCapture::granted());
        let mut preview = controller(capture.clone());
        preview.start().await;
        preview.start().await;
        assert_eq!(capture.live_tracks(), 2);
        assert_eq!(capture.requests(), 2);
    }

    #[tokio::test]
    async fn test_drop_releases_tracks() {
        let capture = Arc::new(FakeDeviceCapture::granted());
        {
            let mut preview = controller(capture.clone());
            preview.start().await;
            assert_eq!(capture.live_tracks(), 2);
        }
        assert_eq!(capture.live_tracks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_request_times_out_as_denied() {
        let capture = Arc::new(FakeDeviceCapture::hanging());
        let mut preview = controller(capture);
        let outcome = preview.start().await;
        assert!(matches!(outcome, PreviewOutcome::Denied { .. }));
        assert_eq!(preview.permission().state, PermissionState::Denied);
    }
}
