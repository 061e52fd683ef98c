//! Device capture API: streams, tracks and native device capture.

use crate::errors::SessionError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Typed rejection of a device capture request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaAccessError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("request aborted: {0}")]
    Aborted(String),
}

impl From<MediaAccessError> for SessionError {
    fn from(e: MediaAccessError) -> Self {
        match e {
            MediaAccessError::PermissionDenied(msg) | MediaAccessError::Aborted(msg) => {
                SessionError::PermissionDenied(msg)
            }
            MediaAccessError::DeviceNotFound(msg) => SessionError::DeviceNotFound(msg),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Which device kinds to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl MediaConstraints {
    pub const AUDIO_VIDEO: MediaConstraints = MediaConstraints { audio: true, video: true };
    pub const AUDIO_ONLY: MediaConstraints = MediaConstraints { audio: true, video: false };
    pub const VIDEO_ONLY: MediaConstraints = MediaConstraints { audio: false, video: true };
}

/// A device held open on behalf of a track
pub trait DeviceHandle: Send {
    /// False once the device stopped delivering on its own (unplugged,
    /// access revoked, stream error).
    fn is_open(&self) -> bool;

    /// Release the device. Called at most once per handle.
    fn close(&mut self);
}

struct TrackShared {
    live: AtomicBool,
    enabled: AtomicBool,
    device: Mutex<Option<Box<dyn DeviceHandle>>>,
}

/// A single device track. Clones share state with the backend that issued
/// the track, so a backend can observe `stop()`. A track backed by a device
/// handle ends by itself when the device does.
#[derive(Clone)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    shared: Arc<TrackShared>,
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("live", &self.is_live())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl MediaTrack {
    /// A track with no device behind it; it ends only through `stop()`.
    pub fn new(kind: TrackKind) -> Self {
        Self::build(kind, None)
    }

    /// A track that owns `device` and closes it on `stop()`.
    pub fn with_device(kind: TrackKind, device: Box<dyn DeviceHandle>) -> Self {
        Self::build(kind, Some(device))
    }

    fn build(kind: TrackKind, device: Option<Box<dyn DeviceHandle>>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            shared: Arc::new(TrackShared {
                live: AtomicBool::new(true),
                enabled: AtomicBool::new(true),
                device: Mutex::new(device),
            }),
        }
    }

    fn device(&self) -> MutexGuard<'_, Option<Box<dyn DeviceHandle>>> {
        self.shared.device.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_live(&self) -> bool {
        self.shared.live.load(Ordering::SeqCst) && self.device().as_ref().map_or(true, |d| d.is_open())
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Release the underlying device. Idempotent.
    pub fn stop(&self) {
        self.shared.live.store(false, Ordering::SeqCst);
        let device = self.device().take();
        if let Some(mut device) = device {
            device.close();
            log::debug!("Closed {:?} device for track {}", self.kind, self.id);
        }
    }
}

/// A set of live device tracks, exclusively owned by one holder
#[derive(Debug, Default)]
pub struct MediaStream {
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(move |t| t.kind() == kind)
    }

    pub fn has_kind(&self, kind: TrackKind) -> bool {
        self.tracks_of(kind).next().is_some()
    }

    /// Set the `enabled` flag of every track of the given kind.
    pub fn set_kind_enabled(&self, kind: TrackKind, enabled: bool) {
        for track in self.tracks_of(kind) {
            track.set_enabled(enabled);
        }
    }

    pub fn live_track_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    /// A track ended without us stopping it.
    pub fn has_ended_track(&self) -> bool {
        self.tracks.iter().any(|t| !t.is_live())
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// Camera/microphone acquisition
#[async_trait]
pub trait DeviceCapture: Send + Sync {
    async fn request_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, MediaAccessError>;
}

/// Device capture backed by the platform device APIs.
///
/// The first camera nokhwa reports is opened as a callback stream and held
/// by the video track until the track stops. With the `audio` feature the
/// default cpal input is opened the same way; without it a microphone is
/// assumed present and its track holds no device.
#[derive(Debug, Default, Clone)]
pub struct NativeDeviceCapture;

impl NativeDeviceCapture {
    pub fn new() -> Self {
        Self
    }

    fn open(constraints: MediaConstraints) -> Result<Vec<MediaTrack>, MediaAccessError> {
        let cameras = if constraints.video {
            nokhwa::query(nokhwa::utils::ApiBackend::Auto).map_err(|e| {
                MediaAccessError::PermissionDenied(format!("camera enumeration refused: {}", e))
            })?
        } else {
            Vec::new()
        };
        let microphone = constraints.audio && microphone::is_present();

        let mut missing = Vec::new();
        if constraints.video && cameras.is_empty() {
            missing.push("camera");
        }
        if constraints.audio && !microphone {
            missing.push("microphone");
        }
        if !missing.is_empty() {
            return Err(MediaAccessError::DeviceNotFound(format!(
                "no {} available",
                missing.join(" or ")
            )));
        }

        let mut tracks = Vec::new();
        if let Some(info) = cameras.first() {
            let camera = camera::CameraDevice::open(info)?;
            tracks.push(MediaTrack::with_device(TrackKind::Video, Box::new(camera)));
        }
        if constraints.audio {
            // An already opened camera is closed by the track drop on error.
            tracks.insert(0, microphone::open()?);
        }
        Ok(tracks)
    }
}

#[async_trait]
impl DeviceCapture for NativeDeviceCapture {
    async fn request_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, MediaAccessError> {
        let tracks = tokio::task::spawn_blocking(move || Self::open(constraints))
            .await
            .map_err(|e| MediaAccessError::Aborted(format!("device open task failed: {}", e)))??;
        log::debug!("Native capture opened {} track(s)", tracks.len());
        Ok(MediaStream::new(tracks))
    }
}

mod camera {
    use super::{DeviceHandle, MediaAccessError};
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{CameraInfo, RequestedFormat, RequestedFormatType};
    use nokhwa::CallbackCamera;

    pub struct CameraDevice {
        camera: CallbackCamera,
        closed: bool,
    }

    impl CameraDevice {
        pub fn open(info: &CameraInfo) -> Result<Self, MediaAccessError> {
            // Frames are rendered by the webview; the stream only holds the device.
            let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
            let mut camera = CallbackCamera::new(info.index().clone(), format, |_| {}).map_err(|e| {
                MediaAccessError::PermissionDenied(format!("camera could not be opened: {}", e))
            })?;
            camera.open_stream().map_err(|e| {
                MediaAccessError::PermissionDenied(format!("camera stream refused: {}", e))
            })?;
            log::info!("Opened camera {}", info.human_name());
            Ok(Self {
                camera,
                closed: false,
            })
        }
    }

    impl DeviceHandle for CameraDevice {
        fn is_open(&self) -> bool {
            !self.closed && self.camera.is_stream_open()
        }

        fn close(&mut self) {
            if self.closed {
                return;
            }
            self.closed = true;
            if let Err(e) = self.camera.stop_stream() {
                log::warn!("Failed to stop camera stream: {}", e);
            }
        }
    }

    impl Drop for CameraDevice {
        fn drop(&mut self) {
            self.close();
        }
    }
}

#[cfg(feature = "audio")]
mod microphone {
    use super::{DeviceHandle, MediaAccessError, MediaTrack, TrackKind};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread::JoinHandle;

    pub fn is_present() -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    /// A cpal stream cannot leave the thread that built it, so it lives on
    /// its own thread until the handle closes.
    struct MicrophoneDevice {
        failed: Arc<AtomicBool>,
        stop: Option<mpsc::Sender<()>>,
        thread: Option<JoinHandle<()>>,
    }

    pub fn open() -> Result<MediaTrack, MediaAccessError> {
        let failed = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let flag = failed.clone();
        let thread = std::thread::Builder::new()
            .name("unio-meet-mic".to_string())
            .spawn(move || match build_stream(flag) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Returns on close or when the handle is dropped.
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| MediaAccessError::Aborted(format!("microphone thread failed: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(MediaTrack::with_device(
                TrackKind::Audio,
                Box::new(MicrophoneDevice {
                    failed,
                    stop: Some(stop_tx),
                    thread: Some(thread),
                }),
            )),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(MediaAccessError::Aborted(
                "microphone thread exited before opening".to_string(),
            )),
        }
    }

    fn build_stream(failed: Arc<AtomicBool>) -> Result<cpal::Stream, MediaAccessError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| MediaAccessError::DeviceNotFound("no microphone available".to_string()))?;
        let config = device.default_input_config().map_err(|e| {
            MediaAccessError::PermissionDenied(format!("microphone config unavailable: {}", e))
        })?;
        let stream = device
            .build_input_stream(
                &config.config(),
                |_: &[f32], _: &cpal::InputCallbackInfo| {},
                move |err| {
                    log::warn!("Microphone stream error: {}", err);
                    failed.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| MediaAccessError::PermissionDenied(format!("microphone refused: {}", e)))?;
        stream
            .play()
            .map_err(|e| MediaAccessError::PermissionDenied(format!("microphone refused: {}", e)))?;
        Ok(stream)
    }

    impl DeviceHandle for MicrophoneDevice {
        fn is_open(&self) -> bool {
            self.stop.is_some() && !self.failed.load(Ordering::SeqCst)
        }

        fn close(&mut self) {
            if let Some(stop) = self.stop.take() {
                let _ = stop.send(());
            }
            if let Some(thread) = self.thread.take() {
                if thread.join().is_err() {
                    log::warn!("Microphone thread panicked");
                }
            }
        }
    }

    impl Drop for MicrophoneDevice {
        fn drop(&mut self) {
            self.close();
        }
    }
}

#[cfg(not(feature = "audio"))]
mod microphone {
    use super::{MediaAccessError, MediaTrack, TrackKind};

    pub fn is_present() -> bool {
        true
    }

    pub fn open() -> Result<MediaTrack, MediaAccessError> {
        Ok(MediaTrack::new(TrackKind::Audio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_stop_is_shared_between_clones() {
        let track = MediaTrack::new(TrackKind::Video);
        let backend_view = track.clone();
        track.stop();
        assert!(!backend_view.is_live());
        track.stop();
        assert!(!track.is_live());
    }

    #[test]
    fn test_stream_kind_toggle() {
        let stream = MediaStream::new(vec![
            MediaTrack::new(TrackKind::Audio),
            MediaTrack::new(TrackKind::Video),
        ]);
        stream.set_kind_enabled(TrackKind::Audio, false);
        assert!(stream.tracks_of(TrackKind::Audio).all(|t| !t.is_enabled()));
        assert!(stream.tracks_of(TrackKind::Video).all(|t| t.is_enabled()));
        assert_eq!(stream.live_track_count(), 2);
        stream.stop_all();
        assert_eq!(stream.live_track_count(), 0);
    }

    struct CountingDevice {
        open: Arc<AtomicBool>,
        closes: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl DeviceHandle for CountingDevice {
        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_stop_closes_device_once() {
        let closes = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let track = MediaTrack::with_device(
            TrackKind::Audio,
            Box::new(CountingDevice {
                open: Arc::new(AtomicBool::new(true)),
                closes: closes.clone(),
            }),
        );
        assert!(track.is_live());
        track.stop();
        track.clone().stop();
        assert!(!track.is_live());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_device_failure_ends_track() {
        let open = Arc::new(AtomicBool::new(true));
        let stream = MediaStream::new(vec![MediaTrack::with_device(
            TrackKind::Video,
            Box::new(CountingDevice {
                open: open.clone(),
                closes: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            }),
        )]);
        assert!(!stream.has_ended_track());
        open.store(false, Ordering::SeqCst);
        assert!(stream.has_ended_track());
        assert_eq!(stream.live_track_count(), 0);
    }

    #[test]
    fn test_access_error_conversion() {
        let e: SessionError = MediaAccessError::DeviceNotFound("none".into()).into();
        assert_eq!(e, SessionError::DeviceNotFound("none".into()));
        let e: SessionError = MediaAccessError::PermissionDenied("no".into()).into();
        assert_eq!(e, SessionError::PermissionDenied("no".into()));
    }
}
