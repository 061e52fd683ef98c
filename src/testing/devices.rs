use crate::preview::{
    DeviceCapture, DeviceHandle, MediaAccessError, MediaConstraints, MediaStream, MediaTrack,
    TrackKind,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Simulated hardware behind one issued track
struct FakeDevice {
    unplugged: Arc<AtomicBool>,
    closes: Arc<AtomicUsize>,
}

impl DeviceHandle for FakeDevice {
    fn is_open(&self) -> bool {
        !self.unplugged.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Grant,
    Deny,
    Hang,
}

#[derive(Debug)]
struct State {
    mode: Mode,
    has_audio: bool,
    has_video: bool,
    microphone_blocked: bool,
    issued: Vec<MediaTrack>,
    requests: usize,
    unplugged: Arc<AtomicBool>,
    closes: Arc<AtomicUsize>,
}

/// Simulated camera and microphone
#[derive(Debug)]
pub struct FakeDeviceCapture {
    state: Mutex<State>,
}

impl FakeDeviceCapture {
    fn with_mode(mode: Mode, has_audio: bool, has_video: bool) -> Self {
        Self {
            state: Mutex::new(State {
                mode,
                has_audio,
                has_video,
                microphone_blocked: false,
                issued: Vec::new(),
                requests: 0,
                unplugged: Arc::new(AtomicBool::new(false)),
                closes: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Both devices present, access allowed.
    pub fn granted() -> Self {
        Self::with_mode(Mode::Grant, true, true)
    }

    /// Access allowed, only the listed devices exist.
    pub fn with_devices(has_audio: bool, has_video: bool) -> Self {
        Self::with_mode(Mode::Grant, has_audio, has_video)
    }

    /// Only a microphone exists and the user refuses it.
    pub fn microphone_blocked() -> Self {
        let capture = Self::with_mode(Mode::Grant, true, false);
        capture.state().microphone_blocked = true;
        capture
    }

    /// The user refuses access.
    pub fn denied() -> Self {
        Self::with_mode(Mode::Deny, true, true)
    }

    /// No device at all.
    pub fn missing() -> Self {
        Self::with_mode(Mode::Grant, false, false)
    }

    /// The request never settles.
    pub fn hanging() -> Self {
        Self::with_mode(Mode::Hang, true, true)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Tracks issued so far that are still live.
    pub fn live_tracks(&self) -> usize {
        self.state().issued.iter().filter(|t| t.is_live()).count()
    }

    pub fn requests(&self) -> usize {
        self.state().requests
    }

    /// How many device handles have been released.
    pub fn device_closes(&self) -> usize {
        self.state().closes.load(Ordering::SeqCst)
    }

    /// Unplug every device, as when the user revokes access mid-preview.
    /// Issued tracks end on their own; nothing is stopped from this side.
    pub fn revoke_all(&self) {
        let mut state = self.state();
        state.mode = Mode::Deny;
        state.unplugged.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeviceCapture for FakeDeviceCapture {
    async fn request_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, MediaAccessError> {
        let mode = {
            let mut state = self.state();
            state.requests += 1;
            state.mode
        };

        match mode {
            Mode::Hang => std::future::pending().await,
            Mode::Deny => Err(MediaAccessError::PermissionDenied(
                "user dismissed the permission prompt".to_string(),
            )),
            Mode::Grant => {
                let mut state = self.state();
                if (constraints.audio && !state.has_audio) || (constraints.video && !state.has_video) {
                    return Err(MediaAccessError::DeviceNotFound(
                        "requested device not present".to_string(),
                    ));
                }
                if constraints.audio && !constraints.video && state.microphone_blocked {
                    return Err(MediaAccessError::PermissionDenied(
                        "microphone access refused".to_string(),
                    ));
                }
                let device = || {
                    Box::new(FakeDevice {
                        unplugged: state.unplugged.clone(),
                        closes: state.closes.clone(),
                    })
                };
                let mut tracks = Vec::new();
                if constraints.audio {
                    tracks.push(MediaTrack::with_device(TrackKind::Audio, device()));
                }
                if constraints.video {
                    tracks.push(MediaTrack::with_device(TrackKind::Video, device()));
                }
                state.issued.extend(tracks.iter().cloned());
                Ok(MediaStream::new(tracks))
            }
        }
    }
}
