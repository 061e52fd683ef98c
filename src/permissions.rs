use crate::preview::MediaAccessError;

/// Device permission state as seen by the lobby preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum PermissionState {
    /// Access has not been requested yet
    #[default]
    Unrequested,
    /// Access granted, at least one device track is live
    Granted,
    /// Access refused by the user or the platform
    Denied,
    /// No camera or microphone physically present
    DeviceMissing,
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionState::Unrequested => write!(f, "unrequested"),
            PermissionState::Granted => write!(f, "granted"),
            PermissionState::Denied => write!(f, "denied"),
            PermissionState::DeviceMissing => write!(f, "device_missing"),
        }
    }
}

impl PermissionState {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionState::Granted)
    }
}

/// Detailed permission information surfaced to the lobby
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PermissionInfo {
    pub state: PermissionState,
    pub message: String,
    /// Whether calling `start()` again may change the outcome
    pub can_retry: bool,
}

impl PermissionInfo {
    pub fn unrequested() -> Self {
        Self {
            state: PermissionState::Unrequested,
            message: "Camera and microphone access not requested yet".to_string(),
            can_retry: true,
        }
    }

    pub fn granted(has_audio: bool, has_video: bool) -> Self {
        let message = match (has_audio, has_video) {
            (true, true) => "Camera and microphone access granted".to_string(),
            (true, false) => "Microphone access granted, no camera available".to_string(),
            (false, true) => "Camera access granted, no microphone available".to_string(),
            (false, false) => "Access granted but no tracks were delivered".to_string(),
        };
        Self {
            state: PermissionState::Granted,
            message,
            can_retry: false,
        }
    }

    pub fn from_access_error(error: &MediaAccessError) -> Self {
        match error {
            MediaAccessError::PermissionDenied(msg) => Self {
                state: PermissionState::Denied,
                message: format!("Camera/Mic access denied: {}", msg),
                can_retry: true,
            },
            MediaAccessError::DeviceNotFound(msg) => Self {
                state: PermissionState::DeviceMissing,
                message: format!("No camera or microphone found: {}", msg),
                can_retry: true,
            },
            MediaAccessError::Aborted(msg) => Self {
                state: PermissionState::Denied,
                message: format!("Device request did not complete: {}", msg),
                can_retry: true,
            },
        }
    }
}
