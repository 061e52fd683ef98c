use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Permission denied error: {0}")]
    PermissionDenied(String),
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    #[error("Engine load failure: {0}")]
    EngineLoadFailure(String),
    #[error("Engine command ignored: {0}")]
    EngineCommandIgnored(String),
    #[error("Termination timeout: {0}")]
    TerminationTimeout(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid room name: {0}")]
    InvalidRoomName(String),
    #[error("Engine bridge error: {0}")]
    Bridge(String),
}

impl SessionError {
    /// Whether the session attempt can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SessionError::EngineLoadFailure(_) | SessionError::Config(_)
        )
    }

    /// Text shown to the user in the dismissible inline message or the
    /// persistent error state.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::PermissionDenied(_) => {
                "Camera/Mic access denied. You can still join with your devices muted.".to_string()
            }
            SessionError::DeviceNotFound(_) => {
                "No camera or microphone was found. You can still join muted.".to_string()
            }
            SessionError::EngineLoadFailure(_) => {
                "The meeting service could not be loaded. Please try again later.".to_string()
            }
            SessionError::TerminationTimeout(_) => "You have left the meeting.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::InvalidPayload(e.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_contains_message() {
        let error = SessionError::EngineLoadFailure("script missing".to_string());
        assert_eq!(error.to_string(), "Engine load failure: script missing");
    }

    #[test]
    fn test_recoverability() {
        assert!(SessionError::PermissionDenied("x".into()).is_recoverable());
        assert!(SessionError::DeviceNotFound("x".into()).is_recoverable());
        assert!(SessionError::EngineCommandIgnored("x".into()).is_recoverable());
        assert!(SessionError::TerminationTimeout("x".into()).is_recoverable());
        assert!(!SessionError::EngineLoadFailure("x".into()).is_recoverable());
    }

    #[test]
    fn test_json_error_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let converted: SessionError = err.into();
        assert!(matches!(converted, SessionError::InvalidPayload(_)));
    }
}
