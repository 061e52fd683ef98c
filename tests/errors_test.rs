#[cfg(test)]
mod error_tests {
    use std::error::Error;
    use unio_meet::errors::SessionError;

    #[test]
    fn test_permission_denied_display() {
        let error = SessionError::PermissionDenied("prompt dismissed".to_string());
        assert!(error.to_string().contains("Permission denied"));
        assert!(error.to_string().contains("prompt dismissed"));
    }

    #[test]
    fn test_engine_command_ignored_display() {
        let error = SessionError::EngineCommandIgnored("toggleAudio (session ended)".to_string());
        assert_eq!(
            error.to_string(),
            "Engine command ignored: toggleAudio (session ended)"
        );
    }

    #[test]
    fn test_error_debug_format() {
        let error = SessionError::TerminationTimeout("no readyToClose".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("TerminationTimeout"));
        assert!(debug_str.contains("no readyToClose"));
    }

    #[test]
    fn test_implements_error_trait() {
        let error = SessionError::Storage("disk full".to_string());
        let _error_trait: &dyn Error = &error;
        assert!(error.source().is_none());
    }

    #[test]
    fn test_user_messages_are_friendly() {
        let denied = SessionError::PermissionDenied("NotAllowedError".to_string());
        assert!(denied.user_message().contains("join with your devices muted"));
        assert!(!denied.user_message().contains("NotAllowedError"));

        let load = SessionError::EngineLoadFailure("external_api.js 404".to_string());
        assert!(!load.user_message().contains("404"));
        assert!(!load.is_recoverable());

        let storage = SessionError::Storage("quota".to_string());
        assert_eq!(storage.user_message(), storage.to_string());
    }

    #[test]
    fn test_io_error_becomes_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let error: SessionError = io.into();
        assert!(matches!(error, SessionError::Storage(_)));
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_all_error_variants() {
        let errors = vec![
            SessionError::PermissionDenied("a".to_string()),
            SessionError::DeviceNotFound("b".to_string()),
            SessionError::EngineLoadFailure("c".to_string()),
            SessionError::EngineCommandIgnored("d".to_string()),
            SessionError::TerminationTimeout("e".to_string()),
            SessionError::Storage("f".to_string()),
            SessionError::Config("g".to_string()),
            SessionError::InvalidPayload("h".to_string()),
            SessionError::InvalidRoomName("i".to_string()),
            SessionError::Bridge("j".to_string()),
        ];
        for error in &errors {
            assert!(!error.to_string().is_empty());
            assert!(!error.user_message().is_empty());
        }
        let cloned = errors.clone();
        assert_eq!(cloned, errors);
    }
}
