//! Lobby preview behaviour against simulated devices

use std::sync::Arc;
use unio_meet::config::PreviewConfig;
use unio_meet::permissions::PermissionState;
use unio_meet::preferences::{IdentityPreferences, IdentityTier};
use unio_meet::preview::{JoinOverrides, MediaPreviewController, PreviewOutcome};
use unio_meet::testing::FakeDeviceCapture;

const MUTED: JoinOverrides = JoinOverrides {
    audio_muted: Some(true),
    video_muted: Some(true),
};

fn preview(capture: &Arc<FakeDeviceCapture>) -> MediaPreviewController {
    MediaPreviewController::new(capture.clone(), &PreviewConfig::default())
}

#[tokio::test]
async fn test_denied_access_is_reported_not_raised() {
    let capture = Arc::new(FakeDeviceCapture::denied());
    let mut preview = preview(&capture);

    let outcome = preview.start().await;
    assert!(matches!(outcome, PreviewOutcome::Denied { .. }));

    let state = preview.state();
    assert_eq!(state.permission_state, PermissionState::Denied);
    assert!(state.message.contains("denied"));
    assert!(preview.permission().can_retry);
    assert_eq!(preview.toggle_local_video(), None);
    assert_eq!(preview.release_for_join(), MUTED);
}

#[tokio::test]
async fn test_toggles_flip_track_enabled_state() {
    let capture = Arc::new(FakeDeviceCapture::granted());
    let mut preview = preview(&capture);
    preview.start().await;

    assert_eq!(preview.toggle_local_audio(), Some(false));
    assert_eq!(preview.toggle_local_video(), Some(true));
    assert_eq!(preview.toggle_local_video(), Some(false));

    let state = preview.state();
    assert!(!state.local_audio_muted);
    assert!(!state.local_video_muted);
    assert_eq!(
        preview.join_overrides(),
        JoinOverrides {
            audio_muted: Some(false),
            video_muted: Some(false)
        }
    );
}

#[tokio::test]
async fn test_stop_is_idempotent_and_releases_everything() {
    let capture = Arc::new(FakeDeviceCapture::granted());
    let mut preview = preview(&capture);
    preview.start().await;
    assert_eq!(capture.live_tracks(), 2);

    preview.stop();
    preview.stop();
    assert_eq!(capture.live_tracks(), 0);
    assert_eq!(capture.device_closes(), 2);
    assert_eq!(preview.active_track_count(), 0);
}

#[tokio::test]
async fn test_release_for_join_stops_tracks() {
    let capture = Arc::new(FakeDeviceCapture::granted());
    let mut preview = preview(&capture);
    preview.start().await;

    // Untouched devices leave the mutes to the resolved preferences.
    assert_eq!(preview.release_for_join(), JoinOverrides::default());
    assert_eq!(capture.live_tracks(), 0);
}

#[tokio::test]
async fn test_revoked_devices_make_toggles_noops() {
    let capture = Arc::new(FakeDeviceCapture::granted());
    let mut preview = preview(&capture);
    preview.start().await;

    capture.revoke_all();
    assert_eq!(capture.live_tracks(), 0);
    assert_eq!(preview.toggle_local_audio(), None);
    assert_eq!(preview.toggle_local_video(), None);
    assert_eq!(preview.state().permission_state, PermissionState::Denied);
    assert_eq!(preview.active_track_count(), 0);

    assert_eq!(capture.device_closes(), 2);

    assert_eq!(preview.release_for_join(), MUTED);
}

#[tokio::test]
async fn test_missing_devices_join_muted() {
    let capture = Arc::new(FakeDeviceCapture::missing());
    let mut preview = preview(&capture);

    let outcome = preview.start().await;
    assert!(matches!(outcome, PreviewOutcome::DeviceMissing { .. }));
    assert_eq!(preview.state().permission_state, PermissionState::DeviceMissing);
    assert_eq!(preview.release_for_join(), MUTED);
}

#[tokio::test]
async fn test_single_device_is_still_granted() {
    let capture = Arc::new(FakeDeviceCapture::with_devices(true, false));
    let mut preview = preview(&capture);

    let outcome = preview.start().await;
    assert_eq!(
        outcome,
        PreviewOutcome::Granted {
            has_audio: true,
            has_video: false
        }
    );
    assert_eq!(capture.requests(), 2);
    assert_eq!(preview.toggle_local_video(), None);
    assert_eq!(preview.toggle_local_audio(), Some(false));
    assert_eq!(preview.join_overrides().video_muted, Some(true));
}

#[tokio::test]
async fn test_camera_only_falls_back_to_video_request() {
    let capture = Arc::new(FakeDeviceCapture::with_devices(false, true));
    let mut preview = preview(&capture);

    let outcome = preview.start().await;
    assert_eq!(
        outcome,
        PreviewOutcome::Granted {
            has_audio: false,
            has_video: true
        }
    );
    assert_eq!(capture.requests(), 3);
    assert_eq!(preview.join_overrides().audio_muted, Some(true));
}

#[tokio::test]
async fn test_refused_single_device_is_denied() {
    let capture = Arc::new(FakeDeviceCapture::microphone_blocked());
    let mut preview = preview(&capture);

    let outcome = preview.start().await;
    assert!(matches!(outcome, PreviewOutcome::Denied { .. }));
    assert_eq!(preview.state().permission_state, PermissionState::Denied);
    assert_eq!(capture.requests(), 2);
}

#[tokio::test]
async fn test_preferences_seed_untouched_mutes() {
    let capture = Arc::new(FakeDeviceCapture::granted());
    let mut preview = preview(&capture);
    let prefs = IdentityPreferences {
        display_name: "Ana".into(),
        avatar_url: None,
        default_audio_muted: false,
        default_video_muted: true,
        tier: IdentityTier::Anonymous,
    };

    preview.apply_preferences(&prefs);
    preview.start().await;
    let state = preview.state();
    assert!(!state.local_audio_muted);
    assert!(state.local_video_muted);
    assert_eq!(preview.join_overrides(), JoinOverrides::default());

    assert_eq!(preview.toggle_local_video(), Some(false));
    preview.apply_preferences(&prefs);
    assert!(!preview.state().local_video_muted);
    assert_eq!(
        preview.release_for_join(),
        JoinOverrides {
            audio_muted: None,
            video_muted: Some(false)
        }
    );
    assert_eq!(capture.live_tracks(), 0);
}

#[tokio::test]
async fn test_missing_camera_overrides_to_muted() {
    let capture = Arc::new(FakeDeviceCapture::with_devices(true, false));
    let mut preview = preview(&capture);
    preview.start().await;

    assert_eq!(
        preview.join_overrides(),
        JoinOverrides {
            audio_muted: None,
            video_muted: Some(true)
        }
    );
}
