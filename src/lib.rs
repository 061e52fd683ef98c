//! unio-meet: live meeting sessions for Tauri applications
//!
//! This crate provides the session layer of a video meeting app whose
//! conferencing engine runs embedded in the webview.
//!
//! # Features
//! - Lobby camera/microphone preview with guaranteed device release
//! - Preference resolution across anonymous and registered identities
//! - Engine embed lifecycle with confirmation-driven control state
//! - Deduplicated participant roster with local identity resolution
//! - Toolbar view model, reactions and invite links
//!
//! # Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! unio-meet = "0.1"
//! tauri = { version = "2.0", features = ["protocol-asset"] }
//! ```
//!
//! Then in your Tauri app:
//! ```rust,ignore
//! fn main() {
//!     unio_meet::init_logging();
//!     tauri::Builder::default()
//!         .plugin(unio_meet::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
pub mod commands;
pub mod config;
pub mod engine;
pub mod errors;
pub mod permissions;
pub mod preferences;
pub mod preview;
pub mod roster;
pub mod session;
pub mod toolbar;
pub mod types;

// Fakes for the external collaborators, used by tests and the CLI
pub mod testing;

// Re-exports for convenience
pub use config::MeetConfig;
pub use errors::SessionError;
pub use preferences::{Identity, IdentityPreferences, PreferenceResolver};
pub use preview::MediaPreviewController;
pub use roster::{reconcile, ParticipantRoster};
pub use session::{MeetingSessionController, SessionSnapshot};
pub use types::{Participant, ReactionKind, RoomName};

use tauri::{
    plugin::{Builder, TauriPlugin},
    Manager, Runtime,
};

/// Initialize the unio-meet plugin with all commands
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("unio-meet")
        .invoke_handler(tauri::generate_handler![
            // Lobby preview
            commands::preview::start_preview,
            commands::preview::toggle_preview_audio,
            commands::preview::toggle_preview_video,
            commands::preview::get_preview_state,
            commands::preview::stop_preview,
            // Preferences
            commands::preferences::resolve_preferences,
            commands::preferences::save_preferences,
            commands::preferences::suggest_name,
            commands::preferences::generate_room_name,
            // Session
            commands::session::join_meeting,
            commands::session::get_session_state,
            commands::session::get_toolbar,
            commands::session::toolbar_action,
            commands::session::leave_meeting,
            commands::session::get_invite_link,
            // Engine bridge ingress
            commands::engine::forward_engine_event,
            commands::engine::report_embed_loaded,
            commands::engine::resolve_engine_query,
            // Configuration
            commands::config::get_config,
            commands::config::update_config,
            commands::config::reset_config,
            commands::config::get_engine_config,
            commands::config::get_session_config,
        ])
        .setup(|app, _api| {
            let path = MeetConfig::default_path();
            let config = MeetConfig::load_or_default();
            let bridge = engine::WebviewBridge::from_app(app.clone(), &config.session);
            app.manage(commands::AppState::with_bridge(config, path, bridge));
            log::info!("unio-meet plugin initialized");
            Ok(())
        })
        .build()
}

/// Initialize logging for the meeting layer
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "unio_meet=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}
