pub mod config;
pub mod engine;
pub mod preferences;
pub mod preview;
pub mod session;
pub mod state;

pub use config::*;
pub use engine::*;
pub use preferences::*;
pub use preview::*;
pub use session::*;
pub use state::AppState;
