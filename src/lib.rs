// Re-export from sub-crates
pub use soundboard_audio::{
    CaptureHandle, PlaybackError, Player, Recorder, RecorderError, RecordingPreset,
};
pub use soundboard_core::{
    APP_NAME, APP_NAME_PRETTY, CATALOG, Clip, ClipSource, Config, ConfigManager,
    DEFAULT_LOG_LEVEL, Recording, SessionEvent, SessionState,
};

// App-specific modules
pub mod driver;
pub mod hotkey;
pub mod icon;
pub mod menu;
pub mod notify;
pub mod platform;
pub mod session;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Assets directory shipped with the source tree.
pub const BUNDLED_ASSETS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets");
