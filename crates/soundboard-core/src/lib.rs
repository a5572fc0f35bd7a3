//! Core types and configuration for soundboard.
//!
//! This crate holds everything that does not touch an audio device or a UI
//! toolkit: the bundled clip catalog, the session data model and events, and
//! the on-disk configuration.

mod catalog;
mod config;
mod event;
mod source;
mod state;

pub use catalog::{CATALOG, find_clip};
pub use config::{Config, ConfigManager};
pub use event::SessionEvent;
pub use source::{AssetHandle, Clip, ClipSource, Recording, file_locator, locator_path};
pub use state::SessionState;

/// Application name
pub const APP_NAME: &str = "soundboard";

/// Pretty application name for display
pub const APP_NAME_PRETTY: &str = "Soundboard";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";
