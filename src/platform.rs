//! [`AudioPlatform`] backed by the real input and output devices.
//!
//! Device work blocks (waiting for a stream to come up, finalizing a WAV,
//! decoding a clip), so every call is moved onto tokio's blocking pool.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::spawn_blocking;
use tracing::{debug, info};

use soundboard_audio::{CaptureHandle, Player, Recorder, RecordingPreset};
use soundboard_core::{ClipSource, Config, file_locator, locator_path};

use crate::session::{AudioMode, AudioPlatform, Permission, PlatformError};

/// An in-progress device capture. Dropping it finalizes the file.
pub struct DeviceCapture {
    handle: Option<CaptureHandle>,
}

pub struct DevicePlatform {
    recorder: Arc<Recorder>,
    player: Arc<Player>,
    assets_dir: PathBuf,
    allow_microphone: bool,
    mode: Mutex<AudioMode>,
}

impl DevicePlatform {
    pub fn new(config: &Config, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            recorder: Arc::new(Recorder::new(config.recordings_dir())),
            player: Arc::new(Player::new(config.max_concurrent_playbacks())),
            assets_dir: assets_dir.into(),
            allow_microphone: config.allow_microphone(),
            mode: Mutex::new(AudioMode::default()),
        }
    }

    pub fn audio_mode(&self) -> AudioMode {
        *self.mode.lock()
    }

    /// Where a source lives on local storage.
    pub fn resolve(&self, source: &ClipSource) -> Result<PathBuf, PlatformError> {
        match source {
            ClipSource::Bundled(handle) => Ok(handle.resolve(&self.assets_dir)),
            ClipSource::Recorded(uri) => {
                locator_path(uri).ok_or_else(|| PlatformError::InvalidLocator(uri.clone()))
            }
        }
    }
}

#[async_trait]
impl AudioPlatform for DevicePlatform {
    type Capture = DeviceCapture;

    async fn request_permission(&self) -> Result<Permission, PlatformError> {
        let permission = if self.allow_microphone {
            Permission::Granted
        } else {
            Permission::Denied
        };
        debug!(?permission, "microphone permission");
        Ok(permission)
    }

    async fn set_audio_mode(&self, mode: AudioMode) -> Result<(), PlatformError> {
        if mode.plays_in_silent_mode {
            debug!("silent mode playback requested, desktop output is never muted by it");
        }
        *self.mode.lock() = mode;
        Ok(())
    }

    async fn start_capture(&self, preset: RecordingPreset) -> Result<DeviceCapture, PlatformError> {
        if !self.audio_mode().allows_recording {
            return Err(PlatformError::RecordingNotAllowed);
        }
        let recorder = self.recorder.clone();
        let handle = spawn_blocking(move || recorder.start_recording(preset)).await??;
        info!(path = ?handle.path(), "capture started");
        Ok(DeviceCapture {
            handle: Some(handle),
        })
    }

    async fn stop_capture(&self, capture: &mut DeviceCapture) -> Result<String, PlatformError> {
        let mut handle = capture.handle.take().ok_or(PlatformError::CaptureFinished)?;
        let summary = spawn_blocking(move || handle.finish())
            .await??
            .ok_or(PlatformError::CaptureFinished)?;
        Ok(file_locator(&summary.path))
    }

    async fn load_and_play(&self, source: &ClipSource) -> Result<(), PlatformError> {
        let path = self.resolve(source)?;
        let player = self.player.clone();
        let id = spawn_blocking(move || player.play(&path)).await??;
        info!(id = %id, source = %source, "playing");
        Ok(())
    }
}
