//! The soundboard session: one optional in-progress capture, the list of
//! finished recordings, and the status line describing the last recording
//! action.
//!
//! The session never talks to a device directly. Everything goes through an
//! [`AudioPlatform`], which keeps the state machine testable without audio
//! hardware.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use soundboard_audio::{PlaybackError, RecorderError, RecordingPreset};
use soundboard_core::{ClipSource, Recording, SessionState};

pub const STATUS_STARTED: &str = "Recording started...";
pub const STATUS_STOPPED: &str = "Recording stopped.";
pub const STATUS_DENIED: &str = "Microphone permission denied.";
pub const STATUS_NOT_RECORDING: &str = "No recording in progress.";
pub const STATUS_ALREADY_RECORDING: &str = "A recording is already in progress.";

/// Answer to a microphone permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Audio routing flags applied before a capture starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioMode {
    pub allows_recording: bool,
    pub plays_in_silent_mode: bool,
}

impl AudioMode {
    /// Mode used for every capture: record while still allowing playback.
    pub const RECORD_AND_PLAY: AudioMode = AudioMode {
        allows_recording: true,
        plays_in_silent_mode: true,
    };
}

/// Errors reported by an [`AudioPlatform`].
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("audio mode does not allow recording")]
    RecordingNotAllowed,

    #[error("capture was already finalized")]
    CaptureFinished,

    #[error("invalid recording locator: {0:?}")]
    InvalidLocator(String),

    #[error("audio task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("audio device unavailable: {0}")]
    Unavailable(String),
}

/// The media capabilities the session relies on.
#[async_trait]
pub trait AudioPlatform: Send + Sync {
    /// Opaque reference to an in-progress capture.
    type Capture: Send + Sync;

    async fn request_permission(&self) -> Result<Permission, PlatformError>;

    async fn set_audio_mode(&self, mode: AudioMode) -> Result<(), PlatformError>;

    async fn start_capture(&self, preset: RecordingPreset) -> Result<Self::Capture, PlatformError>;

    /// Finalize the capture and return a locator for the written file.
    async fn stop_capture(&self, capture: &mut Self::Capture) -> Result<String, PlatformError>;

    /// Load the source and start playing it without waiting for it to end.
    async fn load_and_play(&self, source: &ClipSource) -> Result<(), PlatformError>;
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error("failed to start recording: {0}")]
    StartFailed(#[source] PlatformError),

    #[error("failed to stop recording: {0}")]
    StopFailed(#[source] PlatformError),
}

pub struct SoundboardSession<P: AudioPlatform> {
    platform: P,
    active: Option<P::Capture>,
    recordings: Vec<Recording>,
    status: String,
}

impl<P: AudioPlatform> SoundboardSession<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            active: None,
            recordings: Vec::new(),
            status: String::new(),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn state(&self) -> SessionState {
        if self.active.is_some() {
            SessionState::Recording
        } else {
            SessionState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Outcome of the last recording action, empty before the first one.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }

    /// Start or stop depending on the current state.
    pub async fn toggle_recording(&mut self) -> Result<(), SessionError> {
        if self.is_recording() {
            self.stop_recording().await
        } else {
            self.begin_recording().await
        }
    }

    /// Ask for the microphone and start capturing. Every failure leaves the
    /// session idle with the reason in the status line.
    pub async fn begin_recording(&mut self) -> Result<(), SessionError> {
        if self.active.is_some() {
            warn!("begin_recording called while a recording is active");
            self.status = STATUS_ALREADY_RECORDING.to_string();
            return Err(SessionError::AlreadyRecording);
        }

        match self.open_capture().await {
            Ok(capture) => {
                self.active = Some(capture);
                self.status = STATUS_STARTED.to_string();
                info!("recording started");
                Ok(())
            }
            Err(SessionError::PermissionDenied) => {
                warn!("microphone permission denied");
                self.status = STATUS_DENIED.to_string();
                Err(SessionError::PermissionDenied)
            }
            Err(SessionError::StartFailed(e)) => {
                error!(error = %e, "failed to start recording");
                self.status = format!("Failed to start recording: {}", e);
                Err(SessionError::StartFailed(e))
            }
            Err(e) => Err(e),
        }
    }

    async fn open_capture(&self) -> Result<P::Capture, SessionError> {
        let permission = self
            .platform
            .request_permission()
            .await
            .map_err(SessionError::StartFailed)?;
        if permission == Permission::Denied {
            return Err(SessionError::PermissionDenied);
        }

        self.platform
            .set_audio_mode(AudioMode::RECORD_AND_PLAY)
            .await
            .map_err(SessionError::StartFailed)?;

        self.platform
            .start_capture(RecordingPreset::HighQuality)
            .await
            .map_err(SessionError::StartFailed)
    }

    /// Finalize the active capture and append it to the recordings. The
    /// active slot stays occupied until the platform call resolves.
    pub async fn stop_recording(&mut self) -> Result<(), SessionError> {
        let Some(capture) = self.active.as_mut() else {
            warn!("stop_recording called with no active recording");
            self.status = STATUS_NOT_RECORDING.to_string();
            return Err(SessionError::NotRecording);
        };

        let result = self.platform.stop_capture(capture).await;
        // A capture that failed to finalize cannot be resumed.
        self.active = None;

        match result {
            Ok(uri) => {
                info!(uri = %uri, index = self.recordings.len(), "recording stopped");
                self.recordings.push(Recording::new(uri));
                self.status = STATUS_STOPPED.to_string();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to stop recording");
                self.status = format!("Failed to stop recording: {}", e);
                Err(SessionError::StopFailed(e))
            }
        }
    }

    /// Play a bundled clip or a recording. Failures are logged and never
    /// touch the session state.
    pub async fn play_clip(&self, source: Option<ClipSource>) {
        let Some(source) = source else {
            error!("Cannot play sound because the source is missing");
            return;
        };
        if let Err(e) = self.platform.load_and_play(&source).await {
            error!(source = %source, error = %e, "Error playing sound");
        }
    }
}
