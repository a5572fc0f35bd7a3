//! Audio device access for soundboard: microphone capture to WAV files and
//! fire-and-forget clip playback.

mod playback;
mod record;
mod registry;

pub use playback::{DecodedClip, PlaybackError, Player, decode_file, remap_channels, resample_linear};
pub use record::{CaptureHandle, CaptureSummary, Recorder, RecorderError, RecordingPreset};
pub use registry::{PlaybackGuard, PlaybackId, PlaybackRegistry, RegistryFull};
