//! Clip playback.
//!
//! A clip is decoded in full with symphonia, adapted to the default output
//! device, and played on its own output stream. Playbacks never wait on one
//! another; the [`PlaybackRegistry`] is the only thing bounding how many run
//! at once.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::registry::{PlaybackGuard, PlaybackId, PlaybackRegistry};

const DRAIN_POLL: Duration = Duration::from_millis(20);
// Let the device flush its last buffer before the stream is dropped.
const TAIL: Duration = Duration::from_millis(100);
/// Extra time past the clip length before a silent stream is given up on.
const STALL_MARGIN: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to open clip: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to probe audio format: {0}")]
    Probe(String),

    #[error("no audio tracks found")]
    NoTracks,

    #[error("decoder error: {0}")]
    Decoder(String),

    #[error("clip contains no audio")]
    Empty,

    #[error("no output device available")]
    NoOutputDevice,

    #[error("sample format not supported: {0}")]
    SampleFormatNotSupported(String),

    #[error(transparent)]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error(transparent)]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error(transparent)]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("too many clips playing (limit {limit})")]
    TooManyPlaybacks { limit: usize },

    #[error("playback thread exited unexpectedly")]
    PlaybackThreadLost,
}

type Result<T> = std::result::Result<T, PlaybackError>;

/// Interleaved PCM held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedClip {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedClip {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate.max(1)))
    }

    /// Convert to the given channel count and sample rate.
    pub fn adapt(self, channels: usize, sample_rate: u32) -> DecodedClip {
        let samples = remap_channels(&self.samples, self.channels, channels);
        let samples = resample_linear(&samples, channels, self.sample_rate, sample_rate);
        DecodedClip {
            samples,
            channels,
            sample_rate,
        }
    }
}

/// Decode a whole file into interleaved f32 samples.
pub fn decode_file(path: &Path) -> Result<DecodedClip> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlaybackError::Probe(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(PlaybackError::NoTracks)?;
    let track_id = track.id;
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PlaybackError::Decoder(e.to_string()))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(PlaybackError::Decoder(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels = spec.channels.count();
                sample_rate = spec.rate;
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            // Corrupt packets are skipped, the rest of the clip still plays.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(error = e, "skipping undecodable packet");
            }
            Err(e) => return Err(PlaybackError::Decoder(e.to_string())),
        }
    }

    if samples.is_empty() || channels == 0 || sample_rate == 0 {
        return Err(PlaybackError::Empty);
    }

    Ok(DecodedClip {
        samples,
        channels,
        sample_rate,
    })
}

/// Plays clips on the default output device.
pub struct Player {
    registry: PlaybackRegistry,
}

impl Player {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            registry: PlaybackRegistry::new(max_concurrent),
        }
    }

    pub fn registry(&self) -> &PlaybackRegistry {
        &self.registry
    }

    /// Load `path` and start playing it. Returns once the output stream is
    /// running; completion is not tracked by the caller.
    pub fn play(&self, path: &Path) -> Result<PlaybackId> {
        let guard = self
            .registry
            .reserve(path.display().to_string())
            .map_err(|full| {
                warn!(playing = ?self.registry.active_labels(), "playback limit reached");
                PlaybackError::TooManyPlaybacks {
                    limit: full.capacity,
                }
            })?;
        let id = guard.id();

        let clip = decode_file(path)?;
        info!(
            id = %id,
            path = ?path,
            channels = clip.channels,
            sample_rate = clip.sample_rate,
            length_seconds = clip.duration().as_secs_f64(),
            "clip decoded"
        );

        let (ready_tx, ready_rx) = mpsc::channel();
        thread::Builder::new()
            .name(format!("soundboard-playback-{}", id))
            .spawn(move || run_playback(clip, guard, ready_tx))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(id),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(PlaybackError::PlaybackThreadLost),
        }
    }
}

/// Owns the output stream until every sample has been handed to the device,
/// then releases its registry slot.
fn run_playback(clip: DecodedClip, guard: PlaybackGuard, ready: Sender<Result<()>>) {
    let id = guard.id();
    let done = Arc::new(AtomicBool::new(false));
    let deadline = Instant::now() + clip.duration() + STALL_MARGIN;

    let stream = match start_output(clip, done.clone()) {
        Ok(stream) => stream,
        Err(e) => {
            ready.send(Err(e)).ok();
            return;
        }
    };
    ready.send(Ok(())).ok();

    if wait_until_done(&done, deadline) {
        thread::sleep(TAIL);
        debug!(id = %id, "playback finished");
    } else {
        warn!(id = %id, "output stream stalled, abandoning playback");
    }
    drop(stream);
    drop(guard);
}

/// Poll `done` until it is set or `deadline` passes. Returns whether the
/// stream reported completion.
fn wait_until_done(done: &AtomicBool, deadline: Instant) -> bool {
    loop {
        if done.load(Ordering::Acquire) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(DRAIN_POLL.min(deadline - now));
    }
}

fn start_output(clip: DecodedClip, done: Arc<AtomicBool>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(PlaybackError::NoOutputDevice)?;
    let config = device.default_output_config()?;

    let channels = config.channels() as usize;
    let clip = clip.adapt(channels, config.sample_rate().0);
    let stream_config: cpal::StreamConfig = config.clone().into();

    let stream = match config.sample_format() {
        cpal::SampleFormat::I16 => build_output::<i16>(&device, &stream_config, clip, done)?,
        cpal::SampleFormat::I32 => build_output::<i32>(&device, &stream_config, clip, done)?,
        cpal::SampleFormat::U16 => build_output::<u16>(&device, &stream_config, clip, done)?,
        cpal::SampleFormat::F32 => build_output::<f32>(&device, &stream_config, clip, done)?,
        sample_format => {
            return Err(PlaybackError::SampleFormatNotSupported(format!(
                "{:?}",
                sample_format
            )));
        }
    };
    stream.play()?;
    Ok(stream)
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    clip: DecodedClip,
    done: Arc<AtomicBool>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let samples = clip.samples;
    let mut position = 0;
    let failed = done.clone();
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            position += fill_output(data, &samples, position);
            if position >= samples.len() {
                done.store(true, Ordering::Release);
            }
        },
        move |err| {
            error!("an error occurred on output stream: {}", err);
            failed.store(true, Ordering::Release);
        },
        None,
    )?;
    Ok(stream)
}

/// Copy from `samples[start..]` into `data`, padding with silence. Returns
/// the number of source samples consumed.
fn fill_output<T>(data: &mut [T], samples: &[f32], start: usize) -> usize
where
    T: SizedSample + FromSample<f32>,
{
    let remaining = samples.get(start..).unwrap_or_default();
    let count = remaining.len().min(data.len());
    for (out, &sample) in data.iter_mut().zip(&remaining[..count]) {
        *out = T::from_sample(sample);
    }
    for out in &mut data[count..] {
        *out = T::EQUILIBRIUM;
    }
    count
}

/// Map interleaved audio between channel counts. Mono is spread to every
/// output channel; otherwise channels are copied in order and extras are
/// silent, or dropped when there are fewer output channels.
pub fn remap_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }
    let mut out = Vec::with_capacity(samples.len() / from * to);
    for frame in samples.chunks_exact(from) {
        for ch in 0..to {
            let sample = if from == 1 {
                frame[0]
            } else if to == 1 {
                frame.iter().sum::<f32>() / from as f32
            } else {
                frame.get(ch).copied().unwrap_or(0.0)
            };
            out.push(sample);
        }
    }
    out
}

/// Linear interpolation resampler for interleaved audio.
pub fn resample_linear(samples: &[f32], channels: usize, from: u32, to: u32) -> Vec<f32> {
    if from == to || from == 0 || to == 0 || channels == 0 {
        return samples.to_vec();
    }
    let in_frames = samples.len() / channels;
    if in_frames == 0 {
        return Vec::new();
    }
    let out_frames = (in_frames as u64 * u64::from(to) / u64::from(from)).max(1) as usize;
    let step = f64::from(from) / f64::from(to);

    let mut out = Vec::with_capacity(out_frames * channels);
    for frame in 0..out_frames {
        let pos = frame as f64 * step;
        let index = (pos.floor() as usize).min(in_frames - 1);
        let next = (index + 1).min(in_frames - 1);
        let frac = (pos - index as f64) as f32;
        for ch in 0..channels {
            let a = samples[index * channels + ch];
            let b = samples[next * channels + ch];
            out.push(a + (b - a) * frac);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_remap_mono_to_stereo() {
        assert_eq!(
            remap_channels(&[0.1, 0.2], 1, 2),
            vec![0.1, 0.1, 0.2, 0.2]
        );
    }

    #[test]
    fn test_remap_stereo_to_mono_averages() {
        assert_eq!(
            remap_channels(&[0.25, 0.75, -1.0, 1.0], 2, 1),
            vec![0.5, 0.0]
        );
    }

    #[test]
    fn test_remap_stereo_to_quad_pads_silence() {
        assert_eq!(
            remap_channels(&[0.5, -0.5], 2, 4),
            vec![0.5, -0.5, 0.0, 0.0]
        );
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![0.0, 0.5, 1.0];
        assert_eq!(resample_linear(&samples, 1, 44_100, 44_100), samples);
    }

    #[test]
    fn test_resample_doubles_frames() {
        let out = resample_linear(&[0.0, 1.0], 1, 1, 2);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_resample_keeps_channels_interleaved() {
        let out = resample_linear(&[0.0, 1.0, 1.0, 0.0], 2, 2, 1);
        assert_eq!(out, vec![0.0, 1.0]);
    }

    #[test]
    fn test_fill_output_pads_with_silence() {
        let mut data = [1.0f32; 4];
        let consumed = fill_output(&mut data, &[0.25, 0.5, 0.75], 1);
        assert_eq!(consumed, 2);
        assert_eq!(data, [0.5, 0.75, 0.0, 0.0]);
    }

    #[test]
    fn test_fill_output_past_end() {
        let mut data = [1.0f32; 2];
        assert_eq!(fill_output(&mut data, &[0.25], 5), 0);
        assert_eq!(data, [0.0, 0.0]);
    }

    #[test]
    fn test_decode_wav_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..800 {
            let s = if i % 2 == 0 { 0.5f32 } else { -0.5 };
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let clip = decode_file(&path).unwrap();
        assert_eq!(clip.channels, 2);
        assert_eq!(clip.sample_rate, 8_000);
        assert_eq!(clip.frames(), 400);
        assert!((clip.duration().as_secs_f64() - 0.05).abs() < 1e-9);
        assert_eq!(&clip.samples[..2], &[0.5, -0.5]);
    }

    #[test]
    fn test_decode_missing_file() {
        let result = decode_file(Path::new("/nonexistent/amen.mp3"));
        assert!(matches!(result, Err(PlaybackError::Io(_))));
    }

    #[test]
    fn test_decode_garbage_fails_probe() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("garbage.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(decode_file(&path).is_err());
    }

    #[test]
    fn test_play_rejected_when_registry_full() {
        let player = Player::new(1);
        let _held = player.registry().reserve("busy").unwrap();
        let result = player.play(Path::new("/nonexistent/amen.mp3"));
        assert!(matches!(
            result,
            Err(PlaybackError::TooManyPlaybacks { limit: 1 })
        ));
    }

    #[test]
    fn test_wait_returns_once_done() {
        let done = Arc::new(AtomicBool::new(false));
        let setter = done.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            setter.store(true, Ordering::Release);
        });
        assert!(wait_until_done(&done, Instant::now() + Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn test_stalled_stream_releases_slot_at_deadline() {
        let registry = PlaybackRegistry::new(1);
        let guard = registry.reserve("stalled").unwrap();
        let done = AtomicBool::new(false);

        let started = Instant::now();
        let finished = wait_until_done(&done, started + Duration::from_millis(50));
        drop(guard);

        assert!(!finished);
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(registry.active(), 0);
        assert!(registry.reserve("next").is_ok());
    }

    #[test]
    fn test_failed_play_releases_slot() {
        let player = Player::new(1);
        assert!(player.play(Path::new("/nonexistent/amen.mp3")).is_err());
        assert_eq!(player.registry().active(), 0);
    }
}
