//! Module for capturing audio from the default input device. There can only
//! be one active recording at a time; the caller owns the handle.
//!
//! `cpal` streams cannot move between threads on every host, so each capture
//! runs on its own thread which owns the stream and the WAV writer. The
//! [`CaptureHandle`] only holds the channel used to stop it.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use hound::WavWriter;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RecorderError {
    /// generic anyhow error
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    /// No recording device available
    #[error("no input device available")]
    NoInputDevice,
    /// Sample format not supported
    #[error("sample format not supported: {0}")]
    SampleFormatNotSupported(String),
    /// Build stream error
    #[error(transparent)]
    BuildStream(#[from] cpal::BuildStreamError),
    /// Could not create or write the recording file
    #[error("recording file error: {0}")]
    Io(#[from] std::io::Error),
    /// WAV framing error
    #[error(transparent)]
    Wav(#[from] hound::Error),
    /// The capture thread went away without reporting back
    #[error("capture thread exited unexpectedly")]
    CaptureThreadLost,
}

type Result<T> = std::result::Result<T, RecorderError>;
type WavWriterHandle = Arc<Mutex<Option<WavWriter<BufWriter<File>>>>>;

/// Capture quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingPreset {
    /// Device native rate and channel count, stored as 32-bit float WAV.
    #[default]
    HighQuality,
}

impl RecordingPreset {
    fn wav_spec(&self, config: &cpal::SupportedStreamConfig) -> hound::WavSpec {
        match self {
            RecordingPreset::HighQuality => hound::WavSpec {
                channels: config.channels(),
                sample_rate: config.sample_rate().0,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            },
        }
    }
}

/// Creates captures, each written to its own file in `recordings_dir`.
pub struct Recorder {
    recordings_dir: PathBuf,
    counter: AtomicU64,
}

impl Recorder {
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Self {
        Self {
            recordings_dir: recordings_dir.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Begin capturing. Returns once the input stream is running or failed
    /// to start.
    pub fn start_recording(&self, preset: RecordingPreset) -> Result<CaptureHandle> {
        fs::create_dir_all(&self.recordings_dir)?;
        let path = self.next_recording_path();

        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();

        let thread_path = path.clone();
        let thread = thread::Builder::new()
            .name("soundboard-capture".into())
            .spawn(move || run_capture(&thread_path, preset, ready_tx, stop_rx))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(CaptureHandle {
                path,
                stop: Some(stop_tx),
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                thread.join().ok();
                fs::remove_file(&path).ok();
                Err(e)
            }
            Err(_) => {
                thread.join().ok();
                Err(RecorderError::CaptureThreadLost)
            }
        }
    }

    fn next_recording_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.recordings_dir
            .join(format!("recording-{}-{}.wav", millis, n))
    }
}

/// Handle to the active capture. When dropped or finished, the capture will
/// end. You must call `finish` to receive the file path.
pub struct CaptureHandle {
    path: PathBuf,
    // Presence of the sender indicates the capture is still running.
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<Result<CaptureSummary>>>,
}

/// What a finished capture wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSummary {
    pub path: PathBuf,
    pub samples: u64,
    pub duration: Duration,
}

impl CaptureHandle {
    /// Path the capture is being written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop capturing and finalize the WAV file. Returns `None` when the
    /// capture was already finished.
    pub fn finish(&mut self) -> Result<Option<CaptureSummary>> {
        let Some(stop) = self.stop.take() else {
            return Ok(None);
        };
        info!(path = ?self.path, "Ending recording.");
        // The thread also stops when the sender is dropped, so a failed send
        // only means it already exited.
        stop.send(()).ok();

        let thread = self.thread.take().ok_or(RecorderError::CaptureThreadLost)?;
        let summary = thread
            .join()
            .map_err(|_| RecorderError::Anyhow(anyhow!("capture thread panicked")))??;
        info!(
            samples = summary.samples,
            length_seconds = summary.duration.as_secs_f64(),
            "recording finalized"
        );
        Ok(Some(summary))
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        if self.stop.is_some() {
            if let Err(e) = self.finish() {
                error!("failed to finalize recording: {}", e);
            }
        }
    }
}

fn run_capture(
    path: &Path,
    preset: RecordingPreset,
    ready: Sender<Result<()>>,
    stop: Receiver<()>,
) -> Result<CaptureSummary> {
    let started = match start_stream(path, preset) {
        Ok(started) => started,
        Err(e) => {
            // Hand the real error to the caller, keep a marker for the join.
            let message = e.to_string();
            ready.send(Err(e)).ok();
            return Err(RecorderError::Anyhow(anyhow!(message)));
        }
    };
    ready.send(Ok(())).ok();

    // Either an explicit stop or the handle being dropped ends the capture.
    stop.recv().ok();

    let ActiveStream {
        stream,
        writer,
        samples,
        rate,
        channels,
    } = started;
    stream.pause().ok();
    drop(stream);

    let writer = writer
        .lock()
        .take()
        .ok_or_else(|| anyhow!("recording writer already finalized"))?;
    writer.finalize()?;

    let samples = samples.load(Ordering::Relaxed);
    let frames = samples / u64::from(channels.max(1));
    Ok(CaptureSummary {
        path: path.to_path_buf(),
        samples,
        duration: Duration::from_secs_f64(frames as f64 / f64::from(rate.max(1))),
    })
}

struct ActiveStream {
    stream: cpal::Stream,
    writer: WavWriterHandle,
    samples: Arc<AtomicU64>,
    rate: u32,
    channels: u16,
}

fn start_stream(path: &Path, preset: RecordingPreset) -> Result<ActiveStream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(RecorderError::NoInputDevice)?;
    let config = device
        .default_input_config()
        .map_err(|_| RecorderError::NoInputDevice)?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    info!(device_name = %device_name, config = ?config, "Recording from device");

    let spec = preset.wav_spec(&config);
    let writer = WavWriter::create(path, spec)?;
    let writer: WavWriterHandle = Arc::new(Mutex::new(Some(writer)));
    let samples = Arc::new(AtomicU64::new(0));

    let writer_2 = writer.clone();
    let samples_2 = samples.clone();
    let err_fn = move |err| {
        error!("an error occurred on stream: {}", err);
    };

    let stream_config: cpal::StreamConfig = config.clone().into();
    let stream = match config.sample_format() {
        cpal::SampleFormat::I8 => device.build_input_stream(
            &stream_config,
            move |data, _: &_| write_input_data::<i8>(data, &writer_2, &samples_2),
            err_fn,
            None,
        )?,
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data, _: &_| write_input_data::<i16>(data, &writer_2, &samples_2),
            err_fn,
            None,
        )?,
        cpal::SampleFormat::I32 => device.build_input_stream(
            &stream_config,
            move |data, _: &_| write_input_data::<i32>(data, &writer_2, &samples_2),
            err_fn,
            None,
        )?,
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data, _: &_| write_input_data::<f32>(data, &writer_2, &samples_2),
            err_fn,
            None,
        )?,
        sample_format => {
            return Err(RecorderError::SampleFormatNotSupported(format!(
                "{:?}",
                sample_format
            )));
        }
    };

    stream
        .play()
        .map_err(|e| anyhow!("failed to play stream: {}", e))?;

    Ok(ActiveStream {
        stream,
        writer,
        samples,
        rate: config.sample_rate().0,
        channels: config.channels(),
    })
}

fn write_input_data<T>(input: &[T], writer: &WavWriterHandle, samples: &AtomicU64)
where
    T: Sample + SizedSample,
    f32: FromSample<T>,
{
    if let Some(mut guard) = writer.try_lock() {
        if let Some(writer) = guard.as_mut() {
            for &sample in input.iter() {
                writer.write_sample(f32::from_sample(sample)).ok();
            }
            samples.fetch_add(input.len() as u64, Ordering::Relaxed);
        }
    }
}
