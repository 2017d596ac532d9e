//! Evidence recorder: microphone → 16-bit mono 16 kHz WAV file.
//!
//! [`AudioRecorder`] is the exclusive capture device the alert sequence
//! acquires for the Recording step.  [`CpalRecorder`] implements it with a
//! dedicated writer thread:
//!
//! ```text
//! start(path) ──spawn──► writer thread
//!                          ├─ AudioCapture::start (cpal stream lives here)
//!                          ├─ hound::WavWriter::create(path)
//!                          ├─ ready ──────────────► start() returns Ok
//!                          └─ loop: chunk → mono 16 kHz → i16 → write
//! stop() ──flag──────────► drain, finalize ─► join ─► Ok(path)
//! ```
//!
//! `start` blocks until the thread reports readiness (or failure), so a
//! capture that could not begin is reported synchronously and no thread is
//! left behind.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;

use super::capture::{AudioCapture, AudioChunk, InputError};
use super::convert::{to_pcm16, TARGET_SAMPLE_RATE};

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CaptureError {
    /// No microphone, or access to it was refused.
    #[error("capture device unavailable: {0}")]
    Unavailable(String),

    #[error("capture device already in use")]
    Busy,

    #[error("failed to start capture: {0}")]
    StartFailed(String),

    #[error("failed to stop capture: {0}")]
    StopFailed(String),

    #[error("no capture in progress")]
    NotRecording,

    #[error("recording file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV encoding error: {0}")]
    Encode(#[from] hound::Error),
}

impl From<InputError> for CaptureError {
    fn from(e: InputError) -> Self {
        match e {
            InputError::NoDevice => CaptureError::Unavailable(e.to_string()),
            other => CaptureError::StartFailed(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// AudioRecorder trait
// ---------------------------------------------------------------------------

/// Exclusive audio capture device.
///
/// Both methods block; async callers run them on the blocking pool.
pub trait AudioRecorder: Send + Sync {
    /// Begin capturing into `path`.  Fails with [`CaptureError::Busy`] when a
    /// capture is already running.
    fn start(&self, path: &Path) -> Result<(), CaptureError>;

    /// Stop the running capture and return the finished file.
    fn stop(&self) -> Result<PathBuf, CaptureError>;

    fn is_recording(&self) -> bool;
}

// ---------------------------------------------------------------------------
// CpalRecorder
// ---------------------------------------------------------------------------

struct ActiveRecording {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Result<u64, CaptureError>>,
    path: PathBuf,
}

/// Default-microphone recorder writing WAV files with `hound`.
#[derive(Default)]
pub struct CpalRecorder {
    active: Mutex<Option<ActiveRecording>>,
}

impl CpalRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioRecorder for CpalRecorder {
    fn start(&self, path: &Path) -> Result<(), CaptureError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| CaptureError::StartFailed("recorder state poisoned".into()))?;
        if active.is_some() {
            return Err(CaptureError::Busy);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), CaptureError>>(1);

        let thread = {
            let stop = stop.clone();
            let path = path.to_path_buf();
            std::thread::Builder::new()
                .name("sos-recorder".into())
                .spawn(move || write_wav(&path, &stop, ready_tx))?
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                log::info!("recorder: capturing to {}", path.display());
                *active = Some(ActiveRecording {
                    stop,
                    thread,
                    path: path.to_path_buf(),
                });
                Ok(())
            }
            Ok(Err(e)) => {
                join_failed_start(thread);
                Err(e)
            }
            Err(_) => {
                join_failed_start(thread);
                Err(CaptureError::StartFailed(
                    "writer thread exited before starting".into(),
                ))
            }
        }
    }

    fn stop(&self) -> Result<PathBuf, CaptureError> {
        let recording = self
            .active
            .lock()
            .map_err(|_| CaptureError::StopFailed("recorder state poisoned".into()))?
            .take()
            .ok_or(CaptureError::NotRecording)?;

        recording.stop.store(true, Ordering::SeqCst);
        let frames = recording
            .thread
            .join()
            .map_err(|_| CaptureError::StopFailed("writer thread panicked".into()))??;

        log::info!(
            "recorder: saved {} ({:.1}s)",
            recording.path.display(),
            frames as f64 / TARGET_SAMPLE_RATE as f64
        );
        Ok(recording.path)
    }

    fn is_recording(&self) -> bool {
        self.active.lock().map(|a| a.is_some()).unwrap_or(false)
    }
}

fn join_failed_start(thread: JoinHandle<Result<u64, CaptureError>>) {
    match thread.join() {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => log::warn!("recorder: writer thread failed: {e}"),
        Err(_) => log::error!("recorder: writer thread panicked while starting"),
    }
}

impl Drop for CpalRecorder {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(recording) = active.take() {
                recording.stop.store(true, Ordering::SeqCst);
                let _ = recording.thread.join();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Writer thread
// ---------------------------------------------------------------------------

fn wav_spec() -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate: TARGET_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Body of the writer thread.  Returns the number of frames written.
fn write_wav(
    path: &Path,
    stop: &AtomicBool,
    ready: mpsc::SyncSender<Result<(), CaptureError>>,
) -> Result<u64, CaptureError> {
    let (tx, rx) = mpsc::channel::<AudioChunk>();

    let opened = AudioCapture::new()
        .and_then(|capture| capture.start(tx))
        .map_err(CaptureError::from)
        .and_then(|handle| {
            hound::WavWriter::create(path, wav_spec())
                .map(|writer| (handle, writer))
                .map_err(CaptureError::from)
        });

    let (stream, mut writer) = match opened {
        Ok(v) => {
            let _ = ready.send(Ok(()));
            v
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return Ok(0);
        }
    };

    let mut frames = 0u64;
    let mut write_chunk = |chunk: AudioChunk| -> Result<(), CaptureError> {
        for sample in chunk.to_mono_16k() {
            writer.write_sample(to_pcm16(sample))?;
            frames += 1;
        }
        Ok(())
    };

    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(chunk) => write_chunk(chunk)?,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(CaptureError::StopFailed("audio stream closed".into()));
            }
        }
    }

    drop(stream);
    while let Ok(chunk) = rx.try_recv() {
        write_chunk(chunk)?;
    }

    writer.finalize()?;
    Ok(frames)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_without_start_is_not_recording() {
        let recorder = CpalRecorder::new();
        assert!(!recorder.is_recording());
        assert!(matches!(recorder.stop(), Err(CaptureError::NotRecording)));
    }

    #[test]
    fn wav_spec_is_16k_mono_pcm16() {
        let spec = wav_spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    }

    #[test]
    fn missing_device_maps_to_unavailable() {
        let e: CaptureError = InputError::NoDevice.into();
        assert!(matches!(e, CaptureError::Unavailable(_)));
    }

    #[test]
    fn wav_spec_round_trips_through_hound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.wav");
        let mut writer = hound::WavWriter::create(&path, wav_spec()).unwrap();
        for s in [0.0_f32, 0.5, -0.5] {
            writer.write_sample(to_pcm16(s)).unwrap();
        }
        writer.finalize().unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec(), wav_spec());
        assert_eq!(reader.len(), 3);
    }

    #[test]
    fn recorder_is_object_safe() {
        let r: Arc<dyn AudioRecorder> = Arc::new(CpalRecorder::new());
        assert!(!r.is_recording());
    }

    #[test]
    fn failed_start_join_absorbs_writer_panic() {
        let thread = std::thread::spawn(|| -> Result<u64, CaptureError> {
            panic!("writer died");
        });
        join_failed_start(thread);

        let thread = std::thread::spawn(|| Err(CaptureError::NotRecording));
        join_failed_start(thread);
    }
}
