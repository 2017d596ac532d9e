//! Audio capture: microphone stream, evidence recorder, sample utilities.
//!
//! ```text
//! Microphone ─► cpal callback ─► AudioChunk (mpsc)
//!                                   ├─► CpalRecorder ─► downmix/resample ─► WAV (hound)
//!                                   └─► WhisperRecognizer ─► SampleWindow ─► VadDetector
//! ```
//!
//! ```rust,no_run
//! use std::path::Path;
//! use sos_alert::audio::{AudioRecorder, CpalRecorder};
//!
//! let recorder = CpalRecorder::new();
//! recorder.start(Path::new("/tmp/evidence.wav")).unwrap();
//! std::thread::sleep(std::time::Duration::from_secs(2));
//! let file = recorder.stop().unwrap();
//! println!("saved {}", file.display());
//! ```

pub mod capture;
pub mod convert;
pub mod recorder;
pub mod vad;
pub mod window;

pub use capture::{AudioCapture, AudioChunk, InputError, StreamHandle};
pub use convert::{downmix, resample_to_16k, to_pcm16, TARGET_SAMPLE_RATE};
pub use recorder::{AudioRecorder, CaptureError, CpalRecorder};
pub use vad::{rms, VadDetector};
pub use window::SampleWindow;
