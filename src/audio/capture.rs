//! Microphone input stream via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`AudioCapture::start`] to begin streaming [`AudioChunk`]s over an mpsc
//! channel.  The returned [`StreamHandle`] is a RAII guard: dropping it
//! stops the underlying cpal stream.
//!
//! `cpal::Stream` is not `Send` on every platform, so a [`StreamHandle`] must
//! be dropped on the thread that created it.  Both consumers in this crate
//! (the evidence recorder and the speech recognizer) own their stream on a
//! dedicated thread for that reason.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]` regardless of the device's
/// native sample format.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000, 16000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

impl AudioChunk {
    /// Downmix to mono and resample to 16 kHz.
    pub fn to_mono_16k(&self) -> Vec<f32> {
        let mono = super::downmix(&self.samples, self.channels);
        super::resample_to_16k(&mono, self.sample_rate)
    }
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// InputError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening the microphone.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported input sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Default-microphone wrapper built on top of `cpal`.
///
/// ```rust,no_run
/// use std::sync::mpsc;
/// use sos_alert::audio::{AudioCapture, AudioChunk};
///
/// let (tx, rx) = mpsc::channel::<AudioChunk>();
/// let capture = AudioCapture::new().unwrap();
/// let _handle = capture.start(tx).unwrap();
/// // `_handle` keeps the stream alive; drop it to stop capturing.
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    sample_rate: u32,
    channels: u16,
}

impl AudioCapture {
    /// Open the system default input device with its preferred configuration.
    ///
    /// # Errors
    ///
    /// [`InputError::NoDevice`] when the host has no microphone (or access to
    /// it is denied), [`InputError::DefaultConfig`] when the device cannot
    /// report a default stream configuration.
    pub fn new() -> Result<Self, InputError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(InputError::NoDevice)?;

        let supported = device.default_input_config()?;

        let sample_format = supported.sample_format();
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_format,
            sample_rate,
            channels,
        })
    }

    /// Start capturing and send [`AudioChunk`]s to `tx`.
    ///
    /// The cpal callback runs on the host's audio thread.  Send errors
    /// (receiver dropped) are ignored so that thread never panics.
    pub fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<StreamHandle, InputError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;
        let emit = move |samples: Vec<f32>| {
            let _ = tx.send(AudioChunk {
                samples,
                sample_rate,
                channels,
            });
        };
        let on_error = |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
        };

        let stream = match self.sample_format {
            cpal::SampleFormat::F32 => self.device.build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| emit(data.to_vec()),
                on_error,
                None,
            )?,
            cpal::SampleFormat::I16 => self.device.build_input_stream(
                &self.config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    emit(data.iter().map(|&s| s as f32 / i16::MAX as f32).collect())
                },
                on_error,
                None,
            )?,
            cpal::SampleFormat::U16 => self.device.build_input_stream(
                &self.config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    emit(
                        data.iter()
                            .map(|&s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0)
                            .collect(),
                    )
                },
                on_error,
                None,
            )?,
            other => return Err(InputError::UnsupportedFormat(other)),
        };

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    /// Native sample rate of the capture stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels in each [`AudioChunk`].
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_chunk_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AudioChunk>();
    }

    #[test]
    fn stereo_48k_chunk_becomes_mono_16k() {
        let chunk = AudioChunk {
            samples: vec![0.5_f32; 960], // 480 stereo frames @ 48 kHz = 10 ms
            sample_rate: 48_000,
            channels: 2,
        };
        let out = chunk.to_mono_16k();
        assert_eq!(out.len(), 160);
        assert!(out.iter().all(|s| (s - 0.5).abs() < 1e-5));
    }

    #[test]
    fn mono_16k_chunk_is_unchanged() {
        let chunk = AudioChunk {
            samples: vec![0.25_f32; 320],
            sample_rate: 16_000,
            channels: 1,
        };
        assert_eq!(chunk.to_mono_16k(), chunk.samples);
    }
}
