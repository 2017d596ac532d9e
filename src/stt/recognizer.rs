//! Streaming recognizer: microphone → rolling window → Whisper → events.
//!
//! Whisper is not a streaming model, so [`TranscriptWindow`] re-transcribes
//! the current utterance every `window_secs` of new audio:
//!
//! ```text
//!  chunk ─▶ SampleWindow (≤ utterance_secs) ─┬─ < window_secs new audio → nothing
//!                                            └─ window_secs reached
//!                                                 ├─ nothing voiced yet  → drop audio
//!                                                 ├─ latest window voiced → Partial(text)
//!                                                 └─ latest window silent
//!                                                    or utterance full    → Final(text)
//! ```
//!
//! [`WhisperRecognizer`] runs that loop on a `voice-recognizer` thread that
//! owns the cpal stream.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::audio::{AudioCapture, AudioChunk, SampleWindow, VadDetector, TARGET_SAMPLE_RATE};
use crate::config::VoiceConfig;
use crate::stt::engine::{SttEngine, SttError, TranscribeParams, WhisperEngine, MIN_AUDIO_SAMPLES};
use crate::stt::model::{resolve_model_path, MODEL_SOURCE_URL};
use crate::trigger::{RecognizerError, RecognizerEvent, SpeechRecognizer};

impl From<SttError> for RecognizerError {
    fn from(e: SttError) -> Self {
        match e {
            SttError::ModelNotFound(_) | SttError::ContextInit(_) => {
                RecognizerError::Unavailable(e.to_string())
            }
            other => RecognizerError::Recognition(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptWindow
// ---------------------------------------------------------------------------

/// Turns a stream of 16 kHz mono samples into partial/final transcripts.
pub struct TranscriptWindow {
    engine: Arc<dyn SttEngine>,
    vad: VadDetector,
    utterance: SampleWindow,
    window_samples: usize,
    pending: usize,
    voiced: bool,
}

impl TranscriptWindow {
    pub fn new(engine: Arc<dyn SttEngine>, config: &VoiceConfig) -> Self {
        let window_samples = ((config.window_secs.max(0.1)) * TARGET_SAMPLE_RATE as f32) as usize;
        let utterance_secs = config.utterance_secs.max(config.window_secs);
        Self {
            engine,
            vad: VadDetector::new(config.vad_threshold),
            utterance: SampleWindow::with_duration(utterance_secs),
            window_samples,
            pending: 0,
            voiced: false,
        }
    }

    pub fn push(&mut self, samples: &[f32]) -> Option<RecognizerEvent> {
        self.utterance.push_slice(samples);
        self.pending += samples.len();
        if self.pending < self.window_samples {
            return None;
        }
        self.pending = 0;

        let audio = self.utterance.snapshot();
        let latest = &audio[audio.len().saturating_sub(self.window_samples)..];
        let latest_voiced = self.vad.has_voice(latest);
        self.voiced |= latest_voiced;

        if !self.voiced {
            self.utterance.clear();
            return None;
        }

        let finished = !latest_voiced || self.utterance.is_full();
        let result = self.transcribe(&audio);
        if finished {
            self.reset();
        }

        match result {
            Ok(text) if finished => Some(RecognizerEvent::Final(text)),
            Ok(text) if text.is_empty() => None,
            Ok(text) => Some(RecognizerEvent::Partial(text)),
            Err(e) => Some(RecognizerEvent::Error(e.into())),
        }
    }

    pub fn reset(&mut self) {
        self.utterance.clear();
        self.pending = 0;
        self.voiced = false;
    }

    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError> {
        let mut speech = self.vad.trim_silence(audio).to_vec();
        if speech.len() < MIN_AUDIO_SAMPLES {
            speech.resize(MIN_AUDIO_SAMPLES, 0.0);
        }
        self.engine.transcribe(&speech)
    }
}

// ---------------------------------------------------------------------------
// WhisperRecognizer
// ---------------------------------------------------------------------------

struct Worker {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
    events: mpsc::Receiver<RecognizerEvent>,
}

/// [`SpeechRecognizer`] over the default microphone and a Whisper model.
///
/// Listening is continuous: once started, `start` is a no-op until the
/// worker fails or [`cancel`](SpeechRecognizer::cancel) is called.
pub struct WhisperRecognizer {
    engine: Arc<dyn SttEngine>,
    config: VoiceConfig,
    worker: Option<Worker>,
}

impl WhisperRecognizer {
    pub fn new(engine: Arc<dyn SttEngine>, config: &VoiceConfig) -> Self {
        Self {
            engine,
            config: config.clone(),
            worker: None,
        }
    }

    /// Load the configured model from `models_dir`.
    pub fn from_config(config: &VoiceConfig, models_dir: &Path) -> Result<Self, RecognizerError> {
        let path = resolve_model_path(models_dir, &config.model);
        let engine = WhisperEngine::load(&path, TranscribeParams::from_config(config)).map_err(
            |e| match e {
                SttError::ModelNotFound(p) => RecognizerError::Unavailable(format!(
                    "model not found at {p} (download ggml-{}.bin from {MODEL_SOURCE_URL})",
                    config.model
                )),
                other => other.into(),
            },
        )?;
        Ok(Self::new(Arc::new(engine), config))
    }

    fn worker_alive(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.thread.is_finished())
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn start(&mut self) -> Result<(), RecognizerError> {
        if self.worker_alive() {
            return Ok(());
        }
        self.cancel();

        let stop = Arc::new(AtomicBool::new(false));
        let (event_tx, events) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let window = TranscriptWindow::new(self.engine.clone(), &self.config);

        let thread = {
            let stop = stop.clone();
            std::thread::Builder::new()
                .name("voice-recognizer".into())
                .spawn(move || recognize(window, &stop, event_tx, ready_tx))
                .map_err(|e| RecognizerError::Audio(e.to_string()))?
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(Worker {
                    stop,
                    thread,
                    events,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                join_failed_start(thread);
                Err(e)
            }
            Err(_) => {
                join_failed_start(thread);
                Err(RecognizerError::Audio("recognizer thread exited early".into()))
            }
        }
    }

    fn next_event(&mut self, timeout: Duration) -> Option<RecognizerEvent> {
        let Some(worker) = self.worker.as_ref() else {
            std::thread::sleep(timeout);
            return None;
        };
        match worker.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Some(RecognizerEvent::Error(
                RecognizerError::Audio("microphone stream ended".into()),
            )),
        }
    }

    fn cancel(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::SeqCst);
            if worker.thread.join().is_err() {
                log::error!("voice: recognizer thread panicked");
            }
        }
    }
}

fn join_failed_start(thread: JoinHandle<()>) {
    if thread.join().is_err() {
        log::error!("voice: recognizer thread panicked while starting");
    }
}

impl Drop for WhisperRecognizer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn recognize(
    mut window: TranscriptWindow,
    stop: &AtomicBool,
    events: mpsc::Sender<RecognizerEvent>,
    ready: mpsc::SyncSender<Result<(), RecognizerError>>,
) {
    let (tx, rx) = mpsc::channel::<AudioChunk>();
    let stream = match AudioCapture::new().and_then(|capture| capture.start(tx)) {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(RecognizerError::Unavailable(e.to_string())));
            return;
        }
    };

    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(chunk) => {
                if let Some(event) = window.push(&chunk.to_mono_16k()) {
                    if events.send(event).is_err() {
                        break;
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    drop(stream);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
