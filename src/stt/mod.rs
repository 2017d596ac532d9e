//! Speech-to-text for activation-phrase spotting.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ WhisperRecognizer (SpeechRecognizer)                         │
//! │   voice-recognizer thread                                    │
//! │   AudioCapture ─▶ TranscriptWindow ─▶ SttEngine::transcribe  │
//! │                        │                    ▲                │
//! │                        ▼                    │                │
//! │              Partial / Final / Error   WhisperEngine          │
//! │                                        (ggml model file)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The recognizer only produces transcripts; deciding whether a transcript
//! contains the activation phrase is the voice adapter's job
//! ([`crate::trigger::VoiceListener`]).

pub mod engine;
pub mod model;
pub mod recognizer;

pub use engine::{SttEngine, SttError, TranscribeParams, WhisperEngine};
pub use model::{model_size_mb, resolve_model_path, KNOWN_MODELS, MODEL_SOURCE_URL};
pub use recognizer::{TranscriptWindow, WhisperRecognizer};
