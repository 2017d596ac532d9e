//! SOS alert service.
//!
//! A shake of the device or a spoken activation phrase raises an alert: the
//! user's emergency contacts get a text with their location and the
//! microphone records ambient audio as evidence.
//!
//! ```text
//! trigger::MotionListener ─┐
//!                          ├─► alert::AlertCoordinator ─► response::{location, notify}
//! trigger::VoiceListener ──┘            │                 audio::CpalRecorder
//!                                       └─► AlertEvent stream
//! ```

pub mod alert;
pub mod audio;
pub mod cli;
pub mod config;
pub mod recordings;
pub mod response;
pub mod service;
pub mod stt;
pub mod trigger;
