//! Trigger source adapters.
//!
//! Each adapter owns a dedicated OS thread that turns one detection
//! mechanism into [`TriggerEvent`]s and pushes them into a [`TriggerSink`]
//! (in production, the [`AlertCoordinator`](crate::alert::AlertCoordinator)).
//! Adapters never wait on the response sequence, and a rejected submission
//! is only logged.
//!
//! | Adapter           | Signal                                  | Source            |
//! |-------------------|-----------------------------------------|-------------------|
//! | [`MotionListener`] | acceleration magnitude > threshold (g) | [`AccelSource`]   |
//! | [`VoiceListener`]  | activation phrase in a transcript      | [`SpeechRecognizer`] |

pub mod motion;
pub mod sensor;
pub mod voice;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::alert::{Submission, TriggerEvent};

/// Single entry point adapters push trigger events into.
pub trait TriggerSink: Send + Sync {
    fn submit(&self, event: TriggerEvent) -> Submission;
}

/// Sleep up to `total`, returning early once `stop` is set.
pub(crate) fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    let step = Duration::from_millis(50);
    let mut waited = Duration::ZERO;
    while waited < total && !stop.load(Ordering::SeqCst) {
        std::thread::sleep(step);
        waited += step;
    }
}

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use motion::{AccelSample, MotionListener, ShakeDetector, STANDARD_GRAVITY};
pub use sensor::{
    parse_sample, source_from_config, AccelSource, IioAccelerometer, LineAccelSource,
    SensorError,
};
pub use voice::{
    PhraseMatcher, RecognizerError, RecognizerEvent, SpeechRecognizer, VoiceListener,
};
