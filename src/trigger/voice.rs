//! Activation-phrase spotting over a streaming recognizer.
//!
//! [`VoiceListener`] keeps a [`SpeechRecognizer`] session open on a
//! dedicated thread.  Every partial or final transcript goes through a
//! [`PhraseMatcher`]; each new occurrence of the phrase becomes one `Voice`
//! trigger.  When the recognizer reports an error, or an utterance ends, the
//! session is started again so the listener never goes deaf on its own.
//!
//! ```text
//! start ──▶ next_event ─┬─ Partial(t) ─▶ matcher ─▶ submit(Voice) × new hits
//!   ▲                   ├─ Final(t)   ─▶ matcher ─▶ reset ──┐
//!   │                   └─ Error(e)   ─▶ cancel ────────────┤
//!   └────────────────────────── restart (unless stopped) ◀──┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;

use super::{sleep_unless_stopped, TriggerSink};
use crate::alert::{Submission, TriggerEvent, TriggerSource};

/// How long one `next_event` call may block before the stop flag is checked.
const EVENT_POLL: Duration = Duration::from_millis(200);
/// Pause before retrying a recognizer that failed to start.
const START_RETRY: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Recognizer contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecognizerError {
    /// No model or no microphone.
    #[error("speech recognizer unavailable: {0}")]
    Unavailable(String),

    #[error("audio input failed: {0}")]
    Audio(String),

    #[error("recognition failed: {0}")]
    Recognition(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    /// Transcript so far for the current utterance; later partials repeat it.
    Partial(String),
    /// Complete transcript; the utterance is over.
    Final(String),
    Error(RecognizerError),
}

pub trait SpeechRecognizer: Send {
    /// Begin (or resume) listening.
    fn start(&mut self) -> Result<(), RecognizerError>;

    /// Block up to `timeout` for the next event.
    fn next_event(&mut self, timeout: Duration) -> Option<RecognizerEvent>;

    fn cancel(&mut self);
}

// ---------------------------------------------------------------------------
// PhraseMatcher
// ---------------------------------------------------------------------------

/// Case-insensitive substring matcher that fires once per occurrence.
///
/// Partial transcripts of one utterance repeat earlier text, so the matcher
/// remembers how many occurrences it already reported and only counts the
/// surplus.
///
/// ```
/// use sos_alert::trigger::PhraseMatcher;
///
/// let mut m = PhraseMatcher::new("help me");
/// assert_eq!(m.observe("please"), 0);
/// assert_eq!(m.observe("please HELP me"), 1);
/// assert_eq!(m.observe("please help me now"), 0);
/// assert_eq!(m.observe("please help me now help me"), 1);
/// m.reset();
/// assert_eq!(m.observe("help me"), 1);
/// ```
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    phrase: String,
    reported: usize,
}

impl PhraseMatcher {
    pub fn new(phrase: &str) -> Self {
        Self {
            phrase: phrase.trim().to_lowercase(),
            reported: 0,
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Number of occurrences in `transcript` not reported before.
    pub fn observe(&mut self, transcript: &str) -> usize {
        if self.phrase.is_empty() {
            return 0;
        }
        let count = transcript.to_lowercase().matches(&self.phrase).count();
        let fresh = count.saturating_sub(self.reported);
        self.reported = self.reported.max(count);
        fresh
    }

    /// Start a new utterance.
    pub fn reset(&mut self) {
        self.reported = 0;
    }
}

// ---------------------------------------------------------------------------
// VoiceListener
// ---------------------------------------------------------------------------

pub struct VoiceListener {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl VoiceListener {
    pub fn start(
        recognizer: Box<dyn SpeechRecognizer>,
        matcher: PhraseMatcher,
        sink: Arc<dyn TriggerSink>,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let thread = std::thread::Builder::new()
            .name("voice-listener".into())
            .spawn(move || listen(recognizer, matcher, sink, &stop_flag))?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop listening, cancel the recognizer session, and wait for the thread.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("voice: listener thread panicked");
            }
        }
    }
}

impl Drop for VoiceListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn listen(
    mut recognizer: Box<dyn SpeechRecognizer>,
    mut matcher: PhraseMatcher,
    sink: Arc<dyn TriggerSink>,
    stop: &AtomicBool,
) {
    log::info!("voice: listening for {:?}", matcher.phrase());

    'session: while !stop.load(Ordering::SeqCst) {
        if let Err(e) = recognizer.start() {
            log::warn!("voice: {e}; retrying in {}s", START_RETRY.as_secs());
            sleep_unless_stopped(START_RETRY, stop);
            continue;
        }
        matcher.reset();

        while !stop.load(Ordering::SeqCst) {
            match recognizer.next_event(EVENT_POLL) {
                None => {}
                Some(RecognizerEvent::Partial(text)) => {
                    fire(&sink, matcher.observe(&text), &text);
                }
                Some(RecognizerEvent::Final(text)) => {
                    fire(&sink, matcher.observe(&text), &text);
                    matcher.reset();
                    continue 'session;
                }
                Some(RecognizerEvent::Error(e)) => {
                    log::warn!("voice: {e}; restarting recognition");
                    recognizer.cancel();
                    continue 'session;
                }
            }
        }
    }

    recognizer.cancel();
    log::debug!("voice: listener stopped");
}

fn fire(sink: &Arc<dyn TriggerSink>, hits: usize, transcript: &str) {
    for _ in 0..hits {
        log::info!("voice: activation phrase heard in {transcript:?}");
        if let Submission::Rejected(reason) = sink.submit(TriggerEvent::now(TriggerSource::Voice)) {
            log::debug!("voice: trigger not accepted ({reason})");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
