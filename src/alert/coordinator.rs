//! Alert coordinator: trigger arbitration and the response sequence.
//!
//! # Flow
//!
//! ```text
//! submit_trigger(source)                      [caller thread, under lock]
//!   ├─ stopped?          → Rejected(ServiceStopped)
//!   ├─ session exists?   → Rejected(SessionInProgress)
//!   ├─ inside cooldown?  → Rejected(CooldownActive)
//!   └─ last_alert_at = now, session = Locating, spawn sequence → Accepted
//!
//! sequence                                    [tokio task, lock not held]
//!   haptic pulse (best effort)
//!   Locating   → maps link | "location unavailable"
//!   Notifying  → one send per contact, failures isolated
//!              └─ no contacts → Releasing
//!   Recording  → capture start ─ failed → Releasing
//!              └─ sleep(recording) | shutdown
//!   Releasing  → stop capture, drop session, SessionFinished
//! ```
//!
//! `Releasing` is reached through a single function.  If the sequence task
//! is dropped before getting there (runtime teardown, panic) a drop guard
//! performs the same release synchronously.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::alert::clock::{Clock, SystemClock};
use crate::alert::message::{compose_message, location_text};
use crate::alert::state::{
    AlertEvent, AlertSession, AlertStatus, CooldownState, RejectReason, SessionOutcome,
    SessionState, Submission, TriggerEvent, TriggerSource,
};
use crate::audio::AudioRecorder;
use crate::config::{AlertConfig, AppConfig, LocationPriority};
use crate::recordings;
use crate::response::{Contact, ContactStore, Haptics, LocationProvider, NotificationDispatcher};
use crate::trigger::TriggerSink;

/// Length of the feedback pulse on acceptance.
pub const HAPTIC_PULSE: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// The collaborators one coordinator drives.
#[derive(Clone)]
pub struct Services {
    pub contacts: Arc<dyn ContactStore>,
    pub location: Arc<dyn LocationProvider>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub recorder: Arc<dyn AudioRecorder>,
    pub haptics: Arc<dyn Haptics>,
    /// Where evidence files are created.
    pub recordings_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CoordinatorState {
    cooldown: CooldownState,
    session: Option<AlertSession>,
    next_session_id: u64,
    stopped: bool,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    alert: AlertConfig,
    priority: LocationPriority,
    record_evidence: bool,
    services: Services,
    clock: Arc<dyn Clock>,
    state: Mutex<CoordinatorState>,
    shutdown: watch::Sender<bool>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<AlertEvent>>>,
    runtime: Handle,
}

// ---------------------------------------------------------------------------
// AlertCoordinator
// ---------------------------------------------------------------------------

/// Shared handle to the coordinator.  Clones refer to the same state.
#[derive(Clone)]
pub struct AlertCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AlertCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertCoordinator")
            .field("status", &self.current_status())
            .field("state", &self.session_state())
            .finish_non_exhaustive()
    }
}

impl AlertCoordinator {
    /// Build a coordinator bound to the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime context.
    pub fn new(config: &AppConfig, services: Services) -> Self {
        Self::with_clock(config, services, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AppConfig, services: Services, clock: Arc<dyn Clock>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                alert: config.alert.clone(),
                priority: config.location.priority,
                record_evidence: config.recording.enabled,
                services,
                clock,
                state: Mutex::new(CoordinatorState::default()),
                shutdown,
                listeners: Mutex::new(Vec::new()),
                runtime: Handle::current(),
            }),
        }
    }

    /// Accept or reject a trigger.  Safe to call from any thread.
    ///
    /// On `Accepted` the session already exists (in `Locating`) when this
    /// returns; the response sequence runs on the runtime afterwards.
    pub fn submit_trigger(&self, source: TriggerSource) -> Submission {
        let inner = &self.inner;
        let mut state = inner.lock_state();

        let now = inner.clock.now();
        let verdict = if state.stopped {
            Err(RejectReason::ServiceStopped)
        } else if state.session.is_some() {
            Err(RejectReason::SessionInProgress)
        } else if state.cooldown.is_active(now, inner.alert.cooldown()) {
            Err(RejectReason::CooldownActive)
        } else {
            Ok(())
        };

        if let Err(reason) = verdict {
            drop(state);
            log::debug!("alert: {source} trigger rejected ({reason})");
            return Submission::Rejected(reason);
        }

        state.next_session_id += 1;
        let id = state.next_session_id;
        state.cooldown.last_alert_at = Some(now);
        state.session = Some(AlertSession::new(id, source, now));

        inner.emit(AlertEvent::SessionStarted {
            session: id,
            source,
        });
        inner.emit(AlertEvent::StateChanged {
            session: id,
            state: SessionState::Locating,
        });

        let task = inner.runtime.spawn(run_session(inner.clone(), id));
        state.task = Some(task);

        log::info!("alert: session {id} started by {source} trigger");
        Submission::Accepted
    }

    pub fn current_status(&self) -> AlertStatus {
        if self.inner.lock_state().session.is_some() {
            AlertStatus::Active
        } else {
            AlertStatus::Idle
        }
    }

    /// State of the active session, `Idle` when there is none.
    pub fn session_state(&self) -> SessionState {
        self.inner
            .lock_state()
            .session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(SessionState::Idle)
    }

    /// Time left in the cooldown window, zero when a trigger would pass it.
    pub fn cooldown_remaining(&self) -> Duration {
        let state = self.inner.lock_state();
        state
            .cooldown
            .remaining(self.inner.clock.now(), self.inner.alert.cooldown())
    }

    /// Stream of progress events for every session from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<AlertEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Refuse further triggers, force any in-flight session to release, and
    /// wait for the release to finish.  Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let task = {
            let mut state = self.inner.lock_state();
            if !state.stopped {
                log::info!("alert: coordinator shutting down");
            }
            state.stopped = true;
            state.task.take()
        };

        self.inner.shutdown.send_replace(true);

        if let Some(task) = task {
            if let Err(e) = task.await {
                log::error!("alert: session task ended abnormally: {e}");
            }
        }
    }
}

impl TriggerSink for AlertCoordinator {
    fn submit(&self, event: TriggerEvent) -> Submission {
        self.submit_trigger(event.source)
    }
}

// ---------------------------------------------------------------------------
// Response sequence
// ---------------------------------------------------------------------------

/// Releases the session if the sequence task is dropped before it could.
struct ReleaseGuard {
    inner: Arc<Inner>,
    session: u64,
    armed: bool,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if self.armed {
            log::warn!(
                "alert: session {} interrupted, releasing synchronously",
                self.session
            );
            self.inner.release_blocking(self.session);
        }
    }
}

async fn run_session(inner: Arc<Inner>, id: u64) {
    let mut guard = ReleaseGuard {
        inner: inner.clone(),
        session: id,
        armed: true,
    };

    let mut shutdown = inner.shutdown.subscribe();
    let outcome = inner.respond(id, &mut shutdown).await;
    inner.release(id, outcome).await;

    guard.armed = false;
}

/// Resolves once teardown has been requested.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: AlertEvent) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn advance(&self, id: u64, next: SessionState) {
        let advanced = {
            let mut state = self.lock_state();
            match state.session.as_mut() {
                Some(session) if session.id == id => session.advance(next),
                _ => false,
            }
        };
        if advanced {
            log::debug!("alert: session {id} → {next}");
            self.emit(AlertEvent::StateChanged {
                session: id,
                state: next,
            });
        }
    }

    fn set_recording_path(&self, id: u64, path: Option<PathBuf>) {
        let mut state = self.lock_state();
        if let Some(session) = state.session.as_mut().filter(|s| s.id == id) {
            session.recording_path = path;
        }
    }

    fn take_recording_path(&self, id: u64) -> Option<PathBuf> {
        let mut state = self.lock_state();
        state
            .session
            .as_mut()
            .filter(|s| s.id == id)
            .and_then(|s| s.recording_path.take())
    }

    fn clear_session(&self, id: u64) {
        let mut state = self.lock_state();
        if state.session.as_ref().is_some_and(|s| s.id == id) {
            state.session = None;
        }
    }

    /// Steps 1–4.  Every return value leads into [`Inner::release`].
    async fn respond(&self, id: u64, shutdown: &mut watch::Receiver<bool>) -> SessionOutcome {
        if self.alert.haptics {
            if let Err(e) = self.services.haptics.pulse(HAPTIC_PULSE) {
                log::debug!("alert: haptic feedback failed: {e}");
            }
        }

        // ── Locating ────────────────────────────────────────────────────
        let lookup = self.services.location.current_location(self.priority);
        let location = tokio::select! {
            result = lookup => {
                if let Err(e) = &result {
                    log::warn!("alert: {e}; sending without coordinates");
                }
                location_text(&result)
            }
            _ = cancelled(shutdown) => return SessionOutcome::Cancelled,
        };

        // ── Notifying ───────────────────────────────────────────────────
        self.advance(id, SessionState::Notifying);

        let store = self.services.contacts.clone();
        let contacts = match tokio::task::spawn_blocking(move || store.list_contacts()).await {
            Ok(Ok(contacts)) => contacts,
            Ok(Err(e)) => {
                log::error!("alert: cannot read contacts: {e}");
                Vec::new()
            }
            Err(e) => {
                log::error!("alert: contact read task failed: {e}");
                Vec::new()
            }
        };
        if contacts.is_empty() {
            log::info!("alert: no contacts registered, nothing to send");
            return SessionOutcome::NoContacts;
        }

        tokio::select! {
            _ = self.notify_all(id, contacts, &location) => {}
            _ = cancelled(shutdown) => return SessionOutcome::Cancelled,
        }

        // ── Recording ───────────────────────────────────────────────────
        if !self.record_evidence {
            return SessionOutcome::CompletedWithoutRecording;
        }
        self.advance(id, SessionState::Recording);

        let path = recordings::new_recording_path(&self.services.recordings_dir);
        let recorder = self.services.recorder.clone();
        let start_path = path.clone();
        let started = tokio::task::spawn_blocking(move || recorder.start(&start_path))
            .await
            .map_err(|e| e.to_string())
            .and_then(|r| r.map_err(|e| e.to_string()));

        if let Err(error) = started {
            log::error!("alert: evidence recording unavailable: {error}");
            self.emit(AlertEvent::RecordingFailed { session: id, error });
            return SessionOutcome::CompletedWithoutRecording;
        }

        self.set_recording_path(id, Some(path.clone()));
        self.emit(AlertEvent::RecordingStarted {
            session: id,
            path: path.clone(),
        });

        tokio::select! {
            _ = tokio::time::sleep(self.alert.recording_duration()) => {
                SessionOutcome::Completed { recording: path }
            }
            _ = cancelled(shutdown) => SessionOutcome::Cancelled,
        }
    }

    async fn notify_all(&self, id: u64, contacts: Vec<Contact>, location: &str) {
        let body = self.alert.message_text();
        let mut sends = JoinSet::new();

        for contact in contacts {
            let dispatcher = self.services.dispatcher.clone();
            let text = compose_message(&contact.name, body, location);
            sends.spawn(async move {
                let result = dispatcher.send(&contact.phone_number, &text).await;
                (contact, result)
            });
        }

        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((contact, Ok(()))) => {
                    log::info!("alert: notified {}", contact.name);
                    self.emit(AlertEvent::NotificationSent {
                        session: id,
                        contact: contact.name,
                    });
                }
                Ok((contact, Err(e))) => {
                    log::warn!("alert: message to {} failed: {e}", contact.name);
                    self.emit(AlertEvent::NotificationFailed {
                        session: id,
                        contact: contact.name,
                        error: e.to_string(),
                    });
                }
                Err(e) => log::error!("alert: send task failed: {e}"),
            }
        }
    }

    /// Step 5.  The only place a session is released in normal operation.
    async fn release(&self, id: u64, outcome: SessionOutcome) {
        self.advance(id, SessionState::Releasing);

        if let Some(path) = self.take_recording_path(id) {
            let recorder = self.services.recorder.clone();
            match tokio::task::spawn_blocking(move || recorder.stop()).await {
                Ok(Ok(saved)) => log::info!("alert: evidence saved to {}", saved.display()),
                Ok(Err(e)) => log::error!("alert: stopping capture of {} failed: {e}", path.display()),
                Err(e) => log::error!("alert: capture stop task failed: {e}"),
            }
        }

        self.finish(id, outcome);
    }

    /// Synchronous twin of [`Inner::release`] for the drop guard.
    fn release_blocking(&self, id: u64) {
        self.advance(id, SessionState::Releasing);
        if self.take_recording_path(id).is_some() {
            if let Err(e) = self.services.recorder.stop() {
                log::error!("alert: stopping capture failed: {e}");
            }
        }
        self.finish(id, SessionOutcome::Cancelled);
    }

    fn finish(&self, id: u64, outcome: SessionOutcome) {
        self.clear_session(id);
        log::info!("alert: session {id} finished: {outcome:?}");
        self.emit(AlertEvent::SessionFinished {
            session: id,
            outcome,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
