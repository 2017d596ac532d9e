//! Alert session state machine and the values the coordinator hands out.
//!
//! ```text
//! Idle ─accepted─▶ Locating ─▶ Notifying ─▶ Recording ─▶ Releasing ─▶ Idle
//!                                  │              │           ▲
//!                                  │ no contacts  │ capture   │
//!                                  └──────────────┴─ failed ──┘
//! ```
//!
//! Transitions only move forward; every path ends in `Releasing` exactly once.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// TriggerSource / TriggerEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerSource {
    Shake,
    Voice,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerSource::Shake => "shake",
            TriggerSource::Voice => "voice",
        })
    }
}

/// A detected trigger, created by an adapter and consumed immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub source: TriggerSource,
    pub timestamp: Instant,
}

impl TriggerEvent {
    pub fn now(source: TriggerSource) -> Self {
        Self {
            source,
            timestamp: Instant::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Locating,
    Notifying,
    Recording,
    Releasing,
}

impl SessionState {
    /// `true` when moving from `self` to `next` is a legal forward step.
    ///
    /// ```
    /// use sos_alert::alert::SessionState;
    ///
    /// assert!(SessionState::Locating.can_advance_to(SessionState::Notifying));
    /// assert!(SessionState::Notifying.can_advance_to(SessionState::Releasing));
    /// assert!(!SessionState::Recording.can_advance_to(SessionState::Locating));
    /// assert!(!SessionState::Releasing.can_advance_to(SessionState::Releasing));
    /// ```
    pub fn can_advance_to(self, next: SessionState) -> bool {
        next > self && next != SessionState::Idle
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Locating => "locating",
            SessionState::Notifying => "notifying",
            SessionState::Recording => "recording",
            SessionState::Releasing => "releasing",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// AlertSession / CooldownState
// ---------------------------------------------------------------------------

/// The in-progress token.  At most one exists at a time.
#[derive(Debug, Clone)]
pub struct AlertSession {
    pub id: u64,
    pub started_at: Instant,
    pub source: TriggerSource,
    pub recording_path: Option<PathBuf>,
    pub state: SessionState,
}

impl AlertSession {
    pub(crate) fn new(id: u64, source: TriggerSource, started_at: Instant) -> Self {
        Self {
            id,
            started_at,
            source,
            recording_path: None,
            state: SessionState::Locating,
        }
    }

    /// Move forward to `next`.  Backward or repeated steps are refused.
    pub(crate) fn advance(&mut self, next: SessionState) -> bool {
        if self.state.can_advance_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CooldownState {
    pub last_alert_at: Option<Instant>,
}

impl CooldownState {
    /// `true` while `now` is strictly inside the window opened by the last
    /// accepted alert.  Exactly `cooldown` later the window is closed.
    pub fn is_active(&self, now: Instant, cooldown: Duration) -> bool {
        self.last_alert_at
            .is_some_and(|last| now.saturating_duration_since(last) < cooldown)
    }

    /// Time left before a new alert may be accepted.
    pub fn remaining(&self, now: Instant, cooldown: Duration) -> Duration {
        self.last_alert_at
            .map(|last| cooldown.saturating_sub(now.saturating_duration_since(last)))
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Submission / RejectReason / AlertStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    CooldownActive,
    SessionInProgress,
    /// The coordinator has been shut down.
    ServiceStopped,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RejectReason::CooldownActive => "cooldown active",
            RejectReason::SessionInProgress => "session in progress",
            RejectReason::ServiceStopped => "service stopped",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    Rejected(RejectReason),
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Idle,
    Active,
}

// ---------------------------------------------------------------------------
// SessionOutcome / AlertEvent
// ---------------------------------------------------------------------------

/// How a session ended.  None of these are process-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Contacts notified and evidence recorded.
    Completed { recording: PathBuf },
    /// Contacts notified; the capture device could not be used.
    CompletedWithoutRecording,
    /// Nobody to notify; the session was a no-op.
    NoContacts,
    /// Teardown cut the session short.
    Cancelled,
}

/// Observable progress of a session, in the order it happens.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    SessionStarted { session: u64, source: TriggerSource },
    StateChanged { session: u64, state: SessionState },
    NotificationSent { session: u64, contact: String },
    NotificationFailed { session: u64, contact: String, error: String },
    RecordingStarted { session: u64, path: PathBuf },
    RecordingFailed { session: u64, error: String },
    SessionFinished { session: u64, outcome: SessionOutcome },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_in_locating() {
        let s = AlertSession::new(1, TriggerSource::Shake, Instant::now());
        assert_eq!(s.state, SessionState::Locating);
        assert!(s.recording_path.is_none());
    }

    #[test]
    fn advance_is_monotonic() {
        let mut s = AlertSession::new(1, TriggerSource::Voice, Instant::now());
        assert!(s.advance(SessionState::Notifying));
        assert!(!s.advance(SessionState::Locating));
        assert!(s.advance(SessionState::Releasing));
        assert!(!s.advance(SessionState::Recording));
        assert!(!s.advance(SessionState::Idle));
        assert_eq!(s.state, SessionState::Releasing);
    }

    #[test]
    fn cooldown_inactive_without_previous_alert() {
        let c = CooldownState::default();
        assert!(!c.is_active(Instant::now(), Duration::from_secs(20)));
    }

    #[test]
    fn cooldown_boundary_is_exclusive() {
        let t0 = Instant::now();
        let c = CooldownState {
            last_alert_at: Some(t0),
        };
        let window = Duration::from_secs(20);
        assert!(c.is_active(t0 + Duration::from_secs(19), window));
        assert!(!c.is_active(t0 + window, window));
        assert!(!c.is_active(t0 + Duration::from_secs(25), window));
    }

    #[test]
    fn cooldown_remaining() {
        let t0 = Instant::now();
        let c = CooldownState {
            last_alert_at: Some(t0),
        };
        let window = Duration::from_secs(20);
        assert_eq!(c.remaining(t0 + Duration::from_secs(5), window), Duration::from_secs(15));
        assert_eq!(c.remaining(t0 + Duration::from_secs(30), window), Duration::ZERO);
    }

    #[test]
    fn labels_and_display() {
        assert_eq!(SessionState::Recording.to_string(), "recording");
        assert_eq!(TriggerSource::Voice.to_string(), "voice");
        assert_eq!(RejectReason::CooldownActive.to_string(), "cooldown active");
        assert!(Submission::Accepted.is_accepted());
        assert!(!Submission::Rejected(RejectReason::SessionInProgress).is_accepted());
    }
}
