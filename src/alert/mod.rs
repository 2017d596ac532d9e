//! The alert coordinator and the types it exchanges with the rest of the
//! service.
//!
//! * [`AlertCoordinator`]: single entry point for triggers; owns cooldown
//!   and the single in-flight [`AlertSession`].
//! * [`state`]: session states, outcomes, and progress events.
//! * [`message`]: the text sent to each contact.
//!
//! ```
//! use sos_alert::alert::{compose_message, SessionState};
//!
//! assert!(SessionState::Locating.can_advance_to(SessionState::Notifying));
//! assert_eq!(
//!     compose_message("Ana", "Call me", "location unavailable"),
//!     "Hey, Ana! Call me\n\nMy location:\nlocation unavailable"
//! );
//! ```

pub mod clock;
pub mod coordinator;
pub mod message;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use clock::{Clock, SystemClock};
pub use coordinator::{AlertCoordinator, Services, HAPTIC_PULSE};
pub use message::{compose_message, location_text, LOCATION_UNAVAILABLE};
pub use state::{
    AlertEvent, AlertSession, AlertStatus, CooldownState, RejectReason, SessionOutcome,
    SessionState, Submission, TriggerEvent, TriggerSource,
};
