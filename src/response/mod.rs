//! Collaborators driven by the alert response sequence.
//!
//! This module provides:
//! * [`ContactStore`] / [`JsonContactStore`]: who gets notified.
//! * [`LocationProvider`]: single-shot position lookup
//!   ([`HttpLocationProvider`], [`FixedLocationProvider`],
//!   [`UnavailableLocationProvider`]).
//! * [`NotificationDispatcher`]: per-contact text delivery
//!   ([`WebhookDispatcher`], [`LogDispatcher`]).
//! * [`Haptics`]: immediate local feedback ([`BellHaptics`], [`NoHaptics`]).
//!
//! The audio capture device lives in [`crate::audio`].

pub mod contacts;
pub mod haptics;
pub mod location;
pub mod notify;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use contacts::{Contact, ContactError, ContactStore, JsonContactStore};
pub use haptics::{BellHaptics, Haptics, HapticsError, NoHaptics};
pub use location::{
    Coordinates, FixedLocationProvider, HttpLocationProvider, LocationError, LocationProvider,
    UnavailableLocationProvider,
};
pub use notify::{DispatchError, LogDispatcher, NotificationDispatcher, WebhookDispatcher};
