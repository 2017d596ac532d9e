//! Immediate local feedback when an alert is accepted.
//!
//! Feedback is best-effort: the coordinator logs a failed pulse and carries
//! on with the response sequence.

use std::io::Write;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HapticsError {
    #[error("feedback device unavailable")]
    Unavailable,

    #[error("feedback write failed: {0}")]
    Io(#[from] std::io::Error),
}

pub trait Haptics: Send + Sync {
    fn pulse(&self, duration: Duration) -> Result<(), HapticsError>;
}

/// Rings the terminal bell; the closest thing to a vibrator on a desktop.
#[derive(Debug, Default)]
pub struct BellHaptics;

impl Haptics for BellHaptics {
    fn pulse(&self, duration: Duration) -> Result<(), HapticsError> {
        let mut err = std::io::stderr().lock();
        err.write_all(b"\x07")?;
        err.flush()?;
        log::debug!("haptics: bell pulse ({} ms)", duration.as_millis());
        Ok(())
    }
}

/// Feedback disabled.
#[derive(Debug, Default)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn pulse(&self, _duration: Duration) -> Result<(), HapticsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_haptics_never_fails() {
        assert!(NoHaptics.pulse(Duration::from_millis(500)).is_ok());
    }

    #[test]
    fn haptics_is_object_safe() {
        let h: Box<dyn Haptics> = Box::new(BellHaptics);
        drop(h);
    }
}
