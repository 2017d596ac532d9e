//! Shake detection.
//!
//! A sample is a shake when its acceleration magnitude, expressed in g, is
//! strictly above the threshold (3.0 g by default).  There is no debouncing
//! here: a vigorous shake produces a burst of triggers and the coordinator's
//! cooldown collapses them into one alert.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::sensor::{AccelSource, SensorError};
use super::{sleep_unless_stopped, TriggerSink};
use crate::alert::{Submission, TriggerEvent, TriggerSource};
use crate::config::MotionConfig;

/// m/s² per g.
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Pause after a failed read before polling the sensor again.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// AccelSample / ShakeDetector
// ---------------------------------------------------------------------------

/// One 3-axis accelerometer reading in m/s².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Magnitude normalized by standard gravity.  A device at rest reads ~1.0.
    ///
    /// ```
    /// use sos_alert::trigger::AccelSample;
    ///
    /// let resting = AccelSample::new(0.0, 0.0, 9.80665);
    /// assert!((resting.g_force() - 1.0).abs() < 1e-9);
    /// ```
    pub fn g_force(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt() / STANDARD_GRAVITY
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ShakeDetector {
    threshold_g: f64,
}

impl ShakeDetector {
    pub fn new(threshold_g: f64) -> Self {
        Self { threshold_g }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(config.threshold_g)
    }

    pub fn threshold_g(&self) -> f64 {
        self.threshold_g
    }

    pub fn is_shake(&self, sample: &AccelSample) -> bool {
        sample.g_force() > self.threshold_g
    }
}

// ---------------------------------------------------------------------------
// MotionListener
// ---------------------------------------------------------------------------

/// Handle to the sampling thread.  Dropping it asks the thread to stop;
/// [`MotionListener::stop`] also waits for it.
pub struct MotionListener {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MotionListener {
    pub fn start(
        mut source: Box<dyn AccelSource>,
        detector: ShakeDetector,
        sink: Arc<dyn TriggerSink>,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let thread = std::thread::Builder::new()
            .name("motion-listener".into())
            .spawn(move || {
                log::info!(
                    "motion: listening (threshold {:.1} g)",
                    detector.threshold_g()
                );
                while !stop_flag.load(Ordering::SeqCst) {
                    match source.next_sample() {
                        Ok(Some(sample)) if detector.is_shake(&sample) => {
                            log::info!("motion: shake detected ({:.2} g)", sample.g_force());
                            let event = TriggerEvent::now(TriggerSource::Shake);
                            if let Submission::Rejected(reason) = sink.submit(event) {
                                log::debug!("motion: trigger not accepted ({reason})");
                            }
                        }
                        Ok(_) => {}
                        Err(SensorError::Closed) => {
                            log::info!("motion: sample stream ended");
                            break;
                        }
                        Err(e @ SensorError::Malformed { .. }) => {
                            log::warn!("motion: skipping sample: {e}");
                        }
                        Err(e) => {
                            log::warn!("motion: {e}");
                            sleep_unless_stopped(ERROR_BACKOFF, &stop_flag);
                        }
                    }
                }
                log::debug!("motion: listener stopped");
            })?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop forwarding and wait for the sampling thread to exit.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("motion: listener thread panicked");
            }
        }
    }
}

impl Drop for MotionListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::test_support::CollectingSink;
    use std::collections::VecDeque;

    /// Replays a fixed list, then reports the stream as closed.
    struct Scripted(VecDeque<AccelSample>);

    impl AccelSource for Scripted {
        fn next_sample(&mut self) -> Result<Option<AccelSample>, SensorError> {
            self.0.pop_front().map(Some).ok_or(SensorError::Closed)
        }
    }

    /// Never produces anything; stays open until stopped.
    struct Idle;

    impl AccelSource for Idle {
        fn next_sample(&mut self) -> Result<Option<AccelSample>, SensorError> {
            std::thread::sleep(Duration::from_millis(10));
            Ok(None)
        }
    }

    fn g(n: f64) -> AccelSample {
        AccelSample::new(0.0, 0.0, n * STANDARD_GRAVITY)
    }

    #[test]
    fn threshold_is_strict() {
        let d = ShakeDetector::new(3.0);
        assert!(!d.is_shake(&g(1.0)));
        assert!(!d.is_shake(&g(3.0)));
        assert!(d.is_shake(&g(3.01)));
    }

    #[test]
    fn magnitude_uses_all_axes() {
        // 2g on each axis → √12 ≈ 3.46 g
        let s = AccelSample::new(
            2.0 * STANDARD_GRAVITY,
            2.0 * STANDARD_GRAVITY,
            2.0 * STANDARD_GRAVITY,
        );
        assert!((s.g_force() - 12f64.sqrt()).abs() < 1e-9);
        assert!(ShakeDetector::new(3.0).is_shake(&s));
    }

    #[test]
    fn detector_follows_config() {
        let config = MotionConfig {
            threshold_g: 2.5,
            ..MotionConfig::default()
        };
        assert_eq!(ShakeDetector::from_config(&config).threshold_g(), 2.5);
    }

    #[test]
    fn every_shake_sample_is_forwarded_without_debouncing() {
        let sink = Arc::new(CollectingSink::default());
        let samples = VecDeque::from(vec![g(1.0), g(4.0), g(5.0), g(0.9), g(3.5)]);

        let listener = MotionListener::start(
            Box::new(Scripted(samples)),
            ShakeDetector::new(3.0),
            sink.clone(),
        )
        .unwrap();

        // The scripted source closes after the last sample, ending the thread.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while listener.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        listener.stop();

        let seen = sink.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![TriggerSource::Shake; 3]);
    }

    #[test]
    fn stop_joins_an_idle_listener() {
        let sink = Arc::new(CollectingSink::default());
        let listener =
            MotionListener::start(Box::new(Idle), ShakeDetector::new(3.0), sink.clone()).unwrap();
        assert!(listener.is_running());
        listener.stop();
        assert_eq!(sink.count(), 0);
    }

    /// Fails every read with an I/O error until stopped.
    struct Broken;

    impl AccelSource for Broken {
        fn next_sample(&mut self) -> Result<Option<AccelSample>, SensorError> {
            Err(SensorError::Io(std::io::Error::other("bus error")))
        }
    }

    #[test]
    fn malformed_samples_are_skipped_without_backoff() {
        struct Mixed(VecDeque<Result<AccelSample, SensorError>>);

        impl AccelSource for Mixed {
            fn next_sample(&mut self) -> Result<Option<AccelSample>, SensorError> {
                self.0.pop_front().ok_or(SensorError::Closed)?.map(Some)
            }
        }

        let malformed = || SensorError::Malformed {
            line: "x".into(),
            reason: "expected 3 values".into(),
        };
        let script = VecDeque::from(vec![
            Err(malformed()),
            Err(malformed()),
            Err(malformed()),
            Ok(g(4.0)),
        ]);

        let sink = Arc::new(CollectingSink::default());
        let started = std::time::Instant::now();
        let listener =
            MotionListener::start(Box::new(Mixed(script)), ShakeDetector::new(3.0), sink.clone())
                .unwrap();

        let deadline = started + Duration::from_secs(5);
        while listener.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        listener.stop();

        assert_eq!(sink.count(), 1);
        assert!(started.elapsed() < ERROR_BACKOFF);
    }

    #[test]
    fn stop_interrupts_the_error_backoff() {
        let sink = Arc::new(CollectingSink::default());
        let listener =
            MotionListener::start(Box::new(Broken), ShakeDetector::new(3.0), sink.clone()).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let started = std::time::Instant::now();
        listener.stop();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(sink.count(), 0);
    }
}
