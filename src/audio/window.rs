//! Rolling window of the most recent 16 kHz samples.
//!
//! The recognizer keeps the tail of the current utterance here.  When the
//! window is full the oldest samples are overwritten, so a long stream of
//! speech is still transcribed in bounded memory.

/// Fixed-capacity circular buffer of `f32` samples.
///
/// ```rust
/// use sos_alert::audio::SampleWindow;
///
/// let mut w = SampleWindow::new(4);
/// w.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
/// assert_eq!(w.snapshot(), vec![2.0, 3.0, 4.0, 5.0]);
/// assert!(w.is_full()); // snapshot does not consume
/// ```
pub struct SampleWindow {
    buf: Vec<f32>,
    /// Next write index.
    head: usize,
    len: usize,
}

impl SampleWindow {
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "SampleWindow capacity must be > 0");
        Self {
            buf: vec![0.0; capacity],
            head: 0,
            len: 0,
        }
    }

    /// Window sized to hold `secs` seconds of 16 kHz audio (at least one sample).
    pub fn with_duration(secs: f32) -> Self {
        let samples = (secs.max(0.0) * super::TARGET_SAMPLE_RATE as f32) as usize;
        Self::new(samples.max(1))
    }

    pub fn push_slice(&mut self, data: &[f32]) {
        let cap = self.buf.len();
        for &s in data {
            self.buf[self.head] = s;
            self.head = (self.head + 1) % cap;
            self.len = (self.len + 1).min(cap);
        }
    }

    /// Copy of the stored samples, oldest first.
    pub fn snapshot(&self) -> Vec<f32> {
        let cap = self.buf.len();
        let start = (self.head + cap - self.len) % cap;
        (0..self.len).map(|i| self.buf[(start + i) % cap]).collect()
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    pub fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_within_capacity_keeps_order() {
        let mut w = SampleWindow::new(8);
        w.push_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(w.snapshot(), vec![1.0, 2.0, 3.0]);
        assert!(!w.is_full());
    }

    #[test]
    fn overflow_keeps_newest_in_order() {
        let mut w = SampleWindow::new(3);
        w.push_slice(&[1.0, 2.0, 3.0]);
        w.push_slice(&[4.0, 5.0]);
        assert!(w.is_full());
        assert_eq!(w.snapshot(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn clear_empties_and_window_is_reusable() {
        let mut w = SampleWindow::new(4);
        w.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        w.clear();
        assert!(w.snapshot().is_empty());

        w.push_slice(&[9.0]);
        assert_eq!(w.snapshot(), vec![9.0]);
    }

    #[test]
    fn duration_is_derived_from_16k() {
        let mut w = SampleWindow::with_duration(1.0);
        w.push_slice(&vec![0.0; 15_999]);
        assert!(!w.is_full());
        w.push_slice(&[0.0]);
        assert!(w.is_full());
        assert_eq!(w.snapshot().len(), 16_000);
    }

    #[test]
    fn zero_duration_still_allocates_one_sample() {
        let mut w = SampleWindow::with_duration(0.0);
        w.push_slice(&[0.5, 0.25]);
        assert_eq!(w.snapshot(), vec![0.25]);
    }

    #[test]
    #[should_panic(expected = "SampleWindow capacity must be > 0")]
    fn zero_capacity_panics() {
        let _ = SampleWindow::new(0);
    }
}
