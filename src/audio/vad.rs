//! Energy-based voice activity check.
//!
//! The recognizer uses [`VadDetector::has_voice`] to skip Whisper entirely
//! on silent windows, and [`VadDetector::trim_silence`] to hand it only the
//! voiced span of a window.  Frames are 30 ms (480 samples at 16 kHz); a
//! frame is voiced when its RMS exceeds the threshold.

/// RMS amplitude of `samples`, `0.0` for an empty slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

pub struct VadDetector {
    rms_threshold: f32,
    frame_size: usize,
}

impl VadDetector {
    /// `0.01` suits a quiet room; raise it to 0.02–0.05 outdoors.
    pub fn new(rms_threshold: f32) -> Self {
        Self {
            rms_threshold,
            frame_size: 480,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.rms_threshold
    }

    fn frames<'a>(&self, audio: &'a [f32]) -> std::slice::Chunks<'a, f32> {
        audio.chunks(self.frame_size)
    }

    fn is_voiced(&self, frame: &[f32]) -> bool {
        rms(frame) > self.rms_threshold
    }

    /// `true` when at least one frame is voiced.
    pub fn has_voice(&self, audio: &[f32]) -> bool {
        self.frames(audio).any(|f| self.is_voiced(f))
    }

    /// Sub-slice from the first to the last voiced frame; empty when the
    /// whole input is silence.
    ///
    /// ```rust
    /// use sos_alert::audio::VadDetector;
    ///
    /// let mut audio = vec![0.0_f32; 480];
    /// audio.extend(vec![0.5_f32; 480]);
    /// audio.extend(vec![0.0_f32; 480]);
    /// assert_eq!(VadDetector::new(0.01).trim_silence(&audio).len(), 480);
    /// ```
    pub fn trim_silence<'a>(&self, audio: &'a [f32]) -> &'a [f32] {
        let voiced: Vec<usize> = self
            .frames(audio)
            .enumerate()
            .filter(|(_, f)| self.is_voiced(f))
            .map(|(i, _)| i)
            .collect();

        match (voiced.first(), voiced.last()) {
            (Some(&first), Some(&last)) => {
                let start = first * self.frame_size;
                let end = ((last + 1) * self.frame_size).min(audio.len());
                &audio[start..end]
            }
            _ => &audio[0..0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(pre: usize, voice: usize, post: usize) -> Vec<f32> {
        let mut v = vec![0.0_f32; pre];
        v.extend(vec![0.5_f32; voice]);
        v.extend(vec![0.0_f32; post]);
        v
    }

    #[test]
    fn rms_of_constant_signal() {
        assert!((rms(&[0.5; 100]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn silence_has_no_voice() {
        let vad = VadDetector::new(0.01);
        assert!(!vad.has_voice(&vec![0.0; 1440]));
        assert!(vad.trim_silence(&vec![0.0; 1440]).is_empty());
    }

    #[test]
    fn voiced_middle_is_kept() {
        let vad = VadDetector::new(0.01);
        let audio = signal(960, 480, 960);
        assert!(vad.has_voice(&audio));
        assert_eq!(vad.trim_silence(&audio).len(), 480);
    }

    #[test]
    fn gap_between_voiced_frames_is_kept() {
        let vad = VadDetector::new(0.01);
        let mut audio = signal(480, 480, 480);
        audio.extend(vec![0.5_f32; 480]);
        assert_eq!(vad.trim_silence(&audio).len(), 480 * 3);
    }

    #[test]
    fn empty_input() {
        let vad = VadDetector::new(0.01);
        assert!(!vad.has_voice(&[]));
        assert!(vad.trim_silence(&[]).is_empty());
    }
}
