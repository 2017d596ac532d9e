//! Sample conversions shared by the evidence recorder and the recognizer.
//!
//! Both consumers want **16 kHz mono**: Whisper takes it as `f32`, the WAV
//! writer stores it as 16-bit PCM.
//!
//! ```text
//! interleaved f32 @ device rate ─► downmix ─► resample_to_16k ─► f32 / i16
//! ```

/// Target rate for everything downstream of the microphone.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Average interleaved frames down to a single channel.
///
/// `channels == 0` yields an empty vector; a trailing partial frame is
/// dropped.
///
/// ```rust
/// use sos_alert::audio::downmix;
///
/// let mono = downmix(&[0.5_f32, -0.5, 0.2, 0.4], 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

/// Linear-interpolation resampler from `source_rate` to 16 kHz.
///
/// Each cpal callback buffer is converted on its own, so there is a tiny
/// discontinuity at buffer edges.  That is inaudible in an evidence clip and
/// irrelevant to phrase spotting.
pub fn resample_to_16k(samples: &[f32], source_rate: u32) -> Vec<f32> {
    if source_rate == TARGET_SAMPLE_RATE || source_rate == 0 {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return Vec::new();
    }

    let step = source_rate as f64 / TARGET_SAMPLE_RATE as f64;
    let out_len = (samples.len() as f64 / step).ceil() as usize;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            match (samples.get(idx), samples.get(idx + 1)) {
                (Some(a), Some(b)) => a * (1.0 - frac) + b * frac,
                (Some(a), None) => *a,
                _ => 0.0,
            }
        })
        .collect()
}

/// Convert a normalized sample to 16-bit PCM, clamping out-of-range input.
///
/// ```rust
/// use sos_alert::audio::to_pcm16;
///
/// assert_eq!(to_pcm16(1.5), i16::MAX);
/// assert_eq!(to_pcm16(0.0), 0);
/// ```
pub fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_mono_is_copy() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(downmix(&input, 1), input);
    }

    #[test]
    fn downmix_averages_each_frame() {
        let out = downmix(&[1.0_f32, -1.0, 0.5, 0.5], 2);
        assert_eq!(out.len(), 2);
        assert!(out[0].abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn downmix_zero_channels_is_empty() {
        assert!(downmix(&[1.0_f32, 2.0], 0).is_empty());
    }

    #[test]
    fn resample_passthrough_at_target_rate() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        assert_eq!(resample_to_16k(&input, 16_000), input);
    }

    #[test]
    fn resample_48k_length_and_level() {
        let out = resample_to_16k(&vec![0.5_f32; 480], 48_000);
        assert_eq!(out.len(), 160);
        assert!(out.iter().all(|s| (s - 0.5).abs() < 1e-5));
    }

    #[test]
    fn resample_44k1_one_second() {
        let out = resample_to_16k(&vec![0.0_f32; 44_100], 44_100);
        assert!(out.len().abs_diff(16_000) <= 1, "got {}", out.len());
    }

    #[test]
    fn resample_upsamples_8k() {
        assert_eq!(resample_to_16k(&vec![0.0_f32; 80], 8_000).len(), 160);
    }

    #[test]
    fn pcm16_clamps_and_scales() {
        assert_eq!(to_pcm16(-2.0), -i16::MAX);
        assert_eq!(to_pcm16(0.5), i16::MAX / 2);
    }
}
