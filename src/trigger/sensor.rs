//! Accelerometer sample sources.
//!
//! * [`IioAccelerometer`] polls a Linux Industrial I/O device through sysfs:
//!   `in_accel_{x,y,z}_raw` multiplied by `in_accel_scale` gives m/s².
//! * [`LineAccelSource`] parses `x y z` (or `x,y,z`) lines from any reader,
//!   typically stdin fed by an external sensor bridge.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use thiserror::Error;

use super::motion::AccelSample;
use crate::config::{MotionConfig, MotionSourceKind};

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("no accelerometer at {0}")]
    NotFound(PathBuf),

    #[error("sensor read failed: {0}")]
    Io(#[from] io::Error),

    #[error("malformed sample {line:?}: {reason}")]
    Malformed { line: String, reason: String },

    /// The source will never produce another sample.
    #[error("sample stream closed")]
    Closed,
}

/// Blocking producer of accelerometer readings.
pub trait AccelSource: Send {
    /// Wait a bounded time for the next reading.  `Ok(None)` means nothing
    /// arrived yet; callers poll again.
    fn next_sample(&mut self) -> Result<Option<AccelSample>, SensorError>;
}

/// Build the source selected in the settings.  `Ok(None)` when motion
/// detection is switched off.
pub fn source_from_config(config: &MotionConfig) -> Result<Option<Box<dyn AccelSource>>, SensorError> {
    if !config.enabled {
        return Ok(None);
    }
    let poll = Duration::from_millis(config.poll_interval_ms);
    match config.source {
        MotionSourceKind::Disabled => Ok(None),
        MotionSourceKind::Iio => Ok(Some(Box::new(IioAccelerometer::open(
            &config.iio_device,
            poll,
        )?))),
        MotionSourceKind::Stdin => Ok(Some(Box::new(LineAccelSource::spawn(
            io::BufReader::new(io::stdin()),
            poll,
        )?))),
    }
}

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

/// Parse `"x y z"` / `"x,y,z"` in m/s².
///
/// ```
/// use sos_alert::trigger::parse_sample;
///
/// let s = parse_sample("0.1, -0.2 9.8").unwrap();
/// assert_eq!((s.x, s.y, s.z), (0.1, -0.2, 9.8));
/// ```
pub fn parse_sample(line: &str) -> Result<AccelSample, SensorError> {
    let malformed = |reason: &str| SensorError::Malformed {
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let values = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>().map_err(|e| malformed(&e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [x, y, z] => Ok(AccelSample::new(*x, *y, *z)),
        _ => Err(malformed("expected three axis values")),
    }
}

// ---------------------------------------------------------------------------
// LineAccelSource
// ---------------------------------------------------------------------------

/// Samples read line by line on a helper thread.
///
/// A reader blocked in `read_line` cannot be interrupted, so the helper
/// thread lives until its input closes; the source itself stops as soon as
/// its owner stops polling.
pub struct LineAccelSource {
    rx: mpsc::Receiver<Result<AccelSample, SensorError>>,
    poll: Duration,
}

impl LineAccelSource {
    pub fn spawn<R>(reader: R, poll: Duration) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("motion-reader".into())
            .spawn(move || {
                for line in reader.lines() {
                    let parsed = match line {
                        Ok(line) if line.trim().is_empty() || line.starts_with('#') => continue,
                        Ok(line) => parse_sample(&line),
                        Err(e) => Err(SensorError::Io(e)),
                    };
                    if tx.send(parsed).is_err() {
                        return;
                    }
                }
            })?;
        Ok(Self { rx, poll })
    }
}

impl AccelSource for LineAccelSource {
    fn next_sample(&mut self) -> Result<Option<AccelSample>, SensorError> {
        match self.rx.recv_timeout(self.poll) {
            Ok(sample) => sample.map(Some),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(SensorError::Closed),
        }
    }
}

// ---------------------------------------------------------------------------
// IioAccelerometer
// ---------------------------------------------------------------------------

/// Linux IIO accelerometer polled every `poll` interval.
#[derive(Debug)]
pub struct IioAccelerometer {
    device: PathBuf,
    scale: [f64; 3],
    poll: Duration,
}

impl IioAccelerometer {
    pub fn open(device: &Path, poll: Duration) -> Result<Self, SensorError> {
        if !device.join("in_accel_x_raw").exists() {
            return Err(SensorError::NotFound(device.to_path_buf()));
        }

        // Either one shared scale or one per axis, depending on the driver.
        let shared = read_value(&device.join("in_accel_scale")).ok();
        let mut scale = [1.0; 3];
        for (slot, axis) in scale.iter_mut().zip(["x", "y", "z"]) {
            *slot = match shared {
                Some(s) => s,
                None => read_value(&device.join(format!("in_accel_{axis}_scale"))).unwrap_or(1.0),
            };
        }

        log::info!("motion: using IIO device {}", device.display());
        Ok(Self {
            device: device.to_path_buf(),
            scale,
            poll,
        })
    }

    fn read_axis(&self, axis: &str, scale: f64) -> Result<f64, SensorError> {
        Ok(read_value(&self.device.join(format!("in_accel_{axis}_raw")))? * scale)
    }
}

impl AccelSource for IioAccelerometer {
    fn next_sample(&mut self) -> Result<Option<AccelSample>, SensorError> {
        std::thread::sleep(self.poll);
        Ok(Some(AccelSample::new(
            self.read_axis("x", self.scale[0])?,
            self.read_axis("y", self.scale[1])?,
            self.read_axis("z", self.scale[2])?,
        )))
    }
}

fn read_value(path: &Path) -> Result<f64, SensorError> {
    let text = std::fs::read_to_string(path)?;
    text.trim().parse::<f64>().map_err(|e| SensorError::Malformed {
        line: text.trim().to_string(),
        reason: format!("{}: {e}", path.display()),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::STANDARD_GRAVITY;

    #[test]
    fn parses_space_and_comma_separated() {
        assert_eq!(parse_sample("1 2 3").unwrap(), AccelSample::new(1.0, 2.0, 3.0));
        assert_eq!(parse_sample("1,2,3").unwrap(), AccelSample::new(1.0, 2.0, 3.0));
        assert_eq!(
            parse_sample("  -1.5 ,\t0 ,9.8 ").unwrap(),
            AccelSample::new(-1.5, 0.0, 9.8)
        );
    }

    #[test]
    fn rejects_wrong_arity_and_garbage() {
        assert!(matches!(parse_sample("1 2"), Err(SensorError::Malformed { .. })));
        assert!(matches!(parse_sample("1 2 3 4"), Err(SensorError::Malformed { .. })));
        assert!(matches!(parse_sample("a b c"), Err(SensorError::Malformed { .. })));
    }

    #[test]
    fn line_source_yields_samples_then_closes() {
        let input = "# header\n0 0 9.8\n\nbad line\n30 0 0\n";
        let mut source =
            LineAccelSource::spawn(io::Cursor::new(input), Duration::from_secs(1)).unwrap();

        assert_eq!(source.next_sample().unwrap(), Some(AccelSample::new(0.0, 0.0, 9.8)));
        assert!(matches!(source.next_sample(), Err(SensorError::Malformed { .. })));
        assert_eq!(source.next_sample().unwrap(), Some(AccelSample::new(30.0, 0.0, 0.0)));
        assert!(matches!(source.next_sample(), Err(SensorError::Closed)));
    }

    fn fake_iio(dir: &Path, raw: [&str; 3], scale: &str) {
        for (axis, value) in ["x", "y", "z"].iter().zip(raw) {
            std::fs::write(dir.join(format!("in_accel_{axis}_raw")), value).unwrap();
        }
        std::fs::write(dir.join("in_accel_scale"), scale).unwrap();
    }

    #[test]
    fn iio_scales_raw_counts() {
        let dir = tempfile::tempdir().unwrap();
        fake_iio(dir.path(), ["0\n", "0\n", "1000\n"], "0.00980665\n");

        let mut accel = IioAccelerometer::open(dir.path(), Duration::ZERO).unwrap();
        let sample = accel.next_sample().unwrap().unwrap();
        assert!((sample.z - STANDARD_GRAVITY).abs() < 1e-9);
        assert!((sample.g_force() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn iio_per_axis_scale_fallback() {
        let dir = tempfile::tempdir().unwrap();
        for axis in ["x", "y", "z"] {
            std::fs::write(dir.path().join(format!("in_accel_{axis}_raw")), "2").unwrap();
            std::fs::write(dir.path().join(format!("in_accel_{axis}_scale")), "0.5").unwrap();
        }
        let mut accel = IioAccelerometer::open(dir.path(), Duration::ZERO).unwrap();
        assert_eq!(accel.next_sample().unwrap(), Some(AccelSample::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn iio_missing_device_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = IioAccelerometer::open(&dir.path().join("iio:device9"), Duration::ZERO).unwrap_err();
        assert!(matches!(err, SensorError::NotFound(_)));
    }

    #[test]
    fn disabled_config_builds_no_source() {
        let config = MotionConfig {
            source: MotionSourceKind::Disabled,
            ..MotionConfig::default()
        };
        assert!(source_from_config(&config).unwrap().is_none());

        let config = MotionConfig {
            enabled: false,
            ..MotionConfig::default()
        };
        assert!(source_from_config(&config).unwrap().is_none());
    }
}
