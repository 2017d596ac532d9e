//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every struct is `#[serde(default)]`, so a hand-edited `settings.toml` only
//! needs the keys it wants to override.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Message body used when the user has not configured their own.
pub const DEFAULT_ALERT_MESSAGE: &str =
    "I am in DANGER, I need help. Please urgently reach me out.";

// ---------------------------------------------------------------------------
// AlertConfig
// ---------------------------------------------------------------------------

/// Timing and content of the alert response sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum seconds between the starts of two accepted alert sessions.
    pub cooldown_secs: f64,
    /// Length of the evidence recording in seconds.
    pub recording_secs: f64,
    /// Custom message body.  `None` uses [`DEFAULT_ALERT_MESSAGE`].
    pub message: Option<String>,
    /// Emit a haptic/audible pulse when an alert is accepted.
    pub haptics: bool,
}

/// Default [`AlertConfig::cooldown_secs`].
pub const DEFAULT_COOLDOWN_SECS: f64 = 20.0;
/// Default [`AlertConfig::recording_secs`].
pub const DEFAULT_RECORDING_SECS: f64 = 40.0;

/// Seconds from the settings file as a `Duration`.  Negative values clamp to
/// zero; infinite or out-of-range values fall back to `default`.
fn secs_or_default(name: &str, secs: f64, default: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or_else(|_| {
        log::warn!("config: {name} = {secs} is out of range; using {default}");
        Duration::from_secs_f64(default)
    })
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        secs_or_default("cooldown_secs", self.cooldown_secs, DEFAULT_COOLDOWN_SECS)
    }

    pub fn recording_duration(&self) -> Duration {
        secs_or_default("recording_secs", self.recording_secs, DEFAULT_RECORDING_SECS)
    }

    /// The configured message, or the default when unset or blank.
    pub fn message_text(&self) -> &str {
        match self.message.as_deref() {
            Some(msg) if !msg.trim().is_empty() => msg,
            _ => DEFAULT_ALERT_MESSAGE,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            recording_secs: DEFAULT_RECORDING_SECS,
            message: None,
            haptics: true,
        }
    }
}

// ---------------------------------------------------------------------------
// MotionConfig
// ---------------------------------------------------------------------------

/// Where accelerometer samples come from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MotionSourceKind {
    /// Linux Industrial-I/O accelerometer exposed under sysfs.
    Iio,
    /// `x y z` lines (m/s²) on standard input, e.g. piped from a sensor daemon.
    Stdin,
    /// Shake detection is off.
    Disabled,
}

impl Default for MotionSourceKind {
    fn default() -> Self {
        Self::Iio
    }
}

/// Settings for the shake trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub enabled: bool,
    /// Normalised acceleration (in g) above which a sample counts as a shake.
    pub threshold_g: f64,
    pub source: MotionSourceKind,
    /// IIO device directory (only used with [`MotionSourceKind::Iio`]).
    pub iio_device: PathBuf,
    /// Sampling interval for polled sources in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_g: 3.0,
            source: MotionSourceKind::default(),
            iio_device: PathBuf::from("/sys/bus/iio/devices/iio:device0"),
            poll_interval_ms: 200,
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

/// Settings for the spoken activation-phrase trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub enabled: bool,
    /// Phrase matched case-insensitively anywhere in a transcript.
    pub activation_phrase: String,
    /// GGML model name / file stem under the models directory.
    pub model: String,
    /// ISO-639-1 language code, or `"auto"`.
    pub language: String,
    /// Seconds of captured speech between partial transcripts.
    pub window_secs: f32,
    /// Utterance length in seconds after which a final transcript is emitted
    /// and the recognizer starts a fresh utterance.
    pub utterance_secs: f32,
    /// RMS threshold below which a window is treated as silence and skipped.
    pub vad_threshold: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            activation_phrase: "help me".into(),
            model: "base.en".into(),
            language: "en".into(),
            window_secs: 3.0,
            utterance_secs: 8.0,
            vad_threshold: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// LocationConfig
// ---------------------------------------------------------------------------

/// Which location backend answers the single-shot lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LocationProviderKind {
    /// HTTP geolocation endpoint returning JSON coordinates.
    Http,
    /// Static coordinates from [`LocationConfig::fixed`].
    Fixed,
    /// Always report the location as unavailable.
    Disabled,
}

impl Default for LocationProviderKind {
    fn default() -> Self {
        Self::Http
    }
}

/// Accuracy/power trade-off requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationPriority {
    HighAccuracy,
    Balanced,
    LowPower,
}

impl Default for LocationPriority {
    fn default() -> Self {
        Self::HighAccuracy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub provider: LocationProviderKind,
    /// Endpoint queried by the HTTP provider.
    pub url: String,
    /// Upper bound for one lookup, in seconds.
    pub timeout_secs: u64,
    /// `(latitude, longitude)` for the fixed provider.
    pub fixed: Option<(f64, f64)>,
    pub priority: LocationPriority,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            provider: LocationProviderKind::default(),
            url: "http://ip-api.com/json".into(),
            timeout_secs: 10,
            fixed: None,
            priority: LocationPriority::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// NotifyConfig
// ---------------------------------------------------------------------------

/// Which transport delivers the text messages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NotifyProviderKind {
    /// POST each message as JSON to an SMS gateway webhook.
    Webhook,
    /// Only write the messages to the log (dry run).
    Log,
}

impl Default for NotifyProviderKind {
    fn default() -> Self {
        Self::Log
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub provider: NotifyProviderKind,
    /// Gateway endpoint for the webhook provider.
    pub url: String,
    /// Bearer token, or `None` for gateways that need no authentication.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            provider: NotifyProviderKind::default(),
            url: "http://localhost:8080/sms".into(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Capture ambient audio as evidence after notifying contacts.
    pub enabled: bool,
    /// Override for the recordings directory.  `None` uses
    /// [`AppPaths::recordings_dir`].
    pub dir: Option<PathBuf>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use sos_alert::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub alert: AlertConfig,
    pub motion: MotionConfig,
    pub voice: VoiceConfig,
    pub location: LocationConfig,
    pub notify: NotifyConfig,
    pub recording: RecordingConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory that receives evidence recordings.
    pub fn recordings_dir(&self, paths: &AppPaths) -> PathBuf {
        self.recording
            .dir
            .clone()
            .unwrap_or_else(|| paths.recordings_dir.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.alert.cooldown_secs, 20.0);
        assert_eq!(config.voice.activation_phrase, "help me");
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.alert.cooldown(), Duration::from_secs(20));
        assert_eq!(cfg.alert.recording_duration(), Duration::from_secs(40));
        assert!(cfg.alert.message.is_none());
        assert_eq!(cfg.motion.threshold_g, 3.0);
        assert_eq!(cfg.motion.source, MotionSourceKind::Iio);
        assert_eq!(cfg.location.priority, LocationPriority::HighAccuracy);
        assert_eq!(cfg.notify.provider, NotifyProviderKind::Log);
        assert!(cfg.recording.enabled);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.alert.message = Some("Call me now".into());
        cfg.alert.cooldown_secs = 30.0;
        cfg.motion.source = MotionSourceKind::Stdin;
        cfg.location.provider = LocationProviderKind::Fixed;
        cfg.location.fixed = Some((12.34, 56.78));
        cfg.notify.provider = NotifyProviderKind::Webhook;
        cfg.notify.api_key = Some("token".into());
        cfg.recording.dir = Some(PathBuf::from("/tmp/evidence"));

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.alert.message.as_deref(), Some("Call me now"));
        assert_eq!(loaded.alert.cooldown_secs, 30.0);
        assert_eq!(loaded.motion.source, MotionSourceKind::Stdin);
        assert_eq!(loaded.location.provider, LocationProviderKind::Fixed);
        assert_eq!(loaded.location.fixed, Some((12.34, 56.78)));
        assert_eq!(loaded.notify.provider, NotifyProviderKind::Webhook);
        assert_eq!(loaded.notify.api_key.as_deref(), Some("token"));
        assert_eq!(loaded.recording.dir, Some(PathBuf::from("/tmp/evidence")));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[alert]\nrecording_secs = 5.0\n").expect("write");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.alert.recording_secs, 5.0);
        assert_eq!(loaded.alert.cooldown_secs, 20.0);
        assert_eq!(loaded.voice.model, "base.en");
    }

    #[test]
    fn blank_message_falls_back_to_default() {
        let mut alert = AlertConfig::default();
        assert_eq!(alert.message_text(), DEFAULT_ALERT_MESSAGE);

        alert.message = Some("   ".into());
        assert_eq!(alert.message_text(), DEFAULT_ALERT_MESSAGE);

        alert.message = Some("Come quickly".into());
        assert_eq!(alert.message_text(), "Come quickly");
    }

    #[test]
    fn recordings_dir_prefers_override() {
        let paths = AppPaths::with_roots("/cfg", "/data");
        let mut cfg = AppConfig::default();
        assert_eq!(cfg.recordings_dir(&paths), PathBuf::from("/data/Recordings"));

        cfg.recording.dir = Some(PathBuf::from("/elsewhere"));
        assert_eq!(cfg.recordings_dir(&paths), PathBuf::from("/elsewhere"));
    }

    #[test]
    fn out_of_range_durations_fall_back_to_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("extreme.toml");
        std::fs::write(
            &path,
            "[alert]\ncooldown_secs = inf\nrecording_secs = 1e20\n",
        )
        .expect("write");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert!(loaded.alert.cooldown_secs.is_infinite());
        assert_eq!(loaded.alert.cooldown(), Duration::from_secs(20));
        assert_eq!(loaded.alert.recording_duration(), Duration::from_secs(40));

        let mut alert = AlertConfig::default();
        alert.cooldown_secs = -5.0;
        alert.recording_secs = f64::NAN;
        assert_eq!(alert.cooldown(), Duration::ZERO);
        assert_eq!(alert.recording_duration(), Duration::ZERO);
    }
}
