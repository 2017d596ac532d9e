//! Configuration module for the SOS alert service.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform data directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AlertConfig, AppConfig, LocationConfig, LocationPriority, LocationProviderKind, MotionConfig,
    MotionSourceKind, NotifyConfig, NotifyProviderKind, RecordingConfig, VoiceConfig,
    DEFAULT_ALERT_MESSAGE, DEFAULT_COOLDOWN_SECS, DEFAULT_RECORDING_SECS,
};
