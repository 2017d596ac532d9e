//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings, contacts, service status):
//!   Windows: %APPDATA%\sos-alert\
//!   macOS:   ~/Library/Application Support/sos-alert/
//!   Linux:   ~/.config/sos-alert/
//!
//! Data dir (evidence recordings, speech models):
//!   Windows: %LOCALAPPDATA%\sos-alert\
//!   macOS:   ~/Library/Application Support/sos-alert/
//!   Linux:   ~/.local/share/sos-alert/

use std::path::{Path, PathBuf};

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`, `contacts.json` and the status flag.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to `contacts.json`.
    pub contacts_file: PathBuf,
    /// Full path to `service-status.toml`.
    pub status_file: PathBuf,
    /// Directory that receives `SOS_Recording_*.wav` evidence files.
    pub recordings_dir: PathBuf,
    /// Directory for downloaded GGML model files.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "sos-alert";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self::with_roots(config_dir, data_dir)
    }

    /// Lay out the standard file names under explicit roots.
    pub fn with_roots(config_dir: impl AsRef<Path>, data_dir: impl AsRef<Path>) -> Self {
        let config_dir = config_dir.as_ref().to_path_buf();
        let data_dir = data_dir.as_ref();

        Self {
            settings_file: config_dir.join("settings.toml"),
            contacts_file: config_dir.join("contacts.json"),
            status_file: config_dir.join("service-status.toml"),
            recordings_dir: data_dir.join("Recordings"),
            models_dir: data_dir.join("models"),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.recordings_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths
            .contacts_file
            .file_name()
            .is_some_and(|n| n == "contacts.json"));
    }

    #[test]
    fn with_roots_places_files_under_roots() {
        let paths = AppPaths::with_roots("/tmp/cfg", "/tmp/data");
        assert_eq!(paths.status_file, PathBuf::from("/tmp/cfg/service-status.toml"));
        assert_eq!(paths.recordings_dir, PathBuf::from("/tmp/data/Recordings"));
        assert_eq!(paths.models_dir, PathBuf::from("/tmp/data/models"));
    }
}
