//! The one piece of state that survives a restart: whether the service was
//! left running.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Contents of `service-status.toml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceStatus {
    pub is_running: bool,
}

impl ServiceStatus {
    /// A missing file reads as "not running".
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Persist the flag, logging instead of failing.
    pub(crate) fn record(path: &Path, is_running: bool) {
        if let Err(e) = (Self { is_running }).save_to(path) {
            log::warn!(
                "service: could not write status to {} ({e})",
                path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_not_running() {
        let dir = tempdir().unwrap();
        let status = ServiceStatus::load_from(&dir.path().join("none.toml")).unwrap();
        assert!(!status.is_running);
    }

    #[test]
    fn flag_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("service-status.toml");

        ServiceStatus { is_running: true }.save_to(&path).unwrap();
        assert!(ServiceStatus::load_from(&path).unwrap().is_running);

        ServiceStatus::record(&path, false);
        assert!(!ServiceStatus::load_from(&path).unwrap().is_running);
    }

    #[test]
    fn garbage_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("service-status.toml");
        std::fs::write(&path, "is_running = \"maybe\"").unwrap();
        assert!(ServiceStatus::load_from(&path).is_err());
    }
}
