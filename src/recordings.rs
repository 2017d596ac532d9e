//! Evidence files on disk.
//!
//! Every session records to a fresh `SOS_Recording_<yyyyMMdd_HHmmss>.wav`
//! in the recordings directory.  Two sessions inside the same second get a
//! numeric suffix so a file is never overwritten.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

pub const RECORDING_PREFIX: &str = "SOS_Recording_";
pub const RECORDING_EXTENSION: &str = "wav";

/// `SOS_Recording_20240131_235959.wav` for the given local time.
pub fn recording_file_name(at: DateTime<Local>) -> String {
    format!(
        "{RECORDING_PREFIX}{}.{RECORDING_EXTENSION}",
        at.format("%Y%m%d_%H%M%S")
    )
}

/// A path in `dir` that does not exist yet, named after `at`.
pub fn unique_recording_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    let candidate = dir.join(recording_file_name(at));
    if !candidate.exists() {
        return candidate;
    }

    let stem = format!("{RECORDING_PREFIX}{}", at.format("%Y%m%d_%H%M%S"));
    (1..)
        .map(|n| dir.join(format!("{stem}_{n}.{RECORDING_EXTENSION}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// [`unique_recording_path`] for the current local time.
pub fn new_recording_path(dir: &Path) -> PathBuf {
    unique_recording_path(dir, Local::now())
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecordingEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size_bytes: u64,
}

impl RecordingEntry {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn modified_local(&self) -> DateTime<Local> {
        DateTime::<Local>::from(self.modified)
    }
}

/// Files in `dir`, newest first.  A missing directory has no recordings.
pub fn list_recordings(dir: &Path) -> io::Result<Vec<RecordingEntry>> {
    let read = match std::fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut entries = Vec::new();
    for entry in read {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        entries.push(RecordingEntry {
            path: entry.path(),
            modified: meta.modified()?,
            size_bytes: meta.len(),
        });
    }

    entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 31, h, m, s).unwrap()
    }

    #[test]
    fn file_name_is_timestamped() {
        assert_eq!(
            recording_file_name(at(23, 59, 7)),
            "SOS_Recording_20240131_235907.wav"
        );
    }

    #[test]
    fn same_second_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_recording_path(dir.path(), at(10, 0, 0));
        std::fs::write(&first, b"x").unwrap();

        let second = unique_recording_path(dir.path(), at(10, 0, 0));
        assert_ne!(first, second);
        assert!(second.ends_with("SOS_Recording_20240131_100000_1.wav"));
    }

    #[test]
    fn missing_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let listed = list_recordings(&dir.path().join("nope")).unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn listing_is_newest_first_and_skips_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("SOS_Recording_20240101_000000.wav");
        let new = dir.path().join("SOS_Recording_20240102_000000.wav");
        std::fs::write(&old, b"old").unwrap();
        std::fs::write(&new, b"newer").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let past = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let listed = list_recordings(dir.path()).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].path, new);
        assert_eq!(listed[1].path, old);
        assert_eq!(listed[0].size_bytes, 5);
        assert_eq!(listed[1].file_name(), "SOS_Recording_20240101_000000.wav");
    }
}
