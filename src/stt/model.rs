//! Whisper GGML model lookup.
//!
//! `voice.model` in the settings is either a catalog id (`"base.en"`) or a
//! path to a `.bin` file.  Catalog ids resolve to `ggml-<id>.bin` inside
//! [`AppPaths::models_dir`](crate::config::AppPaths).

use std::path::{Path, PathBuf};

/// Known English-capable models, smallest first.
pub const KNOWN_MODELS: &[(&str, u64)] = &[
    ("tiny.en", 75),
    ("base.en", 142),
    ("small.en", 466),
    ("medium.en", 1_500),
];

/// Where to fetch GGML files from.
pub const MODEL_SOURCE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp";

/// Resolve `model` against `models_dir`.
///
/// ```
/// use std::path::Path;
/// use sos_alert::stt::resolve_model_path;
///
/// let p = resolve_model_path(Path::new("/data/models"), "base.en");
/// assert_eq!(p, Path::new("/data/models/ggml-base.en.bin"));
/// ```
pub fn resolve_model_path(models_dir: &Path, model: &str) -> PathBuf {
    let as_path = Path::new(model);
    if as_path.extension().is_some_and(|ext| ext == "bin") || as_path.components().count() > 1 {
        return as_path.to_path_buf();
    }
    models_dir.join(format!("ggml-{model}.bin"))
}

/// Approximate download size in MB for a catalog id.
pub fn model_size_mb(model: &str) -> Option<u64> {
    KNOWN_MODELS
        .iter()
        .find(|(id, _)| *id == model)
        .map(|(_, mb)| *mb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_bin_path_is_used_as_is() {
        let p = resolve_model_path(Path::new("/m"), "/opt/whisper/custom.bin");
        assert_eq!(p, Path::new("/opt/whisper/custom.bin"));
    }

    #[test]
    fn relative_path_with_directory_is_used_as_is() {
        let p = resolve_model_path(Path::new("/m"), "models/ggml-tiny.en.bin");
        assert_eq!(p, Path::new("models/ggml-tiny.en.bin"));
    }

    #[test]
    fn catalog_id_resolves_into_models_dir() {
        let p = resolve_model_path(Path::new("/m"), "tiny.en");
        assert_eq!(p, Path::new("/m/ggml-tiny.en.bin"));
    }

    #[test]
    fn catalog_sizes() {
        assert_eq!(model_size_mb("base.en"), Some(142));
        assert_eq!(model_size_mb("huge"), None);
    }
}
