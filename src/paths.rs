//! Output path derivation for batch rows.

use std::path::{Path, PathBuf};

use crate::error::InputError;

/// Extension used when a destination hint has none.
pub const DEFAULT_EXTENSION: &str = "mp3";

/// Audio containers accepted as output.
pub const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "m4a", "wav", "ogg", "flac"];

/// Turn a raw destination hint from an input row into an output path.
///
/// An empty hint becomes `output_dir/audio_0001.mp3` (numbered by ordinal).
/// Otherwise one leading `/` is stripped so absolute-looking hints stay
/// relative to the working directory, and the hint's stem and extension are
/// kept, defaulting the extension to `.mp3`.
pub fn derive_destination(hint: &str, ordinal: usize, output_dir: &Path) -> PathBuf {
    let hint = hint.trim();
    if hint.is_empty() {
        return output_dir.join(format!("audio_{ordinal:04}.{DEFAULT_EXTENSION}"));
    }

    let relative = Path::new(hint.strip_prefix('/').unwrap_or(hint));
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("audio_{ordinal:04}"));
    let extension = relative
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    let dir = relative.parent().unwrap_or_else(|| Path::new(""));
    Path::new(".").join(dir).join(format!("{stem}.{extension}"))
}

/// Check that `path` names a file with a supported audio extension.
pub fn validate_output_path(path: &Path) -> Result<(), InputError> {
    let invalid = |reason: &str| InputError::OutputPath {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    match path.file_name().and_then(|n| n.to_str()) {
        None | Some("") | Some(".") | Some("..") => return Err(invalid("not a file name")),
        Some(_) => {}
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(invalid(&format!(
            "unsupported audio format, use one of: {}",
            AUDIO_EXTENSIONS.join(", ")
        )));
    }
    Ok(())
}

/// Return `path` if free, otherwise the first `stem_NNN.ext` sibling that is.
pub fn unique_destination(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    (1..)
        .map(|n| parent.join(format!("{stem}_{n:03}{suffix}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}
