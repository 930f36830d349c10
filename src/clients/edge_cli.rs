//! Edge TTS client backed by the `edge-tts` command-line tool.
//!
//! # System Requirements
//!
//! The `edge-tts` executable must be installed and reachable:
//!
//! ```bash
//! pip install edge-tts
//! ```
//!
//! The tool talks to Microsoft's online speech service, so every call needs
//! network access.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tts_batch::{clients::edge_cli::EdgeTtsCli, ProsodyParameters, SynthesisClient};
//!
//! # async fn demo() -> Result<(), tts_batch::SynthesisError> {
//! let client = EdgeTtsCli::new();
//! client
//!     .synthesize_to_file(
//!         "你好",
//!         &"zh-CN-XiaoxiaoNeural".into(),
//!         &ProsodyParameters::default(),
//!         Path::new("out/hello.mp3"),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::SynthesisError;
use crate::prosody::ProsodyParameters;
use crate::voice::VoiceIdentity;
use crate::SynthesisClient;

const DEFAULT_BINARY: &str = "edge-tts";

/// Runs `edge-tts` once per synthesis call.
///
/// Audio is written to a staging file beside the destination and renamed
/// into place only when the tool exits cleanly with non-empty output.
#[derive(Debug, Clone, Default)]
pub struct EdgeTtsCli {
    bin_path: Option<PathBuf>,
}

impl EdgeTtsCli {
    /// Use `edge-tts` from PATH.
    pub fn new() -> Self {
        Self { bin_path: None }
    }

    /// Use an explicit `edge-tts` executable, e.g. one bundled with the app.
    pub fn with_binary(bin_path: impl Into<PathBuf>) -> Self {
        Self {
            bin_path: Some(bin_path.into()),
        }
    }

    fn binary(&self) -> PathBuf {
        self.bin_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY))
    }
}

/// Command-line arguments for one call.
///
/// Values are attached with `=` so negative rates are not read as flags.
fn build_args(
    text: &str,
    voice: &VoiceIdentity,
    prosody: &ProsodyParameters,
    media_path: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        format!("--voice={voice}").into(),
        format!("--rate={}", prosody.rate).into(),
        format!("--volume={}", prosody.volume).into(),
    ];
    if let Some(pitch) = prosody.pitch {
        args.push(format!("--pitch={:+}Hz", pitch.hz_offset()).into());
    }
    args.push("--text".into());
    args.push(text.into());
    args.push("--write-media".into());
    args.push(media_path.as_os_str().to_owned());
    args
}

/// Last non-empty stderr line, which is where `edge-tts` puts the reason.
fn failure_reason(stderr: &[u8], status: std::process::ExitStatus) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("edge-tts exited with {status}"))
}

impl SynthesisClient for EdgeTtsCli {
    async fn synthesize_to_file(
        &self,
        text: &str,
        voice: &VoiceIdentity,
        prosody: &ProsodyParameters,
        destination: &Path,
    ) -> Result<(), SynthesisError> {
        let dir = match destination.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let suffix = destination
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let staging = tempfile::Builder::new()
            .prefix(".tts-")
            .suffix(&suffix)
            .tempfile_in(dir)?;

        let binary = self.binary();
        log::debug!(
            "Running {} for {} with voice {}",
            binary.display(),
            destination.display(),
            voice
        );

        let output = tokio::process::Command::new(&binary)
            .args(build_args(text, voice, prosody, staging.path()))
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    SynthesisError::BinaryNotFound(binary.display().to_string())
                }
                _ => SynthesisError::Io(e),
            })?;

        if !output.status.success() {
            return Err(SynthesisError::ServiceFailed(failure_reason(
                &output.stderr,
                output.status,
            )));
        }

        let written = tokio::fs::metadata(staging.path()).await?.len();
        if written == 0 {
            return Err(SynthesisError::ServiceFailed(
                "service returned no audio".to_string(),
            ));
        }

        staging
            .persist(destination)
            .map_err(|e| SynthesisError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prosody::Pitch;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn builds_arguments_without_pitch() {
        let prosody = ProsodyParameters::parse("-22%", "+50%", "default").unwrap();
        let args = build_args(
            "你好",
            &"zh-CN-YunxiNeural".into(),
            &prosody,
            Path::new("out/.tts-1.mp3"),
        );
        assert_eq!(
            strings(args),
            vec![
                "--voice=zh-CN-YunxiNeural",
                "--rate=-22%",
                "--volume=+50%",
                "--text",
                "你好",
                "--write-media",
                "out/.tts-1.mp3",
            ]
        );
    }

    #[test]
    fn maps_pitch_to_hz_offset() {
        let prosody = ProsodyParameters {
            pitch: Some(Pitch::Low),
            ..Default::default()
        };
        let args = strings(build_args("hi", &"v".into(), &prosody, Path::new("a.mp3")));
        assert!(args.contains(&"--pitch=-25Hz".to_string()));

        let prosody = ProsodyParameters {
            pitch: Some(Pitch::Medium),
            ..Default::default()
        };
        let args = strings(build_args("hi", &"v".into(), &prosody, Path::new("a.mp3")));
        assert!(args.contains(&"--pitch=+0Hz".to_string()));
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let client = EdgeTtsCli::with_binary(dir.path().join("no-such-edge-tts"));
        let dest = dir.path().join("a.mp3");

        let result = client
            .synthesize_to_file("hi", &"v".into(), &ProsodyParameters::default(), &dest)
            .await;

        assert!(matches!(result, Err(SynthesisError::BinaryNotFound(_))));
        assert!(!dest.exists());
    }
}
