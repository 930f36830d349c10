//! Persisted application settings.
//!
//! Settings are plain JSON. Every field has a default, so a partial file
//! (or none at all) still loads:
//!
//! ```json
//! {
//!   "max_records": 500,
//!   "result_file": "result.md",
//!   "output_dir": "output_audio",
//!   "tts": { "voice": "zh-CN-YunxiNeural", "rate": "-22%", "volume": "+50%", "concurrent": 5 }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineConfig, EngineConfigBuilder};
use crate::error::ConfigError;
use crate::prosody::{Pitch, ProsodyParameters, Rate, Volume};
use crate::voice::{self, VoiceIdentity};

/// Default location of the settings file.
pub const DEFAULT_CONFIG_PATH: &str = "config/settings.json";

/// Voice and prosody settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    pub voice: VoiceIdentity,
    pub rate: Rate,
    pub volume: Volume,
    /// `default`, `x-low`, `low`, `medium`, `high` or `x-high`.
    #[serde(with = "crate::prosody::pitch_setting")]
    pub pitch: Option<Pitch>,
    /// Concurrency limit for batch runs.
    pub concurrent: usize,
    pub fallback_voices: Vec<VoiceIdentity>,
    /// `None` tries every fallback once.
    pub max_attempts: Option<usize>,
    pub retry_delay_ms: u64,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            voice: VoiceIdentity::from(voice::DEFAULT_VOICE),
            rate: Rate::new(-22).unwrap_or_default(),
            volume: Volume::new(50).unwrap_or_default(),
            pitch: None,
            concurrent: 5,
            fallback_voices: voice::default_fallback_voices(),
            max_attempts: None,
            retry_delay_ms: 500,
        }
    }
}

impl TtsSettings {
    pub fn prosody(&self) -> ProsodyParameters {
        ProsodyParameters {
            rate: self.rate,
            volume: self.volume,
            pitch: self.pitch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Upper bound on rows read from one input file.
    pub max_records: usize,
    pub result_file: PathBuf,
    pub text_column: String,
    pub path_column: String,
    pub output_dir: PathBuf,
    pub tts: TtsSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_records: 500,
            result_file: PathBuf::from("result.md"),
            text_column: "answer_text".to_string(),
            path_column: "file_path".to_string(),
            output_dir: PathBuf::from("output_audio"),
            tts: TtsSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Like [`load`](Self::load), but falls back to defaults on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            log::warn!(
                "Failed to load settings from {}: {}, using defaults",
                path.display(),
                e
            );
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Engine configuration derived from the `tts` section.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut builder = EngineConfigBuilder::default();
        builder
            .primary_voice(self.tts.voice.clone())
            .fallback_voices(self.tts.fallback_voices.clone())
            .prosody(self.tts.prosody())
            .retry_delay(Duration::from_millis(self.tts.retry_delay_ms));
        if let Some(attempts) = self.tts.max_attempts {
            builder.max_attempts(attempts);
        }
        Ok(builder.build()?)
    }
}
