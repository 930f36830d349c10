//! # tts-batch
//!
//! A Rust library for turning lists of texts into audio files through a
//! network speech service, with per-item voice fallback, a concurrency cap,
//! cooperative cancellation and a persisted outcome report.
//!
//! ## Features
//!
//! - **Bounded batch engine**: at most `concurrency_limit` synthesis calls in flight
//! - **Voice fallback**: each task retries across a ranked pool of voices
//! - **Complete accounting**: exactly one [`Outcome`] per task, even on internal faults
//! - **Markdown ledger**: counts plus one row per outcome
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! tts-batch = { version = "0.1", features = ["edge-cli"] }
//! ```
//!
//! ```ignore
//! use tts_batch::{clients::edge_cli::EdgeTtsCli, BatchEngine, EngineConfig, TaskUnit};
//!
//! let engine = BatchEngine::new(EdgeTtsCli::new(), EngineConfig::default());
//! let tasks = vec![
//!     TaskUnit::new("你好", "out/hello.mp3", 1),
//!     TaskUnit::new("再见", "out/bye.mp3", 2),
//! ];
//! let outcomes = engine
//!     .run_with_progress(tasks, 5, |done, total, outcome| {
//!         println!("{done}/{total} {}", outcome.destination().display());
//!     })
//!     .await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cancel;
pub mod clients;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod ledger;
pub mod paths;
pub mod prosody;
pub mod synthesizer;
pub mod task;
pub mod voice;

#[cfg(test)]
pub(crate) mod test_support;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

pub use cancel::CancellationFlag;
pub use config::{AppConfig, TtsSettings};
pub use engine::{BatchEngine, EngineConfig, EngineConfigBuilder, EngineState};
pub use error::{BatchError, ConfigError, InputError, ProsodyError, SynthesisError, TaskFailure};
pub use ledger::OutcomeLedger;
pub use prosody::{Pitch, ProsodyParameters, Rate, Volume};
pub use synthesizer::Synthesizer;
pub use task::{Outcome, TaskUnit};
pub use voice::{VoiceFallbackPolicy, VoiceIdentity, VoiceSelection};

/// Common interface for speech services that render text into an audio file.
///
/// A call either produces a complete file at `destination` or reports a
/// failure; callers must not trust whatever a failed call left behind.
/// Implementations must be `Send + Sync` so one client can serve many
/// concurrent tasks.
pub trait SynthesisClient: Send + Sync {
    /// Synthesize `text` with the given voice and prosody into `destination`.
    fn synthesize_to_file(
        &self,
        text: &str,
        voice: &VoiceIdentity,
        prosody: &ProsodyParameters,
        destination: &Path,
    ) -> impl Future<Output = Result<(), SynthesisError>> + Send;
}

impl<C: SynthesisClient> SynthesisClient for Arc<C> {
    fn synthesize_to_file(
        &self,
        text: &str,
        voice: &VoiceIdentity,
        prosody: &ProsodyParameters,
        destination: &Path,
    ) -> impl Future<Output = Result<(), SynthesisError>> + Send {
        (**self).synthesize_to_file(text, voice, prosody, destination)
    }
}
