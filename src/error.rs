use std::path::PathBuf;

/// Failure of a single synthesis call against the speech service.
#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("Speech service failed: {0}")]
    ServiceFailed(String),
    #[error("Synthesis executable '{0}' not found on PATH")]
    BinaryNotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal reason a task did not produce audio.
///
/// The `Display` text is what ends up in [`Outcome::error`](crate::Outcome::error).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    #[error("cancelled")]
    Cancelled,
    #[error("text is empty")]
    EmptyText,
    #[error("destination is empty")]
    EmptyDestination,
    #[error("could not create output directory {}: {reason}", .dir.display())]
    Directory { dir: PathBuf, reason: String },
    #[error("all voices failed, last error: {0}")]
    Exhausted(String),
    #[error("internal fault: {0}")]
    Internal(String),
}

/// Reasons a batch cannot begin at all.
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("Concurrency limit must be at least 1")]
    InvalidConcurrency,
    #[error("Ordinal {0} appears more than once in the batch")]
    DuplicateOrdinal(usize),
    #[error("Engine is already running a batch")]
    EngineBusy,
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProsodyError {
    #[error("Rate '{0}' must look like -20% or +30%")]
    RateFormat(String),
    #[error("Rate {0}% is outside -100%..+100%")]
    RateRange(i32),
    #[error("Volume '{0}' must look like +50%")]
    VolumeFormat(String),
    #[error("Volume {0}% is outside 0%..+100%")]
    VolumeRange(i32),
    #[error("Unknown pitch '{0}'. Use x-low, low, medium, high, x-high or default")]
    UnknownPitch(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid engine configuration: {0}")]
    Engine(#[from] crate::engine::EngineConfigBuilderError),
}

#[derive(thiserror::Error, Debug)]
pub enum InputError {
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Input file is empty")]
    Empty,
    #[error("Input file is missing required column '{0}'")]
    MissingColumn(String),
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Text must not be empty")]
    EmptyText,
    #[error("Text must not be blank")]
    BlankText,
    #[error("Text is {len} characters long, the limit is {max}")]
    TextTooLong { len: usize, max: usize },
    #[error("Invalid output path {}: {reason}", .path.display())]
    OutputPath { path: PathBuf, reason: String },
}
