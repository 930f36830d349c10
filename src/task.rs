use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::TaskFailure;

/// Maximum number of characters kept in an outcome's text preview.
pub const PREVIEW_CHARS: usize = 50;

/// One text-to-audio conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUnit {
    text: String,
    destination: PathBuf,
    ordinal: usize,
}

impl TaskUnit {
    pub fn new(text: impl Into<String>, destination: impl Into<PathBuf>, ordinal: usize) -> Self {
        Self {
            text: text.into(),
            destination: destination.into(),
            ordinal,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Caller-assigned position, unique within a batch. Results are matched
    /// back to tasks by ordinal, never by completion order.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

/// Final record of one task. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    ordinal: usize,
    destination: PathBuf,
    succeeded: bool,
    text_preview: String,
    error: String,
}

impl Outcome {
    pub fn success(task: &TaskUnit) -> Self {
        Self {
            ordinal: task.ordinal,
            destination: task.destination.clone(),
            succeeded: true,
            text_preview: text_preview(&task.text),
            error: String::new(),
        }
    }

    pub fn failure(task: &TaskUnit, reason: &TaskFailure) -> Self {
        Self {
            ordinal: task.ordinal,
            destination: task.destination.clone(),
            succeeded: false,
            text_preview: text_preview(&task.text),
            error: reason.to_string(),
        }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn text_preview(&self) -> &str {
        &self.text_preview
    }

    /// Empty when the task succeeded.
    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn is_cancelled(&self) -> bool {
        !self.succeeded && self.error == TaskFailure::Cancelled.to_string()
    }
}

/// First [`PREVIEW_CHARS`] characters of `text`, with `...` appended when cut.
pub fn text_preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_not_truncated() {
        assert_eq!(text_preview("Hello"), "Hello");
        let exact = "a".repeat(PREVIEW_CHARS);
        assert_eq!(text_preview(&exact), exact);
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let long = "晓".repeat(60);
        let preview = text_preview(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn success_has_empty_error() {
        let task = TaskUnit::new("Hello", "out/a.mp3", 7);
        let outcome = Outcome::success(&task);
        assert!(outcome.succeeded());
        assert_eq!(outcome.error(), "");
        assert_eq!(outcome.ordinal(), 7);
        assert_eq!(outcome.destination(), Path::new("out/a.mp3"));
    }

    #[test]
    fn failure_carries_reason_text() {
        let task = TaskUnit::new("Hello", "a.mp3", 1);
        let outcome = Outcome::failure(&task, &TaskFailure::Exhausted("timeout".into()));
        assert!(!outcome.succeeded());
        assert_eq!(outcome.error(), "all voices failed, last error: timeout");
        assert!(!outcome.is_cancelled());
        assert!(Outcome::failure(&task, &TaskFailure::Cancelled).is_cancelled());
    }
}
