//! Per-task retry loop across the voice fallback pool.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::cancel::CancellationFlag;
use crate::error::TaskFailure;
use crate::prosody::ProsodyParameters;
use crate::task::{Outcome, TaskUnit};
use crate::voice::{VoiceFallbackPolicy, VoiceIdentity, VoiceSelection};
use crate::SynthesisClient;

/// One voice tried during a retry sequence.
#[derive(Debug, Clone)]
struct AttemptRecord {
    voice_tried: VoiceIdentity,
    error: Option<String>,
}

/// Wraps a [`SynthesisClient`] with the voice fallback retry loop.
pub struct Synthesizer<C> {
    client: C,
    policy: VoiceFallbackPolicy,
    prosody: ProsodyParameters,
    max_attempts: usize,
    retry_delay: Duration,
}

impl<C: SynthesisClient> Synthesizer<C> {
    pub fn new(
        client: C,
        policy: VoiceFallbackPolicy,
        prosody: ProsodyParameters,
        max_attempts: usize,
        retry_delay: Duration,
    ) -> Self {
        Self {
            client,
            policy,
            prosody,
            max_attempts,
            retry_delay,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn policy(&self) -> &VoiceFallbackPolicy {
        &self.policy
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Run one task to its final [`Outcome`].
    pub async fn process(&self, task: &TaskUnit, cancel: &CancellationFlag) -> Outcome {
        match self.synthesize(task.text(), task.destination(), cancel).await {
            Ok(()) => Outcome::success(task),
            Err(reason) => Outcome::failure(task, &reason),
        }
    }

    /// Synthesize `text` into `destination`, rotating voices until one
    /// succeeds or the pool is exhausted. The first success wins.
    pub async fn synthesize(
        &self,
        text: &str,
        destination: &Path,
        cancel: &CancellationFlag,
    ) -> Result<(), TaskFailure> {
        if cancel.is_cancelled() {
            return Err(TaskFailure::Cancelled);
        }
        if text.trim().is_empty() {
            return Err(TaskFailure::EmptyText);
        }
        if destination.as_os_str().is_empty() {
            return Err(TaskFailure::EmptyDestination);
        }

        ensure_parent_dir(destination).await?;

        let mut tried: HashSet<VoiceIdentity> = HashSet::new();
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut last_error = String::new();

        for attempt in 0..self.max_attempts {
            if cancel.is_cancelled() {
                return Err(TaskFailure::Cancelled);
            }

            let voice = match self.policy.select(attempt, &tried) {
                VoiceSelection::Voice(voice) => voice,
                VoiceSelection::Skip => continue,
                VoiceSelection::Exhausted => break,
            };
            if !tried.insert(voice.clone()) {
                continue;
            }

            log::debug!(
                "Attempt {} for {} with voice {}",
                attempt,
                destination.display(),
                voice
            );

            match self
                .client
                .synthesize_to_file(text, voice, &self.prosody, destination)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => {
                    let message = e.to_string();
                    log::warn!(
                        "Voice {} failed for {}: {}",
                        voice,
                        destination.display(),
                        message
                    );
                    attempts.push(AttemptRecord {
                        voice_tried: voice.clone(),
                        error: Some(message.clone()),
                    });
                    last_error = message;
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        log::warn!(
            "All voices failed for {} after {} attempt(s): {}",
            destination.display(),
            attempts.len(),
            attempts
                .iter()
                .map(|a| format!(
                    "{} ({})",
                    a.voice_tried,
                    a.error.as_deref().unwrap_or("no error")
                ))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Err(TaskFailure::Exhausted(last_error))
    }
}

/// Create the destination's parent directory. Already existing is fine.
async fn ensure_parent_dir(destination: &Path) -> Result<(), TaskFailure> {
    match destination.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| TaskFailure::Directory {
                dir: dir.to_path_buf(),
                reason: e.to_string(),
            }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{synthesizer, FakeClient};

    #[tokio::test]
    async fn first_success_wins() {
        let dir = tempfile::tempdir().unwrap();
        let synth = synthesizer(FakeClient::new(), "A", &["B", "C", "D"]);
        let dest = dir.path().join("a.mp3");

        let result = synth.synthesize("Hello", &dest, &CancellationFlag::new()).await;

        assert_eq!(result, Ok(()));
        assert_eq!(synth.client().voices_called(), vec!["A"]);
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn falls_back_in_order_and_stops_at_success() {
        let dir = tempfile::tempdir().unwrap();
        let synth = synthesizer(FakeClient::new().failing(&["A", "B"]), "A", &["B", "C", "D"]);

        let outcome = synth
            .process(
                &TaskUnit::new("Hello", dir.path().join("a.mp3"), 1),
                &CancellationFlag::new(),
            )
            .await;

        assert!(outcome.succeeded());
        assert_eq!(synth.client().voices_called(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn exhaustion_reports_last_error() {
        let dir = tempfile::tempdir().unwrap();
        let synth = synthesizer(
            FakeClient::new().failing(&["A", "B", "C", "D"]),
            "A",
            &["B", "C", "D"],
        );

        let result = synth
            .synthesize("Hello", &dir.path().join("a.mp3"), &CancellationFlag::new())
            .await;

        let Err(TaskFailure::Exhausted(message)) = result else {
            panic!("expected exhaustion, got {result:?}");
        };
        assert!(message.contains("voice D unavailable"), "{message}");
        assert_eq!(synth.client().voices_called(), vec!["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn primary_in_fallback_list_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let synth = synthesizer(
            FakeClient::new().failing(&["A", "B", "C"]),
            "A",
            &["A", "B", "C"],
        );

        let result = synth
            .synthesize("Hello", &dir.path().join("a.mp3"), &CancellationFlag::new())
            .await;

        assert!(matches!(result, Err(TaskFailure::Exhausted(_))));
        assert_eq!(synth.client().voices_called(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn attempt_cap_limits_calls() {
        let dir = tempfile::tempdir().unwrap();
        let mut synth = synthesizer(
            FakeClient::new().failing(&["A", "B", "C", "D"]),
            "A",
            &["B", "C", "D"],
        );
        synth.max_attempts = 2;

        let result = synth
            .synthesize("Hello", &dir.path().join("a.mp3"), &CancellationFlag::new())
            .await;

        assert!(matches!(result, Err(TaskFailure::Exhausted(_))));
        assert_eq!(synth.client().voices_called(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn cancelled_before_start_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let synth = synthesizer(FakeClient::new(), "A", &["B"]);
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let result = synth
            .synthesize("Hello", &dir.path().join("a.mp3"), &cancel)
            .await;

        assert_eq!(result, Err(TaskFailure::Cancelled));
        assert_eq!(synth.client().call_count(), 0);
    }

    #[tokio::test]
    async fn cancel_between_attempts_stops_retrying() {
        let dir = tempfile::tempdir().unwrap();
        let policy = VoiceFallbackPolicy::new("A".into(), vec!["B".into()]);
        let synth = Synthesizer::new(
            FakeClient::new().failing(&["A"]),
            policy,
            ProsodyParameters::default(),
            2,
            Duration::from_millis(100),
        );
        let cancel = CancellationFlag::new();
        let trigger = cancel.clone();
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = synth
            .synthesize("Hello", &dir.path().join("a.mp3"), &cancel)
            .await;
        canceller.await.unwrap();

        assert_eq!(result, Err(TaskFailure::Cancelled));
        assert_eq!(synth.client().voices_called(), vec!["A"]);
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_calls() {
        let dir = tempfile::tempdir().unwrap();
        let synth = synthesizer(FakeClient::new(), "A", &["B"]);

        let result = synth
            .synthesize("   ", &dir.path().join("a.mp3"), &CancellationFlag::new())
            .await;

        assert_eq!(result, Err(TaskFailure::EmptyText));
        assert_eq!(synth.client().call_count(), 0);
    }

    #[tokio::test]
    async fn shared_parent_directory_is_created_once_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let synth = synthesizer(FakeClient::new(), "A", &["B"]);
        let cancel = CancellationFlag::new();
        let nested = dir.path().join("nested").join("deeper");

        let first = synth.synthesize("one", &nested.join("1.mp3"), &cancel).await;
        let second = synth.synthesize("two", &nested.join("2.mp3"), &cancel).await;

        assert_eq!(first, Ok(()));
        assert_eq!(second, Ok(()));
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn directory_failure_becomes_task_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let synth = synthesizer(FakeClient::new(), "A", &["B"]);

        let result = synth
            .synthesize("Hello", &blocker.join("a.mp3"), &CancellationFlag::new())
            .await;

        assert!(matches!(result, Err(TaskFailure::Directory { .. })));
        assert_eq!(synth.client().call_count(), 0);
    }
}
