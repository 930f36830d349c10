//! Scripted in-memory synthesis client for tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::prosody::ProsodyParameters;
use crate::synthesizer::Synthesizer;
use crate::voice::{VoiceFallbackPolicy, VoiceIdentity};
use crate::{SynthesisClient, SynthesisError};

#[derive(Default)]
pub struct FakeClient {
    failing: HashSet<String>,
    delay: Duration,
    panic_on: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call with one of these voices fails.
    pub fn failing(mut self, voices: &[&str]) -> Self {
        self.failing = voices.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Hold each call open for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Panic when asked to synthesize exactly this text.
    pub fn panicking_on(mut self, text: &str) -> Self {
        self.panic_on = Some(text.to_string());
        self
    }

    pub fn voices_called(&self) -> Vec<String> {
        self.lock_calls().iter().map(|(voice, _)| voice.clone()).collect()
    }

    pub fn texts_called(&self) -> Vec<String> {
        self.lock_calls().iter().map(|(_, text)| text.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    /// Highest number of calls observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<(String, String)>> {
        self.calls.lock().unwrap()
    }
}

impl SynthesisClient for FakeClient {
    async fn synthesize_to_file(
        &self,
        text: &str,
        voice: &VoiceIdentity,
        _prosody: &ProsodyParameters,
        destination: &Path,
    ) -> Result<(), SynthesisError> {
        if self.panic_on.as_deref() == Some(text) {
            panic!("client blew up on {text}");
        }

        self.lock_calls()
            .push((voice.as_str().to_string(), text.to_string()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let in_flight = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        drop(in_flight);

        if self.failing.contains(voice.as_str()) {
            return Err(SynthesisError::ServiceFailed(format!(
                "voice {voice} unavailable"
            )));
        }
        tokio::fs::write(destination, b"ID3").await?;
        Ok(())
    }
}

/// Decrements the in-flight count even when the call is aborted mid-way.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Synthesizer over `client` with no retry delay.
pub fn synthesizer<C: SynthesisClient>(
    client: C,
    primary: &str,
    fallbacks: &[&str],
) -> Synthesizer<C> {
    let policy = VoiceFallbackPolicy::new(
        primary.into(),
        fallbacks.iter().copied().map(VoiceIdentity::from).collect(),
    );
    let max_attempts = policy.attempts_to_cover_all();
    Synthesizer::new(
        client,
        policy,
        ProsodyParameters::default(),
        max_attempts,
        Duration::ZERO,
    )
}
