//! Bounded, cancellable batch dispatcher.
//!
//! [`BatchEngine`] hands every [`TaskUnit`] to a shared [`Synthesizer`],
//! admitting at most `concurrency_limit` tasks at a time through a
//! semaphore. Tasks are dispatched in input order, complete in any order,
//! and are reported to the progress sink from a single collection loop.
//!
//! ```text
//! Idle ──run──▶ Running ──▶ Completed
//!                  │
//!                cancel
//!                  ▼
//!              Cancelled ──reset──▶ Idle
//! ```

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use derive_builder::Builder;
use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::cancel::CancellationFlag;
use crate::error::{BatchError, TaskFailure};
use crate::prosody::ProsodyParameters;
use crate::synthesizer::Synthesizer;
use crate::task::{Outcome, TaskUnit};
use crate::voice::{self, VoiceFallbackPolicy, VoiceIdentity};
use crate::SynthesisClient;

/// Default pause between failed attempts of one task.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Settings injected into a [`BatchEngine`] at construction.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Voice used for the first attempt of every task.
    #[builder(setter(into), default = "VoiceIdentity::from(voice::DEFAULT_VOICE)")]
    pub primary_voice: VoiceIdentity,
    /// Ranked voices tried after the primary fails.
    #[builder(default = "voice::default_fallback_voices()")]
    pub fallback_voices: Vec<VoiceIdentity>,
    #[builder(default)]
    pub prosody: ProsodyParameters,
    /// Attempt indices per task. `None` visits every fallback slot once.
    #[builder(setter(strip_option), default)]
    pub max_attempts: Option<usize>,
    #[builder(default = "DEFAULT_RETRY_DELAY")]
    pub retry_delay: Duration,
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(Some(0)) = self.max_attempts {
            return Err("max_attempts must be at least 1".to_string());
        }
        if let Some(voice) = &self.primary_voice {
            if voice.as_str().trim().is_empty() {
                return Err("primary_voice must not be empty".to_string());
            }
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            primary_voice: VoiceIdentity::from(voice::DEFAULT_VOICE),
            fallback_voices: voice::default_fallback_voices(),
            prosody: ProsodyParameters::default(),
            max_attempts: None,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Lifecycle of an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug)]
struct Lifecycle {
    state: EngineState,
    active: bool,
    cancel: CancellationFlag,
}

/// Converts batches of [`TaskUnit`]s into audio files.
///
/// Share it behind an [`Arc`] to call [`cancel`](Self::cancel) from another
/// task while [`run`](Self::run) is in progress.
pub struct BatchEngine<C> {
    synthesizer: Arc<Synthesizer<C>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<C: SynthesisClient + 'static> BatchEngine<C> {
    pub fn new(client: C, config: EngineConfig) -> Self {
        let policy = VoiceFallbackPolicy::new(config.primary_voice, config.fallback_voices);
        let max_attempts = config
            .max_attempts
            .unwrap_or_else(|| policy.attempts_to_cover_all());
        Self {
            synthesizer: Arc::new(Synthesizer::new(
                client,
                policy,
                config.prosody,
                max_attempts,
                config.retry_delay,
            )),
            lifecycle: Mutex::new(Lifecycle {
                state: EngineState::Idle,
                active: false,
                cancel: CancellationFlag::new(),
            }),
        }
    }

    pub fn synthesizer(&self) -> &Synthesizer<C> {
        &self.synthesizer
    }

    pub fn state(&self) -> EngineState {
        self.lock().state
    }

    /// Stop dispatching new tasks and attempts. In-flight calls finish.
    pub fn cancel(&self) {
        let mut lifecycle = self.lock();
        lifecycle.cancel.cancel();
        if lifecycle.state == EngineState::Running {
            lifecycle.state = EngineState::Cancelled;
        }
        log::info!("Cancellation requested");
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancel.is_cancelled()
    }

    /// Replace the cancellation flag with a fresh one for the next run.
    pub fn reset(&self) -> Result<(), BatchError> {
        let mut lifecycle = self.lock();
        if lifecycle.active {
            return Err(BatchError::EngineBusy);
        }
        lifecycle.cancel = CancellationFlag::new();
        lifecycle.state = EngineState::Idle;
        Ok(())
    }

    /// Run a batch without progress reporting.
    pub async fn run(
        &self,
        tasks: Vec<TaskUnit>,
        concurrency_limit: usize,
    ) -> Result<Vec<Outcome>, BatchError> {
        self.run_with_progress(tasks, concurrency_limit, |_, _, _| {})
            .await
    }

    /// Run a batch, calling `on_progress(completed, total, outcome)` once per
    /// finished task.
    ///
    /// The returned list is in input order and holds exactly one outcome per
    /// task. Completion order is unconstrained; match results by ordinal.
    pub async fn run_with_progress<F>(
        &self,
        tasks: Vec<TaskUnit>,
        concurrency_limit: usize,
        mut on_progress: F,
    ) -> Result<Vec<Outcome>, BatchError>
    where
        F: FnMut(usize, usize, &Outcome),
    {
        if concurrency_limit == 0 {
            return Err(BatchError::InvalidConcurrency);
        }
        check_unique_ordinals(&tasks)?;

        let cancel = self.begin_run()?;
        let mut guard = RunGuard {
            engine: self,
            finished: false,
        };

        let total = tasks.len();
        log::info!(
            "Starting batch of {} task(s) with concurrency {}",
            total,
            concurrency_limit
        );

        let placeholders: Vec<TaskUnit> = tasks.clone();
        let gate = Arc::new(Semaphore::new(
            concurrency_limit.min(Semaphore::MAX_PERMITS),
        ));
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Outcome)>();
        // Owned by this future: dropping the run aborts every worker.
        let mut workers = JoinSet::new();

        let dispatch = {
            let synthesizer = Arc::clone(&self.synthesizer);
            let cancel = cancel.clone();
            let workers = &mut workers;
            async move {
                for (slot, task) in tasks.into_iter().enumerate() {
                    if cancel.is_cancelled() {
                        let _ = tx.send((slot, Outcome::failure(&task, &TaskFailure::Cancelled)));
                        continue;
                    }
                    let permit = match Arc::clone(&gate).acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            let reason = TaskFailure::Internal(e.to_string());
                            let _ = tx.send((slot, Outcome::failure(&task, &reason)));
                            continue;
                        }
                    };
                    if cancel.is_cancelled() {
                        drop(permit);
                        let _ = tx.send((slot, Outcome::failure(&task, &TaskFailure::Cancelled)));
                        continue;
                    }

                    let synthesizer = Arc::clone(&synthesizer);
                    let cancel = cancel.clone();
                    let tx = tx.clone();
                    workers.spawn(async move {
                        let _permit = permit;
                        let outcome = match AssertUnwindSafe(synthesizer.process(&task, &cancel))
                            .catch_unwind()
                            .await
                        {
                            Ok(outcome) => outcome,
                            Err(panic) => {
                                let message = panic_message(&*panic);
                                log::error!(
                                    "Task {} faulted: {}",
                                    task.ordinal(),
                                    message
                                );
                                Outcome::failure(&task, &TaskFailure::Internal(message))
                            }
                        };
                        let _ = tx.send((slot, outcome));
                    });
                }
            }
        };

        let collect = async {
            let mut slots: Vec<Option<Outcome>> = (0..total).map(|_| None).collect();
            let mut completed = 0;
            while let Some((slot, outcome)) = rx.recv().await {
                completed += 1;
                on_progress(completed, total, &outcome);
                slots[slot] = Some(outcome);
            }
            (slots, completed)
        };

        let ((), (slots, mut completed)) = tokio::join!(dispatch, collect);
        while workers.join_next().await.is_some() {}

        let mut outcomes = Vec::with_capacity(total);
        for (slot, outcome) in slots.into_iter().enumerate() {
            let outcome = match outcome {
                Some(outcome) => outcome,
                None => {
                    // worker dropped without reporting, e.g. runtime shutdown
                    let reason =
                        TaskFailure::Internal("task ended without reporting an outcome".into());
                    let outcome = Outcome::failure(&placeholders[slot], &reason);
                    completed += 1;
                    on_progress(completed, total, &outcome);
                    outcome
                }
            };
            outcomes.push(outcome);
        }

        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        log::info!(
            "Batch finished: {} succeeded, {} failed",
            succeeded,
            total - succeeded
        );
        guard.finished = true;
        Ok(outcomes)
    }

    /// Run a batch to completion on a dedicated multi-threaded runtime.
    ///
    /// For synchronous callers only; blocking inside an async context panics.
    pub fn run_blocking<F>(
        &self,
        tasks: Vec<TaskUnit>,
        concurrency_limit: usize,
        on_progress: F,
    ) -> Result<Vec<Outcome>, BatchError>
    where
        F: FnMut(usize, usize, &Outcome),
    {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run_with_progress(tasks, concurrency_limit, on_progress))
    }

    /// Synthesize a single text outside of a batch.
    pub async fn synthesize_one(
        &self,
        text: &str,
        destination: &Path,
    ) -> Result<Outcome, BatchError> {
        let task = TaskUnit::new(text, destination, 0);
        let mut outcomes = self.run(vec![task.clone()], 1).await?;
        Ok(outcomes.pop().unwrap_or_else(|| {
            Outcome::failure(&task, &TaskFailure::Internal("no outcome produced".into()))
        }))
    }

    fn begin_run(&self) -> Result<CancellationFlag, BatchError> {
        let mut lifecycle = self.lock();
        if lifecycle.active {
            return Err(BatchError::EngineBusy);
        }
        lifecycle.active = true;
        lifecycle.state = if lifecycle.cancel.is_cancelled() {
            EngineState::Cancelled
        } else {
            EngineState::Running
        };
        Ok(lifecycle.cancel.clone())
    }
}

impl<C> BatchEngine<C> {
    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the engine when a run ends.
///
/// A run dropped before `finished` is set counts as cancelled: its flag is
/// raised so nothing dispatched under it starts another attempt, and the
/// engine needs a [`reset`](BatchEngine::reset) before the next run.
struct RunGuard<'a, C> {
    engine: &'a BatchEngine<C>,
    finished: bool,
}

impl<C> Drop for RunGuard<'_, C> {
    fn drop(&mut self) {
        let mut lifecycle = self.engine.lock();
        lifecycle.active = false;
        if !self.finished {
            log::warn!("Batch abandoned before completion, cancelling");
            lifecycle.cancel.cancel();
            lifecycle.state = EngineState::Cancelled;
        } else if lifecycle.state == EngineState::Running {
            lifecycle.state = if lifecycle.cancel.is_cancelled() {
                EngineState::Cancelled
            } else {
                EngineState::Completed
            };
        }
    }
}

fn check_unique_ordinals(tasks: &[TaskUnit]) -> Result<(), BatchError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.ordinal()) {
            return Err(BatchError::DuplicateOrdinal(task.ordinal()));
        }
    }
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
