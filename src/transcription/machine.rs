//! Retry/backoff state machine.
//!
//! Drives the fallback chain against an endpoint client one attempt at a time
//! and reports every transition through a [`ProgressObserver`]. All run state
//! lives in a [`RunContext`] created per call and dropped when the run ends.
//!
//! Transitions:
//! - `Idle` → `Attempting`
//! - `Attempting` → `Succeeded` | `Failed` | `Switching` | `Waiting`
//! - `Switching` → `Attempting(next)` after a short display pause
//! - `Waiting` → `Waiting(n - 1)` each tick, then `Attempting(first)` once

use std::time::Duration;

use super::api::EndpointClient;
use super::error::OrchestrationError;
use super::model::ModelId;
use super::policy::{Action, ChainState, FailureKind, FallbackChain};
use super::request::TranscriptionRequest;

/// Progress notification emitted at each state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A request is about to be sent to `model` (`attempt` of `of` in the chain).
    Calling {
        model: ModelId,
        attempt: usize,
        of: usize,
    },
    Switching {
        from: ModelId,
        to: ModelId,
    },
    Waiting {
        seconds_remaining: u64,
        model: ModelId,
    },
    /// The single final attempt after a full wait.
    Retrying {
        model: ModelId,
    },
}

/// Receives progress events in transition order.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Observer that only writes events to the log.
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        tracing::debug!("Transcription progress: {:?}", event);
    }
}

/// Fixed pauses used by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Display pause before switching to the next model.
    pub switch_pause: Duration,
    /// Length of one countdown tick while waiting out a rate limit.
    pub tick: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            switch_pause: Duration::from_millis(800),
            tick: Duration::from_secs(1),
        }
    }
}

/// Machine state. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineState {
    Idle,
    Attempting,
    Switching { to_index: usize },
    Waiting { seconds_remaining: u64, target_index: usize },
    Succeeded(String),
    Failed(FailureKind),
}

/// Per-run context threaded through every transition.
#[derive(Debug, Default)]
pub struct RunContext {
    pub chain: ChainState,
}

/// Runs one transcription request through the fallback chain.
pub struct RetryMachine<'a> {
    client: &'a dyn EndpointClient,
    chain: &'a FallbackChain,
    observer: &'a dyn ProgressObserver,
    timing: Timing,
}

impl<'a> RetryMachine<'a> {
    pub fn new(
        client: &'a dyn EndpointClient,
        chain: &'a FallbackChain,
        observer: &'a dyn ProgressObserver,
    ) -> Self {
        Self {
            client,
            chain,
            observer,
            timing: Timing::default(),
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Drives the machine from `Idle` to a terminal state.
    pub async fn run(&self, request: &TranscriptionRequest) -> Result<String, OrchestrationError> {
        let mut ctx = RunContext::default();
        let mut state = MachineState::Idle;

        loop {
            state = match self.step(state, &mut ctx, request).await {
                MachineState::Succeeded(text) => {
                    tracing::info!(
                        "Transcription succeeded after {} attempt(s)",
                        ctx.chain.attempts_made
                    );
                    return Ok(text);
                }
                MachineState::Failed(kind) => {
                    tracing::warn!(
                        "Transcription failed after {} attempt(s): {:?}",
                        ctx.chain.attempts_made,
                        kind
                    );
                    return Err(match kind {
                        FailureKind::Rejected(message) => OrchestrationError::HardFailure(message),
                        FailureKind::QuotaExhausted { wait_seconds } => {
                            OrchestrationError::QuotaExhausted { wait_seconds }
                        }
                    });
                }
                next => next,
            };
        }
    }

    /// Applies a single transition. Terminal states are returned unchanged.
    pub async fn step(
        &self,
        state: MachineState,
        ctx: &mut RunContext,
        request: &TranscriptionRequest,
    ) -> MachineState {
        match state {
            MachineState::Idle => {
                ctx.chain = ChainState::default();
                MachineState::Attempting
            }
            MachineState::Attempting => self.attempt(ctx, request).await,
            MachineState::Switching { to_index } => {
                let from = self.model_at(ctx.chain.current_model_index).clone();
                let to = self.model_at(to_index).clone();
                tracing::info!("{} is rate limited, switching to {}", from, to);
                self.observer
                    .on_progress(&ProgressEvent::Switching { from, to });
                tokio::time::sleep(self.timing.switch_pause).await;
                ctx.chain.current_model_index = to_index;
                MachineState::Attempting
            }
            MachineState::Waiting {
                seconds_remaining: 0,
                target_index,
            } => {
                ctx.chain.current_model_index = target_index;
                MachineState::Attempting
            }
            MachineState::Waiting {
                seconds_remaining,
                target_index,
            } => {
                self.observer.on_progress(&ProgressEvent::Waiting {
                    seconds_remaining,
                    model: self.model_at(target_index).clone(),
                });
                tokio::time::sleep(self.timing.tick).await;
                MachineState::Waiting {
                    seconds_remaining: seconds_remaining - 1,
                    target_index,
                }
            }
            terminal @ (MachineState::Succeeded(_) | MachineState::Failed(_)) => terminal,
        }
    }

    async fn attempt(&self, ctx: &mut RunContext, request: &TranscriptionRequest) -> MachineState {
        let index = ctx.chain.current_model_index;
        let model = self.model_at(index);

        if ctx.chain.exhausted_all_models {
            self.observer.on_progress(&ProgressEvent::Retrying {
                model: model.clone(),
            });
        } else {
            self.observer.on_progress(&ProgressEvent::Calling {
                model: model.clone(),
                attempt: index + 1,
                of: self.chain.len(),
            });
        }

        ctx.chain.attempts_made += 1;
        tracing::debug!("Attempt {} using {}", ctx.chain.attempts_made, model);
        let outcome = self.client.call(model, request).await;

        match self.chain.decide(&ctx.chain, outcome) {
            Action::Succeed(text) => MachineState::Succeeded(text),
            Action::Fail(kind) => MachineState::Failed(kind),
            Action::TryNextModel => MachineState::Switching {
                to_index: index + 1,
            },
            Action::WaitThenRetrySameModel(secs) => {
                tracing::info!("{} is rate limited, retrying in {}s", model, secs);
                ctx.chain.exhausted_all_models = true;
                MachineState::Waiting {
                    seconds_remaining: secs,
                    target_index: index,
                }
            }
            Action::WaitThenRetryFirstModel(secs) => {
                tracing::info!(
                    "All {} models are rate limited, retrying {} in {}s",
                    self.chain.len(),
                    self.chain.first(),
                    secs
                );
                ctx.chain.current_model_index = self.chain.len();
                ctx.chain.exhausted_all_models = true;
                MachineState::Waiting {
                    seconds_remaining: secs,
                    target_index: 0,
                }
            }
        }
    }

    fn model_at(&self, index: usize) -> &ModelId {
        self.chain.get(index).unwrap_or_else(|| self.chain.first())
    }
}
