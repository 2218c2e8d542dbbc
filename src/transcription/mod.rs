//! Transcription orchestration for recorded voice notes.
//!
//! Layers, leaf to root:
//! - `api`: one HTTP call to one model, classified into an [`AttemptOutcome`]
//! - `policy`: the ordered model chain and what to do after each outcome
//! - `machine`: the retry/backoff state machine emitting [`ProgressEvent`]s
//! - `orchestrator`: precondition checks and the one-run-at-a-time facade

pub mod api;
pub mod error;
pub mod machine;
pub mod model;
pub mod orchestrator;
pub mod policy;
pub mod request;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AttemptOutcome, EndpointClient, GeminiClient};
pub use error::OrchestrationError;
pub use machine::{LogObserver, ProgressEvent, ProgressObserver, RetryMachine, Timing};
pub use model::ModelId;
pub use orchestrator::{ClientFactory, Transcriber};
pub use policy::{Action, ChainState, FailureKind, FallbackChain};
pub use request::TranscriptionRequest;
