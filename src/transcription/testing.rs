//! Scripted collaborators for exercising the orchestrator without a network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::api::{AttemptOutcome, EndpointClient};
use super::machine::{ProgressEvent, ProgressObserver};
use super::model::ModelId;
use super::request::TranscriptionRequest;

/// Replays a fixed list of outcomes and records which models were called.
pub struct ScriptedClient {
    outcomes: Mutex<VecDeque<AttemptOutcome>>,
    calls: Mutex<Vec<ModelId>>,
    fallback: AttemptOutcome,
}

impl ScriptedClient {
    pub fn new(outcomes: Vec<AttemptOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
            fallback: AttemptOutcome::HardFailure("script exhausted".into()),
        }
    }

    /// Returns `outcome` for every call.
    pub fn always(outcome: AttemptOutcome) -> Self {
        let mut client = Self::new(Vec::new());
        client.fallback = outcome;
        client
    }

    pub fn calls(&self) -> Vec<ModelId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EndpointClient for ScriptedClient {
    async fn call(&self, model: &ModelId, _request: &TranscriptionRequest) -> AttemptOutcome {
        self.calls.lock().unwrap().push(model.clone());
        // Yield so concurrent callers can interleave like a real request would
        tokio::task::yield_now().await;
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
