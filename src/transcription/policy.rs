//! Fallback chain policy.
//!
//! Rate limits are treated as per-model quota pools, so the cheap recovery is
//! to switch models immediately. Only when the whole chain is exhausted does
//! the policy wait out the reported cooldown and retry the first model once.
//! Any other failure is returned as-is; retrying a malformed request or a bad
//! key does not help.

use super::api::AttemptOutcome;
use super::model::ModelId;

/// Run-scoped position in the fallback chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainState {
    /// Index into the chain; equal to its length once every model was tried.
    pub current_model_index: usize,
    pub exhausted_all_models: bool,
    pub attempts_made: u32,
}

/// What the state machine should do after an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    TryNextModel,
    WaitThenRetrySameModel(u64),
    WaitThenRetryFirstModel(u64),
    Succeed(String),
    Fail(FailureKind),
}

/// Why a run failed, kept apart so quota exhaustion can be reported
/// differently from a provider rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Rejected(String),
    QuotaExhausted { wait_seconds: u64 },
}

/// Ordered list of models to try, most preferred first.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    models: Vec<ModelId>,
}

impl FallbackChain {
    /// Returns `None` for an empty list; a chain always has a first model.
    pub fn new(models: Vec<ModelId>) -> Option<Self> {
        if models.is_empty() {
            None
        } else {
            Some(Self { models })
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn first(&self) -> &ModelId {
        &self.models[0]
    }

    /// Model at `index`, or `None` once the chain is exhausted.
    pub fn get(&self, index: usize) -> Option<&ModelId> {
        self.models.get(index)
    }

    pub fn has_next(&self, state: &ChainState) -> bool {
        state.current_model_index + 1 < self.models.len()
    }

    /// Decides the next action for an attempt made at `state`.
    pub fn decide(&self, state: &ChainState, outcome: AttemptOutcome) -> Action {
        match outcome {
            AttemptOutcome::Success(text) => Action::Succeed(text),
            AttemptOutcome::HardFailure(message) => Action::Fail(FailureKind::Rejected(message)),
            // The single retry after exhaustion gets no second wait cycle
            AttemptOutcome::RateLimited(secs) if state.exhausted_all_models => {
                Action::Fail(FailureKind::QuotaExhausted { wait_seconds: secs })
            }
            AttemptOutcome::RateLimited(_) if self.has_next(state) => Action::TryNextModel,
            AttemptOutcome::RateLimited(secs) => Action::WaitThenRetryFirstModel(secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> FallbackChain {
        FallbackChain::new(vec!["m0".into(), "m1".into(), "m2".into(), "m3".into()]).unwrap()
    }

    fn at(index: usize) -> ChainState {
        ChainState {
            current_model_index: index,
            ..ChainState::default()
        }
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        assert!(FallbackChain::new(Vec::new()).is_none());
    }

    #[test]
    fn test_success_succeeds_anywhere() {
        for index in 0..4 {
            assert_eq!(
                chain().decide(&at(index), AttemptOutcome::Success("ok".into())),
                Action::Succeed("ok".into())
            );
        }
    }

    #[test]
    fn test_rate_limit_switches_while_models_remain() {
        for index in 0..3 {
            assert_eq!(
                chain().decide(&at(index), AttemptOutcome::RateLimited(30)),
                Action::TryNextModel
            );
        }
    }

    #[test]
    fn test_rate_limit_on_last_model_waits_for_first() {
        assert_eq!(
            chain().decide(&at(3), AttemptOutcome::RateLimited(30)),
            Action::WaitThenRetryFirstModel(30)
        );
    }

    #[test]
    fn test_hard_failure_never_falls_back() {
        for index in 0..4 {
            assert_eq!(
                chain().decide(&at(index), AttemptOutcome::HardFailure("bad key".into())),
                Action::Fail(FailureKind::Rejected("bad key".into()))
            );
        }
    }

    #[test]
    fn test_rate_limit_after_exhaustion_is_terminal() {
        let state = ChainState {
            current_model_index: 0,
            exhausted_all_models: true,
            attempts_made: 4,
        };
        assert_eq!(
            chain().decide(&state, AttemptOutcome::RateLimited(5)),
            Action::Fail(FailureKind::QuotaExhausted { wait_seconds: 5 })
        );
    }

    #[test]
    fn test_single_model_chain_waits_immediately() {
        let chain = FallbackChain::new(vec!["only".into()]).unwrap();
        assert_eq!(
            chain.decide(&at(0), AttemptOutcome::RateLimited(9)),
            Action::WaitThenRetryFirstModel(9)
        );
    }
}
