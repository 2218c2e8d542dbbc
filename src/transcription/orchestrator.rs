//! Single entry point for turning recorded audio into cleaned-up text.
//!
//! The orchestrator checks the caller-side preconditions (session, API key,
//! audio) before any network traffic, then hands a freshly built request to
//! the retry machine. Only one run may be active at a time; a second call made
//! while one is in flight is rejected with [`OrchestrationError::Busy`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::api::EndpointClient;
use super::error::OrchestrationError;
use super::machine::{ProgressObserver, RetryMachine, Timing};
use super::policy::FallbackChain;
use super::request::TranscriptionRequest;
use crate::config::secrets::CredentialStore;
use crate::session::AuthSession;

/// Builds an endpoint client for the given API key.
pub type ClientFactory =
    Box<dyn Fn(&str) -> anyhow::Result<Arc<dyn EndpointClient>> + Send + Sync>;

pub struct Transcriber {
    connect: ClientFactory,
    chain: FallbackChain,
    instruction: String,
    timing: Timing,
    session: Arc<dyn AuthSession>,
    credentials: Arc<dyn CredentialStore>,
    busy: AtomicBool,
}

/// Clears the busy flag on every exit path, including a dropped future.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Transcriber {
    pub fn new(
        connect: ClientFactory,
        chain: FallbackChain,
        instruction: impl Into<String>,
        session: Arc<dyn AuthSession>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            connect,
            chain,
            instruction: instruction.into(),
            timing: Timing::default(),
            session,
            credentials,
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// True while a run is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Transcribes one recording, reporting progress to `observer`.
    ///
    /// # Errors
    /// - `Busy` if another run is active
    /// - `NotAuthenticated`, `MissingCredential`, `EmptyAudio` before any attempt
    /// - `HardFailure` or `QuotaExhausted` from the retry machine
    pub async fn transcribe(
        &self,
        audio_bytes: &[u8],
        mime_type: &str,
        observer: &dyn ProgressObserver,
    ) -> Result<String, OrchestrationError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Rejected transcription request: another run is in progress");
            return Err(OrchestrationError::Busy);
        }
        let _guard = RunGuard(&self.busy);

        let user = self
            .session
            .current_user()
            .ok_or(OrchestrationError::NotAuthenticated)?;

        let api_key = match self.credentials.get() {
            Ok(Some(key)) if !key.trim().is_empty() => key,
            Ok(_) => return Err(OrchestrationError::MissingCredential),
            Err(e) => {
                tracing::warn!("Failed to read API key: {e}");
                return Err(OrchestrationError::MissingCredential);
            }
        };

        if audio_bytes.is_empty() {
            return Err(OrchestrationError::EmptyAudio);
        }

        tracing::info!(
            "Transcribing {} bytes of {} for {} across {} model(s)",
            audio_bytes.len(),
            mime_type,
            user.id,
            self.chain.len()
        );

        let client = (self.connect)(api_key.trim()).map_err(|e| {
            tracing::error!("Failed to create endpoint client: {e}");
            OrchestrationError::HardFailure(e.to_string())
        })?;

        let request = TranscriptionRequest::new(audio_bytes, mime_type, self.instruction.as_str());
        RetryMachine::new(client.as_ref(), &self.chain, observer)
            .with_timing(self.timing)
            .run(&request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secrets::MemoryCredentials;
    use crate::session::{MemorySession, User};
    use crate::transcription::api::AttemptOutcome;
    use crate::transcription::machine::ProgressEvent;
    use crate::transcription::model::ModelId;
    use crate::transcription::testing::{RecordingObserver, ScriptedClient};

    fn transcriber(
        client: Arc<ScriptedClient>,
        signed_in: bool,
        key: Option<&str>,
    ) -> Transcriber {
        let session = MemorySession::new(signed_in.then(|| User::new("tester", "Tester")));
        let credentials = MemoryCredentials::new(key.map(str::to_string));
        Transcriber::new(
            Box::new(move |_key: &str| {
                Ok::<_, anyhow::Error>(client.clone() as Arc<dyn EndpointClient>)
            }),
            FallbackChain::new(vec!["m0".into(), "m1".into(), "m2".into(), "m3".into()]).unwrap(),
            "clean",
            Arc::new(session),
            Arc::new(credentials),
        )
    }

    #[tokio::test]
    async fn test_preconditions_never_reach_the_network() {
        let client = Arc::new(ScriptedClient::always(AttemptOutcome::Success("x".into())));
        let observer = RecordingObserver::default();

        let signed_out = transcriber(client.clone(), false, Some("key"));
        assert_eq!(
            signed_out.transcribe(b"audio", "audio/webm", &observer).await,
            Err(OrchestrationError::NotAuthenticated)
        );

        let no_key = transcriber(client.clone(), true, None);
        assert_eq!(
            no_key.transcribe(b"audio", "audio/webm", &observer).await,
            Err(OrchestrationError::MissingCredential)
        );

        let blank_key = transcriber(client.clone(), true, Some("   "));
        assert_eq!(
            blank_key.transcribe(b"audio", "audio/webm", &observer).await,
            Err(OrchestrationError::MissingCredential)
        );

        let ready = transcriber(client.clone(), true, Some("key"));
        assert_eq!(
            ready.transcribe(b"", "audio/webm", &observer).await,
            Err(OrchestrationError::EmptyAudio)
        );

        assert!(client.calls().is_empty());
        assert!(observer.events().is_empty());
        assert!(!ready.is_busy());
    }

    #[tokio::test]
    async fn test_sequential_runs_are_independent() {
        let client = Arc::new(ScriptedClient::always(AttemptOutcome::Success(
            "Hello world.".into(),
        )));
        let transcriber = transcriber(client.clone(), true, Some("key"));

        for run in 1..=2 {
            let observer = RecordingObserver::default();
            let result = transcriber.transcribe(b"audio", "audio/webm", &observer).await;
            assert_eq!(result, Ok("Hello world.".to_string()));
            assert_eq!(client.calls().len(), run);
            assert_eq!(observer.events().len(), 1);
        }
        assert_eq!(client.calls(), vec![ModelId::from("m0"), ModelId::from("m0")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_call_is_rejected_as_busy() {
        let client = Arc::new(ScriptedClient::new(vec![
            AttemptOutcome::RateLimited(5),
            AttemptOutcome::Success("first".into()),
        ]));
        let transcriber = transcriber(client.clone(), true, Some("key"));
        let first_observer = RecordingObserver::default();
        let second_observer = RecordingObserver::default();

        let (first, second) = tokio::join!(
            transcriber.transcribe(b"one", "audio/webm", &first_observer),
            async {
                tokio::task::yield_now().await;
                transcriber.transcribe(b"two", "audio/webm", &second_observer).await
            }
        );

        assert_eq!(first, Ok("first".to_string()));
        assert_eq!(second, Err(OrchestrationError::Busy));
        assert!(second_observer.events().is_empty());
        assert_eq!(client.calls().len(), 2);
        assert!(matches!(
            first_observer.events()[1],
            ProgressEvent::Switching { .. }
        ));
        assert!(!transcriber.is_busy());
    }

    #[tokio::test]
    async fn test_busy_flag_released_after_failure() {
        let client = Arc::new(ScriptedClient::new(vec![
            AttemptOutcome::HardFailure("bad request".into()),
            AttemptOutcome::Success("second try".into()),
        ]));
        let transcriber = transcriber(client, true, Some("key"));
        let observer = RecordingObserver::default();

        assert_eq!(
            transcriber.transcribe(b"a", "audio/webm", &observer).await,
            Err(OrchestrationError::HardFailure("bad request".into()))
        );
        assert!(!transcriber.is_busy());
        assert_eq!(
            transcriber.transcribe(b"a", "audio/webm", &observer).await,
            Ok("second try".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_run_releases_busy_flag() {
        let client = Arc::new(ScriptedClient::always(AttemptOutcome::RateLimited(30)));
        let transcriber = transcriber(client, true, Some("key"));
        let observer = RecordingObserver::default();

        let timed_out = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            transcriber.transcribe(b"a", "audio/webm", &observer),
        )
        .await;

        assert!(timed_out.is_err());
        assert!(!transcriber.is_busy());
    }
}
