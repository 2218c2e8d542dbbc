//! Application command handlers for voxscribe.
//!
//! # Commands
//! - `record`: capture from the microphone, transcribe, and save (default)
//! - `transcribe`: transcribe an existing audio file and save it
//! - `retry`: transcribe a saved recording again
//! - `history`: list saved recordings
//! - `replay`: play back a saved recording
//! - `export`: write a saved recording's audio to a file
//! - `delete` / `clear`: remove saved recordings
//! - `auth`: set or remove the Gemini API key
//! - `session`: `login`, `logout`, `whoami`
//! - `logs`: display recent log entries

pub mod auth;
pub mod history;
pub mod logs;
pub mod record;
pub mod replay;
pub mod retry;
pub mod session;
pub mod transcribe;

pub use auth::handle_auth;
pub use history::{handle_clear, handle_delete, handle_history};
pub use logs::handle_logs;
pub use record::handle_record;
pub use replay::{handle_export, handle_replay};
pub use retry::handle_retry;
pub use session::{handle_login, handle_logout, handle_whoami};
pub use transcribe::handle_transcribe;

use console::style;
use std::path::PathBuf;
use std::sync::Arc;

use crate::clipboard::copy_to_clipboard;
use crate::config::{CredentialStore, SecretsFile, VoxConfig};
use crate::history::{HistoryStore, RecordStore, VoiceRecord};
use crate::recording::CapturedAudio;
use crate::session::{AuthSession, LocalSession, User};
use crate::transcription::{
    ClientFactory, EndpointClient, GeminiClient, LogObserver, OrchestrationError, ProgressEvent,
    ProgressObserver, Transcriber,
};
use crate::ui::ProgressPrinter;

/// Where a finished transcript goes: file > clipboard > stdout.
#[derive(Debug, Clone, Default)]
pub struct OutputTarget {
    pub clipboard: bool,
    pub file: Option<String>,
}

/// Loaded configuration plus the local collaborators built from it.
pub(crate) struct Workspace {
    pub config: VoxConfig,
    pub secrets: SecretsFile,
    pub session: Arc<LocalSession>,
    pub data_dir: PathBuf,
}

impl Workspace {
    /// Workspace over the user's config file and data directory.
    pub fn load() -> anyhow::Result<Self> {
        let config = VoxConfig::load().map_err(|e| {
            tracing::error!("Failed to load configuration: {e}");
            anyhow::anyhow!("Configuration error: {e}")
        })?;
        Ok(Self::at(config, crate::config::data_dir()?))
    }

    /// Workspace keeping secrets and history under `data_dir`.
    pub fn at(config: VoxConfig, data_dir: PathBuf) -> Self {
        let secrets = SecretsFile::in_dir(&data_dir);
        let session = Arc::new(LocalSession::new(secrets.clone()));
        Self {
            config,
            secrets,
            session,
            data_dir,
        }
    }

    pub fn require_user(&self) -> Result<User, OrchestrationError> {
        self.session
            .current_user()
            .ok_or(OrchestrationError::NotAuthenticated)
    }

    /// Checks session and API key, so nothing is recorded that could not be
    /// transcribed.
    pub fn ensure_ready(&self) -> Result<User, OrchestrationError> {
        let user = self.require_user()?;
        match self.secrets.get() {
            Ok(Some(key)) if !key.trim().is_empty() => Ok(user),
            Ok(_) => Err(OrchestrationError::MissingCredential),
            Err(e) => {
                tracing::warn!("Failed to read API key: {e}");
                Err(OrchestrationError::MissingCredential)
            }
        }
    }

    /// History store for the signed-in user.
    pub fn history(&self) -> anyhow::Result<HistoryStore> {
        let user = self.require_user()?;
        HistoryStore::open(&self.data_dir, &user.id, self.config.history.cap())
            .map_err(|e| anyhow::anyhow!(OrchestrationError::StorageFailure(e.to_string())))
    }

    /// Saved recording by position, 1 being the most recent (the default).
    pub fn record_at(&self, index: Option<usize>) -> anyhow::Result<VoiceRecord> {
        let mut store = self.history()?;
        let records = store.list_recent(store.cap())?;

        if records.is_empty() {
            return Err(anyhow::anyhow!("No recordings found in history"));
        }

        let available = records.len();
        index
            .unwrap_or(1)
            .checked_sub(1)
            .and_then(|i| records.into_iter().nth(i))
            .ok_or_else(|| {
                anyhow::anyhow!("Recording index out of range. Available recordings: 1-{available}")
            })
    }

    pub fn transcriber(&self) -> anyhow::Result<Transcriber> {
        let settings = self.config.transcription.clone();
        let chain = settings.chain()?;
        let timing = settings.timing();

        let connect: ClientFactory =
            Box::new(move |api_key: &str| -> anyhow::Result<Arc<dyn EndpointClient>> {
                let client = GeminiClient::new(
                    settings.base_url.clone(),
                    api_key,
                    settings.request_timeout(),
                )?
                .with_default_wait(settings.default_wait_secs);
                Ok(Arc::new(client))
            });

        Ok(Transcriber::new(
            connect,
            chain,
            self.config.transcription.prompt.clone(),
            self.session.clone(),
            Arc::new(self.secrets.clone()),
        )
        .with_timing(timing))
    }
}

/// Audio waiting for a transcript, by where it came from.
pub(crate) enum Pending {
    /// Just recorded; kept in history even when transcription fails
    Captured(CapturedAudio),
    /// Read from a file the user still has
    Imported(CapturedAudio),
    /// Already in history and transcribed again
    Stored(VoiceRecord),
}

impl Pending {
    fn audio(&self) -> (&[u8], &str) {
        match self {
            Self::Captured(audio) | Self::Imported(audio) => (&audio.bytes, &audio.mime_type),
            Self::Stored(record) => (&record.audio, &record.mime_type),
        }
    }

    fn into_record(self, transcript: String) -> VoiceRecord {
        match self {
            Self::Captured(audio) | Self::Imported(audio) => {
                VoiceRecord::new(transcript, audio.bytes, audio.mime_type, audio.duration_secs)
            }
            Self::Stored(mut record) => {
                record.transcript = transcript;
                record
            }
        }
    }
}

/// A transcript that reached its destination, and whether it was saved.
#[derive(Debug)]
pub(crate) struct Delivered {
    pub transcript: String,
    /// Id of the saved record
    pub saved: Result<String, OrchestrationError>,
}

/// Runs audio through the orchestrator, delivers the transcript, and saves the
/// record.
///
/// A failed save does not discard the transcript: it has already been
/// delivered, and the user is told that saving failed. A fresh capture whose
/// transcription fails is kept with an empty transcript for `retry`.
pub(crate) async fn transcribe_and_save(
    workspace: &Workspace,
    pending: Pending,
    output: &OutputTarget,
) -> anyhow::Result<Delivered> {
    let transcriber = workspace.transcriber()?;
    let printer = ProgressPrinter::new();
    let observer = |event: &ProgressEvent| {
        LogObserver.on_progress(event);
        printer.on_progress(event);
    };

    let (bytes, mime_type) = pending.audio();
    let transcript = match transcriber.transcribe(bytes, mime_type, &observer).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Transcription failed: {e}");
            if let Pending::Captured(audio) = pending {
                keep_failed_capture(workspace, audio);
            }
            return Err(anyhow::anyhow!(e));
        }
    };

    let delivery = deliver(&transcript, output);

    let saved = save_record(workspace, pending.into_record(transcript.clone()));
    match &saved {
        Ok(id) => eprintln!("{} Saved as {id}", style("✓").green()),
        Err(e) => {
            tracing::warn!("{e}");
            eprintln!("{} {e}", style("!").yellow());
        }
    }

    delivery?;
    Ok(Delivered { transcript, saved })
}

fn save_record(workspace: &Workspace, record: VoiceRecord) -> Result<String, OrchestrationError> {
    let mut store = workspace
        .history()
        .map_err(|e| OrchestrationError::StorageFailure(e.to_string()))?;
    store
        .save(&record)
        .map_err(|e| OrchestrationError::StorageFailure(e.to_string()))?;
    Ok(record.id)
}

/// Stores an untranscribed capture in history, or as a loose file in the data
/// directory when history is out of reach.
fn keep_failed_capture(workspace: &Workspace, audio: CapturedAudio) {
    let record = VoiceRecord::new(String::new(), audio.bytes, audio.mime_type, audio.duration_secs);
    let fallback_path = workspace
        .data_dir
        .join(format!("unsaved_{}.{}", record.id, record.audio_extension()));
    let audio_bytes = record.audio.clone();

    match save_record(workspace, record) {
        Ok(id) => {
            tracing::info!("Kept untranscribed recording {id}");
            eprintln!(
                "{} Recording kept as {id}. Run 'voxscribe retry' to transcribe it again.",
                style("!").yellow()
            );
        }
        Err(e) => {
            tracing::warn!("Could not keep recording in history: {e}");
            match std::fs::write(&fallback_path, audio_bytes) {
                Ok(()) => eprintln!(
                    "{} Recording kept at {}",
                    style("!").yellow(),
                    fallback_path.display()
                ),
                Err(e) => tracing::error!("Recording lost: {e}"),
            }
        }
    }
}

/// Writes the transcript to its destination.
pub(crate) fn deliver(text: &str, output: &OutputTarget) -> anyhow::Result<()> {
    if let Some(file_path) = &output.file {
        std::fs::write(file_path, text)
            .map_err(|e| anyhow::anyhow!("Failed to write to file '{file_path}': {e}"))?;
        tracing::debug!("Transcript written to file: {file_path}");
    } else if output.clipboard {
        match copy_to_clipboard(text) {
            Ok(()) => eprintln!("{} Copied to clipboard", style("✓").green()),
            Err(e) => {
                tracing::warn!("Failed to copy to clipboard: {e}");
                println!("{text}");
            }
        }
    } else {
        println!("{text}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HISTORY_DB_FILE;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::path::Path;
    use tempfile::TempDir;

    /// Gemini stand-in answering every request with `status` and `body`.
    async fn serve(status: u16, body: Value) -> String {
        let app = Router::new().route(
            "/v1beta/models/:model_action",
            post(move || {
                let body = body.clone();
                async move { (StatusCode::from_u16(status).unwrap(), Json(body)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1beta")
    }

    async fn transcript_server(text: &str) -> String {
        serve(
            200,
            json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}),
        )
        .await
    }

    fn workspace(data_dir: &Path, base_url: &str, api_key: Option<&str>) -> Workspace {
        let mut config = VoxConfig::default();
        config.transcription.base_url = base_url.to_string();
        let workspace = Workspace::at(config, data_dir.to_path_buf());
        workspace
            .secrets
            .update(|s| s.user = Some(User::new("ada", "Ada")))
            .unwrap();
        if let Some(key) = api_key {
            workspace.secrets.set(key).unwrap();
        }
        workspace
    }

    fn captured() -> CapturedAudio {
        CapturedAudio {
            bytes: vec![0x1a, 0x45, 0xdf, 0xa3],
            mime_type: "audio/webm".into(),
            duration_secs: 3.0,
        }
    }

    fn to_file(path: &Path) -> OutputTarget {
        OutputTarget {
            clipboard: false,
            file: Some(path.to_string_lossy().to_string()),
        }
    }

    #[tokio::test]
    async fn test_transcript_is_delivered_and_saved() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(dir.path(), &transcript_server("Hello world.").await, Some("key"));
        let out = dir.path().join("out.txt");

        let delivered = transcribe_and_save(&ws, Pending::Captured(captured()), &to_file(&out))
            .await
            .unwrap();

        assert_eq!(delivered.transcript, "Hello world.");
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "Hello world.");
        let id = delivered.saved.unwrap();
        let record = ws.history().unwrap().get_by_id(&id).unwrap().unwrap();
        assert_eq!(record.transcript, "Hello world.");
        assert_eq!(record.audio, captured().bytes);
    }

    #[tokio::test]
    async fn test_failed_save_still_delivers_transcript() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(dir.path(), &transcript_server("Hello world.").await, Some("key"));
        // A directory where the database file belongs makes every save fail
        std::fs::create_dir_all(dir.path().join(HISTORY_DB_FILE)).unwrap();
        let out = dir.path().join("out.txt");

        let delivered = transcribe_and_save(&ws, Pending::Captured(captured()), &to_file(&out))
            .await
            .unwrap();

        assert_eq!(delivered.transcript, "Hello world.");
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "Hello world.");
        assert!(matches!(
            delivered.saved,
            Err(OrchestrationError::StorageFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_transcription_keeps_the_capture() {
        let dir = TempDir::new().unwrap();
        let base = serve(400, json!({"error": {"message": "Invalid audio"}})).await;
        let ws = workspace(dir.path(), &base, Some("key"));
        let out = dir.path().join("out.txt");

        let err = transcribe_and_save(&ws, Pending::Captured(captured()), &to_file(&out))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid audio"));
        assert!(!out.exists());
        let kept = ws.record_at(None).unwrap();
        assert!(kept.transcript.is_empty());
        assert_eq!(kept.audio, captured().bytes);
    }

    #[tokio::test]
    async fn test_retry_fills_in_the_stored_record() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(dir.path(), &transcript_server("Second try.").await, Some("key"));
        let pending = VoiceRecord::new(String::new(), vec![1, 2, 3], "audio/webm".into(), 2.0);
        ws.history().unwrap().save(&pending).unwrap();

        let stored = ws.record_at(Some(1)).unwrap();
        let delivered = transcribe_and_save(
            &ws,
            Pending::Stored(stored),
            &to_file(&dir.path().join("out.txt")),
        )
        .await
        .unwrap();

        assert_eq!(delivered.saved.unwrap(), pending.id);
        let records = ws.history().unwrap().list_recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].transcript, "Second try.");
    }

    #[tokio::test]
    async fn test_imported_file_is_not_kept_on_failure() {
        let dir = TempDir::new().unwrap();
        let base = serve(503, json!({})).await;
        let ws = workspace(dir.path(), &base, Some("key"));

        let result = transcribe_and_save(
            &ws,
            Pending::Imported(captured()),
            &to_file(&dir.path().join("out.txt")),
        )
        .await;

        assert!(result.is_err());
        assert!(ws.history().unwrap().list_recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_not_ready_without_session_or_key() {
        let dir = TempDir::new().unwrap();
        let signed_out = Workspace::at(VoxConfig::default(), dir.path().to_path_buf());
        assert_eq!(
            signed_out.ensure_ready(),
            Err(OrchestrationError::NotAuthenticated)
        );

        let no_key = workspace(dir.path(), "http://127.0.0.1:9", None);
        assert_eq!(
            no_key.ensure_ready(),
            Err(OrchestrationError::MissingCredential)
        );

        no_key.secrets.set("key").unwrap();
        assert_eq!(no_key.ensure_ready(), Ok(User::new("ada", "Ada")));
    }

    #[test]
    fn test_record_index_out_of_range() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(dir.path(), "http://127.0.0.1:9", Some("key"));
        assert!(ws.record_at(None).is_err());

        let saved = VoiceRecord::new("note".into(), vec![1], "audio/webm".into(), 1.0);
        ws.history().unwrap().save(&saved).unwrap();
        assert_eq!(ws.record_at(None).unwrap().id, saved.id);
        assert!(ws.record_at(Some(0)).is_err());
        assert!(ws.record_at(Some(2)).is_err());
    }
}
