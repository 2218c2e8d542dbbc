//! Voice-note history storage using SQLite.
//!
//! Each record keeps the audio, its transcript, and when it was made. The store
//! is opened for one user and only ever sees that user's records. Saving a
//! record prunes the oldest ones beyond the retention cap.

use chrono::{DateTime, Local, TimeZone};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

use crate::config::file::MAX_HISTORY_RECORDS;

/// A single recorded voice note.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceRecord {
    /// Unique identifier, `rec_<unix millis>`
    pub id: String,
    pub created_at: DateTime<Local>,
    /// Length of the recording in seconds
    pub duration_secs: f64,
    /// Cleaned-up transcript
    pub transcript: String,
    /// Raw recorded audio
    pub audio: Vec<u8>,
    /// MIME type of `audio`, as recorded
    pub mime_type: String,
}

impl VoiceRecord {
    /// Creates a record stamped with the current time.
    pub fn new(transcript: String, audio: Vec<u8>, mime_type: String, duration_secs: f64) -> Self {
        let created_at = Local::now();
        Self {
            id: format!("rec_{}", created_at.timestamp_millis()),
            created_at,
            duration_secs,
            transcript,
            audio,
            mime_type,
        }
    }

    /// File extension matching the audio MIME type.
    pub fn audio_extension(&self) -> &'static str {
        if self.mime_type.contains("ogg") {
            "ogg"
        } else if self.mime_type.contains("mp4") || self.mime_type.contains("m4a") {
            "m4a"
        } else if self.mime_type.contains("wav") {
            "wav"
        } else if self.mime_type.contains("mpeg") || self.mime_type.contains("mp3") {
            "mp3"
        } else {
            "webm"
        }
    }
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("history database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("history directory is not accessible: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored timestamp for {id} is invalid")]
    InvalidTimestamp { id: String },
}

/// Persistence for voice-note records.
pub trait RecordStore {
    /// Saves `record`, pruning the oldest records beyond the cap. Saving an id
    /// that already exists for this user replaces that record.
    fn save(&mut self, record: &VoiceRecord) -> Result<(), RecordError>;
    /// Up to `max` records (never more than the cap), most recent first.
    fn list_recent(&mut self, max: usize) -> Result<Vec<VoiceRecord>, RecordError>;
    fn get_by_id(&mut self, id: &str) -> Result<Option<VoiceRecord>, RecordError>;
    /// Returns whether a record was removed.
    fn delete_by_id(&mut self, id: &str) -> Result<bool, RecordError>;
    /// Removes every record; returns how many were deleted.
    fn clear_all(&mut self) -> Result<usize, RecordError>;
}

/// SQLite-backed record store scoped to one user.
pub struct HistoryStore {
    connection: Connection,
    user_id: String,
    cap: usize,
}

/// File name of the history database inside the data directory.
pub const HISTORY_DB_FILE: &str = "voxscribe_history.db";

const SELECT_COLUMNS: &str =
    "SELECT id, created_ms, duration_secs, transcript, audio, mime_type FROM recordings";

impl HistoryStore {
    /// Opens (and creates if needed) the history database in `data_dir`.
    ///
    /// # Errors
    /// - If the data directory cannot be created
    /// - If the database file cannot be opened
    /// - If table creation fails
    pub fn open(data_dir: &Path, user_id: &str, cap: usize) -> Result<Self, RecordError> {
        std::fs::create_dir_all(data_dir)?;
        let connection = Connection::open(data_dir.join(HISTORY_DB_FILE))?;
        Self::with_connection(connection, user_id, cap)
    }

    /// In-memory store, used for tests and dry runs.
    pub fn in_memory(user_id: &str, cap: usize) -> Result<Self, RecordError> {
        Self::with_connection(Connection::open_in_memory()?, user_id, cap)
    }

    fn with_connection(
        connection: Connection,
        user_id: &str,
        cap: usize,
    ) -> Result<Self, RecordError> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS recordings (
                id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                created_ms INTEGER NOT NULL,
                duration_secs REAL NOT NULL,
                transcript TEXT NOT NULL,
                audio BLOB NOT NULL,
                mime_type TEXT NOT NULL,
                PRIMARY KEY (user_id, id)
            )",
            [],
        )?;
        connection.execute(
            "CREATE INDEX IF NOT EXISTS recordings_by_user ON recordings (user_id, created_ms)",
            [],
        )?;

        Ok(Self {
            connection,
            user_id: user_id.to_string(),
            cap: cap.clamp(1, MAX_HISTORY_RECORDS),
        })
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(VoiceRecord, bool)> {
        let id: String = row.get(0)?;
        let created_ms: i64 = row.get(1)?;
        let (created_at, valid) = match Local.timestamp_millis_opt(created_ms).single() {
            Some(at) => (at, true),
            None => (Local::now(), false),
        };
        Ok((
            VoiceRecord {
                id,
                created_at,
                duration_secs: row.get(2)?,
                transcript: row.get(3)?,
                audio: row.get(4)?,
                mime_type: row.get(5)?,
            },
            valid,
        ))
    }

    fn checked((record, valid): (VoiceRecord, bool)) -> Result<VoiceRecord, RecordError> {
        if valid {
            Ok(record)
        } else {
            Err(RecordError::InvalidTimestamp { id: record.id })
        }
    }
}

impl RecordStore for HistoryStore {
    fn save(&mut self, record: &VoiceRecord) -> Result<(), RecordError> {
        let tx = self.connection.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO recordings
                (id, user_id, created_ms, duration_secs, transcript, audio, mime_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                self.user_id,
                record.created_at.timestamp_millis(),
                record.duration_secs,
                record.transcript,
                record.audio,
                record.mime_type
            ],
        )?;
        let pruned = tx.execute(
            "DELETE FROM recordings
             WHERE user_id = ?1 AND id NOT IN (
                SELECT id FROM recordings WHERE user_id = ?1
                ORDER BY created_ms DESC, id DESC LIMIT ?2
             )",
            params![self.user_id, self.cap as i64],
        )?;
        tx.commit()?;

        tracing::debug!("Recording {} saved to history", record.id);
        if pruned > 0 {
            tracing::info!("Pruned {} old recording(s) from history", pruned);
        }
        Ok(())
    }

    fn list_recent(&mut self, max: usize) -> Result<Vec<VoiceRecord>, RecordError> {
        let limit = max.min(self.cap) as i64;
        let mut statement = self.connection.prepare(&format!(
            "{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY created_ms DESC, id DESC LIMIT ?2"
        ))?;
        let rows = statement
            .query_map(params![self.user_id, limit], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::checked).collect()
    }

    fn get_by_id(&mut self, id: &str) -> Result<Option<VoiceRecord>, RecordError> {
        let row = self
            .connection
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE user_id = ?1 AND id = ?2"),
                params![self.user_id, id],
                Self::row_to_record,
            )
            .optional()?;
        row.map(Self::checked).transpose()
    }

    fn delete_by_id(&mut self, id: &str) -> Result<bool, RecordError> {
        let deleted = self.connection.execute(
            "DELETE FROM recordings WHERE user_id = ?1 AND id = ?2",
            params![self.user_id, id],
        )?;
        tracing::debug!("Delete of recording {}: {} row(s)", id, deleted);
        Ok(deleted > 0)
    }

    fn clear_all(&mut self) -> Result<usize, RecordError> {
        let deleted = self.connection.execute(
            "DELETE FROM recordings WHERE user_id = ?1",
            params![self.user_id],
        )?;
        tracing::info!("Cleared {} recording(s) from history", deleted);
        Ok(deleted)
    }
}
