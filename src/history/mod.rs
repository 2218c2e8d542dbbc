//! Bounded history of recorded voice notes.

pub mod storage;

pub use storage::{HistoryStore, RecordError, RecordStore, VoiceRecord, HISTORY_DB_FILE};
