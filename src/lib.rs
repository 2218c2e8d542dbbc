//! voxscribe: record a voice note, transcribe it through a chain of Gemini
//! models with rate-limit fallback, and keep the last few recordings.

pub mod app;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod history;
pub mod logging;
pub mod recording;
pub mod session;
pub mod transcription;
pub mod ui;
