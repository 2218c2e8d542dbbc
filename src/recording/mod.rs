//! Audio capture for voxscribe.
//!
//! A [`Recorder`] produces one [`CapturedAudio`] per start/stop cycle. The
//! microphone recorder drives ffmpeg; recordings can also be imported from
//! existing files.

pub mod capture;
pub mod ffmpeg;
pub mod import;

use thiserror::Error;

pub use capture::FfmpegRecorder;
pub use ffmpeg::find_ffmpeg;
pub use import::{load_audio_file, mime_type_for_path};

/// Audio produced by one capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedAudio {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// Length in seconds, 0.0 when it cannot be determined
    pub duration_secs: f64,
}

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("microphone access was denied")]
    DeviceDenied,

    #[error("audio capture is unavailable: {0}")]
    Unavailable(String),

    #[error("audio file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start/stop audio capture.
pub trait Recorder {
    type Handle;

    fn start_capture(&self) -> Result<Self::Handle, RecordingError>;
    fn stop_capture(&self, handle: Self::Handle) -> Result<CapturedAudio, RecordingError>;
}
