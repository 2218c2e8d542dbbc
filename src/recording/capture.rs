//! Microphone capture through an ffmpeg child process.
//!
//! ffmpeg records mono Opus into a WebM file in the data directory. Stopping
//! sends `q` on its stdin so the container is finalized, then the file is read
//! back and removed.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::ffmpeg::find_ffmpeg;
use super::{CapturedAudio, Recorder, RecordingError};
use crate::config::RecordingConfig;

const CAPTURE_MIME_TYPE: &str = "audio/webm";

/// Time ffmpeg gets to open the device before the capture counts as started.
const STARTUP_GRACE: Duration = Duration::from_millis(300);

/// A running capture.
pub struct CaptureHandle {
    child: Child,
    output_path: PathBuf,
    started_at: Instant,
}

impl CaptureHandle {
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[derive(Clone)]
pub struct FfmpegRecorder {
    input_format: String,
    input_device: String,
    work_dir: PathBuf,
}

impl FfmpegRecorder {
    pub fn new(config: &RecordingConfig, work_dir: &Path) -> Self {
        Self {
            input_format: config.input_format.clone(),
            input_device: config.input_device.clone(),
            work_dir: work_dir.to_path_buf(),
        }
    }

    fn capture_args(&self, output_path: &Path) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-f".into(),
            self.input_format.clone(),
            "-i".into(),
            self.input_device.clone(),
            "-ac".into(),
            "1".into(),
            "-c:a".into(),
            "libopus".into(),
            "-b:a".into(),
            "32k".into(),
            output_path.to_string_lossy().to_string(),
        ]
    }
}

impl Recorder for FfmpegRecorder {
    type Handle = CaptureHandle;

    fn start_capture(&self) -> Result<CaptureHandle, RecordingError> {
        let ffmpeg = find_ffmpeg().map_err(|e| RecordingError::Unavailable(e.to_string()))?;
        std::fs::create_dir_all(&self.work_dir)?;
        let output_path = self
            .work_dir
            .join(format!("capture_{}.webm", chrono::Local::now().timestamp_millis()));

        tracing::info!(
            "Starting capture from {} {} into {}",
            self.input_format,
            self.input_device,
            output_path.display()
        );

        let mut child = Command::new(&ffmpeg)
            .args(self.capture_args(&output_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RecordingError::Unavailable(format!("Failed to start ffmpeg: {e}")))?;

        thread::sleep(STARTUP_GRACE);
        if let Some(status) = child.try_wait()? {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            let _ = std::fs::remove_file(&output_path);
            tracing::error!("ffmpeg exited during startup ({status}): {}", stderr.trim());
            return Err(classify_capture_failure(&stderr));
        }

        Ok(CaptureHandle {
            child,
            output_path,
            started_at: Instant::now(),
        })
    }

    fn stop_capture(&self, mut handle: CaptureHandle) -> Result<CapturedAudio, RecordingError> {
        let duration_secs = handle.elapsed().as_secs_f64();

        if let Some(mut stdin) = handle.child.stdin.take() {
            if let Err(e) = stdin.write_all(b"q") {
                tracing::warn!("Failed to signal ffmpeg to stop: {e}");
            }
        }

        let output = handle.child.wait_with_output()?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() && !handle.output_path.exists() {
            tracing::error!("ffmpeg capture failed ({}): {}", output.status, stderr.trim());
            return Err(classify_capture_failure(&stderr));
        }

        let bytes = std::fs::read(&handle.output_path)?;
        if let Err(e) = std::fs::remove_file(&handle.output_path) {
            tracing::warn!("Failed to remove capture file: {e}");
        }

        tracing::info!("Captured {:.1}s of audio ({} bytes)", duration_secs, bytes.len());
        Ok(CapturedAudio {
            bytes,
            mime_type: CAPTURE_MIME_TYPE.to_string(),
            duration_secs,
        })
    }
}

/// Maps ffmpeg's error output to a capture error.
fn classify_capture_failure(stderr: &str) -> RecordingError {
    let lowered = stderr.to_ascii_lowercase();
    if lowered.contains("permission denied")
        || lowered.contains("operation not permitted")
        || lowered.contains("access denied")
        || lowered.contains("not authorized")
    {
        RecordingError::DeviceDenied
    } else if stderr.trim().is_empty() {
        RecordingError::Unavailable("ffmpeg stopped unexpectedly".to_string())
    } else {
        RecordingError::Unavailable(stderr.trim().to_string())
    }
}
