//! Loading existing audio files as recordings.

use std::path::Path;

use super::{CapturedAudio, RecordingError};

/// MIME type guessed from the file extension.
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "opus" => "audio/ogg",
        "m4a" | "mp4" => "audio/mp4",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        _ => "audio/webm",
    }
}

/// Reads an audio file into a [`CapturedAudio`].
///
/// Duration is read from the header for WAV files and left at zero otherwise.
///
/// # Errors
/// - If the file cannot be read
pub fn load_audio_file(path: &Path) -> Result<CapturedAudio, RecordingError> {
    let bytes = std::fs::read(path)?;
    let mime_type = mime_type_for_path(path);

    let duration_secs = if mime_type == "audio/wav" {
        wav_duration(path).unwrap_or_else(|e| {
            tracing::warn!("Could not read WAV header of {}: {e}", path.display());
            0.0
        })
    } else {
        0.0
    };

    tracing::debug!(
        "Loaded {} ({} bytes, {}, {:.1}s)",
        path.display(),
        bytes.len(),
        mime_type,
        duration_secs
    );

    Ok(CapturedAudio {
        bytes,
        mime_type: mime_type.to_string(),
        duration_secs,
    })
}

fn wav_duration(path: &Path) -> Result<f64, hound::Error> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_type_for_path(Path::new("a.WAV")), "audio/wav");
        assert_eq!(mime_type_for_path(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(mime_type_for_path(Path::new("a.opus")), "audio/ogg");
        assert_eq!(mime_type_for_path(Path::new("a.webm")), "audio/webm");
        assert_eq!(mime_type_for_path(Path::new("noext")), "audio/webm");
    }

    #[test]
    fn test_wav_duration_is_read_from_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("three_seconds.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..16000 * 3 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let audio = load_audio_file(&path).unwrap();
        assert_eq!(audio.mime_type, "audio/wav");
        assert!((audio.duration_secs - 3.0).abs() < 1e-9);
        assert!(!audio.bytes.is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_audio_file(Path::new("/definitely/not/here.webm")).unwrap_err();
        assert!(matches!(err, RecordingError::Io(_)));
    }
}
