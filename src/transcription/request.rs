//! Immutable per-run transcription request.

use base64::{engine::general_purpose, Engine as _};

/// Fallback MIME type when a recording carries none.
pub const DEFAULT_MIME_TYPE: &str = "audio/webm";

/// Cleanup instruction sent ahead of the audio.
pub const DEFAULT_PROMPT: &str = "Act as a professional transcriber and editor. Convert this voice recording into clear, polished written English.

Follow these strict guidelines:
1. Remove all filler words (e.g., \"um,\" \"uh,\" \"like,\" \"you know\"), stuttering, repetitions, and false starts.
2. Fix all grammatical errors and improve sentence structure to make it flow smoothly.
3. Keep vocabulary simple and easy to understand, but ensure the style is professional.
4. Maintain the original context and intent of the message perfectly; do not change the meaning.
5. Output ONLY the final corrected text. Do not add any introductory phrases, quotes, or concluding remarks.";

/// Audio payload plus instruction, built once per orchestration run.
///
/// The audio is base64-encoded at construction so every attempt in the
/// fallback chain reuses the same encoded payload.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    audio_base64: String,
    audio_len: usize,
    mime_type: String,
    instruction_text: String,
}

impl TranscriptionRequest {
    pub fn new(audio_bytes: &[u8], mime_type: &str, instruction_text: impl Into<String>) -> Self {
        Self {
            audio_base64: general_purpose::STANDARD.encode(audio_bytes),
            audio_len: audio_bytes.len(),
            mime_type: normalize_mime_type(mime_type),
            instruction_text: instruction_text.into(),
        }
    }

    pub fn audio_base64(&self) -> &str {
        &self.audio_base64
    }

    /// Size of the raw (unencoded) audio in bytes.
    pub fn audio_len(&self) -> usize {
        self.audio_len
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn instruction_text(&self) -> &str {
        &self.instruction_text
    }
}

/// Strips MIME parameters (`audio/webm;codecs=opus` becomes `audio/webm`).
pub fn normalize_mime_type(mime_type: &str) -> String {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    if essence.is_empty() {
        DEFAULT_MIME_TYPE.to_string()
    } else {
        essence.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_parameters_are_dropped() {
        assert_eq!(normalize_mime_type("audio/webm;codecs=opus"), "audio/webm");
        assert_eq!(normalize_mime_type("audio/ogg; codecs=opus"), "audio/ogg");
        assert_eq!(normalize_mime_type("Audio/MP4"), "audio/mp4");
    }

    #[test]
    fn test_empty_mime_defaults_to_webm() {
        assert_eq!(normalize_mime_type(""), DEFAULT_MIME_TYPE);
        assert_eq!(normalize_mime_type(";codecs=opus"), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_audio_is_encoded_once() {
        let request = TranscriptionRequest::new(b"abc", "audio/wav", "clean this");
        assert_eq!(request.audio_base64(), "YWJj");
        assert_eq!(request.audio_len(), 3);
        assert_eq!(request.mime_type(), "audio/wav");
        assert_eq!(request.instruction_text(), "clean this");
    }
}
