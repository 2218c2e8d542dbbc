//! Terminal rendering of transcription progress.
//!
//! Writes to stderr so the transcript on stdout stays pipeable. The countdown
//! rewrites a single line in place when stderr is a terminal.

use console::{style, Term};
use std::sync::Mutex;

use crate::transcription::{ProgressEvent, ProgressObserver};

pub struct ProgressPrinter {
    term: Term,
    /// Whether the last line written is an in-place countdown line
    countdown_active: Mutex<bool>,
}

impl ProgressPrinter {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            countdown_active: Mutex::new(false),
        }
    }

    fn write_line(&self, line: &str, in_place: bool) {
        let mut active = self
            .countdown_active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let interactive = self.term.is_term();

        if *active && interactive {
            let _ = self.term.clear_last_lines(1);
        }
        if let Err(e) = self.term.write_line(line) {
            tracing::debug!("Failed to write progress: {e}");
        }
        *active = in_place;
    }
}

impl Default for ProgressPrinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable line for a progress event.
pub fn describe(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Calling { model, attempt, of } => {
            format!("Transcribing with AI… using {model} (attempt {attempt} of {of})")
        }
        ProgressEvent::Switching { from, to } => {
            format!("Model quota hit: {from} is busy. Trying {to}…")
        }
        ProgressEvent::Waiting {
            seconds_remaining,
            model,
        } => format!("All models busy. Retrying automatically in {seconds_remaining}s… ({model})"),
        ProgressEvent::Retrying { model } => format!("Retrying with {model}…"),
    }
}

impl ProgressObserver for ProgressPrinter {
    fn on_progress(&self, event: &ProgressEvent) {
        let line = describe(event);
        match event {
            ProgressEvent::Calling { .. } | ProgressEvent::Retrying { .. } => {
                self.write_line(&format!("{} {}", style("●").cyan(), line), false)
            }
            ProgressEvent::Switching { .. } => {
                self.write_line(&format!("{} {}", style("↻").yellow(), line), false)
            }
            ProgressEvent::Waiting { .. } => {
                self.write_line(&format!("{} {}", style("⏳").yellow(), line), true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::ModelId;

    #[test]
    fn test_describe_events() {
        let m0 = ModelId::from("gemini-2.5-flash-lite");
        let m1 = ModelId::from("gemini-2.0-flash-lite");

        assert_eq!(
            describe(&ProgressEvent::Calling {
                model: m0.clone(),
                attempt: 1,
                of: 4
            }),
            "Transcribing with AI… using gemini-2.5-flash-lite (attempt 1 of 4)"
        );
        assert_eq!(
            describe(&ProgressEvent::Switching {
                from: m0.clone(),
                to: m1
            }),
            "Model quota hit: gemini-2.5-flash-lite is busy. Trying gemini-2.0-flash-lite…"
        );
        assert_eq!(
            describe(&ProgressEvent::Waiting {
                seconds_remaining: 7,
                model: m0
            }),
            "All models busy. Retrying automatically in 7s… (gemini-2.5-flash-lite)"
        );
    }
}
