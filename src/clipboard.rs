//! Clipboard utilities for voxscribe.
//!
//! Pipes text into the first available clipboard tool: pbcopy (macOS),
//! wl-copy (Wayland), xclip or xsel (X11), clip (Windows).

use std::io::Write;
use std::process::{Command, Stdio};

/// Clipboard tools in the order they are tried, with their arguments.
fn candidates() -> &'static [(&'static str, &'static [&'static str])] {
    if cfg!(target_os = "macos") {
        &[("pbcopy", &[])]
    } else if cfg!(target_os = "windows") {
        &[("clip", &[])]
    } else {
        &[
            ("wl-copy", &["--type", "text/plain"]),
            ("xclip", &["-selection", "clipboard", "-in"]),
            ("xsel", &["--clipboard", "--input"]),
        ]
    }
}

/// Copies text to the system clipboard.
///
/// # Errors
/// - If no clipboard tool could be run
pub fn copy_to_clipboard(text: &str) -> anyhow::Result<()> {
    for (program, args) in candidates() {
        let mut child = match Command::new(program)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(_) => {
                tracing::debug!("{program} not found or not executable");
                continue;
            }
        };

        let written = child
            .stdin
            .take()
            .map(|mut stdin| stdin.write_all(text.as_bytes()))
            .unwrap_or_else(|| Err(std::io::Error::other("stdin not captured")));

        match (written, child.wait()) {
            (Ok(()), Ok(status)) if status.success() => {
                tracing::debug!("Transcript copied to clipboard via {program}");
                return Ok(());
            }
            (Err(e), _) => tracing::warn!("Failed to write to {program}: {e}"),
            (_, Ok(status)) => tracing::warn!("{program} exited with {status}"),
            (_, Err(e)) => tracing::warn!("Failed to wait for {program}: {e}"),
        }
    }

    Err(anyhow::anyhow!(
        "No clipboard tool available (install wl-clipboard, xclip, or xsel)"
    ))
}
