//! Display recent log entries from the application.

use anyhow::anyhow;
use std::fs;

use crate::logging::{get_log_dir, list_log_files};

const DEFAULT_LINES: usize = 50;

/// Shows the last lines of the most recent log file.
///
/// # Errors
/// - If the log directory cannot be determined
/// - If the log file cannot be read
pub fn handle_logs() -> Result<(), anyhow::Error> {
    let log_dir = get_log_dir()?;

    if !log_dir.exists() {
        println!("Log directory does not exist yet: {}", log_dir.display());
        println!("Logs will be created when the application runs.");
        return Ok(());
    }

    let Some(log_file) = list_log_files(&log_dir)?.into_iter().next() else {
        println!("No log files found in: {}", log_dir.display());
        println!("Run 'voxscribe' or other commands to generate logs.");
        return Ok(());
    };

    let content =
        fs::read_to_string(&log_file).map_err(|e| anyhow!("Failed to read log file: {e}"))?;
    if content.is_empty() {
        println!("Log file is empty: {}", log_file.display());
        return Ok(());
    }

    let lines: Vec<&str> = content.lines().collect();
    let start_index = lines.len().saturating_sub(DEFAULT_LINES);

    if start_index > 0 {
        println!("Showing last {} of {} lines:", DEFAULT_LINES, lines.len());
    } else {
        println!("Showing all {} lines:", lines.len());
    }
    println!("Full log file at: {}", log_file.display());
    println!();

    for line in &lines[start_index..] {
        println!("{line}");
    }
    Ok(())
}
