//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

use crate::commands::{self, OutputTarget};
use crate::logging;

/// Record a voice note and get a cleaned-up transcript
#[derive(Parser)]
#[command(name = "voxscribe")]
#[command(version)]
#[command(about = "Record a voice note and get a cleaned-up transcript")]
#[command(long_about = "Record a voice note and get a cleaned-up transcript.\n\nTranscription uses Gemini models. When a model is rate limited the next one\nis tried; when all are busy voxscribe waits out the cooldown and retries once.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n    Output options (-c, -o) can be used without explicitly saying 'record'.\n\nEXAMPLES:\n    # First run: sign in and store an API key\n    $ voxscribe login\n    $ voxscribe auth\n    \n    # Record and pipe to another command (default stdout)\n    $ voxscribe | grep word\n    \n    # Record and copy to clipboard\n    $ voxscribe -c\n    \n    # Transcribe an existing file into a text file\n    $ voxscribe transcribe memo.webm -o memo.txt\n    \n    # List and replay saved recordings\n    $ voxscribe history\n    $ voxscribe replay 2\n    \n    # Transcribe the latest recording again after a failure\n    $ voxscribe retry")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/voxscribe/voxscribe.toml\n    Secrets:            ~/.local/share/voxscribe/secrets.toml\n    Logs:               ~/.local/state/voxscribe/voxscribe.log.*"
)]
struct Cli {
    /// Copy the transcript to the clipboard instead of stdout
    #[arg(short, long, global = true)]
    clipboard: bool,

    /// Write the transcript to a file instead of stdout
    #[arg(short, long, value_name = "FILE", global = true)]
    output: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a voice note from the microphone (default)
    ///
    /// Press Enter to stop and transcribe, Ctrl-C to discard.
    #[command(visible_alias = "r")]
    Record,

    /// Transcribe a pre-recorded audio file
    ///
    /// Examples:
    ///   voxscribe transcribe memo.webm
    ///   voxscribe transcribe meeting.wav -o transcript.txt
    #[command(visible_alias = "t")]
    Transcribe {
        /// Path to the audio file to transcribe
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Transcribe a saved recording again
    ///
    /// Recordings whose transcription failed are kept for this.
    Retry {
        /// Recording index (1 = most recent)
        #[arg(value_name = "N")]
        index: Option<usize>,
    },

    /// List saved recordings, most recent first
    #[command(visible_alias = "h")]
    History,

    /// Play a saved recording with the system audio player
    #[command(visible_alias = "rp")]
    Replay {
        /// Recording index (1 = most recent)
        #[arg(value_name = "N")]
        index: Option<usize>,
    },

    /// Write a saved recording's audio to a file
    Export {
        /// Destination file
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Recording index (1 = most recent)
        #[arg(value_name = "N")]
        index: Option<usize>,
    },

    /// Delete one saved recording by id
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Delete all saved recordings
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Store the Gemini API key
    #[command(visible_alias = "a")]
    Auth {
        /// Remove the stored key instead
        #[arg(long)]
        clear: bool,
    },

    /// Sign in as the current system user
    Login,

    /// Sign out
    Logout,

    /// Show who is signed in
    Whoami,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   voxscribe completions bash > voxscribe.bash
    ///   voxscribe completions zsh > _voxscribe
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that don't need logging
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "voxscribe", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::Logs) => return commands::handle_logs(),
        _ => {}
    }

    logging::init_logging()?;

    let output = OutputTarget {
        clipboard: cli.clipboard,
        file: cli.output,
    };

    match cli.command {
        None | Some(Commands::Record) => commands::handle_record(output).await?,
        Some(Commands::Transcribe { file }) => commands::handle_transcribe(file, output).await?,
        Some(Commands::Retry { index }) => commands::handle_retry(index, output).await?,
        Some(Commands::History) => commands::handle_history()?,
        Some(Commands::Replay { index }) => commands::handle_replay(index)?,
        Some(Commands::Export { path, index }) => commands::handle_export(index, path)?,
        Some(Commands::Delete { id }) => commands::handle_delete(&id)?,
        Some(Commands::Clear { yes }) => exit_quietly_on_cancel(commands::handle_clear(yes))?,
        Some(Commands::Auth { clear }) => exit_quietly_on_cancel(commands::handle_auth(clear))?,
        Some(Commands::Login) => commands::handle_login()?,
        Some(Commands::Logout) => commands::handle_logout()?,
        Some(Commands::Whoami) => commands::handle_whoami()?,
        Some(Commands::Completions { .. }) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}

/// cliclack has already printed its own message for an interrupted prompt.
fn exit_quietly_on_cancel(result: anyhow::Result<()>) -> anyhow::Result<()> {
    if let Err(e) = &result {
        let message = e.to_string();
        if message.contains("cancelled") || message.contains("interrupted") {
            process::exit(0);
        }
    }
    result
}
