//! CLI - Command Line Interface for episodeplay
//!
//! Inspect and drive playback state from scripts. All output is
//! JSON-parseable; logs go to stderr.
//!
//! # Examples
//!
//! ```bash
//! # Which subtitle tracks survive filtering
//! episodeplay resolve-subs tracks.json --mode sub
//!
//! # Pick a server from what the backend offers
//! episodeplay select-server hd-1 hd-2 megacloud
//!
//! # Stored progress
//! episodeplay progress list --anime frieren-18542
//! episodeplay settings set skip-intro true
//!
//! # Run a scripted session against the simulated engine
//! episodeplay replay session.json --json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::{LanguageMode, ProgressRecord, SubtitleTrack};
use crate::player::{PlaybackState, SessionEvent};

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Key-value store unreadable or unwritable
    StorageError = 4,
    /// Replayed session ended in the failed state
    PlaybackFailed = 5,
    /// Backend says nobody is signed in
    NotSignedIn = 6,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// episodeplay - episode playback session tools
#[derive(Parser, Debug)]
#[command(
    name = "episodeplay",
    version,
    about = "Episode playback session manager",
    long_about = "Resolve subtitle tracks, choose streaming servers, inspect stored \
                  watch progress and settings, and replay scripted playback \
                  sessions against a simulated media engine.",
    after_help = "EXAMPLES:\n\
                  episodeplay resolve-subs tracks.json      Filter and label subtitle tracks\n\
                  episodeplay select-server hd-1 hd-2       Pick a server\n\
                  episodeplay progress list --json          Show stored progress\n\
                  episodeplay replay session.json           Replay a scripted session"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Path to the key-value store file
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Filter, label and pick a default from a subtitle descriptor list
    #[command(visible_alias = "subs")]
    ResolveSubs(ResolveSubsCmd),

    /// Choose the best server from the offered names
    SelectServer(SelectServerCmd),

    /// Persist a server switch and sync it to the backend
    SwitchServer(SwitchServerCmd),

    /// Inspect or clear stored watch progress
    #[command(visible_alias = "p")]
    Progress(ProgressCmd),

    /// Show or change persisted player settings
    Settings(SettingsCmd),

    /// Drive a session from a JSON script on a simulated engine
    Replay(ReplayCmd),

    /// Show the signed-in backend user
    Whoami(WhoamiCmd),
}

// =============================================================================
// Subtitle Command
// =============================================================================

/// Resolve subtitle descriptors from a JSON file (array or session config)
#[derive(Args, Debug)]
pub struct ResolveSubsCmd {
    /// JSON file with a descriptor array or a session config
    #[arg(required = true)]
    pub file: PathBuf,

    /// Audio language mode (defaults to the config's, then settings)
    #[arg(long, short = 'm', value_enum)]
    pub mode: Option<ModeArg>,

    /// Preferred subtitle label (defaults to the stored setting)
    #[arg(long, short = 'p')]
    pub preferred: Option<String>,
}

/// Audio language mode
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Original audio with subtitles
    Sub,
    /// Dubbed audio
    Dub,
}

impl From<ModeArg> for LanguageMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sub => LanguageMode::Sub,
            ModeArg::Dub => LanguageMode::Dub,
        }
    }
}

// =============================================================================
// Server Commands
// =============================================================================

/// Pick a server from available names
#[derive(Args, Debug)]
pub struct SelectServerCmd {
    /// Server names the backend reports as available
    pub servers: Vec<String>,

    /// Names that are listed but currently unavailable
    #[arg(long, short = 'u', value_delimiter = ',')]
    pub unavailable: Vec<String>,
}

/// Switch to a server
#[derive(Args, Debug)]
pub struct SwitchServerCmd {
    /// Server name (e.g. hd-2)
    #[arg(required = true)]
    pub name: String,

    /// Only persist locally
    #[arg(long)]
    pub no_sync: bool,
}

// =============================================================================
// Progress Command
// =============================================================================

#[derive(Args, Debug)]
pub struct ProgressCmd {
    #[command(subcommand)]
    pub action: ProgressAction,
}

#[derive(Subcommand, Debug)]
pub enum ProgressAction {
    /// List stored records
    List {
        /// Only records for this anime
        #[arg(long, short = 'a')]
        anime: Option<String>,
    },
    /// Show one episode's record
    Show {
        anime_id: String,
        episode_id: String,
        /// Language variant (sub, dub or default)
        #[arg(long, short = 'v', default_value = "default")]
        variant: String,
    },
    /// Remove stored records
    Clear {
        /// Only records for this anime
        #[arg(long, short = 'a')]
        anime: Option<String>,
    },
}

// =============================================================================
// Settings Command
// =============================================================================

#[derive(Args, Debug)]
pub struct SettingsCmd {
    #[command(subcommand)]
    pub action: SettingsAction,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print current settings
    Show,
    /// Set one setting (e.g. `skip-intro true`)
    Set {
        key: String,
        value: String,
    },
}

/// Normalize `skip-intro` / `skip_intro` / `skipIntro` to the stored camelCase key
pub fn setting_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.trim().chars() {
        if c == '-' || c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse a setting value: JSON literal when it parses, plain string otherwise
pub fn setting_value(value: &str) -> serde_json::Value {
    serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()))
}

// =============================================================================
// Replay / Whoami
// =============================================================================

/// Replay a scripted session
#[derive(Args, Debug)]
pub struct ReplayCmd {
    /// Script file (JSON)
    #[arg(required = true)]
    pub script: PathBuf,

    /// Treat the device as touch-capable
    #[arg(long)]
    pub touch: bool,
}

#[derive(Args, Debug)]
pub struct WhoamiCmd {}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Status OK response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusOk {
    pub status: &'static str,
}

impl Default for StatusOk {
    fn default() -> Self {
        Self { status: "ok" }
    }
}

/// Resolved subtitle tracks
#[derive(Debug, Serialize)]
pub struct ResolvedSubs {
    pub mode: LanguageMode,
    pub tracks: Vec<SubtitleTrack>,
    pub default: Option<String>,
}

/// Server selection response
#[derive(Debug, Serialize)]
pub struct ServerChoice {
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred: Option<String>,
}

/// One stored progress record
#[derive(Debug, Serialize)]
pub struct ProgressEntry {
    pub key: String,
    #[serde(flatten)]
    pub record: ProgressRecord,
}

/// Result of a replayed session
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub session_id: String,
    pub final_state: PlaybackState,
    pub position: f64,
    pub events: Vec<TimedEvent>,
}

/// Session event stamped with the virtual clock
#[derive(Debug, Serialize)]
pub struct TimedEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: SessionEvent,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            // For non-JSON, caller should handle formatting
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
