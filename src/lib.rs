//! episodeplay - episode playback session manager
//!
//! Drives an adaptive-bitrate media engine for one anime episode: picks the
//! subtitle track, persists and resumes watch position, skips intros and
//! outros, recovers from stalls, and hands off to the next episode.
//!
//! # Modules
//!
//! - `models` - Session config, subtitle tracks, progress records
//! - `settings` - Persisted user settings and partial updates
//! - `storage` - Key-value store trait with memory and file backends
//! - `player` - Session controller and its components
//! - `api` - Backend sync client
//! - `replay` - Scripted sessions on the simulated engine
//! - `cli` / `commands` / `config` - Command-line front end

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod player;
pub mod replay;
pub mod settings;
pub mod storage;

// Re-export commonly used types
pub use models::{
    LanguageMode, Platform, ProgressKey, ProgressRecord, RawSubtitleDescriptor, ServerCandidate,
    SessionConfig, SkipKind, SkipWindow, SubtitleTrack, TrackKind, TrackMode,
};

pub use api::SyncClient;
pub use player::{
    MediaEngine, MediaEvent, PlaybackSessionController, PlaybackState, SessionEvent,
    SimulatedEngine, UserAction,
};
pub use settings::{Settings, SettingsPatch, SettingsSnapshot};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
