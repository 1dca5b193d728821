//! Integration tests for episodeplay
//!
//! Tests are organized by component:
//! - session_test: Controller lifecycle, skip, stall, progress, auto-next
//! - subtitles_test: Descriptor screening, labels, runtime selection
//! - store_test: Progress records, server preference, settings persistence
//! - sync_test: Backend sync client against a mock server
//! - driver_test: Tokio driver, collaborator dispatch, countdown timing
//! - cli_test: Argument parsing and command handlers
//! - replay_test: Scripted sessions on the virtual clock

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
