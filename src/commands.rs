//! CLI Command Handlers
//!
//! Implements all CLI commands on top of the library.
//! Each handler takes CLI args and Output, returns ExitCode.

use std::path::Path;
use std::sync::Arc;

use crate::api::SyncClient;
use crate::cli::{
    setting_key, setting_value, ExitCode, Output, ProgressAction, ProgressCmd, ProgressEntry,
    ReplayCmd, ReplayReport, ResolveSubsCmd, ResolvedSubs, SelectServerCmd, ServerChoice,
    SettingsAction, SettingsCmd, SwitchServerCmd, TimedEvent,
};
use crate::config::Config;
use crate::models::{ProgressKey, ProgressRecord, RawSubtitleDescriptor, ServerCandidate, SessionConfig};
use crate::player::{Outbox, ProgressStore, ServerSelector, SessionOptions, SubtitleTrackResolver};
use crate::replay::{run_script, ReplayScript};
use crate::settings::{SettingsPatch, SettingsStore};
use crate::storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

// =============================================================================
// Shared setup
// =============================================================================

/// Config from `--config`, else the default location
pub fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Store from `--store`, then config, then the default data dir
pub fn open_store(
    override_path: Option<&Path>,
    config: &Config,
) -> Result<Arc<dyn KeyValueStore>, StorageError> {
    let path = override_path
        .map(Path::to_path_buf)
        .or_else(|| config.store_path());
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "opening store");
            Ok(Arc::new(FileStore::open(path)?))
        }
        None => {
            tracing::warn!("no data directory, using an in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn sync_client(config: &Config) -> SyncClient {
    SyncClient::with_base_url(config.api_base_url())
        .with_server_preference_path(config.server_preference_path())
}

// =============================================================================
// Subtitle Command
// =============================================================================

pub fn resolve_subs_cmd(cmd: ResolveSubsCmd, store: Arc<dyn KeyValueStore>, output: &Output) -> ExitCode {
    let text = match std::fs::read_to_string(&cmd.file) {
        Ok(text) => text,
        Err(e) => {
            return output.error(
                format!("Cannot read {}: {}", cmd.file.display(), e),
                ExitCode::InvalidArgs,
            )
        }
    };

    // Either a bare descriptor array or a whole session config
    let (descriptors, session) = match serde_json::from_str::<Vec<RawSubtitleDescriptor>>(&text) {
        Ok(list) => (list, None),
        Err(_) => match serde_json::from_str::<SessionConfig>(&text) {
            Ok(config) => (config.subtitle_descriptors.clone(), Some(config)),
            Err(e) => {
                return output.error(
                    format!("Expected a descriptor array or session config: {}", e),
                    ExitCode::InvalidArgs,
                )
            }
        },
    };

    let settings = SettingsStore::new(store).load();
    let mode = cmd
        .mode
        .map(Into::into)
        .or_else(|| {
            session
                .as_ref()
                .map(|c| c.resolve_language_mode(settings.preferred_language))
        })
        .unwrap_or(settings.preferred_language);
    let preferred = cmd
        .preferred
        .unwrap_or_else(|| settings.subtitle_language.clone());

    let tracks = SubtitleTrackResolver::new().resolve(&descriptors, &preferred, mode);
    output.info(format!(
        "{} of {} descriptors kept ({} mode)",
        tracks.len(),
        descriptors.len(),
        mode
    ));

    let default = tracks
        .iter()
        .find(|t| t.is_default)
        .map(|t| t.label.clone());
    if let Err(e) = output.print(ResolvedSubs {
        mode,
        tracks,
        default,
    }) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Server Commands
// =============================================================================

pub fn select_server_cmd(cmd: SelectServerCmd, store: Arc<dyn KeyValueStore>, output: &Output) -> ExitCode {
    let is_unavailable = |name: &str| cmd.unavailable.iter().any(|u| u.eq_ignore_ascii_case(name));
    let mut candidates: Vec<ServerCandidate> = cmd
        .servers
        .iter()
        .map(|name| ServerCandidate::new(name.as_str(), !is_unavailable(name)))
        .collect();
    for name in &cmd.unavailable {
        if !candidates.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
            candidates.push(ServerCandidate::new(name.as_str(), false));
        }
    }

    let selector = ServerSelector::new(store);
    let server = selector.select_best_server(&candidates);
    output.info(format!("Selected server: {}", server));

    if let Err(e) = output.print(ServerChoice {
        server,
        preferred: selector.preferred(),
    }) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

pub async fn switch_server_cmd(
    cmd: SwitchServerCmd,
    store: Arc<dyn KeyValueStore>,
    config: &Config,
    output: &Output,
) -> ExitCode {
    let name = cmd.name.trim();
    if name.is_empty() {
        return output.error("Server name must not be empty", ExitCode::InvalidArgs);
    }

    let selector = ServerSelector::new(store);
    let mut outbox = Outbox::new();
    selector.switch_server(name, &mut outbox);

    if selector.preferred().as_deref() != Some(name) {
        return output.error("Could not persist server preference", ExitCode::StorageError);
    }

    if !cmd.no_sync {
        // Fire-and-forget on the page; here we just report the outcome
        if let Err(e) = sync_client(config).sync_server_preference(name).await {
            tracing::warn!(server = name, error = %e, "server preference sync failed");
            output.info(format!("Saved locally; backend sync failed: {}", e));
        }
    }

    if let Err(e) = output.print(ServerChoice {
        server: name.to_string(),
        preferred: selector.preferred(),
    }) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Progress Command
// =============================================================================

pub fn progress_cmd(cmd: ProgressCmd, store: Arc<dyn KeyValueStore>, output: &Output) -> ExitCode {
    let progress = ProgressStore::new(store);

    let result = match cmd.action {
        ProgressAction::List { anime } => progress.list(anime.as_deref()).map(|records| {
            let entries: Vec<ProgressEntry> = records
                .into_iter()
                .map(|(key, record)| ProgressEntry { key, record })
                .collect();
            output.info(format!("{} record(s)", entries.len()));
            serde_json::to_value(entries)
        }),
        ProgressAction::Show {
            anime_id,
            episode_id,
            variant,
        } => {
            let key = ProgressKey::new(anime_id.as_str(), episode_id.as_str(), variant.as_str());
            progress.get(&key).map(|record| {
                let record = record.unwrap_or_else(|| ProgressRecord::empty(anime_id, None));
                serde_json::to_value(ProgressEntry {
                    key: key.to_string(),
                    record,
                })
            })
        }
        ProgressAction::Clear { anime } => progress.clear(anime.as_deref()).map(|removed| {
            output.info(format!("Removed {} record(s)", removed));
            Ok(serde_json::json!({ "removed": removed }))
        }),
    };

    match result {
        Ok(Ok(value)) => {
            if let Err(e) = output.print(value) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Ok(Err(e)) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
        Err(e) => output.error(format!("Progress store error: {}", e), ExitCode::StorageError),
    }
}

// =============================================================================
// Settings Command
// =============================================================================

pub fn settings_cmd(cmd: SettingsCmd, store: Arc<dyn KeyValueStore>, output: &Output) -> ExitCode {
    let settings = SettingsStore::new(store);

    match cmd.action {
        SettingsAction::Show => {
            let snapshot = settings.load();
            if let Err(e) = output.print(&snapshot.settings) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        SettingsAction::Set { key, value } => {
            let key = setting_key(&key);
            let mut object = serde_json::Map::new();
            object.insert(key.clone(), setting_value(&value));

            let patch: SettingsPatch = match serde_json::from_value(serde_json::Value::Object(object)) {
                Ok(patch) => patch,
                Err(e) => {
                    return output.error(
                        format!("Invalid value for {}: {}", key, e),
                        ExitCode::InvalidArgs,
                    )
                }
            };
            if patch.is_empty() {
                return output.error(format!("Unknown setting: {}", key), ExitCode::InvalidArgs);
            }

            if let Err(e) = settings.persist(&patch) {
                return output.error(format!("Could not save settings: {}", e), ExitCode::StorageError);
            }
            output.info(format!("Updated {}", key));
            if let Err(e) = output.print(&settings.load().settings) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
    }
}

// =============================================================================
// Replay Command
// =============================================================================

pub fn replay_cmd(cmd: ReplayCmd, config: &Config, output: &Output) -> ExitCode {
    let text = match std::fs::read_to_string(&cmd.script) {
        Ok(text) => text,
        Err(e) => {
            return output.error(
                format!("Cannot read {}: {}", cmd.script.display(), e),
                ExitCode::InvalidArgs,
            )
        }
    };
    let mut script = match ReplayScript::from_json(&text) {
        Ok(script) => script,
        Err(e) => return output.error(format!("Invalid script: {}", e), ExitCode::InvalidArgs),
    };
    if cmd.touch {
        script.platform.coarse_pointer = true;
    }

    let store = match script.seeded_store() {
        Ok(store) => store,
        Err(e) => return output.error(format!("Cannot seed store: {}", e), ExitCode::StorageError),
    };
    let options = SessionOptions {
        touch_points_threshold: config.touch_points_threshold(),
    };

    let outcome = run_script(&script, store, options);
    let final_state = outcome.final_state();
    output.info(format!(
        "Replayed {} step(s), {} event(s), final state {}",
        script.steps.len(),
        outcome.events.len(),
        final_state
    ));

    let report = ReplayReport {
        session_id: outcome.session.id().to_string(),
        final_state,
        position: outcome.session.engine().position,
        events: outcome
            .events
            .iter()
            .map(|e| TimedEvent {
                at_ms: e.at.as_millis() as u64,
                event: e.event.clone(),
            })
            .collect(),
    };
    if let Err(e) = output.print(&report) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }

    if final_state == crate::player::PlaybackState::Failed {
        ExitCode::PlaybackFailed
    } else {
        ExitCode::Success
    }
}

// =============================================================================
// Whoami Command
// =============================================================================

pub async fn whoami_cmd(config: &Config, output: &Output) -> ExitCode {
    let client = sync_client(config);
    output.info(format!("Checking {}", client.base_url()));

    match client.current_user().await {
        Ok(Some(user)) => {
            output.info(format!("Signed in as {}", user.display_name()));
            if let Err(e) = output.print(&user) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Ok(None) => output.error("Not signed in", ExitCode::NotSignedIn),
        Err(e) => output.error(format!("Backend unreachable: {}", e), ExitCode::NetworkError),
    }
}
