//! Watch-position persistence, resume, and completion sync
//!
//! Records live in one JSON map under the `watchProgress` storage key,
//! keyed `{animeId}_{episodeId}_{variant}`. Storage failures are logged and
//! turn the operation into a no-op; playback never depends on them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::models::{ProgressKey, ProgressRecord};
use crate::settings::Settings;
use crate::storage::{KeyValueStore, StorageError};

use super::engine::MediaEngine;
use super::events::{Outbox, SessionEvent};
use super::scheduler::{Scheduler, TimerSlot};

/// Storage key for the progress map
pub const PROGRESS_STORAGE_KEY: &str = "watchProgress";
/// Save cadence while playing
pub const SAVE_INTERVAL: Duration = Duration::from_secs(5);
/// Stored positions at or below this are not worth resuming
pub const RESUME_THRESHOLD_SECS: f64 = 30.0;
/// Resume prompt hides itself after this long
pub const RESUME_PROMPT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Progress store
// =============================================================================

/// Typed view over the stored progress map
#[derive(Clone)]
pub struct ProgressStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load_all(&self) -> Result<BTreeMap<String, ProgressRecord>, StorageError> {
        match self.store.get(PROGRESS_STORAGE_KEY)? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(BTreeMap::new()),
        }
    }

    fn write_all(&self, records: &BTreeMap<String, ProgressRecord>) -> Result<(), StorageError> {
        let json = serde_json::to_string(records)?;
        self.store.set(PROGRESS_STORAGE_KEY, &json)
    }

    pub fn get(&self, key: &ProgressKey) -> Result<Option<ProgressRecord>, StorageError> {
        Ok(self.load_all()?.remove(&key.to_string()))
    }

    pub fn put(&self, key: &ProgressKey, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut records = self.load_all()?;
        records.insert(key.to_string(), record.clone());
        self.write_all(&records)
    }

    /// Records, optionally limited to one anime
    pub fn list(
        &self,
        anime_id: Option<&str>,
    ) -> Result<Vec<(String, ProgressRecord)>, StorageError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|(key, record)| anime_id.map_or(true, |id| belongs_to(key, record, id)))
            .collect())
    }

    /// Number of distinct episodes completed for `anime_id`, in any variant
    pub fn completed_count(&self, anime_id: &str) -> Result<u32, StorageError> {
        let records = self.load_all()?;
        let episodes: BTreeSet<&str> = records
            .iter()
            .filter(|(key, record)| record.completed && belongs_to(key, record, anime_id))
            .map(|(key, _)| episode_part(key, anime_id))
            .collect();
        Ok(episodes.len() as u32)
    }

    /// Explicit cache clear; returns how many records were removed
    pub fn clear(&self, anime_id: Option<&str>) -> Result<usize, StorageError> {
        let mut records = self.load_all()?;
        let before = records.len();
        match anime_id {
            Some(id) => records.retain(|key, record| !belongs_to(key, record, id)),
            None => records.clear(),
        }
        let removed = before - records.len();
        if removed > 0 {
            self.write_all(&records)?;
        }
        Ok(removed)
    }
}

fn belongs_to(key: &str, record: &ProgressRecord, anime_id: &str) -> bool {
    if record.anime_id.is_empty() {
        key.starts_with(&ProgressKey::anime_prefix(anime_id))
    } else {
        record.anime_id == anime_id
    }
}

/// Episode id inside a `{animeId}_{episodeId}_{variant}` key
fn episode_part<'a>(key: &'a str, anime_id: &str) -> &'a str {
    let rest = key
        .strip_prefix(&ProgressKey::anime_prefix(anime_id))
        .unwrap_or(key);
    rest.rsplit_once('_').map_or(rest, |(episode, _)| episode)
}

// =============================================================================
// Tracker
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Restore {
    Pending,
    Prompting { position: f64 },
    Done,
}

/// Per-session progress tracking for one episode
pub struct ProgressTracker {
    store: ProgressStore,
    key: ProgressKey,
    episode_number: Option<u32>,
    /// Highest watched position written this session
    high_water: f64,
    tracking: bool,
    restore: Restore,
    last_reported: Option<u32>,
}

impl ProgressTracker {
    pub fn new(store: ProgressStore, key: ProgressKey, episode_number: Option<u32>) -> Self {
        Self {
            store,
            key,
            episode_number,
            high_water: 0.0,
            tracking: false,
            restore: Restore::Pending,
            last_reported: None,
        }
    }

    pub fn key(&self) -> &ProgressKey {
        &self.key
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn is_prompting(&self) -> bool {
        matches!(self.restore, Restore::Prompting { .. })
    }

    fn stored(&self) -> Option<ProgressRecord> {
        match self.store.get(&self.key) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "progress read failed");
                None
            }
        }
    }

    /// Begin periodic saves for this media
    pub fn start_tracking<E: MediaEngine + ?Sized>(&mut self, _engine: &E, scheduler: &mut Scheduler) {
        self.high_water = self.stored().map(|r| r.watched).unwrap_or(0.0);
        self.tracking = true;
        scheduler.arm_repeating(TimerSlot::ProgressSave, SAVE_INTERVAL);
        tracing::debug!(key = %self.key, from = self.high_water, "progress tracking started");
    }

    pub fn stop_tracking(&mut self, scheduler: &mut Scheduler) {
        scheduler.cancel(TimerSlot::ProgressSave);
        scheduler.cancel(TimerSlot::ResumePromptHide);
        self.tracking = false;
    }

    /// Stored record for this episode, or a zeroed one
    pub fn get_current_progress(&self) -> ProgressRecord {
        self.stored().unwrap_or_else(|| {
            ProgressRecord::empty(self.key.anime_id.clone(), self.episode_number)
        })
    }

    /// Persist a position; `None` when storage failed
    ///
    /// Watched time never moves backwards within a session (see
    /// [`restart`](Self::restart)). Completion is sticky and also derived
    /// from the watched/total ratio.
    pub fn save_progress(
        &mut self,
        watched: f64,
        total: Option<f64>,
        completed: bool,
    ) -> Option<ProgressRecord> {
        let stored = self.stored();
        let watched = watched.max(self.high_water).max(0.0);
        let total = total
            .filter(|t| t.is_finite() && *t > 0.0)
            .or_else(|| stored.as_ref().map(|r| r.total).filter(|t| *t > 0.0))
            .unwrap_or(0.0);
        let completed = completed
            || ProgressRecord::is_past_completion(watched, total)
            || stored.as_ref().map(|r| r.completed).unwrap_or(false);

        let record = ProgressRecord {
            anime_id: self.key.anime_id.clone(),
            watched,
            total,
            completed,
            last_watched: Utc::now(),
            episode_number: self.episode_number,
        };

        match self.store.put(&self.key, &record) {
            Ok(()) => {
                self.high_water = watched;
                tracing::trace!(key = %self.key, watched, total, completed, "progress saved");
                Some(record)
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "progress save failed");
                None
            }
        }
    }

    fn save_from<E: MediaEngine + ?Sized>(&mut self, engine: &E, completed: bool) -> Option<ProgressRecord> {
        self.save_progress(engine.current_time(), engine.duration(), completed)
    }

    /// Periodic save; only while actually playing
    pub fn on_interval<E: MediaEngine + ?Sized>(&mut self, engine: &E) {
        if self.tracking && !engine.is_paused() {
            self.save_from(engine, false);
        }
    }

    /// Save on pause, syncing the tally once past the completion ratio
    pub fn on_pause<E: MediaEngine + ?Sized>(&mut self, engine: &E, outbox: &mut Outbox) {
        if !self.tracking {
            return;
        }
        if let Some(record) = self.save_from(engine, false) {
            if record.completed {
                self.report_completed(outbox);
            }
        }
    }

    /// Media ended: force completion and sync the tally
    pub fn on_ended<E: MediaEngine + ?Sized>(&mut self, engine: &E, outbox: &mut Outbox) -> bool {
        let end = engine
            .duration()
            .map(|d| d.max(engine.current_time()))
            .unwrap_or_else(|| engine.current_time());
        let saved = self.save_progress(end, engine.duration(), true);
        if saved.is_some() {
            self.report_completed(outbox);
        }
        saved.map(|r| r.completed).unwrap_or(true)
    }

    /// Best-effort synchronous save on page unload
    pub fn on_unload<E: MediaEngine + ?Sized>(&mut self, engine: &E) {
        if self.tracking {
            self.save_from(engine, false);
        }
    }

    /// Explicit restart from zero; the only way watched time goes down
    pub fn restart<E: MediaEngine + ?Sized>(&mut self, engine: &mut E) {
        self.high_water = 0.0;
        engine.seek(0.0);
        self.save_progress(0.0, engine.duration(), false);
        tracing::info!(key = %self.key, "progress restarted from zero");
    }

    /// Resume once the media is loaded enough to seek
    ///
    /// Touch-capable devices get a prompt instead of a silent seek.
    pub fn try_restore<E: MediaEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        settings: &Settings,
        touch_capable: bool,
        scheduler: &mut Scheduler,
        outbox: &mut Outbox,
    ) {
        if self.restore != Restore::Pending {
            return;
        }
        self.restore = Restore::Done;

        if !settings.remember_position {
            return;
        }
        let Some(record) = self.stored() else {
            return;
        };
        if record.completed || record.watched <= RESUME_THRESHOLD_SECS {
            return;
        }
        let position = record.watched;
        if engine.duration().is_some_and(|d| position >= d) {
            return;
        }

        if touch_capable {
            tracing::debug!(position, "offering resume prompt");
            self.restore = Restore::Prompting { position };
            scheduler.arm(TimerSlot::ResumePromptHide, RESUME_PROMPT_TIMEOUT);
            outbox.push(SessionEvent::ResumePrompt { position });
        } else {
            tracing::info!(position, "resuming from stored position");
            engine.seek(position);
            outbox.push(SessionEvent::Resumed { position });
        }
    }

    /// Answer to the resume prompt
    pub fn resume_choice<E: MediaEngine + ?Sized>(
        &mut self,
        resume: bool,
        engine: &mut E,
        scheduler: &mut Scheduler,
        outbox: &mut Outbox,
    ) {
        let Restore::Prompting { position } = self.restore else {
            return;
        };
        self.restore = Restore::Done;
        scheduler.cancel(TimerSlot::ResumePromptHide);
        outbox.push(SessionEvent::ResumePromptHidden);

        if resume {
            engine.seek(position);
            outbox.push(SessionEvent::Resumed { position });
        } else {
            self.restart(engine);
        }
    }

    /// Prompt timed out without an answer
    pub fn on_prompt_timeout(&mut self, outbox: &mut Outbox) {
        if self.is_prompting() {
            self.restore = Restore::Done;
            outbox.push(SessionEvent::ResumePromptHidden);
        }
    }

    /// Recount completed episodes for this anime and report a changed tally
    pub fn report_completed(&mut self, outbox: &mut Outbox) {
        let count = match self.store.completed_count(&self.key.anime_id) {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "could not count completed episodes");
                return;
            }
        };
        if self.last_reported == Some(count) {
            return;
        }
        self.last_reported = Some(count);
        tracing::info!(anime_id = %self.key.anime_id, count, "reporting watched episodes");
        outbox.push(SessionEvent::WatchedEpisodes {
            anime_id: self.key.anime_id.clone(),
            watched_episodes: count,
        });
    }
}
