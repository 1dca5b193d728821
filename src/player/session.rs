//! Playback session controller
//!
//! Owns the engine handle and every child component for one episode view.
//! Children never talk to each other; the controller feeds them engine
//! events, timer firings and settings, and collects what they emit.
//!
//! Seeks from auto-skip, stall recovery and the user all land on the same
//! engine. The last write wins; nothing here tries to arbitrate between them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::models::{
    LanguageMode, Platform, ProgressKey, ProgressRecord, ServerCandidate, SessionConfig, SkipKind,
    SubtitleTrack,
};
use crate::settings::{SettingsPatch, SettingsSnapshot, SettingsStore};
use crate::storage::KeyValueStore;

use super::engine::{EngineError, MediaEngine, SubtitleStyle};
use super::events::{ErrorKind, MediaEvent, Outbox, SessionEvent, UserAction};
use super::progress::{ProgressStore, ProgressTracker};
use super::scheduler::{Scheduler, TimerSlot, TimerToken};
use super::server::ServerSelector;
use super::skip::SkipController;
use super::stall::{SampleOutcome, StallRecoveryMonitor, STALL_SAMPLE_THRESHOLD};
use super::subtitles::{apply_selection, SubtitleTrackResolver};

/// Countdown values shown before opening the next episode
pub const AUTO_NEXT_TICKS: u32 = 3;
/// Interval between countdown ticks
pub const AUTO_NEXT_TICK: Duration = Duration::from_secs(1);
/// Total time from the end of the episode to navigation
pub const AUTO_NEXT_DELAY: Duration = Duration::from_secs(5);
/// How long playback must wait before the buffering spinner shows
pub const BUFFERING_INDICATOR_DELAY: Duration = Duration::from_millis(500);

// =============================================================================
// Lifecycle
// =============================================================================

/// Why a session could not start
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already initialized (state: {0})")]
    AlreadyInitialized(PlaybackState),

    #[error("No video source is available for this episode.")]
    MissingManifest,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Media lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackState {
    Uninitialized,
    Loading,
    Ready,
    Playing,
    Paused,
    Stalled,
    Recovered,
    Ended,
    /// Error displayed to the user; not retried
    Failed,
    Destroyed,
}

impl PlaybackState {
    /// No further media transitions (only destroy)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ended | PlaybackState::Failed | PlaybackState::Destroyed
        )
    }

    pub fn can_transition_to(&self, next: PlaybackState) -> bool {
        use PlaybackState::*;
        match (*self, next) {
            (Destroyed, _) => false,
            (_, Destroyed) => true,
            (Failed, _) => false,
            (_, Failed) => true,
            (Uninitialized, Loading) => true,
            (Loading, Ready) => true,
            (Ready, Playing | Paused) => true,
            (Playing, Paused | Stalled | Ended) => true,
            (Paused, Playing | Ended) => true,
            (Stalled, Recovered | Playing | Paused | Ended) => true,
            (Recovered, Playing | Paused | Stalled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Uninitialized => "uninitialized",
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stalled => "stalled",
            PlaybackState::Recovered => "recovered",
            PlaybackState::Ended => "ended",
            PlaybackState::Failed => "failed",
            PlaybackState::Destroyed => "destroyed",
        };
        write!(f, "{}", name)
    }
}

/// Host-tunable knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Touch points at which a device counts as touch-capable
    pub touch_points_threshold: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            touch_points_threshold: 1,
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Top-level orchestrator for one episode view
pub struct PlaybackSessionController<E: MediaEngine> {
    id: Uuid,
    engine: E,
    state: PlaybackState,
    config: SessionConfig,
    language_mode: LanguageMode,
    settings: SettingsSnapshot,
    settings_store: SettingsStore,
    platform: Platform,
    options: SessionOptions,
    store: Arc<dyn KeyValueStore>,
    resolver: SubtitleTrackResolver,
    tracks: Vec<SubtitleTrack>,
    skip: SkipController,
    stall: StallRecoveryMonitor,
    progress: Option<ProgressTracker>,
    servers: ServerSelector,
    scheduler: Scheduler,
    outbox: Outbox,
    attached: bool,
    /// Remaining countdown value while auto-next is pending
    countdown: Option<u32>,
    selected_subtitle: Option<Option<String>>,
    buffering_visible: bool,
}

impl<E: MediaEngine> PlaybackSessionController<E> {
    /// Create a session over `engine`, loading settings from `store`
    pub fn new(engine: E, store: Arc<dyn KeyValueStore>) -> Self {
        let settings_store = SettingsStore::new(store.clone());
        let settings = settings_store.load();
        Self {
            id: Uuid::new_v4(),
            engine,
            state: PlaybackState::Uninitialized,
            config: SessionConfig::default(),
            language_mode: settings.preferred_language,
            settings,
            settings_store,
            platform: Platform::default(),
            options: SessionOptions::default(),
            servers: ServerSelector::new(store.clone()),
            store,
            resolver: SubtitleTrackResolver::new(),
            tracks: Vec::new(),
            skip: SkipController::new(),
            stall: StallRecoveryMonitor::new(),
            progress: None,
            scheduler: Scheduler::new(),
            outbox: Outbox::new(),
            attached: false,
            countdown: None,
            selected_subtitle: None,
            buffering_visible: false,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn tracks(&self) -> &[SubtitleTrack] {
        &self.tracks
    }

    pub fn settings(&self) -> &SettingsSnapshot {
        &self.settings
    }

    pub fn language_mode(&self) -> LanguageMode {
        self.language_mode
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn skip_controller(&self) -> &SkipController {
        &self.skip
    }

    pub fn stall_monitor(&self) -> &StallRecoveryMonitor {
        &self.stall
    }

    pub fn progress_key(&self) -> Option<&ProgressKey> {
        self.progress.as_ref().map(|p| p.key())
    }

    /// Stored progress for this episode
    pub fn get_current_progress(&self) -> Option<ProgressRecord> {
        self.progress.as_ref().map(|p| p.get_current_progress())
    }

    pub fn is_counting_down(&self) -> bool {
        self.countdown.is_some()
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.outbox.drain()
    }

    fn is_touch(&self) -> bool {
        self.platform
            .is_touch_capable(self.options.touch_points_threshold)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Start the session; `false` (with an error event) when it cannot
    pub fn initialize(&mut self, config: SessionConfig) -> bool {
        self.try_initialize(config).is_ok()
    }

    /// Like [`initialize`](Self::initialize) but returns the failure
    pub fn try_initialize(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        if self.state != PlaybackState::Uninitialized {
            tracing::warn!(session = %self.id, state = %self.state, "initialize called twice");
            return Err(SessionError::AlreadyInitialized(self.state));
        }

        self.language_mode = config.resolve_language_mode(self.settings.preferred_language);
        self.config = config;

        let Some(manifest) = self.config.manifest().map(str::to_string) else {
            tracing::error!(session = %self.id, "no manifest URL supplied");
            let err = SessionError::MissingManifest;
            self.fail(ErrorKind::FatalConfig, err.to_string());
            return Err(err);
        };

        if let Err(e) = self.engine.load(&manifest) {
            tracing::error!(session = %self.id, error = %e, "engine failed to load manifest");
            self.fail(ErrorKind::TransportFatal, e.to_string());
            return Err(e.into());
        }

        self.tracks = self.resolver.resolve(
            &self.config.subtitle_descriptors,
            &self.settings.subtitle_language,
            self.language_mode,
        );
        self.progress = Some(ProgressTracker::new(
            ProgressStore::new(self.store.clone()),
            ProgressKey::from_config(&self.config),
            self.config.episode_number,
        ));

        tracing::info!(
            session = %self.id,
            anime_id = %self.config.anime_id,
            episode_id = %self.config.episode_id,
            mode = %self.language_mode,
            tracks = self.tracks.len(),
            "session initialized"
        );
        self.transition(PlaybackState::Loading);
        Ok(())
    }

    /// Release the engine and every timer; safe to call repeatedly
    pub fn destroy(&mut self) {
        if self.state == PlaybackState::Destroyed {
            return;
        }
        self.detach_children();
        self.countdown = None;
        self.scheduler.cancel_all();
        self.engine.destroy();
        self.transition(PlaybackState::Destroyed);
        tracing::info!(session = %self.id, "session destroyed");
    }

    /// Page is going away: best-effort synchronous save
    pub fn page_unload(&mut self) {
        if let Some(progress) = self.progress.as_mut() {
            progress.on_unload(&self.engine);
        }
    }

    fn fail(&mut self, kind: ErrorKind, message: String) {
        if matches!(self.state, PlaybackState::Failed | PlaybackState::Destroyed) {
            return;
        }
        self.detach_children();
        self.countdown = None;
        self.scheduler.cancel_all();
        self.outbox.push(SessionEvent::Error { kind, message });
        self.transition(PlaybackState::Failed);
    }

    fn transition(&mut self, to: PlaybackState) -> bool {
        let from = self.state;
        if from == to {
            return true;
        }
        if !from.can_transition_to(to) {
            tracing::debug!(session = %self.id, %from, %to, "ignoring invalid transition");
            return false;
        }
        self.state = to;
        tracing::info!(session = %self.id, %from, %to, "state change");
        self.outbox.push(SessionEvent::StateChanged { from, to });
        true
    }

    fn attach_children(&mut self) {
        if self.attached {
            tracing::debug!(session = %self.id, "engine ready again, children already attached");
            return;
        }
        for track in &self.tracks {
            self.engine.add_text_track(track);
        }
        self.engine.apply_subtitle_style(SubtitleStyle {
            background: self.settings.subtitle_background,
        });
        self.engine.set_volume(self.settings.default_volume);
        self.attached = true;
        self.refresh_subtitles();

        if let Some(progress) = self.progress.as_mut() {
            progress.start_tracking(&self.engine, &mut self.scheduler);
        }
        self.skip
            .attach(self.config.intro_window, self.config.outro_window);
        self.stall.start(&self.engine, &mut self.scheduler);
        tracing::debug!(session = %self.id, "children attached");

        self.maybe_restore();
    }

    fn detach_children(&mut self) {
        self.stall.stop(&mut self.scheduler);
        self.skip.detach(&mut self.scheduler, &mut self.outbox);
        if let Some(progress) = self.progress.as_mut() {
            progress.stop_tracking(&mut self.scheduler);
        }
        self.set_buffering(false);
        self.attached = false;
    }

    // -------------------------------------------------------------------------
    // Engine events
    // -------------------------------------------------------------------------

    /// Feed one engine/media event into the session
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        if self.state.is_terminal() {
            tracing::trace!(session = %self.id, ?event, "event after terminal state");
            return;
        }

        match event {
            MediaEvent::Ready => {
                if self.transition(PlaybackState::Ready) {
                    self.attach_children();
                }
            }
            MediaEvent::LoadedMetadata | MediaEvent::CanPlay => {
                self.refresh_subtitles();
                self.maybe_restore();
            }
            MediaEvent::TextTracksChanged => self.refresh_subtitles(),
            MediaEvent::Play => self.on_play(true),
            MediaEvent::Playing => self.on_play(false),
            MediaEvent::Pause => self.on_pause(),
            MediaEvent::TimeUpdate => self.tick(),
            MediaEvent::Waiting => {
                if self.attached && !self.buffering_visible {
                    self.scheduler
                        .arm(TimerSlot::BufferingIndicator, BUFFERING_INDICATOR_DELAY);
                }
            }
            MediaEvent::Ended => self.on_ended(),
            MediaEvent::SubtitleLoadFailed { label } => {
                tracing::warn!(session = %self.id, %label, "subtitle track failed to load");
            }
            MediaEvent::Error { fatal: true, details } => {
                tracing::error!(session = %self.id, %details, "fatal engine error");
                self.fail(
                    ErrorKind::TransportFatal,
                    format!("Playback failed: {}", details),
                );
            }
            MediaEvent::Error { fatal: false, details } => {
                tracing::warn!(session = %self.id, %details, "recoverable engine error");
            }
        }
    }

    fn on_play(&mut self, is_play_event: bool) {
        if self.stall.is_recovering() {
            return;
        }
        if is_play_event {
            self.refresh_subtitles();
        }
        if self.transition(PlaybackState::Playing) {
            if let Some(server) = self.config.server.clone() {
                self.servers.remember_if_unset(&server);
            }
        }
        self.set_buffering(false);
    }

    fn on_pause(&mut self) {
        if self.stall.is_recovering() {
            return;
        }
        if self.transition(PlaybackState::Paused) {
            if let Some(progress) = self.progress.as_mut() {
                progress.on_pause(&self.engine, &mut self.outbox);
            }
        }
    }

    fn on_ended(&mut self) {
        if !self.transition(PlaybackState::Ended) {
            return;
        }
        self.stall.stop(&mut self.scheduler);
        self.skip.detach(&mut self.scheduler, &mut self.outbox);
        self.set_buffering(false);

        let completed = match self.progress.as_mut() {
            Some(progress) => {
                let completed = progress.on_ended(&self.engine, &mut self.outbox);
                progress.stop_tracking(&mut self.scheduler);
                completed
            }
            None => true,
        };
        tracing::info!(session = %self.id, completed, "episode ended");

        if self.settings.autoplay_next && self.config.next_episode_url.is_some() {
            self.countdown = Some(AUTO_NEXT_TICKS);
            self.outbox.push(SessionEvent::AutoNextCountdown {
                remaining: AUTO_NEXT_TICKS,
            });
            self.scheduler.arm(TimerSlot::AutoNextTick, AUTO_NEXT_TICK);
            self.scheduler.arm(TimerSlot::AutoNext, AUTO_NEXT_DELAY);
        }
    }

    /// Normalized playback tick shared by every time-driven child
    fn tick(&mut self) {
        if !self.attached {
            return;
        }
        let position = self.engine.current_time();
        self.skip.on_tick(
            position,
            self.settings.skip_intro,
            &mut self.scheduler,
            &mut self.outbox,
        );
        if !self.engine.is_paused() && self.state != PlaybackState::Stalled {
            self.set_buffering(false);
        }
    }

    fn set_buffering(&mut self, visible: bool) {
        if !visible {
            self.scheduler.cancel(TimerSlot::BufferingIndicator);
        }
        if self.buffering_visible != visible {
            self.buffering_visible = visible;
            self.outbox
                .push(SessionEvent::BufferingIndicator { visible });
        }
    }

    fn refresh_subtitles(&mut self) {
        if !self.attached {
            return;
        }
        let label = apply_selection(&mut self.engine, &self.settings, self.language_mode);
        if self.selected_subtitle.as_ref() != Some(&label) {
            tracing::debug!(session = %self.id, ?label, "subtitle selection changed");
            self.outbox
                .push(SessionEvent::SubtitleSelected { label: label.clone() });
            self.selected_subtitle = Some(label);
        }
    }

    fn maybe_restore(&mut self) {
        if !self.attached || self.engine.duration().is_none() {
            return;
        }
        let touch = self.is_touch();
        if let Some(progress) = self.progress.as_mut() {
            progress.try_restore(
                &mut self.engine,
                &self.settings,
                touch,
                &mut self.scheduler,
                &mut self.outbox,
            );
        }
    }

    // -------------------------------------------------------------------------
    // Timers
    // -------------------------------------------------------------------------

    /// Advance the session clock to `now`, firing due timers in order
    pub fn advance_to(&mut self, now: Duration) {
        while let Some(token) = self.scheduler.pop_due(now) {
            self.on_timer(token);
        }
        self.scheduler.settle(now);
    }

    /// Advance the session clock by `by`
    pub fn advance(&mut self, by: Duration) {
        let target = self.scheduler.now() + by;
        self.advance_to(target);
    }

    fn on_timer(&mut self, token: TimerToken) {
        tracing::trace!(session = %self.id, slot = %token.slot, "timer fired");
        match token.slot {
            TimerSlot::IntroSkip => {
                self.skip
                    .on_timer(SkipKind::Intro, &mut self.engine, &mut self.outbox);
            }
            TimerSlot::OutroSkip => {
                self.skip
                    .on_timer(SkipKind::Outro, &mut self.engine, &mut self.outbox);
            }
            TimerSlot::StallSample => self.on_stall_sample(),
            TimerSlot::StallResume => {
                if self.stall.finish_recovery(&mut self.engine) {
                    self.transition(PlaybackState::Recovered);
                    self.transition(PlaybackState::Playing);
                } else {
                    self.transition(PlaybackState::Paused);
                }
            }
            TimerSlot::ProgressSave => {
                if let Some(progress) = self.progress.as_mut() {
                    progress.on_interval(&self.engine);
                }
            }
            TimerSlot::AutoNextTick => {
                if let Some(remaining) = self.countdown.as_mut() {
                    if *remaining > 1 {
                        *remaining -= 1;
                        let remaining = *remaining;
                        self.outbox
                            .push(SessionEvent::AutoNextCountdown { remaining });
                        if remaining > 1 {
                            self.scheduler.arm(TimerSlot::AutoNextTick, AUTO_NEXT_TICK);
                        }
                    }
                }
            }
            TimerSlot::AutoNext => self.fire_auto_next(),
            TimerSlot::BufferingIndicator => self.set_buffering(true),
            TimerSlot::ResumePromptHide => {
                if let Some(progress) = self.progress.as_mut() {
                    progress.on_prompt_timeout(&mut self.outbox);
                }
            }
        }
    }

    fn on_stall_sample(&mut self) {
        match self.stall.sample(&mut self.engine, &mut self.scheduler) {
            SampleOutcome::Recovering { seek_to } => {
                self.transition(PlaybackState::Stalled);
                self.set_buffering(true);
                self.outbox.push(SessionEvent::StallRecovery {
                    seek_to,
                    resume: true,
                });
            }
            SampleOutcome::Suppressed { count } if count >= STALL_SAMPLE_THRESHOLD => {
                if self.transition(PlaybackState::Stalled) {
                    tracing::warn!(session = %self.id, "still stalled after recovery");
                }
                self.set_buffering(true);
            }
            SampleOutcome::Healthy => {
                if self.state == PlaybackState::Stalled {
                    self.transition(PlaybackState::Playing);
                }
                if self.state == PlaybackState::Playing {
                    self.set_buffering(false);
                }
            }
            SampleOutcome::Skipped
            | SampleOutcome::Stalled { .. }
            | SampleOutcome::Suppressed { .. } => {}
        }
    }

    fn fire_auto_next(&mut self) {
        // A cancel that landed before this point leaves no countdown
        if self.countdown.take().is_none() {
            return;
        }
        self.scheduler.cancel(TimerSlot::AutoNextTick);

        // Read the live setting, not the one from when the countdown began
        if !self.settings.autoplay_next {
            tracing::debug!(session = %self.id, "autoplay disabled during countdown");
            self.outbox.push(SessionEvent::AutoNextCancelled);
            return;
        }
        if let Some(url) = self.config.next_episode_url.clone() {
            tracing::info!(session = %self.id, %url, "opening next episode");
            self.outbox.push(SessionEvent::Navigate { url });
        }
    }

    // -------------------------------------------------------------------------
    // User actions
    // -------------------------------------------------------------------------

    /// Merge a partial settings update and re-apply subtitles immediately
    pub fn update_settings(&mut self, patch: SettingsPatch) {
        if self.state == PlaybackState::Destroyed || patch.is_empty() {
            return;
        }
        self.settings = self.settings.merged(&patch);
        if let Err(e) = self.settings_store.persist(&patch) {
            tracing::warn!(session = %self.id, error = %e, "settings not persisted");
        }
        tracing::debug!(session = %self.id, version = self.settings.version, "settings updated");

        if self.attached {
            if patch.touches_subtitles() {
                self.engine.apply_subtitle_style(SubtitleStyle {
                    background: self.settings.subtitle_background,
                });
                self.refresh_subtitles();
            }
            if patch.skip_intro.is_some() {
                self.tick();
            }
        }
    }

    /// Click on a visible skip button
    pub fn skip(&mut self, kind: SkipKind) -> bool {
        if !self.attached || self.state.is_terminal() {
            return false;
        }
        self.skip
            .skip_now(kind, &mut self.engine, &mut self.scheduler, &mut self.outbox)
    }

    /// Stop a running next-episode countdown
    pub fn cancel_auto_next(&mut self) {
        if self.countdown.take().is_some() {
            self.scheduler.cancel(TimerSlot::AutoNextTick);
            self.scheduler.cancel(TimerSlot::AutoNext);
            tracing::debug!(session = %self.id, "auto-next cancelled");
            self.outbox.push(SessionEvent::AutoNextCancelled);
        }
    }

    /// Answer the touch-device resume prompt
    pub fn resume_choice(&mut self, resume: bool) {
        if let Some(progress) = self.progress.as_mut() {
            progress.resume_choice(
                resume,
                &mut self.engine,
                &mut self.scheduler,
                &mut self.outbox,
            );
        }
    }

    /// Restart the episode from zero
    pub fn restart(&mut self) {
        if let Some(progress) = self.progress.as_mut() {
            progress.restart(&mut self.engine);
        }
    }

    /// Choose a server for this session's candidates
    pub fn select_server(&self, candidates: &[ServerCandidate]) -> String {
        self.servers.select_best_server(candidates)
    }

    /// Persist a server switch and ask the page to reload
    pub fn switch_server(&mut self, name: &str) {
        if self.state == PlaybackState::Destroyed {
            return;
        }
        self.servers.switch_server(name, &mut self.outbox);
    }

    /// Dispatch a user action
    pub fn handle_action(&mut self, action: UserAction) {
        match action {
            UserAction::Skip { window } => {
                self.skip(window);
            }
            UserAction::CancelAutoNext => self.cancel_auto_next(),
            UserAction::UpdateSettings { patch } => self.update_settings(patch),
            UserAction::ResumeChoice { resume } => self.resume_choice(resume),
            UserAction::SwitchServer { server } => self.switch_server(&server),
            UserAction::Seek { position } => {
                if !self.state.is_terminal() {
                    self.engine.seek(position.max(0.0));
                    self.tick();
                }
            }
            UserAction::Play => {
                if !self.state.is_terminal() {
                    self.engine.play();
                }
            }
            UserAction::Pause => {
                if !self.state.is_terminal() {
                    self.stall.abandon_resume();
                    self.engine.pause();
                }
            }
            UserAction::Unload => self.page_unload(),
            UserAction::Destroy => self.destroy(),
        }
    }
}

impl<E: MediaEngine> Drop for PlaybackSessionController<E> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use PlaybackState::*;
        assert!(Uninitialized.can_transition_to(Loading));
        assert!(Playing.can_transition_to(Stalled));
        assert!(!Paused.can_transition_to(Stalled));
        assert!(!Ready.can_transition_to(Stalled));
        assert!(Loading.can_transition_to(Failed));
        assert!(!Ended.can_transition_to(Playing));
        assert!(Ended.can_transition_to(Destroyed));
        assert!(!Destroyed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Playing));
    }

    #[test]
    fn test_terminal_states() {
        assert!(PlaybackState::Ended.is_terminal());
        assert!(PlaybackState::Failed.is_terminal());
        assert!(!PlaybackState::Stalled.is_terminal());
    }
}
