//! Scripted sessions on the simulated engine
//!
//! A script is a session config plus timestamped steps. The virtual clock
//! moves in fixed quanta; while the engine is playing its playhead advances
//! with the clock and a `time-update` is fed after every quantum.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{Platform, SessionConfig};
use crate::player::{
    EngineUpdate, MediaEngine, MediaEvent, PlaybackSessionController, PlaybackState,
    SessionEvent, SessionOptions, SimulatedEngine, UserAction,
};
use crate::settings::SettingsPatch;
use crate::storage::{KeyValueStore, MemoryStore, StorageError};

/// Virtual-clock step between playhead updates
pub const QUANTUM: Duration = Duration::from_millis(250);

/// One input at a virtual time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayStep {
    pub at_ms: u64,
    #[serde(flatten)]
    pub input: StepInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepInput {
    Media(MediaEvent),
    Action(UserAction),
    /// Poke the simulated engine (position, buffer, duration, paused)
    Engine(EngineUpdate),
}

/// Complete replay script
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayScript {
    pub config: SessionConfig,
    /// Media duration in seconds; fully buffered unless `buffered` is set
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub buffered: Option<f64>,
    #[serde(default)]
    pub platform: Platform,
    /// Settings applied to the store before the session starts
    #[serde(default)]
    pub settings: Option<SettingsPatch>,
    /// Raw store entries to seed (e.g. `watchProgress`, `preferredServer`)
    #[serde(default)]
    pub store: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub steps: Vec<ReplayStep>,
    /// Keep the clock running until this time after the last step
    #[serde(default)]
    pub until_ms: Option<u64>,
}

impl ReplayScript {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Seed a fresh in-memory store from `store` and `settings`
    pub fn seeded_store(&self) -> Result<Arc<dyn KeyValueStore>, StorageError> {
        let store = MemoryStore::new();
        for (key, value) in &self.store {
            let raw = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            store.set(key, &raw)?;
        }
        let store: Arc<dyn KeyValueStore> = Arc::new(store);
        if let Some(patch) = &self.settings {
            crate::settings::SettingsStore::new(store.clone()).persist(patch)?;
        }
        Ok(store)
    }
}

/// Event stamped with the virtual time it was emitted at
#[derive(Debug, Clone, PartialEq)]
pub struct StampedEvent {
    pub at: Duration,
    pub event: SessionEvent,
}

/// What a replay produced
pub struct ReplayOutcome {
    pub session: PlaybackSessionController<SimulatedEngine>,
    pub events: Vec<StampedEvent>,
}

impl ReplayOutcome {
    pub fn final_state(&self) -> PlaybackState {
        self.session.state()
    }

    pub fn contains(&self, pred: impl Fn(&SessionEvent) -> bool) -> bool {
        self.events.iter().any(|e| pred(&e.event))
    }
}

/// Steps a session and its simulated engine through virtual time
pub struct Replayer {
    session: PlaybackSessionController<SimulatedEngine>,
    events: Vec<StampedEvent>,
}

impl Replayer {
    pub fn new(session: PlaybackSessionController<SimulatedEngine>) -> Self {
        Self {
            session,
            events: Vec::new(),
        }
    }

    pub fn session(&self) -> &PlaybackSessionController<SimulatedEngine> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PlaybackSessionController<SimulatedEngine> {
        &mut self.session
    }

    fn collect(&mut self) {
        let at = self.session.now();
        self.events.extend(
            self.session
                .drain_events()
                .into_iter()
                .map(|event| StampedEvent { at, event }),
        );
    }

    /// Run the clock forward to `target`, moving the playhead while playing
    pub fn run_until(&mut self, target: Duration) {
        while self.session.now() < target {
            let step = QUANTUM.min(target - self.session.now());
            let playing = !self.session.engine().is_paused()
                && !self.session.state().is_terminal()
                && self.session.state() != PlaybackState::Uninitialized;
            if playing {
                let before = self.session.engine().current_time();
                self.session.engine_mut().advance(step.as_secs_f64());
                self.session.advance(step);
                if self.session.engine().current_time() != before {
                    self.session.handle_media_event(MediaEvent::TimeUpdate);
                }
                if self.reached_end() {
                    self.session.engine_mut().paused = true;
                    self.session.handle_media_event(MediaEvent::Ended);
                }
            } else {
                self.session.advance(step);
            }
            self.collect();
        }
    }

    fn reached_end(&self) -> bool {
        let engine = self.session.engine();
        !self.session.state().is_terminal()
            && engine
                .duration()
                .is_some_and(|d| d > 0.0 && engine.current_time() >= d)
    }

    /// Apply one input at the current virtual time
    pub fn apply(&mut self, input: StepInput) {
        match input {
            StepInput::Media(event) => {
                self.mirror_engine(&event);
                self.session.handle_media_event(event);
            }
            StepInput::Action(action) => {
                let echo = match action {
                    UserAction::Play => Some(MediaEvent::Play),
                    UserAction::Pause => Some(MediaEvent::Pause),
                    _ => None,
                };
                self.session.handle_action(action);
                // The simulated engine has no event loop of its own
                if let Some(event) = echo {
                    self.session.handle_media_event(event);
                }
            }
            StepInput::Engine(update) => {
                self.session.engine_mut().apply(&update);
                self.session.handle_media_event(MediaEvent::TimeUpdate);
            }
        }
        self.collect();
    }

    /// Keep the simulated engine's play/pause flag in step with scripted events
    fn mirror_engine(&mut self, event: &MediaEvent) {
        let engine = self.session.engine_mut();
        match event {
            MediaEvent::Play | MediaEvent::Playing => engine.paused = false,
            MediaEvent::Pause | MediaEvent::Ended => engine.paused = true,
            _ => {}
        }
    }

    pub fn finish(mut self) -> ReplayOutcome {
        self.collect();
        ReplayOutcome {
            session: self.session,
            events: self.events,
        }
    }
}

/// Run `script` against a fresh simulated engine
pub fn run_script(
    script: &ReplayScript,
    store: Arc<dyn KeyValueStore>,
    options: SessionOptions,
) -> ReplayOutcome {
    let mut engine = match script.duration {
        Some(d) => SimulatedEngine::with_duration(d),
        None => SimulatedEngine::new(),
    };
    if let Some(buffered) = script.buffered {
        engine.buffered_end = Some(buffered);
    }

    let session = PlaybackSessionController::new(engine, store)
        .with_platform(script.platform)
        .with_options(options);
    let mut replayer = Replayer::new(session);

    tracing::info!(session = %replayer.session().id(), steps = script.steps.len(), "replaying script");
    if replayer.session_mut().initialize(script.config.clone()) {
        let mut steps = script.steps.clone();
        steps.sort_by_key(|s| s.at_ms);
        for step in steps {
            replayer.run_until(Duration::from_millis(step.at_ms));
            replayer.apply(step.input);
        }
        if let Some(until) = script.until_ms {
            replayer.run_until(Duration::from_millis(until));
        }
    }
    replayer.collect();
    replayer.finish()
}
