//! Tokio driver for a playback session
//!
//! Runs a [`PlaybackSessionController`] against wall-clock time. Host inputs
//! arrive over an mpsc channel, a `tokio::time::interval` advances the
//! session clock, and emitted events are forwarded to the host. Backend
//! sync calls run as detached tasks; their failures are only logged.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use crate::api::SyncClient;

use super::engine::MediaEngine;
use super::events::{MediaEvent, SessionEvent, UserAction};
use super::session::{PlaybackSessionController, PlaybackState};

/// How often the session clock is advanced
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Input accepted by a running driver
#[derive(Debug, Clone, PartialEq)]
pub enum DriverInput {
    Media(MediaEvent),
    Action(UserAction),
    /// Destroy the session and stop the driver
    Shutdown,
}

/// Owns a session and the collaborator client
pub struct SessionDriver<E: MediaEngine + Send + 'static> {
    session: PlaybackSessionController<E>,
    sync: Option<SyncClient>,
    tick: Duration,
}

/// Host side of a spawned driver
pub struct DriverHandle {
    inputs: mpsc::UnboundedSender<DriverInput>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    task: JoinHandle<()>,
}

impl<E: MediaEngine + Send + 'static> SessionDriver<E> {
    pub fn new(session: PlaybackSessionController<E>) -> Self {
        Self {
            session,
            sync: None,
            tick: DEFAULT_TICK,
        }
    }

    /// Forward watched-episode and server-preference events to the backend
    pub fn with_sync(mut self, client: SyncClient) -> Self {
        self.sync = Some(client);
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Start the driver on the current runtime
    pub fn spawn(self) -> DriverHandle {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(input_rx, event_tx));
        DriverHandle {
            inputs: input_tx,
            events: event_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<DriverInput>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) {
        let started = Instant::now();
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut pending = JoinSet::new();

        tracing::debug!(session = %self.session.id(), "driver started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.session.advance_to(started.elapsed());
                }
                input = inputs.recv() => match input {
                    Some(DriverInput::Media(event)) => self.session.handle_media_event(event),
                    Some(DriverInput::Action(action)) => self.session.handle_action(action),
                    Some(DriverInput::Shutdown) | None => self.session.destroy(),
                },
            }

            for event in self.session.drain_events() {
                if event.is_collaborator() {
                    self.dispatch(&event, &mut pending);
                }
                // Host may have stopped listening; keep running regardless
                let _ = events.send(event);
            }

            reap_finished(&mut pending);

            if self.session.state() == PlaybackState::Destroyed {
                break;
            }
        }

        while let Some(result) = pending.join_next().await {
            log_sync_result(result);
        }
        tracing::debug!(session = %self.session.id(), "driver stopped");
    }

    fn dispatch(&self, event: &SessionEvent, pending: &mut JoinSet<()>) {
        let Some(client) = self.sync.clone() else {
            return;
        };
        match event.clone() {
            SessionEvent::WatchedEpisodes {
                anime_id,
                watched_episodes,
            } => {
                pending.spawn(async move {
                    match client.current_user().await {
                        Ok(Some(_)) => {}
                        Ok(None) => {
                            tracing::debug!("not signed in, skipping watchlist sync");
                            return;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "could not check sign-in state");
                            return;
                        }
                    }
                    match client
                        .update_watched_episodes(&anime_id, watched_episodes)
                        .await
                    {
                        Ok(()) => tracing::info!(%anime_id, watched_episodes, "watchlist synced"),
                        Err(e) => tracing::warn!(%anime_id, error = %e, "watchlist sync failed"),
                    }
                });
            }
            SessionEvent::ServerPreference { server } => {
                pending.spawn(async move {
                    if let Err(e) = client.sync_server_preference(&server).await {
                        tracing::warn!(%server, error = %e, "server preference sync failed");
                    }
                });
            }
            _ => {}
        }
    }
}

impl DriverHandle {
    /// Queue a media event; `false` once the driver has stopped
    pub fn media(&self, event: MediaEvent) -> bool {
        self.inputs.send(DriverInput::Media(event)).is_ok()
    }

    /// Queue a user action; `false` once the driver has stopped
    pub fn action(&self, action: UserAction) -> bool {
        self.inputs.send(DriverInput::Action(action)).is_ok()
    }

    /// Next emitted event; `None` after the driver stopped and drained
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Events already delivered, without waiting
    pub fn try_events(&mut self) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    /// Destroy the session, wait for pending sync calls, return remaining events
    pub async fn shutdown(mut self) -> Vec<SessionEvent> {
        let _ = self.inputs.send(DriverInput::Shutdown);
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "driver task failed");
        }
        self.try_events()
    }
}

/// Drop sync tasks that already finished; returns how many were collected
fn reap_finished(pending: &mut JoinSet<()>) -> usize {
    let mut reaped = 0;
    while let Some(result) = pending.try_join_next() {
        log_sync_result(result);
        reaped += 1;
    }
    reaped
}

fn log_sync_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "sync task panicked");
    }
}
