//! Typed events in and out of a playback session
//!
//! Inbound: [`MediaEvent`] normalizes the engine's event stream and
//! [`UserAction`] covers the controls. Outbound: [`SessionEvent`]s queue in an
//! [`Outbox`] the host drains after every call.

use serde::{Deserialize, Serialize};

use crate::models::SkipKind;
use crate::settings::SettingsPatch;

use super::session::PlaybackState;

/// Events reported by the engine/media element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MediaEvent {
    /// Manifest parsed, engine ready to play
    Ready,
    LoadedMetadata,
    CanPlay,
    Play,
    Playing,
    Pause,
    TimeUpdate,
    Waiting,
    Ended,
    TextTracksChanged,
    /// A subtitle file failed to load; logged only
    SubtitleLoadFailed { label: String },
    Error {
        fatal: bool,
        #[serde(default)]
        details: String,
    },
}

/// User-initiated controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UserAction {
    Skip { window: SkipKind },
    CancelAutoNext,
    UpdateSettings { patch: SettingsPatch },
    ResumeChoice { resume: bool },
    SwitchServer { server: String },
    Seek { position: f64 },
    Play,
    Pause,
    Unload,
    Destroy,
}

/// User-visible error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Missing or invalid manifest URL; never retried
    FatalConfig,
    /// Manifest or network failure from the engine; never retried
    TransportFatal,
}

/// Events the session emits for the host page and collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    StateChanged {
        from: PlaybackState,
        to: PlaybackState,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
    SubtitleSelected {
        label: Option<String>,
    },
    SkipControl {
        window: SkipKind,
        visible: bool,
    },
    Skipped {
        window: SkipKind,
        to: f64,
        auto: bool,
    },
    BufferingIndicator {
        visible: bool,
    },
    StallRecovery {
        seek_to: f64,
        resume: bool,
    },
    ResumePrompt {
        position: f64,
    },
    ResumePromptHidden,
    Resumed {
        position: f64,
    },
    AutoNextCountdown {
        remaining: u32,
    },
    AutoNextCancelled,
    Navigate {
        url: String,
    },
    /// Reload the page so the backend re-resolves the manifest
    Reload {
        server: String,
    },
    /// Collaborator: watch-history update with the completed tally
    WatchedEpisodes {
        anime_id: String,
        watched_episodes: u32,
    },
    /// Collaborator: fire-and-forget server preference sync
    ServerPreference {
        server: String,
    },
}

impl SessionEvent {
    /// Whether the event is meant for a backend collaborator
    pub fn is_collaborator(&self) -> bool {
        matches!(
            self,
            SessionEvent::WatchedEpisodes { .. } | SessionEvent::ServerPreference { .. }
        )
    }
}

/// Ordered queue of outbound events
#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<SessionEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SessionEvent) {
        tracing::trace!(?event, "session event");
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionEvent> {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_event_wire_format() {
        let event: MediaEvent =
            serde_json::from_str(r#"{"type":"error","fatal":true,"details":"manifestLoadError"}"#)
                .unwrap();
        assert_eq!(
            event,
            MediaEvent::Error {
                fatal: true,
                details: "manifestLoadError".into()
            }
        );
        let ready: MediaEvent = serde_json::from_str(r#"{"type":"ready"}"#).unwrap();
        assert_eq!(ready, MediaEvent::Ready);
    }

    #[test]
    fn test_user_action_wire_format() {
        let action: UserAction =
            serde_json::from_str(r#"{"type":"skip","window":"outro"}"#).unwrap();
        assert_eq!(
            action,
            UserAction::Skip {
                window: SkipKind::Outro
            }
        );
    }

    #[test]
    fn test_outbox_drain_empties() {
        let mut outbox = Outbox::new();
        outbox.push(SessionEvent::AutoNextCancelled);
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox.drain(), vec![SessionEvent::AutoNextCancelled]);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_collaborator_events() {
        assert!(SessionEvent::ServerPreference {
            server: "hd-2".into()
        }
        .is_collaborator());
        assert!(!SessionEvent::AutoNextCancelled.is_collaborator());
    }
}
