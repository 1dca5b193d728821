//! Media engine boundary
//!
//! The adaptive-bitrate engine and media element are driven, not
//! implemented, here. [`MediaEngine`] is the surface the session needs;
//! [`SimulatedEngine`] is an in-process stand-in used by tests and `replay`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{SubtitleTrack, TrackMode};
use crate::settings::SubtitleBackground;

/// Errors reported by the engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("Manifest load failed: {0}")]
    ManifestLoad(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Media error: {0}")]
    Media(String),
}

/// Text track as the engine exposes it (any kind, including metadata)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextTrackInfo {
    pub label: String,
    pub language: String,
    pub kind: String,
    pub mode: TrackMode,
}

impl TextTrackInfo {
    /// Subtitle and caption tracks take part in selection
    pub fn is_subtitle(&self) -> bool {
        matches!(self.kind.as_str(), "subtitles" | "captions")
    }
}

impl From<&SubtitleTrack> for TextTrackInfo {
    fn from(track: &SubtitleTrack) -> Self {
        let kind = match track.kind {
            crate::models::TrackKind::Subtitles => "subtitles",
            crate::models::TrackKind::Captions => "captions",
        };
        Self {
            label: track.label.clone(),
            language: track.language.clone(),
            kind: kind.to_string(),
            mode: track.mode,
        }
    }
}

/// Cue styling derived from settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    pub background: SubtitleBackground,
}

/// Media element + ABR engine handle
pub trait MediaEngine {
    /// Attach the engine and start loading the manifest
    fn load(&mut self, manifest_url: &str) -> Result<(), EngineError>;
    fn current_time(&self) -> f64;
    fn duration(&self) -> Option<f64>;
    fn is_paused(&self) -> bool;
    /// End of the buffered range containing (or last before) the playhead
    fn buffered_end(&self) -> Option<f64>;
    fn seek(&mut self, to: f64);
    fn play(&mut self);
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f64);
    fn add_text_track(&mut self, track: &SubtitleTrack);
    fn text_tracks(&self) -> Vec<TextTrackInfo>;
    fn set_text_track_mode(&mut self, index: usize, mode: TrackMode);
    fn apply_subtitle_style(&mut self, style: SubtitleStyle);
    /// Release the engine; further calls are no-ops
    fn destroy(&mut self);
}

// =============================================================================
// Simulated engine
// =============================================================================

/// Partial engine state update, used by replay scripts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineUpdate {
    #[serde(default)]
    pub position: Option<f64>,
    #[serde(default)]
    pub buffered_end: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub paused: Option<bool>,
}

/// Deterministic engine: the playhead moves only through [`advance`](Self::advance)
#[derive(Debug, Clone, Default)]
pub struct SimulatedEngine {
    pub position: f64,
    pub duration: Option<f64>,
    pub paused: bool,
    pub buffered_end: Option<f64>,
    pub volume: f64,
    pub tracks: Vec<TextTrackInfo>,
    pub style: Option<SubtitleStyle>,
    pub loaded_url: Option<String>,
    pub destroyed: bool,
    /// Make the next `load` fail
    pub fail_load: bool,
    /// Every seek target, in order
    pub seeks: Vec<f64>,
    pub play_calls: u32,
    pub pause_calls: u32,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self {
            paused: true,
            volume: 1.0,
            ..Default::default()
        }
    }

    /// Engine with known duration and everything buffered
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            buffered_end: Some(duration),
            ..Self::new()
        }
    }

    /// Move the playhead by `secs` if playing, never past buffered data
    pub fn advance(&mut self, secs: f64) {
        if self.paused || self.destroyed {
            return;
        }
        let limit = self
            .buffered_end
            .or(self.duration)
            .unwrap_or(f64::INFINITY);
        self.position = (self.position + secs).min(limit).max(self.position);
    }

    pub fn apply(&mut self, update: &EngineUpdate) {
        if let Some(p) = update.position {
            self.position = p;
        }
        if let Some(b) = update.buffered_end {
            self.buffered_end = Some(b);
        }
        if let Some(d) = update.duration {
            self.duration = Some(d);
        }
        if let Some(p) = update.paused {
            self.paused = p;
        }
    }

    /// Label of the single showing subtitle track, if any
    pub fn showing_label(&self) -> Option<&str> {
        self.tracks
            .iter()
            .find(|t| t.is_subtitle() && t.mode == TrackMode::Showing)
            .map(|t| t.label.as_str())
    }

    pub fn showing_count(&self) -> usize {
        self.tracks
            .iter()
            .filter(|t| t.is_subtitle() && t.mode == TrackMode::Showing)
            .count()
    }
}

impl MediaEngine for SimulatedEngine {
    fn load(&mut self, manifest_url: &str) -> Result<(), EngineError> {
        if self.fail_load {
            return Err(EngineError::ManifestLoad(manifest_url.to_string()));
        }
        self.loaded_url = Some(manifest_url.to_string());
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn buffered_end(&self) -> Option<f64> {
        self.buffered_end
    }

    fn seek(&mut self, to: f64) {
        if self.destroyed {
            return;
        }
        self.position = to.max(0.0);
        self.seeks.push(self.position);
    }

    fn play(&mut self) {
        if self.destroyed {
            return;
        }
        self.paused = false;
        self.play_calls += 1;
    }

    fn pause(&mut self) {
        if self.destroyed {
            return;
        }
        self.paused = true;
        self.pause_calls += 1;
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn add_text_track(&mut self, track: &SubtitleTrack) {
        self.tracks.push(TextTrackInfo::from(track));
    }

    fn text_tracks(&self) -> Vec<TextTrackInfo> {
        self.tracks.clone()
    }

    fn set_text_track_mode(&mut self, index: usize, mode: TrackMode) {
        if let Some(track) = self.tracks.get_mut(index) {
            track.mode = mode;
        }
    }

    fn apply_subtitle_style(&mut self, style: SubtitleStyle) {
        self.style = Some(style);
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.paused = true;
    }
}
