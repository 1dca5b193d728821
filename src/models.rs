//! Data structures and types for episodeplay
//!
//! Contains the shared models used across the player organized by domain:
//! - **Session**: host-page session configuration and language mode
//! - **Skip**: intro/outro skip windows
//! - **Subtitles**: raw descriptors and resolved tracks
//! - **Progress**: per-episode watch position records
//! - **Servers**: streaming mirror candidates
//! - **Platform**: device capabilities that change resume behavior

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Session Models
// =============================================================================

/// Whether the episode is watched with subtitles or dubbed audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LanguageMode {
    #[default]
    Sub,
    Dub,
}

impl LanguageMode {
    /// Parse from a loose string ("sub", "DUB", "dubbed")
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        if s.starts_with("dub") {
            Some(LanguageMode::Dub)
        } else if s.starts_with("sub") {
            Some(LanguageMode::Sub)
        } else {
            None
        }
    }
}

impl fmt::Display for LanguageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageMode::Sub => write!(f, "sub"),
            LanguageMode::Dub => write!(f, "dub"),
        }
    }
}

/// Everything the host page hands over when a session starts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// HLS manifest URL (required, fatal when missing)
    #[serde(default)]
    pub manifest_url: Option<String>,
    #[serde(default, alias = "subtitles", alias = "tracks")]
    pub subtitle_descriptors: Vec<RawSubtitleDescriptor>,
    #[serde(default, alias = "intro")]
    pub intro_window: Option<SkipWindow>,
    #[serde(default, alias = "outro")]
    pub outro_window: Option<SkipWindow>,
    pub anime_id: String,
    pub episode_id: String,
    #[serde(default)]
    pub episode_number: Option<u32>,
    /// Page URL or raw `ep` query value, e.g. `/watch/x?ep=12345-dub`
    #[serde(default)]
    pub episode_param: Option<String>,
    /// Explicit language mode; derived from `episode_param` when absent
    #[serde(default)]
    pub language_mode: Option<LanguageMode>,
    #[serde(default)]
    pub next_episode_url: Option<String>,
    /// Server the manifest was resolved against
    #[serde(default)]
    pub server: Option<String>,
}

impl SessionConfig {
    /// Manifest URL if present and non-blank
    pub fn manifest(&self) -> Option<&str> {
        self.manifest_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Raw `ep` query value, whether given as a URL or bare
    pub fn episode_query(&self) -> Option<String> {
        let raw = self.episode_param.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }

        if !raw.contains('=') {
            return Some(raw.to_string());
        }

        let query = raw.split_once('?').map(|(_, q)| q).unwrap_or(raw);
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == "ep")
            .and_then(|(_, v)| urlencoding::decode(v).ok())
            .map(|v| v.into_owned())
            .filter(|v| !v.is_empty())
    }

    /// Language-variant suffix of the `ep` parameter (`12345-dub` → `dub`)
    pub fn language_variant(&self) -> String {
        self.episode_query()
            .and_then(|ep| {
                ep.split_once('-')
                    .map(|(_, suffix)| suffix.trim().to_lowercase())
            })
            .filter(|suffix| !suffix.is_empty())
            .unwrap_or_else(|| "default".to_string())
    }

    /// Effective language mode: explicit, then URL suffix, then fallback
    pub fn resolve_language_mode(&self, fallback: LanguageMode) -> LanguageMode {
        self.language_mode
            .or_else(|| LanguageMode::from_str_loose(&self.language_variant()))
            .unwrap_or(fallback)
    }
}

// =============================================================================
// Skip Windows
// =============================================================================

/// Which skippable segment a window covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipKind {
    Intro,
    Outro,
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipKind::Intro => write!(f, "intro"),
            SkipKind::Outro => write!(f, "outro"),
        }
    }
}

/// Time range in seconds eligible for skipping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkipWindow {
    pub start: f64,
    pub end: f64,
}

impl SkipWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Inclusive range check
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }

    /// A window is usable when finite, non-negative and non-empty
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.end > self.start
    }
}

impl fmt::Display for SkipWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.1}s - {:.1}s]", self.start, self.end)
    }
}

// =============================================================================
// Subtitle Models
// =============================================================================

/// Subtitle descriptor as delivered by the host page
///
/// Accepts both `file`/`url` and `lang`/`label` spellings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSubtitleDescriptor {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub default: Option<bool>,
}

impl RawSubtitleDescriptor {
    /// Source reference, preferring `file` over `url`
    pub fn source(&self) -> Option<&str> {
        non_blank(&self.file).or_else(|| non_blank(&self.url))
    }

    /// Display label, falling back to the language string
    pub fn label_or_lang(&self) -> Option<&str> {
        non_blank(&self.label).or_else(|| non_blank(&self.lang))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Text track kind accepted as subtitles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    #[default]
    Subtitles,
    Captions,
}

impl TrackKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "subtitles" => Some(TrackKind::Subtitles),
            "captions" => Some(TrackKind::Captions),
            _ => None,
        }
    }
}

/// Text track activation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackMode {
    #[default]
    Disabled,
    Hidden,
    Showing,
}

/// A resolved, canonical subtitle track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub src: String,
    /// Short language code, e.g. "en"
    pub language: String,
    pub label: String,
    pub is_default: bool,
    pub kind: TrackKind,
    pub mode: TrackMode,
}

impl fmt::Display for SubtitleTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let default = if self.is_default { " *" } else { "" };
        write!(f, "{} [{}]{}", self.label, self.language, default)
    }
}

// =============================================================================
// Progress Models
// =============================================================================

/// Composite storage key `{animeId}_{episodeId}_{languageVariant}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub anime_id: String,
    pub episode_id: String,
    pub variant: String,
}

impl ProgressKey {
    pub fn new(
        anime_id: impl Into<String>,
        episode_id: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            anime_id: anime_id.into(),
            episode_id: episode_id.into(),
            variant: variant.into(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.anime_id.clone(),
            config.episode_id.clone(),
            config.language_variant(),
        )
    }

    /// Prefix shared by every record of one anime
    pub fn anime_prefix(anime_id: &str) -> String {
        format!("{}_", anime_id)
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.anime_id, self.episode_id, self.variant)
    }
}

/// Ratio of watched/total at which an episode counts as completed
pub const COMPLETION_RATIO: f64 = 0.9;

/// Persisted watch state for one episode + language variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Anime the record belongs to, used for aggregate counts
    #[serde(default)]
    pub anime_id: String,
    pub watched: f64,
    pub total: f64,
    pub completed: bool,
    pub last_watched: DateTime<Utc>,
    #[serde(default)]
    pub episode_number: Option<u32>,
}

impl ProgressRecord {
    /// Zeroed record for an episode with no stored progress
    pub fn empty(anime_id: impl Into<String>, episode_number: Option<u32>) -> Self {
        Self {
            anime_id: anime_id.into(),
            watched: 0.0,
            total: 0.0,
            completed: false,
            last_watched: Utc::now(),
            episode_number,
        }
    }

    /// Watched fraction in 0.0-1.0, zero when total is unknown
    pub fn ratio(&self) -> f64 {
        if self.total > 0.0 {
            (self.watched / self.total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Whether watched/total crosses the completion ratio
    pub fn is_past_completion(watched: f64, total: f64) -> bool {
        total > 0.0 && watched / total >= COMPLETION_RATIO
    }
}

impl fmt::Display for ProgressRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ep = self
            .episode_number
            .map(|n| format!("Ep {} ", n))
            .unwrap_or_default();
        let done = if self.completed { " ✓" } else { "" };
        write!(
            f,
            "{}{:.0}s / {:.0}s ({:.0}%){}",
            ep,
            self.watched,
            self.total,
            self.ratio() * 100.0,
            done
        )
    }
}

// =============================================================================
// Server Models
// =============================================================================

/// Streaming server/mirror offered for an episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCandidate {
    pub name: String,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl ServerCandidate {
    pub fn new(name: impl Into<String>, available: bool) -> Self {
        Self {
            name: name.into(),
            available,
        }
    }
}

impl From<&str> for ServerCandidate {
    fn from(name: &str) -> Self {
        Self::new(name, true)
    }
}

impl fmt::Display for ServerCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.available {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} (unavailable)", self.name)
        }
    }
}

// =============================================================================
// Platform
// =============================================================================

/// Device capabilities reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    #[serde(default)]
    pub max_touch_points: u32,
    #[serde(default)]
    pub coarse_pointer: bool,
}

impl Platform {
    /// Touch detection heuristic; `threshold` is a tunable, not a contract
    pub fn is_touch_capable(&self, threshold: u32) -> bool {
        self.coarse_pointer || (threshold > 0 && self.max_touch_points >= threshold)
    }
}
