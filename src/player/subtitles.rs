//! Subtitle track resolution and runtime selection
//!
//! [`SubtitleTrackResolver`] turns the host page's loose descriptors into a
//! canonical track list once per session. [`apply_selection`] re-runs on every
//! metadata load, play and track-list change to keep exactly one track showing.

use regex::Regex;

use crate::models::{LanguageMode, RawSubtitleDescriptor, SubtitleTrack, TrackKind, TrackMode};
use crate::settings::Settings;

use super::engine::MediaEngine;

/// Markers of text tracks that are not subtitles
const NON_SUBTITLE_MARKERS: &[&str] = &[
    "thumbnail",
    "poster",
    "sprite",
    "preview",
    "metadata",
    "chapter",
];

/// Image sources are thumbnail sprites, never subtitles
const IMAGE_SOURCE_PATTERN: &str = r"(?i)\.(?:jpe?g|png|gif|webp|bmp|svg|avif)(?:[?#].*)?$";

/// Filename language patterns, checked in this order
const FILENAME_LANGUAGES: &[(&str, &str)] = &[
    ("English", r"(?i)(?:^|[^a-z])(?:en|eng|english)(?:[^a-z]|$)"),
    (
        "Chinese - Traditional",
        r"(?i)(?:chinese[^a-z]*trad(?:itional)?|zh[-_]?(?:tw|hk|hant)|(?:^|[^a-z])cht(?:[^a-z]|$))",
    ),
    ("Korean", r"(?i)(?:^|[^a-z])(?:ko|kor|korean)(?:[^a-z]|$)"),
    ("Japanese", r"(?i)(?:^|[^a-z])(?:ja|jp|jpn|japanese)(?:[^a-z]|$)"),
    ("Spanish", r"(?i)(?:^|[^a-z])(?:es|spa|spanish|espanol|español)(?:[^a-z]|$)"),
    ("French", r"(?i)(?:^|[^a-z])(?:fr|fre|fra|french)(?:[^a-z]|$)"),
    ("German", r"(?i)(?:^|[^a-z])(?:de|ger|deu|german)(?:[^a-z]|$)"),
    ("Italian", r"(?i)(?:^|[^a-z])(?:it|ita|italian)(?:[^a-z]|$)"),
    ("Portuguese", r"(?i)(?:^|[^a-z])(?:pt|por|pt[-_]br|portuguese)(?:[^a-z]|$)"),
    ("Russian", r"(?i)(?:^|[^a-z])(?:ru|rus|russian)(?:[^a-z]|$)"),
    ("Arabic", r"(?i)(?:^|[^a-z])(?:ar|ara|arabic)(?:[^a-z]|$)"),
    ("Indonesian", r"(?i)(?:^|[^a-z])(?:id|ind|indonesian)(?:[^a-z]|$)"),
    ("Thai", r"(?i)(?:^|[^a-z])(?:th|tha|thai)(?:[^a-z]|$)"),
    ("Vietnamese", r"(?i)(?:^|[^a-z])(?:vi|vie|vietnamese)(?:[^a-z]|$)"),
    (
        "Chinese - Simplified",
        r"(?i)(?:chinese|zh[-_]?(?:cn|hans)|(?:^|[^a-z])(?:chs|chi|zho|zh)(?:[^a-z]|$))",
    ),
];

/// Label → language code, used for exact then substring matching
const LANGUAGE_CODES: &[(&str, &str)] = &[
    ("english", "en"),
    ("chinese - traditional", "zh"),
    ("chinese - simplified", "zh"),
    ("chinese", "zh"),
    ("korean", "ko"),
    ("japanese", "ja"),
    ("spanish", "es"),
    ("español", "es"),
    ("french", "fr"),
    ("german", "de"),
    ("italian", "it"),
    ("portuguese", "pt"),
    ("russian", "ru"),
    ("arabic", "ar"),
    ("hindi", "hi"),
    ("indonesian", "id"),
    ("malay", "ms"),
    ("thai", "th"),
    ("vietnamese", "vi"),
    ("turkish", "tr"),
    ("polish", "pl"),
    ("dutch", "nl"),
    ("swedish", "sv"),
];

/// Why a descriptor was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingSource,
    UnsupportedKind,
    NonSubtitleMarker,
    ImageSource,
}

/// Normalizes raw descriptors into canonical subtitle tracks
pub struct SubtitleTrackResolver {
    image_source: Option<Regex>,
    filename_languages: Vec<(&'static str, Regex)>,
}

impl SubtitleTrackResolver {
    pub fn new() -> Self {
        let filename_languages = FILENAME_LANGUAGES
            .iter()
            .filter_map(|(label, pattern)| Regex::new(pattern).ok().map(|re| (*label, re)))
            .collect();

        Self {
            image_source: Regex::new(IMAGE_SOURCE_PATTERN).ok(),
            filename_languages,
        }
    }

    /// Resolve descriptors into tracks, marking at most one as default
    ///
    /// # Arguments
    /// * `raw` - Descriptors from the host page, in page order
    /// * `preferred_label` - The user's preferred subtitle language label
    /// * `mode` - Session language mode; dub sessions get no default
    pub fn resolve(
        &self,
        raw: &[RawSubtitleDescriptor],
        preferred_label: &str,
        mode: LanguageMode,
    ) -> Vec<SubtitleTrack> {
        let mut tracks: Vec<SubtitleTrack> = Vec::new();

        for (raw_index, descriptor) in raw.iter().enumerate() {
            let (src, kind) = match self.screen(descriptor) {
                Ok(accepted) => accepted,
                Err(reason) => {
                    tracing::debug!(index = raw_index, ?reason, "subtitle descriptor rejected");
                    continue;
                }
            };

            let label = self.derive_label(descriptor, &src, tracks.len());
            let language = language_code(&label);
            tracks.push(SubtitleTrack {
                src,
                language,
                label,
                is_default: false,
                kind,
                mode: TrackMode::Disabled,
            });
        }

        let wants_english =
            mode == LanguageMode::Sub && preferred_label.to_lowercase().contains("english");
        if wants_english {
            if let Some(track) = tracks.iter_mut().find(|t| {
                t.label.to_lowercase().contains("english") && t.language.starts_with("en")
            }) {
                track.is_default = true;
                track.mode = TrackMode::Showing;
            }
        }

        tracing::debug!(
            accepted = tracks.len(),
            rejected = raw.len() - tracks.len(),
            "subtitle tracks resolved"
        );
        tracks
    }

    /// Apply the rejection rules in order; first match wins
    pub fn screen(
        &self,
        descriptor: &RawSubtitleDescriptor,
    ) -> Result<(String, TrackKind), Rejection> {
        let src = descriptor.source().ok_or(Rejection::MissingSource)?;

        let kind = match descriptor.kind.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => TrackKind::parse(k).ok_or(Rejection::UnsupportedKind)?,
            _ => TrackKind::Subtitles,
        };

        let has_marker = [descriptor.label.as_deref(), descriptor.lang.as_deref()]
            .into_iter()
            .flatten()
            .map(str::to_lowercase)
            .any(|text| NON_SUBTITLE_MARKERS.iter().any(|m| text.contains(m)));
        if has_marker {
            return Err(Rejection::NonSubtitleMarker);
        }

        if self
            .image_source
            .as_ref()
            .map(|re| re.is_match(src))
            .unwrap_or(false)
        {
            return Err(Rejection::ImageSource);
        }

        Ok((src.to_string(), kind))
    }

    /// Title-cased label, filename language, or `Subtitle N`
    fn derive_label(&self, descriptor: &RawSubtitleDescriptor, src: &str, index: usize) -> String {
        if let Some(label) = descriptor.label_or_lang() {
            return title_case(label);
        }

        if let Some(label) = self.language_from_filename(src) {
            return label.to_string();
        }

        format!("Subtitle {}", index + 1)
    }

    /// First language pattern matching the source filename
    pub fn language_from_filename(&self, src: &str) -> Option<&'static str> {
        let path = src.split(['?', '#']).next().unwrap_or(src);
        let filename = path.rsplit('/').next().unwrap_or(path);
        let decoded = urlencoding::decode(filename)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| filename.to_string());

        self.filename_languages
            .iter()
            .find(|(_, re)| re.is_match(&decoded))
            .map(|(label, _)| *label)
    }
}

impl Default for SubtitleTrackResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Title-case each word, keeping `-` and whitespace separators as they are
pub fn title_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut at_word_start = true;
    for c in label.trim().chars() {
        if c == '-' || c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Derive a short language code from a display label
pub fn language_code(label: &str) -> String {
    let lower = label.trim().to_lowercase();

    if let Some((_, code)) = LANGUAGE_CODES.iter().find(|(name, _)| *name == lower) {
        return code.to_string();
    }

    if let Some((_, code)) = LANGUAGE_CODES.iter().find(|(name, _)| lower.contains(name)) {
        return code.to_string();
    }

    let letters: String = lower
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(2)
        .collect();
    if !letters.is_empty() {
        return letters;
    }

    "en".to_string()
}

// =============================================================================
// Runtime selection
// =============================================================================

/// Make the engine's subtitle tracks match settings and language mode
///
/// Force-off and dub disable everything. Otherwise the first track whose
/// label contains the preferred language wins, else the first subtitle
/// track. Only tracks whose mode differs are touched, so re-running with the
/// same inputs changes nothing. Returns the label left showing.
pub fn apply_selection<E: MediaEngine + ?Sized>(
    engine: &mut E,
    settings: &Settings,
    mode: LanguageMode,
) -> Option<String> {
    let tracks = engine.text_tracks();
    let subtitle_indices: Vec<usize> = tracks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_subtitle())
        .map(|(i, _)| i)
        .collect();

    let chosen = if settings.force_subtitles_off || mode == LanguageMode::Dub {
        None
    } else {
        let preferred = settings.subtitle_language.trim().to_lowercase();
        subtitle_indices
            .iter()
            .copied()
            .find(|&i| !preferred.is_empty() && tracks[i].label.to_lowercase().contains(&preferred))
            .or_else(|| subtitle_indices.first().copied())
    };

    for &i in &subtitle_indices {
        let wanted = if Some(i) == chosen {
            TrackMode::Showing
        } else {
            TrackMode::Disabled
        };
        if tracks[i].mode != wanted {
            engine.set_text_track_mode(i, wanted);
        }
    }

    chosen.map(|i| tracks[i].label.clone())
}
