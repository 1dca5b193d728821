//! Persisted user playback settings
//!
//! Stored as one JSON object under the `settings` key. Updates are partial
//! merges: keys this crate does not know about (written by other parts of the
//! site) are carried through untouched. Components never read storage
//! directly; they get a [`SettingsSnapshot`] from the session.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::models::LanguageMode;
use crate::storage::{KeyValueStore, StorageError};

/// Storage key for the settings object
pub const SETTINGS_KEY: &str = "settings";

/// Subtitle cue background style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleBackground {
    None,
    #[default]
    Semi,
    Solid,
}

/// User playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Count down and open the next episode when one ends
    pub autoplay_next: bool,
    /// Auto-skip intro and outro windows
    pub skip_intro: bool,
    /// Resume from the stored position
    pub remember_position: bool,
    /// Initial volume (0.0 - 1.0)
    pub default_volume: f64,
    /// Default audio mode for new sessions
    pub preferred_language: LanguageMode,
    /// Subtitle label to prefer, matched as a case-insensitive substring
    pub subtitle_language: String,
    pub subtitle_background: SubtitleBackground,
    /// Disable every subtitle track regardless of language
    pub force_subtitles_off: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autoplay_next: true,
            skip_intro: false,
            remember_position: true,
            default_volume: 1.0,
            preferred_language: LanguageMode::Sub,
            subtitle_language: "English".to_string(),
            subtitle_background: SubtitleBackground::Semi,
            force_subtitles_off: false,
        }
    }
}

impl Settings {
    /// Whether English is the preferred subtitle language
    pub fn prefers_english_subtitles(&self) -> bool {
        self.subtitle_language.to_lowercase().contains("english")
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(v) = patch.autoplay_next {
            self.autoplay_next = v;
        }
        if let Some(v) = patch.skip_intro {
            self.skip_intro = v;
        }
        if let Some(v) = patch.remember_position {
            self.remember_position = v;
        }
        if let Some(v) = patch.default_volume {
            self.default_volume = clamp_volume(v);
        }
        if let Some(v) = patch.preferred_language {
            self.preferred_language = v;
        }
        if let Some(ref v) = patch.subtitle_language {
            self.subtitle_language = v.clone();
        }
        if let Some(v) = patch.subtitle_background {
            self.subtitle_background = v;
        }
        if let Some(v) = patch.force_subtitles_off {
            self.force_subtitles_off = v;
        }
    }
}

fn clamp_volume(v: f64) -> f64 {
    if v.is_nan() {
        Settings::default().default_volume
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Partial settings update; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoplay_next: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_intro: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember_position: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<LanguageMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_background: Option<SubtitleBackground>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_subtitles_off: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }

    /// Copy with out-of-range values pulled into range
    pub fn normalized(&self) -> SettingsPatch {
        SettingsPatch {
            default_volume: self.default_volume.map(clamp_volume),
            ..self.clone()
        }
    }

    /// Whether the patch changes anything subtitle display depends on
    pub fn touches_subtitles(&self) -> bool {
        self.subtitle_language.is_some()
            || self.subtitle_background.is_some()
            || self.force_subtitles_off.is_some()
    }
}

/// Immutable settings value with a version that bumps on every update
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
    pub version: u64,
    pub settings: Settings,
}

impl SettingsSnapshot {
    pub fn new(settings: Settings) -> Self {
        Self {
            version: 0,
            settings,
        }
    }

    /// Next version with `patch` applied
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        let mut settings = self.settings.clone();
        settings.apply(patch);
        Self {
            version: self.version + 1,
            settings,
        }
    }
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl std::ops::Deref for SettingsSnapshot {
    type Target = Settings;

    fn deref(&self) -> &Settings {
        &self.settings
    }
}

/// Loads and persists the settings object
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load settings, falling back to defaults on missing or unreadable data
    pub fn load(&self) -> SettingsSnapshot {
        let mut settings: Settings = match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "stored settings unreadable, using defaults");
                Settings::default()
            }),
            Ok(None) => Settings::default(),
            Err(e) => {
                tracing::warn!(error = %e, "settings storage unavailable, using defaults");
                Settings::default()
            }
        };
        settings.default_volume = clamp_volume(settings.default_volume);
        SettingsSnapshot::new(settings)
    }

    /// Merge `patch` into the stored object, keeping keys it does not name
    pub fn persist(&self, patch: &SettingsPatch) -> Result<(), StorageError> {
        let mut object = match self.store.get(SETTINGS_KEY)? {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            None => Map::new(),
        };

        if let Value::Object(changes) = serde_json::to_value(patch.normalized())? {
            for (key, value) in changes {
                object.insert(key, value);
            }
        }

        let json = serde_json::to_string(&Value::Object(object))?;
        self.store.set(SETTINGS_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.autoplay_next);
        assert!(s.remember_position);
        assert!(!s.force_subtitles_off);
        assert!(s.prefers_english_subtitles());
    }

    #[test]
    fn test_merged_bumps_version_and_keeps_other_fields() {
        let snap = SettingsSnapshot::default();
        let next = snap.merged(&SettingsPatch {
            skip_intro: Some(true),
            ..Default::default()
        });
        assert_eq!(next.version, 1);
        assert!(next.skip_intro);
        assert_eq!(next.subtitle_language, "English");
    }

    #[test]
    fn test_persist_preserves_unknown_keys() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(SETTINGS_KEY, r#"{"theme":"dark","autoplayNext":true}"#)
            .unwrap();

        let settings = SettingsStore::new(store.clone());
        settings
            .persist(&SettingsPatch {
                autoplay_next: Some(false),
                ..Default::default()
            })
            .unwrap();

        let raw: Value = serde_json::from_str(&store.get(SETTINGS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw["autoplayNext"], false);
        assert!(!settings.load().autoplay_next);
    }

    #[test]
    fn test_load_tolerates_partial_object() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(SETTINGS_KEY, r#"{"forceSubtitlesOff":true}"#)
            .unwrap();
        let snap = SettingsStore::new(store).load();
        assert!(snap.force_subtitles_off);
        assert!(snap.autoplay_next);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut s = Settings::default();
        s.apply(&SettingsPatch {
            default_volume: Some(3.0),
            ..Default::default()
        });
        assert_eq!(s.default_volume, 1.0);
    }

    #[test]
    fn test_persisted_volume_is_clamped() {
        let store = Arc::new(MemoryStore::new());
        let settings = SettingsStore::new(store.clone());
        settings
            .persist(&SettingsPatch {
                default_volume: Some(3.0),
                ..Default::default()
            })
            .unwrap();

        let raw: Value = serde_json::from_str(&store.get(SETTINGS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw["defaultVolume"], 1.0);
        assert_eq!(settings.load().default_volume, 1.0);

        store.set(SETTINGS_KEY, r#"{"defaultVolume":-2.5}"#).unwrap();
        assert_eq!(settings.load().default_volume, 0.0);
    }
}
