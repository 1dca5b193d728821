//! Subtitle Track Tests
//!
//! Descriptor screening, label derivation, default marking, and runtime
//! selection against a simulated engine.

use episodeplay::models::{LanguageMode, RawSubtitleDescriptor, TrackKind, TrackMode};
use episodeplay::player::subtitles::{apply_selection, Rejection};
use episodeplay::player::{MediaEngine, SimulatedEngine, SubtitleTrackResolver};
use episodeplay::settings::Settings;

fn file(src: &str) -> RawSubtitleDescriptor {
    RawSubtitleDescriptor {
        file: Some(src.to_string()),
        ..Default::default()
    }
}

fn labelled(src: &str, label: &str) -> RawSubtitleDescriptor {
    RawSubtitleDescriptor {
        label: Some(label.to_string()),
        ..file(src)
    }
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn test_at_most_one_default() {
    let resolver = SubtitleTrackResolver::new();
    let raw = vec![
        labelled("https://cdn.test/a.vtt", "English"),
        labelled("https://cdn.test/b.vtt", "English [CC]"),
        RawSubtitleDescriptor {
            default: Some(true),
            ..labelled("https://cdn.test/c.vtt", "Spanish")
        },
    ];
    let tracks = resolver.resolve(&raw, "English", LanguageMode::Sub);
    assert_eq!(tracks.len(), 3);
    assert_eq!(tracks.iter().filter(|t| t.is_default).count(), 1);
    assert!(tracks[0].is_default);
    assert_eq!(tracks[0].mode, TrackMode::Showing);
    // The raw default flag carries no weight
    assert!(!tracks[2].is_default);
}

#[test]
fn test_no_default_for_dub() {
    let resolver = SubtitleTrackResolver::new();
    let raw = vec![labelled("https://cdn.test/a.vtt", "English")];
    let tracks = resolver.resolve(&raw, "English", LanguageMode::Dub);
    assert!(tracks.iter().all(|t| !t.is_default));
}

#[test]
fn test_no_default_without_english_preference() {
    let resolver = SubtitleTrackResolver::new();
    let raw = vec![labelled("https://cdn.test/a.vtt", "English")];
    let tracks = resolver.resolve(&raw, "Japanese", LanguageMode::Sub);
    assert!(!tracks[0].is_default);
}

#[test]
fn test_all_rejected_gives_empty_list() {
    let resolver = SubtitleTrackResolver::new();
    let raw = vec![
        RawSubtitleDescriptor::default(),
        labelled("https://cdn.test/thumbnails.vtt", "Thumbnails"),
        file("https://cdn.test/sprite-0.png"),
        RawSubtitleDescriptor {
            kind: Some("chapters".into()),
            ..file("https://cdn.test/ch.vtt")
        },
    ];
    assert!(resolver
        .resolve(&raw, "English", LanguageMode::Sub)
        .is_empty());
}

#[test]
fn test_rejection_reasons() {
    let resolver = SubtitleTrackResolver::new();
    assert_eq!(
        resolver.screen(&RawSubtitleDescriptor::default()),
        Err(Rejection::MissingSource)
    );
    assert_eq!(
        resolver.screen(&labelled("https://cdn.test/p.vtt", "Poster frames")),
        Err(Rejection::NonSubtitleMarker)
    );
    assert_eq!(
        resolver.screen(&file("https://cdn.test/thumb.webp?token=1")),
        Err(Rejection::ImageSource)
    );
    assert_eq!(
        resolver.screen(&RawSubtitleDescriptor {
            kind: Some("Captions".into()),
            ..file("https://cdn.test/en.vtt")
        }),
        Ok(("https://cdn.test/en.vtt".to_string(), TrackKind::Captions))
    );
}

#[test]
fn test_url_field_accepted() {
    let resolver = SubtitleTrackResolver::new();
    let raw = vec![RawSubtitleDescriptor {
        url: Some("https://cdn.test/subs/fre.vtt".into()),
        lang: Some("french".into()),
        ..Default::default()
    }];
    let tracks = resolver.resolve(&raw, "English", LanguageMode::Sub);
    assert_eq!(tracks[0].src, "https://cdn.test/subs/fre.vtt");
    assert_eq!(tracks[0].label, "French");
    assert_eq!(tracks[0].language, "fr");
}

// =============================================================================
// Labels
// =============================================================================

#[test]
fn test_label_from_filename() {
    let resolver = SubtitleTrackResolver::new();
    let raw = vec![
        file("https://cdn.test/subs/eng-2.vtt"),
        file("https://cdn.test/subs/spa-3.vtt"),
        file("https://cdn.test/subs/zh-hant.vtt"),
    ];
    let labels: Vec<_> = resolver
        .resolve(&raw, "English", LanguageMode::Sub)
        .into_iter()
        .map(|t| t.label)
        .collect();
    assert_eq!(labels, vec!["English", "Spanish", "Chinese - Traditional"]);
}

#[test]
fn test_numbered_label_counts_accepted_tracks() {
    let resolver = SubtitleTrackResolver::new();
    let raw = vec![
        labelled("https://cdn.test/thumbnails.vtt", "thumbnails"),
        file("https://cdn.test/subs/0001.vtt"),
        file("https://cdn.test/subs/0002.vtt"),
    ];
    let tracks = resolver.resolve(&raw, "English", LanguageMode::Sub);
    assert_eq!(tracks[0].label, "Subtitle 1");
    assert_eq!(tracks[1].label, "Subtitle 2");
    assert_eq!(tracks[0].language, "su");
}

#[test]
fn test_label_title_cased() {
    let resolver = SubtitleTrackResolver::new();
    let raw = vec![labelled("https://cdn.test/x.vtt", "portuguese - brazilian")];
    let tracks = resolver.resolve(&raw, "English", LanguageMode::Sub);
    assert_eq!(tracks[0].label, "Portuguese - Brazilian");
    assert_eq!(tracks[0].language, "pt");
}

// =============================================================================
// Runtime Selection
// =============================================================================

fn engine_with(labels: &[&str]) -> SimulatedEngine {
    let resolver = SubtitleTrackResolver::new();
    let raw: Vec<_> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| labelled(&format!("https://cdn.test/{}.vtt", i), label))
        .collect();
    let mut engine = SimulatedEngine::with_duration(1440.0);
    for track in resolver.resolve(&raw, "none", LanguageMode::Sub) {
        engine.add_text_track(&track);
    }
    engine
}

#[test]
fn test_selection_prefers_setting_then_first() {
    let mut engine = engine_with(&["Spanish", "English", "German"]);
    let settings = Settings::default();
    assert_eq!(
        apply_selection(&mut engine, &settings, LanguageMode::Sub).as_deref(),
        Some("English")
    );

    let settings = Settings {
        subtitle_language: "Klingon".into(),
        ..Settings::default()
    };
    assert_eq!(
        apply_selection(&mut engine, &settings, LanguageMode::Sub).as_deref(),
        Some("Spanish")
    );
    assert_eq!(engine.showing_count(), 1);
}

#[test]
fn test_selection_force_off() {
    let mut engine = engine_with(&["English"]);
    let settings = Settings {
        force_subtitles_off: true,
        ..Settings::default()
    };
    assert_eq!(apply_selection(&mut engine, &settings, LanguageMode::Sub), None);
    assert_eq!(engine.showing_count(), 0);
}

#[test]
fn test_selection_with_no_tracks() {
    let mut engine = SimulatedEngine::with_duration(1440.0);
    assert_eq!(
        apply_selection(&mut engine, &Settings::default(), LanguageMode::Sub),
        None
    );
}
