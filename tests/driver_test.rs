//! Session Driver Tests
//!
//! Runs sessions on the tokio driver. Backend calls go to a mock server;
//! countdown timing runs on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;

use episodeplay::api::SyncClient;
use episodeplay::models::SessionConfig;
use episodeplay::player::{
    MediaEvent, PlaybackSessionController, PlaybackState, SessionDriver, SessionEvent,
    SimulatedEngine, UserAction,
};
use episodeplay::storage::{KeyValueStore, MemoryStore};

fn config(next: Option<&str>) -> SessionConfig {
    SessionConfig {
        manifest_url: Some("https://cdn.test/frieren/3/master.m3u8".into()),
        anime_id: "frieren-18542".into(),
        episode_id: "3".into(),
        episode_number: Some(3),
        episode_param: Some("ep=3-sub".into()),
        next_episode_url: next.map(str::to_string),
        server: Some("hd-1".into()),
        ..Default::default()
    }
}

fn session(next: Option<&str>) -> PlaybackSessionController<SimulatedEngine> {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut session = PlaybackSessionController::new(SimulatedEngine::with_duration(600.0), store);
    assert!(session.initialize(config(next)));
    session
}

// =============================================================================
// Collaborator Sync
// =============================================================================

#[tokio::test]
async fn test_ended_syncs_watchlist_when_signed_in() {
    let mut server = Server::new_async().await;
    let me = server
        .mock("GET", "/api/me")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"_id":"65f0c1","username":"himmel"}"#)
        .create_async()
        .await;
    let update = server
        .mock("POST", "/api/watchlist/update")
        .match_body(Matcher::Json(json!({
            "anime_id": "frieren-18542",
            "action": "episodes",
            "watched_episodes": 1
        })))
        .with_status(200)
        .with_body(r#"{"success":true}"#)
        .expect(1)
        .create_async()
        .await;

    let handle = SessionDriver::new(session(None))
        .with_sync(SyncClient::with_base_url(server.url()))
        .spawn();
    handle.media(MediaEvent::Ready);
    handle.media(MediaEvent::Playing);
    handle.media(MediaEvent::Ended);
    let events = handle.shutdown().await;

    assert!(events.contains(&SessionEvent::WatchedEpisodes {
        anime_id: "frieren-18542".into(),
        watched_episodes: 1,
    }));
    assert!(events.contains(&SessionEvent::StateChanged {
        from: PlaybackState::Ended,
        to: PlaybackState::Destroyed,
    }));

    me.assert_async().await;
    update.assert_async().await;
}

#[tokio::test]
async fn test_signed_out_skips_watchlist() {
    let mut server = Server::new_async().await;
    let me = server
        .mock("GET", "/api/me")
        .with_status(401)
        .create_async()
        .await;
    let update = server
        .mock("POST", "/api/watchlist/update")
        .expect(0)
        .create_async()
        .await;

    let handle = SessionDriver::new(session(None))
        .with_sync(SyncClient::with_base_url(server.url()))
        .spawn();
    handle.media(MediaEvent::Ready);
    handle.media(MediaEvent::Playing);
    handle.media(MediaEvent::Ended);
    handle.shutdown().await;

    me.assert_async().await;
    update.assert_async().await;
}

#[tokio::test]
async fn test_server_switch_synced_and_reload_requested() {
    let mut server = Server::new_async().await;
    let pref = server
        .mock("POST", "/api/preferences/server")
        .match_body(Matcher::Json(json!({"server": "megacloud"})))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let handle = SessionDriver::new(session(None))
        .with_sync(SyncClient::with_base_url(server.url()))
        .spawn();
    handle.media(MediaEvent::Ready);
    handle.action(UserAction::SwitchServer {
        server: "megacloud".into(),
    });
    let events = handle.shutdown().await;

    assert!(events.contains(&SessionEvent::Reload {
        server: "megacloud".into()
    }));
    pref.assert_async().await;
}

#[tokio::test]
async fn test_backend_down_does_not_affect_playback() {
    // Nothing listens here; every sync call fails and is only logged
    let handle = SessionDriver::new(session(None))
        .with_sync(SyncClient::with_base_url("http://127.0.0.1:9"))
        .spawn();
    handle.media(MediaEvent::Ready);
    handle.media(MediaEvent::Playing);
    handle.media(MediaEvent::Ended);
    let events = handle.shutdown().await;

    assert!(events.contains(&SessionEvent::StateChanged {
        from: PlaybackState::Playing,
        to: PlaybackState::Ended,
    }));
}

// =============================================================================
// Timing
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_countdown_navigates_after_five_seconds() {
    let mut handle = SessionDriver::new(session(Some("/watch/frieren-18542?ep=4-sub"))).spawn();
    handle.media(MediaEvent::Ready);
    handle.media(MediaEvent::Playing);
    handle.media(MediaEvent::Ended);
    let ended_at = tokio::time::Instant::now();

    let mut countdown = Vec::new();
    loop {
        match handle.next_event().await {
            Some(SessionEvent::AutoNextCountdown { remaining }) => countdown.push(remaining),
            Some(SessionEvent::Navigate { url }) => {
                assert_eq!(url, "/watch/frieren-18542?ep=4-sub");
                break;
            }
            Some(_) => {}
            None => panic!("driver stopped before navigating"),
        }
    }

    assert_eq!(countdown, vec![3, 2, 1]);
    assert!(ended_at.elapsed() >= Duration::from_secs(5));
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_countdown() {
    let mut handle = SessionDriver::new(session(Some("/watch/frieren-18542?ep=4-sub"))).spawn();
    handle.media(MediaEvent::Ready);
    handle.media(MediaEvent::Playing);
    handle.media(MediaEvent::Ended);

    loop {
        match handle.next_event().await {
            Some(SessionEvent::AutoNextCountdown { remaining: 3 }) => break,
            Some(_) => {}
            None => panic!("driver stopped before the countdown"),
        }
    }
    handle.action(UserAction::CancelAutoNext);
    tokio::time::sleep(Duration::from_secs(10)).await;

    let events = handle.shutdown().await;
    assert!(events.contains(&SessionEvent::AutoNextCancelled));
    assert!(!events
        .iter()
        .any(|e| matches!(e, SessionEvent::Navigate { .. })));
}

#[tokio::test]
async fn test_shutdown_destroys_session() {
    let handle = SessionDriver::new(session(None)).spawn();
    handle.media(MediaEvent::Ready);
    let events = handle.shutdown().await;
    assert_eq!(
        events.last(),
        Some(&SessionEvent::StateChanged {
            from: PlaybackState::Ready,
            to: PlaybackState::Destroyed,
        })
    );
}
