//! Backend Sync Client Tests
//!
//! Exercises the collaborator endpoints against a mock backend.

use mockito::{Matcher, Server};
use serde_json::json;
use tokio_test::assert_ok;

use episodeplay::api::SyncClient;

// =============================================================================
// Sign-in State
// =============================================================================

#[tokio::test]
async fn test_current_user_signed_in() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/me")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"_id":"65f0c1","username":"himmel","email":"himmel@hero.party"}"#)
        .create_async()
        .await;

    let client = SyncClient::with_base_url(server.url());
    let user = client.current_user().await.unwrap().unwrap();
    assert_eq!(user.id.as_deref(), Some("65f0c1"));
    assert_eq!(user.display_name(), "himmel");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_current_user_signed_out() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/me")
        .with_status(401)
        .with_body(r#"{"error":"Not authenticated"}"#)
        .create_async()
        .await;

    let client = SyncClient::with_base_url(server.url());
    assert!(client.current_user().await.unwrap().is_none());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_current_user_server_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/me")
        .with_status(500)
        .create_async()
        .await;

    let client = SyncClient::with_base_url(server.url());
    assert!(client.current_user().await.is_err());
}

// =============================================================================
// Watchlist
// =============================================================================

#[tokio::test]
async fn test_update_watched_episodes_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/watchlist/update")
        .match_body(Matcher::Json(json!({
            "anime_id": "frieren-18542",
            "action": "episodes",
            "watched_episodes": 4
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true,"message":"Updated"}"#)
        .create_async()
        .await;

    let client = SyncClient::with_base_url(server.url());
    assert_ok!(client.update_watched_episodes("frieren-18542", 4).await);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_update_rejected_by_backend() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/watchlist/update")
        .with_status(200)
        .with_body(r#"{"success":false,"message":"Anime not in watchlist"}"#)
        .create_async()
        .await;

    let client = SyncClient::with_base_url(server.url());
    let err = client
        .update_watched_episodes("frieren-18542", 1)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Anime not in watchlist"));
}

#[tokio::test]
async fn test_update_http_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/watchlist/update")
        .with_status(401)
        .create_async()
        .await;

    let client = SyncClient::with_base_url(server.url());
    assert!(client
        .update_watched_episodes("frieren-18542", 1)
        .await
        .is_err());
}

// =============================================================================
// Server Preference
// =============================================================================

#[tokio::test]
async fn test_server_preference_default_path() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/preferences/server")
        .match_body(Matcher::Json(json!({"server": "megacloud"})))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = SyncClient::with_base_url(server.url());
    assert_ok!(client.sync_server_preference("megacloud").await);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_preference_custom_path() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/user/server")
        .with_status(204)
        .create_async()
        .await;

    let client = SyncClient::with_base_url(format!("{}/", server.url()))
        .with_server_preference_path("api/user/server");
    assert_ok!(client.sync_server_preference("hd-2").await);

    mock.assert_async().await;
}
