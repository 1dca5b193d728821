//! Backend sync client
//!
//! The narrow slice of the site backend the player talks to: who is signed
//! in, the watched-episode tally, and the preferred server.

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Default backend base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
/// Default path for server preference sync
pub const DEFAULT_SERVER_PREFERENCE_PATH: &str = "/api/preferences/server";

/// Signed-in user as returned by `/api/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl CurrentUser {
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Serialize)]
struct WatchlistUpdate<'a> {
    anime_id: &'a str,
    action: &'a str,
    watched_episodes: u32,
}

#[derive(Debug, Serialize)]
struct ServerPreferenceBody<'a> {
    server: &'a str,
}

/// Response body of the update endpoints
#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the collaborator endpoints
#[derive(Debug, Clone)]
pub struct SyncClient {
    base_url: String,
    server_preference_path: String,
    client: reqwest::Client,
}

impl SyncClient {
    /// Create a client against the default backend
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            server_preference_path: DEFAULT_SERVER_PREFERENCE_PATH.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_server_preference_path(mut self, path: impl Into<String>) -> Self {
        let path: String = path.into();
        self.server_preference_path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Signed-in user, or `None` when signed out
    pub async fn current_user(&self) -> Result<Option<CurrentUser>> {
        let url = format!("{}/api/me", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach backend")?;

        match response.status() {
            StatusCode::OK => {
                let user = response
                    .json::<CurrentUser>()
                    .await
                    .context("Failed to parse user response")?;
                Ok(Some(user))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => anyhow::bail!("Backend returned HTTP {} for /api/me", status),
        }
    }

    /// Report the completed-episode tally for one anime
    pub async fn update_watched_episodes(&self, anime_id: &str, watched_episodes: u32) -> Result<()> {
        let url = format!("{}/api/watchlist/update", self.base_url);
        let body = WatchlistUpdate {
            anime_id,
            action: "episodes",
            watched_episodes,
        };
        self.post(&url, &body).await
    }

    /// Store the preferred server on the backend
    pub async fn sync_server_preference(&self, server: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, self.server_preference_path);
        self.post(&url, &ServerPreferenceBody { server }).await
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to reach backend")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Backend returned HTTP {}", status);
        }

        // Some endpoints answer 200 with `success: false`
        let text = response.text().await.unwrap_or_default();
        if let Ok(parsed) = serde_json::from_str::<UpdateResponse>(&text) {
            if parsed.success == Some(false) {
                anyhow::bail!(
                    "Backend rejected update: {}",
                    parsed.message.unwrap_or_else(|| "no reason given".to_string())
                );
            }
        }
        Ok(())
    }
}

impl Default for SyncClient {
    fn default() -> Self {
        Self::new()
    }
}
