//! Streaming server selection
//!
//! Picks a mirror from what the backend says is available and remembers the
//! user's choice. Switching reloads the page so the backend re-resolves the
//! manifest; nothing here fetches or validates manifests.

use std::sync::Arc;

use crate::models::ServerCandidate;
use crate::storage::{KeyValueStore, StorageError};

use super::events::{Outbox, SessionEvent};

/// Storage key for the preferred server name
pub const PREFERRED_SERVER_KEY: &str = "preferredServer";

/// Known servers, best first
pub const SERVER_PRIORITY: &[&str] = &[
    "hd-2",
    "hd-1",
    "hd-3",
    "megacloud",
    "vidstreaming",
    "vidcloud",
    "streamtape",
];

/// Used when the backend offers no servers at all
pub const DEFAULT_SERVER: &str = "hd-1";

/// Chooses and persists the preferred server
#[derive(Clone)]
pub struct ServerSelector {
    store: Arc<dyn KeyValueStore>,
}

impl ServerSelector {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persisted preference, if any
    pub fn preferred(&self) -> Option<String> {
        match self.store.get(PREFERRED_SERVER_KEY) {
            Ok(value) => value
                .map(|v| v.trim().trim_matches('"').to_string())
                .filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "preferred server unreadable");
                None
            }
        }
    }

    /// Pick a server: stored preference, then priority list, then first
    /// available, then [`DEFAULT_SERVER`]
    pub fn select_best_server(&self, candidates: &[ServerCandidate]) -> String {
        let available: Vec<&str> = candidates
            .iter()
            .filter(|c| c.available)
            .map(|c| c.name.as_str())
            .collect();

        if let Some(preferred) = self.preferred() {
            if available.iter().any(|name| name.eq_ignore_ascii_case(&preferred)) {
                tracing::debug!(server = %preferred, "using preferred server");
                return preferred;
            }
            tracing::debug!(server = %preferred, "preferred server not offered");
        }

        if let Some(name) = SERVER_PRIORITY
            .iter()
            .find_map(|known| available.iter().find(|name| name.eq_ignore_ascii_case(known)))
        {
            return name.to_string();
        }

        available
            .first()
            .map(|name| name.to_string())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string())
    }

    fn persist(&self, name: &str) -> Result<(), StorageError> {
        self.store.set(PREFERRED_SERVER_KEY, name)
    }

    /// Store `name` only when no preference exists yet
    pub fn remember_if_unset(&self, name: &str) {
        if self.preferred().is_some() {
            return;
        }
        match self.persist(name) {
            Ok(()) => tracing::debug!(server = name, "stored first working server"),
            Err(e) => tracing::warn!(server = name, error = %e, "could not store server"),
        }
    }

    /// Explicit user switch: persist, sync, and ask the page to reload
    pub fn switch_server(&self, name: &str, outbox: &mut Outbox) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        if let Err(e) = self.persist(name) {
            tracing::warn!(server = name, error = %e, "could not persist server switch");
        }
        tracing::info!(server = name, "switching server");
        outbox.push(SessionEvent::ServerPreference {
            server: name.to_string(),
        });
        outbox.push(SessionEvent::Reload {
            server: name.to_string(),
        });
    }
}
