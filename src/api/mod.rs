//! API clients for external services
//!
//! - Sync: signed-in user, watched-episode tally, server preference

pub mod sync;

pub use sync::{CurrentUser, SyncClient};
