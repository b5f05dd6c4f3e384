//! HTTP front end for Santa's Delivery Run.
//!
//! Each browser session gets its own game, stored as a serialized snapshot
//! between requests.

pub mod config;
pub mod routes;
pub mod session;

use santa_core::SantaGame;

use crate::session::SessionStore;

/// Shared application state, injected into HTTP handlers.
pub struct AppState {
    /// Serialized game per session id.
    pub sessions: SessionStore,
    /// The game every new session starts from.
    pub template: SantaGame,
}

impl AppState {
    pub fn new(template: SantaGame) -> Self {
        Self::with_sessions(template, SessionStore::default())
    }

    pub fn with_sessions(template: SantaGame, sessions: SessionStore) -> Self {
        AppState {
            sessions,
            template,
        }
    }
}
