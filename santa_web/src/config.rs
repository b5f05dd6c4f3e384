//! Command-line configuration for the web server.

use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::Parser;
use santa_core::{DEFAULT_LAYOUT, DEFAULT_MAX_MOVES, SantaGame};

use crate::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL, SessionStore};

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Santa's Delivery Run web server", long_about = None)]
pub struct Args {
    /// Host interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to serve on
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    /// Map file to load instead of the built-in map
    #[arg(short, long, value_name = "MAP_FILE")]
    pub map: Option<PathBuf>,

    /// Moves Santa may make before the night ends
    #[arg(long, default_value_t = DEFAULT_MAX_MOVES)]
    pub max_moves: u32,

    /// Sessions kept in memory before the least recently used is evicted
    #[arg(long, default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    /// Seconds a session may sit idle before it is forgotten
    #[arg(long, default_value_t = DEFAULT_SESSION_TTL.as_secs())]
    pub session_ttl_secs: u64,
}

impl Args {
    /// Builds the game every new session starts from.
    pub fn load_game(&self) -> anyhow::Result<SantaGame> {
        let layout = match &self.map {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read map file {}", path.display()))?,
            None => DEFAULT_LAYOUT.to_string(),
        };
        SantaGame::new(&layout, self.max_moves).context("Failed to load map")
    }

    /// Builds the session store with the configured limits.
    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.max_sessions, Duration::from_secs(self.session_ttl_secs))
    }
}
