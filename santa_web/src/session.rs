//! Per-session snapshot storage.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use log::{debug, error, warn};
use santa_core::SantaGame;

/// Sessions kept before the least recently used one is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Sessions idle longer than this are dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

const SESSION_ID_LEN: usize = 32;

#[derive(Debug)]
struct Entry {
    json: String,
    last_seen: Instant,
}

/// Maps session ids to serialized games.
///
/// Games are kept as snapshot JSON, the same form a cookie or external store
/// would hold, so every request goes through a full restore. The store holds
/// at most `max_sessions` entries and forgets sessions idle for `ttl`.
#[derive(Debug)]
pub struct SessionStore {
    snapshots: Mutex<HashMap<String, Entry>>,
    max_sessions: usize,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::new(DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL)
    }
}

/// Generates a new random session id.
pub fn new_session_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Whether `id` has the shape [`new_session_id`] produces.
pub fn is_valid_session_id(id: &str) -> bool {
    id.len() == SESSION_ID_LEN && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl SessionStore {
    pub fn new(max_sessions: usize, ttl: Duration) -> Self {
        SessionStore {
            snapshots: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            ttl,
        }
    }

    /// Loads the session's game (or a copy of `fresh` if there is none or it
    /// can't be restored), runs `f` on it and stores the result.
    ///
    /// The store stays locked for the whole call, so requests for the same
    /// session never interleave.
    pub fn with_game<T>(
        &self,
        session_id: &str,
        fresh: &SantaGame,
        f: impl FnOnce(&mut SantaGame) -> T,
    ) -> T {
        let mut snapshots = self.snapshots.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        let mut game = match snapshots.get(session_id) {
            Some(entry) if now.duration_since(entry.last_seen) <= self.ttl => {
                SantaGame::from_json(&entry.json).unwrap_or_else(|err| {
                    warn!("discarding corrupt snapshot for session {session_id}: {err}");
                    fresh.clone()
                })
            }
            _ => fresh.clone(),
        };

        let result = f(&mut game);
        self.store(&mut snapshots, session_id, &game, now);
        result
    }

    /// Replaces the session's game outright.
    pub fn replace(&self, session_id: &str, game: &SantaGame) {
        let mut snapshots = self.snapshots.lock().unwrap_or_else(PoisonError::into_inner);
        self.store(&mut snapshots, session_id, game, Instant::now());
    }

    /// Raw snapshot JSON for a session, if any.
    pub fn snapshot_json(&self, session_id: &str) -> Option<String> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .map(|entry| entry.json.clone())
    }

    /// Stores raw snapshot JSON without validating it.
    pub fn insert_json(&self, session_id: &str, json: String) {
        let mut snapshots = self.snapshots.lock().unwrap_or_else(PoisonError::into_inner);
        self.insert_entry(&mut snapshots, session_id, json, Instant::now());
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(
        &self,
        snapshots: &mut HashMap<String, Entry>,
        session_id: &str,
        game: &SantaGame,
        now: Instant,
    ) {
        match game.to_json() {
            Ok(json) => self.insert_entry(snapshots, session_id, json, now),
            Err(err) => error!("failed to serialize game for session {session_id}: {err}"),
        }
    }

    fn insert_entry(
        &self,
        snapshots: &mut HashMap<String, Entry>,
        session_id: &str,
        json: String,
        now: Instant,
    ) {
        if !snapshots.contains_key(session_id) {
            snapshots.retain(|_, entry| now.duration_since(entry.last_seen) <= self.ttl);

            if snapshots.len() >= self.max_sessions {
                let oldest = snapshots
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_seen)
                    .map(|(id, _)| id.clone());
                if let Some(id) = oldest {
                    debug!("evicting session {id}");
                    snapshots.remove(&id);
                }
            }
        }

        snapshots.insert(
            session_id.to_string(),
            Entry {
                json,
                last_seen: now,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;

    use super::*;

    #[test]
    fn session_ids_are_unique_hex() {
        let a = new_session_id();
        let b = new_session_id();
        assert_eq!(a.len(), 32);
        assert!(is_valid_session_id(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn only_generated_ids_are_valid() {
        assert!(is_valid_session_id("0123456789abcdef0123456789abcdef"));
        assert!(!is_valid_session_id("0123456789ABCDEF0123456789ABCDEF"));
        assert!(!is_valid_session_id("abc123"));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id(&"a".repeat(1 << 20)));
        assert!(!is_valid_session_id("0123456789abcdef0123456789abcdeg"));
    }

    #[test]
    fn games_persist_per_session() {
        let store = SessionStore::default();
        let fresh = SantaGame::default();

        store.with_game("alice", &fresh, |game| game.move_santa("e"));
        store.with_game("alice", &fresh, |game| game.move_santa("e"));
        let moves = store.with_game("alice", &fresh, |game| game.moves());
        assert_eq!(moves, 2);

        let other = store.with_game("bob", &fresh, |game| game.moves());
        assert_eq!(other, 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn corrupt_snapshot_falls_back_to_fresh_game() {
        let store = SessionStore::default();
        store.insert_json("alice", "{\"bag\": 1}".to_string());

        let moves = store.with_game("alice", &SantaGame::default(), |game| game.moves());
        assert_eq!(moves, 0);
        let json = store.snapshot_json("alice").unwrap();
        assert!(SantaGame::from_json(&json).is_ok());
    }

    #[test]
    fn replace_overwrites() {
        let store = SessionStore::default();
        let fresh = SantaGame::default();
        store.with_game("alice", &fresh, |game| game.move_santa("s"));
        store.replace("alice", &fresh);
        assert_eq!(store.with_game("alice", &fresh, |game| game.moves()), 0);
    }

    #[test]
    fn store_size_is_capped() {
        let store = SessionStore::new(3, DEFAULT_SESSION_TTL);
        let fresh = SantaGame::default();

        for id in 0..1000 {
            store.with_game(&format!("s{id}"), &fresh, |game| game.moves());
        }
        assert_eq!(store.len(), 3);
        assert!(store.snapshot_json("s999").is_some());
    }

    #[test]
    fn least_recently_used_session_is_evicted() {
        let store = SessionStore::new(2, DEFAULT_SESSION_TTL);
        let fresh = SantaGame::default();

        store.with_game("first", &fresh, |game| game.move_santa("s"));
        sleep(Duration::from_millis(5));
        store.with_game("second", &fresh, |game| game.moves());
        sleep(Duration::from_millis(5));
        // Touching "first" makes "second" the oldest.
        store.with_game("first", &fresh, |game| game.moves());
        sleep(Duration::from_millis(5));
        store.with_game("third", &fresh, |game| game.moves());

        assert_eq!(store.len(), 2);
        assert!(store.snapshot_json("second").is_none());
        assert_eq!(store.with_game("first", &fresh, |game| game.moves()), 1);
    }

    #[test]
    fn idle_sessions_expire() {
        let store = SessionStore::new(100, Duration::from_millis(20));
        let fresh = SantaGame::default();

        store.with_game("idle", &fresh, |game| game.move_santa("s"));
        sleep(Duration::from_millis(50));

        // An expired session restarts even though its entry is still around.
        assert_eq!(store.with_game("idle", &fresh, |game| game.moves()), 0);

        store.with_game("a", &fresh, |game| game.moves());
        sleep(Duration::from_millis(50));
        store.with_game("b", &fresh, |game| game.moves());
        assert_eq!(store.len(), 1);
    }
}
