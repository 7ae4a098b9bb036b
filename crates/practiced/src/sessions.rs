//! Registry of logged-in practice sessions, keyed by bearer token.
//!
//! LRU-bounded with an idle timeout. Expired entries are dropped when they
//! are looked up and on every insert.

use lru::LruCache;
use practice_common::PracticeSession;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// One session context; its mutex serializes that user's actions
pub type SessionHandle = Arc<Mutex<PracticeSession>>;

struct SessionEntry {
    session: SessionHandle,
    last_seen: Instant,
}

pub struct SessionRegistry {
    sessions: Mutex<LruCache<Uuid, SessionEntry>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    /// * `capacity` - Maximum number of live sessions; the least recently used is evicted
    /// * `idle_timeout` - Sessions untouched for this long are dropped
    pub fn new(capacity: usize, idle_timeout: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            idle_timeout,
        }
    }

    /// Register a session and return its token
    pub async fn create(&self, session: PracticeSession) -> Uuid {
        let token = Uuid::new_v4();
        let mut sessions = self.sessions.lock().await;
        Self::evict_expired(&mut sessions, self.idle_timeout);

        if let Some((evicted, _)) = sessions.push(
            token,
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_seen: Instant::now(),
            },
        ) {
            debug!("Session registry full, evicted {}", mask_token(&evicted));
        }
        token
    }

    /// Look up a live session and mark it as used
    pub async fn get(&self, token: &Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        let expired = match sessions.get_mut(token) {
            Some(entry) if now.duration_since(entry.last_seen) < self.idle_timeout => {
                entry.last_seen = now;
                return Some(Arc::clone(&entry.session));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            sessions.pop(token);
            debug!("Session {} expired", mask_token(token));
        }
        None
    }

    /// Log out. Returns false when the token was unknown.
    pub async fn remove(&self, token: &Uuid) -> bool {
        self.sessions.lock().await.pop(token).is_some()
    }

    pub async fn len(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        Self::evict_expired(&mut sessions, self.idle_timeout);
        sessions.len()
    }

    fn evict_expired(sessions: &mut LruCache<Uuid, SessionEntry>, idle_timeout: Duration) {
        let now = Instant::now();
        let stale: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_seen) >= idle_timeout)
            .map(|(token, _)| *token)
            .collect();
        for token in stale {
            sessions.pop(&token);
        }
    }
}

/// Mask a token for logs: only the first 8 characters are shown
pub fn mask_token(token: &Uuid) -> String {
    let text = token.to_string();
    format!("{}...", &text[..8])
}
