//! In-process session telemetry.
//!
//! Tracks login time per user so logout can report a session duration.
//! Advisory only: this map is never consulted for authorization and is lost
//! on restart. Entries expire after the configured idle TTL.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct SessionEntry {
    started_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionTracker {
    inner: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    ttl: Duration,
}

impl SessionTracker {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Record a login. A fresh login replaces any stale entry for the user.
    pub async fn login(&self, user_id: Uuid) {
        let now = Utc::now();
        let mut sessions = self.inner.write().await;
        sessions.insert(
            user_id,
            SessionEntry {
                started_at: now,
                last_seen: now,
            },
        );
    }

    /// Refresh the idle clock for an active session
    pub async fn touch(&self, user_id: Uuid) {
        let mut sessions = self.inner.write().await;
        if let Some(entry) = sessions.get_mut(&user_id) {
            entry.last_seen = Utc::now();
        }
    }

    /// End a session, returning its duration if one was being tracked
    pub async fn logout(&self, user_id: Uuid) -> Option<Duration> {
        let mut sessions = self.inner.write().await;
        sessions
            .remove(&user_id)
            .map(|entry| Utc::now() - entry.started_at)
    }

    pub async fn active_count(&self) -> usize {
        let cutoff = Utc::now() - self.ttl;
        let sessions = self.inner.read().await;
        sessions.values().filter(|e| e.last_seen >= cutoff).count()
    }

    /// Background task that prunes idle entries on an interval, so the map
    /// cannot grow without bound for users who never log out
    pub fn spawn_pruner(&self, every: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let pruned = tracker.prune_expired().await;
                if pruned > 0 {
                    tracing::debug!(pruned, "expired sessions pruned");
                }
            }
        })
    }

    /// Drop entries idle past the TTL
    pub async fn prune_expired(&self) -> usize {
        let cutoff = Utc::now() - self.ttl;
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen >= cutoff);
        before - sessions.len()
    }
}
