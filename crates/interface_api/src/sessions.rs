//! Live upload wizard sessions
//!
//! Sessions idle for longer than the configured time to live are swept out
//! whenever a new session is opened.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use core_kernel::SessionId;
use domain_claims::WizardSession;

pub type SharedSession = Arc<RwLock<WizardSession>>;

/// Process-local registry of wizard sessions
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Opens a new session and returns it
    pub async fn create(&self) -> SharedSession {
        let now = Utc::now();
        self.evict_idle(now).await;
        self.insert(WizardSession::new(now)).await
    }

    /// Registers an existing session
    pub async fn insert(&self, session: WizardSession) -> SharedSession {
        let id = session.id();
        let shared = Arc::new(RwLock::new(session));
        self.sessions.write().await.insert(id, shared.clone());
        shared
    }

    pub async fn get(&self, id: SessionId) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Drops a session; returns false if it did not exist
    pub async fn remove(&self, id: SessionId) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions not updated within the time to live, returning how many
    ///
    /// Sessions that are locked for writing are in use and always kept.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, session| match session.try_read() {
            Ok(guard) => !self.is_expired(guard.updated_at(), now),
            Err(_) => true,
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "Evicted idle wizard sessions");
        }
        evicted
    }

    fn is_expired(&self, updated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - updated_at).to_std().map_or(false, |idle| idle > self.ttl)
    }
}
