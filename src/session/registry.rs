use super::session::CallSession;
use super::stats::SessionStats;
use anyhow::{bail, Result};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Every live call session in the process, keyed by session id
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<CallSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session; ids must be unique
    pub async fn insert(&self, session: Arc<CallSession>) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let id = session.id().to_string();
        if sessions.contains_key(&id) {
            bail!("Session {} already registered", id);
        }
        debug!("Registered session {}", id);
        sessions.insert(id, session);
        Ok(())
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<CallSession>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn remove(&self, session_id: &str) -> Option<Arc<CallSession>> {
        self.sessions.write().await.remove(session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Stats of every registered session, ordered by session id
    pub async fn list(&self) -> Vec<SessionStats> {
        let sessions: Vec<Arc<CallSession>> = self.sessions.read().await.values().cloned().collect();
        let mut stats = join_all(sessions.iter().map(|s| s.stats())).await;
        stats.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        stats
    }

    /// Drop sessions that already finished, returning how many were removed
    pub async fn reap(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_finished());
        let reaped = before - sessions.len();
        if reaped > 0 {
            debug!("Reaped {} finished sessions", reaped);
        }
        reaped
    }

    /// Stop every session concurrently and empty the registry
    pub async fn shutdown_all(&self) -> Vec<SessionStats> {
        let sessions: Vec<Arc<CallSession>> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, session)| session).collect()
        };
        if sessions.is_empty() {
            return Vec::new();
        }

        info!("Stopping {} call sessions", sessions.len());
        join_all(sessions.iter().map(|s| s.stop())).await
    }
}
