//! In-memory registry of live debug sessions, keyed by session ID.
//!
//! Each session sits behind its own `tokio::sync::Mutex`, so operations on
//! one session are serialized while different sessions proceed
//! independently. Callers only ever receive snapshots.
//!
//! Sessions stay registered until deleted. Finished sessions (completed,
//! stopped or failed) can also be dropped once idle via [`DebugSessionStore::evict_finished`],
//! which `serve` runs periodically.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use uuid::Uuid;
use workflow_types::debug::SessionSnapshot;

use super::debug::{DebugSession, SessionError};

/// A session plus the time of its last store operation.
#[derive(Debug)]
struct StoredSession {
    session: DebugSession,
    touched: Instant,
}

impl Deref for StoredSession {
    type Target = DebugSession;

    fn deref(&self) -> &DebugSession {
        &self.session
    }
}

impl DerefMut for StoredSession {
    fn deref_mut(&mut self) -> &mut DebugSession {
        &mut self.session
    }
}

#[derive(Debug, Clone, Default)]
pub struct DebugSessionStore {
    sessions: Arc<DashMap<Uuid, Arc<Mutex<StoredSession>>>>,
}

impl DebugSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return its first snapshot.
    pub fn insert(&self, session: DebugSession) -> SessionSnapshot {
        let snapshot = session.snapshot();
        let stored = StoredSession {
            session,
            touched: Instant::now(),
        };
        self.sessions
            .insert(snapshot.id, Arc::new(Mutex::new(stored)));
        snapshot
    }

    pub fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        self.sessions
            .remove(&id)
            .map(|_| ())
            .ok_or(SessionError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// IDs of all live sessions.
    pub fn ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.sessions.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// Drop finished sessions idle for at least `ttl`. Sessions currently
    /// locked by an operation are skipped. Returns how many were removed.
    pub fn evict_finished(&self, ttl: Duration) -> usize {
        let expired: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|entry| {
                entry.value().try_lock().is_ok_and(|stored| {
                    stored.state().is_terminal() && stored.touched.elapsed() >= ttl
                })
            })
            .map(|entry| *entry.key())
            .collect();

        for id in &expired {
            self.sessions.remove(id);
        }
        if !expired.is_empty() {
            tracing::debug!(evicted = expired.len(), "evicted finished debug sessions");
        }
        expired.len()
    }

    /// Run [`Self::evict_finished`] every `ttl` (at least once a second) in
    /// the background.
    pub fn spawn_eviction(&self, ttl: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let period = ttl.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                store.evict_finished(ttl);
            }
        })
    }

    // Clone the Arc out so the DashMap shard lock is not held across awaits.
    async fn get(&self, id: Uuid) -> Result<OwnedMutexGuard<StoredSession>, SessionError> {
        let entry = self
            .sessions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SessionError::NotFound(id))?;
        let mut stored = entry.lock_owned().await;
        stored.touched = Instant::now();
        Ok(stored)
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        Ok(self.get(id).await?.snapshot())
    }

    pub async fn start(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        self.get(id).await?.start().await
    }

    pub async fn step(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        self.get(id).await?.step().await
    }

    pub async fn continue_run(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        self.get(id).await?.continue_run().await
    }

    pub async fn stop(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        self.get(id).await?.stop()
    }

    pub async fn add_breakpoint(&self, id: Uuid, task_id: &str) -> Result<SessionSnapshot, SessionError> {
        Ok(self.get(id).await?.add_breakpoint(task_id))
    }

    pub async fn remove_breakpoint(
        &self,
        id: Uuid,
        task_id: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        self.get(id).await?.remove_breakpoint(task_id)
    }

    pub async fn set_breakpoint_enabled(
        &self,
        id: Uuid,
        task_id: &str,
        enabled: bool,
    ) -> Result<SessionSnapshot, SessionError> {
        self.get(id)
            .await?
            .set_breakpoint_enabled(task_id, enabled)
    }

    pub async fn set_context_value(
        &self,
        id: Uuid,
        path: &str,
        value: Value,
    ) -> Result<SessionSnapshot, SessionError> {
        self.get(id).await?.set_context_value(path, value)
    }

    pub async fn set_mock_response(
        &self,
        id: Uuid,
        task_ref: &str,
        response: Value,
    ) -> Result<SessionSnapshot, SessionError> {
        Ok(self.get(id).await?.set_mock_response(task_ref, response))
    }

    pub async fn clear_mock_response(
        &self,
        id: Uuid,
        task_ref: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        Ok(self.get(id).await?.clear_mock_response(task_ref))
    }
}
