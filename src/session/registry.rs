use crate::core::{BrowserHandle, Config};
use crate::errors::{AutomationError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

struct SessionEntry<H> {
    handle: Arc<AsyncMutex<H>>,
    created_at: Instant,
    created_wall: DateTime<Utc>,
    last_used_at: Instant,
}

/// Live reference to a session, handed out by [`SessionRegistry::get`].
///
/// Holds the per-session lock wrapper; callers take the lock for the
/// duration of one driver action, so overlapping calls against the same
/// session serialize instead of racing on the browser connection.
pub struct SessionRef<H> {
    id: String,
    handle: Arc<AsyncMutex<H>>,
}

impl<H> SessionRef<H> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, H> {
        self.handle.lock().await
    }
}

/// Point-in-time session metadata for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub age_ms: u64,
    pub idle_ms: u64,
}

/// Thread-safe registry of live browser sessions.
///
/// Single source of truth for "does this session exist": a closed id is
/// absent from the map, so any later lookup fails with
/// [`AutomationError::SessionNotFound`]. The map lock is never held
/// across browser I/O; handle launch and close always happen outside it.
pub struct SessionRegistry<H> {
    sessions: Mutex<HashMap<String, SessionEntry<H>>>,
    config: Config,
}

impl<H: BrowserHandle> SessionRegistry<H> {
    pub fn new(config: Config) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn lock_map(&self) -> MutexGuard<'_, HashMap<String, SessionEntry<H>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launch a browser and register it under a fresh session id.
    ///
    /// The launch happens outside the map lock, so the cap is re-checked
    /// at insert time; a handle launched past the cap is closed and no
    /// entry survives the failure.
    pub async fn create(&self) -> Result<String> {
        if let Some(cap) = self.config.session.max_sessions {
            if self.lock_map().len() >= cap {
                return Err(AutomationError::ResourceExhausted(cap));
            }
        }

        let handle = match H::launch(&self.config.browser).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "browser launch failed");
                return Err(AutomationError::BackendUnavailable(e.to_string()));
            }
        };

        let id = Uuid::new_v4().to_string();
        let now = Instant::now();
        let entry = SessionEntry {
            handle: Arc::new(AsyncMutex::new(handle)),
            created_at: now,
            created_wall: Utc::now(),
            last_used_at: now,
        };

        let (rejected, leftover) = {
            let mut sessions = self.lock_map();
            match self.config.session.max_sessions {
                Some(cap) if sessions.len() >= cap => (Some(cap), Some(entry)),
                _ => {
                    sessions.insert(id.clone(), entry);
                    (None, None)
                }
            }
        };

        if let (Some(cap), Some(entry)) = (rejected, leftover) {
            warn!(session_id = %id, cap, "session cap hit during launch, discarding handle");
            Self::close_handle(&id, entry.handle).await;
            return Err(AutomationError::ResourceExhausted(cap));
        }

        info!(session_id = %id, "session created");
        Ok(id)
    }

    /// Look up a session and refresh its `last_used_at` in the same
    /// critical section, so the reaper cannot close it between lookup
    /// and use.
    pub fn get(&self, id: &str) -> Result<SessionRef<H>> {
        let mut sessions = self.lock_map();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| AutomationError::SessionNotFound(id.to_string()))?;
        entry.last_used_at = Instant::now();
        Ok(SessionRef {
            id: id.to_string(),
            handle: Arc::clone(&entry.handle),
        })
    }

    /// Remove a session and release its browser. Idempotent: returns
    /// whether a session was actually present. The entry is removed even
    /// if the browser refuses to close; that failure is logged only.
    pub async fn close(&self, id: &str) -> bool {
        let removed = self.lock_map().remove(id);
        match removed {
            Some(entry) => {
                info!(session_id = %id, "session closed");
                Self::close_handle(id, entry.handle).await;
                true
            }
            None => false,
        }
    }

    /// Close every session idle longer than `max_idle` and return the
    /// count. Expired entries are removed under the lock in one pass;
    /// the (potentially slow) browser teardowns run outside it so they
    /// cannot stall concurrent `get`/`create` calls.
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let expired: Vec<(String, Arc<AsyncMutex<H>>)> = {
            let mut sessions = self.lock_map();
            let ids: Vec<String> = sessions
                .iter()
                .filter(|(_, entry)| now.duration_since(entry.last_used_at) > max_idle)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|entry| (id, entry.handle)))
                .collect()
        };

        let count = expired.len();
        for (id, handle) in expired {
            debug!(session_id = %id, "reaping idle session");
            Self::close_handle(&id, handle).await;
        }
        if count > 0 {
            info!(reaped = count, "closed idle sessions");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_map().is_empty()
    }

    /// Metadata for one session; does not count as use.
    pub fn session_info(&self, id: &str) -> Result<SessionInfo> {
        let sessions = self.lock_map();
        let entry = sessions
            .get(id)
            .ok_or_else(|| AutomationError::SessionNotFound(id.to_string()))?;
        Ok(SessionInfo {
            id: id.to_string(),
            created_at: entry.created_wall,
            age_ms: entry.created_at.elapsed().as_millis() as u64,
            idle_ms: entry.last_used_at.elapsed().as_millis() as u64,
        })
    }

    async fn close_handle(id: &str, handle: Arc<AsyncMutex<H>>) {
        let mut guard = handle.lock().await;
        if let Err(e) = guard.close().await {
            warn!(session_id = %id, error = %e, "browser close failed, entry removed anyway");
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, id: &str, by: Duration) -> bool {
        let mut sessions = self.lock_map();
        match sessions.get_mut(id) {
            Some(entry) => match entry.last_used_at.checked_sub(by) {
                Some(earlier) => {
                    entry.last_used_at = earlier;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn idle_for(&self, id: &str) -> Option<Duration> {
        let sessions = self.lock_map();
        sessions.get(id).map(|entry| entry.last_used_at.elapsed())
    }

    #[cfg(test)]
    pub(crate) fn age_of(&self, id: &str) -> Option<(Instant, Instant)> {
        let sessions = self.lock_map();
        sessions
            .get(id)
            .map(|entry| (entry.created_at, entry.last_used_at))
    }
}

/// Spawn a timer task that reaps idle sessions every `interval`.
///
/// The registry's `reap_idle` stays callable on demand; this is just the
/// convenience loop for long-running processes.
pub fn spawn_reaper<H: BrowserHandle>(
    registry: Arc<SessionRegistry<H>>,
    interval: Duration,
    max_idle: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let reaped = registry.reap_idle(max_idle).await;
            if reaped > 0 {
                debug!(reaped, "reaper pass finished");
            }
        }
    })
}
