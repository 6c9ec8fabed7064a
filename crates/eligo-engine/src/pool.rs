//! Bounded pool of automation sessions.
//!
//! Sessions are created lazily up to the pool capacity and reused in FIFO
//! order. Idle sessions and leased sessions are tracked separately; a session
//! handed to a caller is counted as leased and only re-enters the idle queue
//! when its [`Lease`] is released.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PoolError;
use crate::session::{SessionFactory, SessionHandle};

/// Default maximum number of live sessions.
pub const DEFAULT_CAPACITY: usize = 5;

/// Default time to wait for a free session.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the session pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of sessions alive at once.
    pub capacity: usize,

    /// How long `acquire` waits for a free session before giving up.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool capacity (at least one).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Lease state of a pooled session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState {
    Idle,
    Leased,
}

/// A session owned by the pool.
struct PooledSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    state: LeaseState,
    handle: Box<dyn SessionHandle>,
    closed: bool,
}

impl PooledSession {
    fn new(handle: Box<dyn SessionHandle>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            state: LeaseState::Leased,
            handle,
            closed: false,
        }
    }

    /// Close the remote session. Returns false if it was already closed.
    async fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        if let Err(e) = self.handle.close().await {
            warn!(session_id = %self.id, error = %e, "Session close failed");
        }
        true
    }
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub idle: usize,
    pub leased: usize,
    /// Sessions created since start.
    pub created: u64,
    /// Sessions torn down since start.
    pub torn_down: u64,
}

struct PoolState {
    idle: VecDeque<PooledSession>,
    leased: usize,
    created: u64,
    torn_down: u64,
    shut_down: bool,
}

/// Bounded, explicitly owned pool of automation sessions.
///
/// Capacity is enforced by a semaphore: every lease holds one permit, so no
/// more than `capacity` sessions ever exist at once, including sessions that
/// are being created or torn down.
pub struct SessionPool {
    factory: Arc<dyn SessionFactory>,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    state: Mutex<PoolState>,
}

impl SessionPool {
    /// Create an empty pool. No session is created until the first acquire.
    pub fn new(factory: Arc<dyn SessionFactory>, config: PoolConfig) -> Arc<Self> {
        let capacity = config.capacity.max(1);
        Arc::new(Self {
            factory,
            config: PoolConfig { capacity, ..config },
            permits: Arc::new(Semaphore::new(capacity)),
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(capacity),
                leased: 0,
                created: 0,
                torn_down: 0,
                shut_down: false,
            }),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Lease a session.
    ///
    /// Reuses the oldest idle session, or creates a new one while under
    /// capacity. At capacity this waits up to the acquire timeout for a lease
    /// to come back.
    pub async fn acquire(self: &Arc<Self>) -> Result<Lease, PoolError> {
        let wait = self.config.acquire_timeout;
        let permit =
            match tokio::time::timeout(wait, Arc::clone(&self.permits).acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return Err(PoolError::ShutDown),
                Err(_) => {
                    warn!(
                        capacity = self.config.capacity,
                        waited_ms = wait.as_millis() as u64,
                        "Timed out waiting for a free session"
                    );
                    return Err(PoolError::Exhausted { waited: wait });
                }
            };

        let reused = {
            let mut state = self.state.lock();
            if state.shut_down {
                return Err(PoolError::ShutDown);
            }
            let session = state.idle.pop_front();
            if session.is_some() {
                state.leased += 1;
            }
            session
        };

        let mut session = match reused {
            Some(session) => {
                debug!(session_id = %session.id, "Reusing idle session");
                session
            }
            None => {
                let handle = self.factory.create().await.map_err(|e| {
                    warn!(backend = self.factory.name(), error = %e, "Failed to create session");
                    PoolError::Unavailable(e.to_string())
                })?;
                let session = PooledSession::new(handle);
                let mut state = self.state.lock();
                state.created += 1;
                state.leased += 1;
                debug!(
                    session_id = %session.id,
                    backend = self.factory.name(),
                    created = state.created,
                    "Created session"
                );
                session
            }
        };

        session.state = LeaseState::Leased;
        Ok(Lease {
            id: session.id,
            created_at: session.created_at,
            session: Some(session),
            pool: Arc::clone(self),
            permit: Some(permit),
        })
    }

    /// Tear down every idle session and refuse further leases.
    ///
    /// Sessions leased at this point are torn down when they come back.
    /// Calling this again has no effect.
    pub async fn shutdown(&self) {
        let idle: Vec<PooledSession> = {
            let mut state = self.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.idle.drain(..).collect()
        };
        self.permits.close();

        let count = idle.len();
        for session in idle {
            self.teardown(session, "pool shut down").await;
        }
        info!(torn_down = count, "Session pool shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            capacity: self.config.capacity,
            idle: state.idle.len(),
            leased: state.leased,
            created: state.created,
            torn_down: state.torn_down,
        }
    }

    /// Move a returned session to the idle queue.
    ///
    /// Hands the session back with a reason when it must be torn down instead.
    fn check_in(&self, mut session: PooledSession) -> Option<(PooledSession, &'static str)> {
        let mut state = self.state.lock();
        state.leased = state.leased.saturating_sub(1);

        let reason = if state.shut_down {
            "pool shut down"
        } else if state.idle.len() >= self.config.capacity {
            "pool already full"
        } else {
            session.state = LeaseState::Idle;
            state.idle.push_back(session);
            debug!(idle = state.idle.len(), "Session returned to pool");
            return None;
        };
        Some((session, reason))
    }

    fn settle(&self) {
        let mut state = self.state.lock();
        state.leased = state.leased.saturating_sub(1);
    }

    async fn teardown(&self, mut session: PooledSession, reason: &str) {
        if session.close().await {
            self.state.lock().torn_down += 1;
            debug!(session_id = %session.id, reason, "Session torn down");
        }
    }
}

/// Exclusive use of one pooled session.
///
/// Settle a lease with [`Lease::release`] or [`Lease::discard`]. A lease that
/// is dropped unsettled (for example when the owning task is cancelled) has
/// its session torn down in the background.
pub struct Lease {
    id: Uuid,
    created_at: DateTime<Utc>,
    session: Option<PooledSession>,
    pool: Arc<SessionPool>,
    permit: Option<OwnedSemaphorePermit>,
}

impl Lease {
    /// Identity of the leased session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> LeaseState {
        self.session
            .as_ref()
            .map_or(LeaseState::Idle, |session| session.state)
    }

    /// The session handle to drive, `None` once the lease is settled.
    pub fn handle(&mut self) -> Option<&mut dyn SessionHandle> {
        self.session
            .as_mut()
            .map(|session| session.handle.as_mut() as &mut dyn SessionHandle)
    }

    /// Return the session to the pool for reuse.
    pub async fn release(mut self) {
        if let Some(session) = self.session.take() {
            if let Some((session, reason)) = self.pool.check_in(session) {
                self.pool.teardown(session, reason).await;
            }
        }
    }

    /// Tear the session down instead of reusing it.
    ///
    /// Used after a fault, when the remote page state is unknown.
    pub async fn discard(mut self) {
        if let Some(session) = self.session.take() {
            self.pool.settle();
            self.pool.teardown(session, "discarded after fault").await;
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.pool.settle();
        let permit = self.permit.take();
        let pool = Arc::clone(&self.pool);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(session_id = %session.id, "Lease dropped without release, tearing session down");
                runtime.spawn(async move {
                    pool.teardown(session, "lease abandoned").await;
                    drop(permit);
                });
            }
            Err(_) => {
                warn!(session_id = %session.id, "Lease dropped outside a runtime, discarding session");
                pool.state.lock().torn_down += 1;
                drop(session);
                drop(permit);
            }
        }
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("session_id", &self.session.as_ref().map(|s| s.id))
            .finish()
    }
}
