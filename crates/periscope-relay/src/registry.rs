//! Live-session bookkeeping.
//!
//! The registry exists for observability only — `/health`, `/status`, and
//! shutdown draining read it. Sessions never coordinate through it; each
//! one registers itself on creation and removes itself on exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::ids::SessionId;

/// Lifecycle of one relay session. States are never re-entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Opening the backend TCP connection.
    Connecting,
    /// Both copy loops running.
    Forwarding,
    /// Termination signalled; waiting for both loops to finish.
    Closing,
    /// Both loops joined and both sockets closed.
    Closed,
}

/// Byte counters and last-activity tracking shared by a session's two legs.
///
/// `last_activity` is stored as milliseconds since the session epoch in an
/// atomic, so both legs and the idle watchdog can touch it without a lock.
#[derive(Debug)]
pub struct SessionStats {
    epoch: Instant,
    bytes_up: AtomicU64,
    bytes_down: AtomicU64,
    last_activity_ms: AtomicU64,
}

impl SessionStats {
    /// Fresh counters; activity starts "now".
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            bytes_up: AtomicU64::new(0),
            bytes_down: AtomicU64::new(0),
            last_activity_ms: AtomicU64::new(0),
        }
    }

    /// Record bytes forwarded client→backend.
    pub fn record_up(&self, n: u64) {
        let _ = self.bytes_up.fetch_add(n, Ordering::Relaxed);
        self.touch();
    }

    /// Record bytes forwarded backend→client.
    pub fn record_down(&self, n: u64) {
        let _ = self.bytes_down.fetch_add(n, Ordering::Relaxed);
        self.touch();
    }

    /// Mark activity now without moving a byte counter.
    pub fn touch(&self) {
        #[allow(clippy::cast_possible_truncation)]
        let ms = self.epoch.elapsed().as_millis() as u64;
        self.last_activity_ms.store(ms, Ordering::Relaxed);
    }

    /// Total bytes forwarded client→backend.
    #[must_use]
    pub fn bytes_up(&self) -> u64 {
        self.bytes_up.load(Ordering::Relaxed)
    }

    /// Total bytes forwarded backend→client.
    #[must_use]
    pub fn bytes_down(&self) -> u64 {
        self.bytes_down.load(Ordering::Relaxed)
    }

    /// How long since either leg last moved a byte.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.epoch.elapsed().saturating_sub(last)
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// One registered session.
#[derive(Debug)]
pub struct SessionEntry {
    /// Session ID.
    pub id: SessionId,
    /// Address of the browser-side peer, for logs and status.
    pub client_addr: String,
    /// When the session was registered.
    pub started_at: Instant,
    /// Shared byte/activity counters.
    pub stats: Arc<SessionStats>,
    state: Mutex<SessionState>,
}

impl SessionEntry {
    fn new(client_addr: String) -> Self {
        Self {
            id: SessionId::new(),
            client_addr,
            started_at: Instant::now(),
            stats: Arc::new(SessionStats::new()),
            state: Mutex::new(SessionState::Connecting),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Advance the lifecycle state.
    pub fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }

    /// Session age.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Registry of live relay sessions.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<SessionEntry>>,
}

impl SessionRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register a new session for a connecting peer.
    pub fn register(&self, client_addr: impl Into<String>) -> Arc<SessionEntry> {
        let entry = Arc::new(SessionEntry::new(client_addr.into()));
        let _ = self.sessions.insert(entry.id.clone(), entry.clone());
        entry
    }

    /// Remove a session by ID.
    pub fn remove(&self, id: &SessionId) {
        let _ = self.sessions.remove(id);
    }

    /// Number of live sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether any sessions remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Look up a session.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionEntry>> {
        self.sessions.get(id).map(|e| e.value().clone())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
