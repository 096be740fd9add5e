//! Session state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Track session state (Accepted → ReadingSelector → Dispatching → WritingResponse → Closed)
//! - Generate unique connection IDs for tracing
//! - Count live sessions so shutdown can drain them
//! - Publish per-transport connection metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Transport;
use crate::observability::metrics;

/// Relaxed ordering is enough: IDs only need to be unique.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where a request-serving session is in its life.
///
/// A stream connection walks the states once. A QUIC connection stays
/// `Accepted` while its streams walk them individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Accepted,
    ReadingSelector,
    Dispatching,
    WritingResponse,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Accepted => "accepted",
            SessionState::ReadingSelector => "reading_selector",
            SessionState::Dispatching => "dispatching",
            SessionState::WritingResponse => "writing_response",
            SessionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks active connections for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self, transport: Transport) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::connection_opened(transport.as_str());
        let id = ConnectionId::new();
        tracing::trace!(connection_id = %id, %transport, state = %SessionState::Accepted, "Session opened");
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id,
            transport,
            state: SessionState::Accepted,
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until all connections are closed.
    pub async fn wait_for_shutdown(&self) {
        while self.active_count.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Wait up to `grace` for connections to close. Returns whether they did.
    pub async fn drain(&self, grace: Duration) -> bool {
        tokio::time::timeout(grace, self.wait_for_shutdown())
            .await
            .is_ok()
    }
}

/// Guard that tracks a connection's lifetime and state.
/// Decrements the active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
    transport: Transport,
    state: SessionState,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next`, tracing the transition.
    pub fn transition(&mut self, next: SessionState) {
        tracing::trace!(
            connection_id = %self.id,
            transport = %self.transport,
            from = %self.state,
            to = %next,
            "Session state"
        );
        self.state = next;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            self.transition(SessionState::Closed);
        }
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::connection_closed(self.transport.as_str());
    }
}
