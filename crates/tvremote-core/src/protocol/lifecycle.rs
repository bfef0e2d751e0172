//! Lifecycle events reported by a pairing/remote client during one connection
//! attempt.
//!
//! A remote client reports progress through seven callbacks. Each callback is
//! turned into exactly one [`LifecycleEvent`] and tagged with the
//! [`AttemptId`] of the `connect()` call that produced it, so a session can
//! tell a current callback from one left over by an abandoned attempt.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// One progress notification from the pairing/remote client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// The TLS session with the pairing endpoint is up.
    SessionCreated,
    /// The TV is displaying a PIN and expects it back.
    SecretRequested,
    /// Pairing finished; certificates were exchanged.
    Paired,
    /// The client is opening the remote-control channel.
    ConnectingToRemote,
    /// The remote-control channel is ready for key commands.
    Connected,
    /// The remote-control channel closed.
    Disconnected,
    /// The attempt failed; the message is shown to the user verbatim.
    Error(String),
}

impl LifecycleEvent {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::SessionCreated => "session_created",
            LifecycleEvent::SecretRequested => "secret_requested",
            LifecycleEvent::Paired => "paired",
            LifecycleEvent::ConnectingToRemote => "connecting_to_remote",
            LifecycleEvent::Connected => "connected",
            LifecycleEvent::Disconnected => "disconnected",
            LifecycleEvent::Error(_) => "error",
        }
    }
}

/// Identifier of one `connect()` attempt.
///
/// Identifiers only grow; a larger value always belongs to a newer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttemptId(u64);

impl AttemptId {
    /// Returns the raw counter value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Thread-safe source of increasing [`AttemptId`]s.
#[derive(Debug, Default)]
pub struct AttemptCounter {
    next: AtomicU64,
}

impl AttemptCounter {
    /// Creates a counter whose first issued identifier is `#1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next identifier.
    pub fn next(&self) -> AttemptId {
        AttemptId(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
