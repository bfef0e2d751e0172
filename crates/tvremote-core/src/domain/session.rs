//! Connection state machine for the single controlled device.
//!
//! ```text
//! Idle ──connect()──> Connecting ──SecretRequested──> AwaitingSecret
//!                        │   │                             │
//!                        │   └──Paired / ConnectingToRemote│submit_secret()
//!                        │              │                  v
//!                        │              └──────────────> Pairing ──Connected──> Connected
//!                        └──Connected───────────────────────────────────────────^   │
//!                                                                  Disconnected <───┘
//! (any) ──Error(msg)──> Failed(msg)          (any) ──connect()──> Connecting
//! ```
//!
//! [`ConnectionState::on_event`] is a pure function: it says which state a
//! lifecycle event leads to, or that the event does not apply. Anything with
//! side effects (clearing the PIN buffer, remembering the last error) is the
//! session controller's job.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::lifecycle::LifecycleEvent;

/// Minimum PIN length accepted by the pairing dialog unless configured otherwise.
pub const DEFAULT_MIN_PIN_LENGTH: usize = 4;

/// State of the one logical connection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No connection has been attempted yet.
    #[default]
    Idle,
    /// A handshake is in progress.
    Connecting,
    /// The TV shows a PIN and the user must type it in.
    AwaitingSecret,
    /// The PIN was sent or pairing completed; the remote channel is opening.
    Pairing,
    /// Key commands are accepted.
    Connected,
    /// The connection was closed (by either side).
    Disconnected,
    /// The last attempt failed with the given message.
    Failed(String),
}

impl ConnectionState {
    /// Returns the state `event` leads to, or `None` if the event does not
    /// apply in the current state.
    ///
    /// Informational events (`SessionCreated`, `ConnectingToRemote` while
    /// already pairing) return the current state unchanged.
    pub fn on_event(&self, event: &LifecycleEvent) -> Option<ConnectionState> {
        use ConnectionState::*;

        match (self, event) {
            (_, LifecycleEvent::Error(message)) => Some(Failed(message.clone())),

            (Connecting, LifecycleEvent::SessionCreated) => Some(Connecting),

            (Connecting | AwaitingSecret | Pairing, LifecycleEvent::SecretRequested) => {
                Some(AwaitingSecret)
            }

            (Connecting | AwaitingSecret | Pairing, LifecycleEvent::Paired) => Some(Pairing),

            (Connecting | Pairing, LifecycleEvent::ConnectingToRemote) => Some(Pairing),

            (Connecting | AwaitingSecret | Pairing, LifecycleEvent::Connected) => Some(Connected),

            (Connecting | AwaitingSecret | Pairing | Connected, LifecycleEvent::Disconnected) => {
                Some(Disconnected)
            }

            _ => None,
        }
    }

    /// Returns `true` only in [`ConnectionState::Connected`].
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Returns `true` while a handshake is underway.
    pub fn is_handshaking(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::AwaitingSecret | ConnectionState::Pairing
        )
    }

    /// Returns `true` while the PIN dialog should be shown.
    pub fn is_awaiting_secret(&self) -> bool {
        matches!(self, ConnectionState::AwaitingSecret)
    }

    /// Returns the failure message in [`ConnectionState::Failed`].
    pub fn failure(&self) -> Option<&str> {
        match self {
            ConnectionState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Stable lowercase label for status displays and DTOs.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::AwaitingSecret => "awaiting_secret",
            ConnectionState::Pairing => "pairing",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Failed(message) => write!(f, "failed: {message}"),
            other => f.write_str(other.label()),
        }
    }
}

/// PIN text typed by the user while the TV waits for it.
///
/// Exists only while the session is in [`ConnectionState::AwaitingSecret`].
/// `Debug` output never contains the digits.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PendingSecret {
    text: String,
}

impl PendingSecret {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the buffer contents with `text`.
    pub fn update(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Returns the raw, untrimmed text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns `true` if the trimmed text has at least `min_len` characters.
    pub fn is_submittable(&self, min_len: usize) -> bool {
        self.text.trim().chars().count() >= min_len
    }

    /// Consumes the buffer and returns the trimmed secret.
    pub fn into_secret(self) -> String {
        self.text.trim().to_string()
    }
}

impl fmt::Debug for PendingSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSecret")
            .field("len", &self.text.len())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
