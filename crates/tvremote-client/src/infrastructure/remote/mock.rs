//! Scripted remote client for testing the session without a TV.
//!
//! # Why a scripted client?
//!
//! The real pairing protocol needs a TV on the network that shows a PIN and
//! accepts a TLS client certificate.  [`ScriptedRemoteClient`] replaces all
//! of that with in-memory recording:
//!
//! - every `connect` stores the device and the listener it was given, so a
//!   test can fire callbacks for any attempt later (including stale ones);
//! - an optional script of [`LifecycleEvent`]s is played on the listener as
//!   soon as `connect` is called;
//! - secrets, commands and disconnects are pushed into `Mutex<Vec<...>>`
//!   fields for assertions;
//! - every call, successful or not, is also appended to `calls` as a
//!   [`ClientCall`], so tests can check the order the client saw.
//!
//! # Usage in tests
//!
//! ```ignore
//! let client = Arc::new(ScriptedRemoteClient::with_script(vec![
//!     LifecycleEvent::SessionCreated,
//!     LifecycleEvent::SecretRequested,
//! ]));
//! let session = SessionController::new(client.clone(), handle);
//! session.connect(device);
//! ```
//!
//! # Failure flags
//!
//! `connect_error` makes `connect` return an error; `should_fail` makes
//! `send_command` and `send_secret` fail.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tvremote_core::{DeviceDescriptor, LifecycleEvent, PressKind, RemoteKeyCode};

use crate::application::control_session::{
    dispatch, LifecycleListener, RemoteClient, RemoteError,
};

/// One call received by a [`ScriptedRemoteClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    /// `connect`, with the device's display name.
    Connect(String),
    Secret(String),
    Command(RemoteKeyCode, PressKind),
    Disconnect,
}

/// A [`RemoteClient`] that records calls and replays a script.
#[derive(Default)]
pub struct ScriptedRemoteClient {
    /// Every call in arrival order.
    pub calls: Mutex<Vec<ClientCall>>,
    /// Devices passed to `connect`, in call order.
    pub connects: Mutex<Vec<DeviceDescriptor>>,
    /// Listener given to each `connect`, same order as `connects`.
    pub listeners: Mutex<Vec<Arc<dyn LifecycleListener>>>,
    /// Every `(key, press)` passed to `send_command`.
    pub commands: Mutex<Vec<(RemoteKeyCode, PressKind)>>,
    /// Every secret passed to `send_secret`.
    pub secrets: Mutex<Vec<String>>,
    /// Number of `disconnect` calls.
    pub disconnects: Mutex<usize>,
    /// Events played on the listener during `connect`.
    pub script: Vec<LifecycleEvent>,
    /// When set, `connect` returns this error instead of running the script.
    pub connect_error: Option<RemoteError>,
    /// When `true`, `send_command` and `send_secret` return `RemoteError::Send`.
    pub should_fail: bool,
}

impl ScriptedRemoteClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client that plays `script` on every connect.
    pub fn with_script(script: Vec<LifecycleEvent>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Listener of the `index`-th connect, if it happened.
    pub fn listener(&self, index: usize) -> Option<Arc<dyn LifecycleListener>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    /// Fires `event` on the listener of the `index`-th connect.
    ///
    /// Returns `false` if that connect has not happened.
    pub fn emit(&self, index: usize, event: &LifecycleEvent) -> bool {
        match self.listener(index) {
            Some(listener) => {
                dispatch(listener.as_ref(), event);
                true
            }
            None => false,
        }
    }

    /// Copy of the ordered call log.
    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: ClientCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn disconnect_count(&self) -> usize {
        *self.disconnects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Polls `condition` every few milliseconds until it holds or `timeout`
    /// elapses. Work dispatched by the session runs on spawned tasks, so tests
    /// use this to wait for it.
    pub async fn wait_until(&self, timeout: Duration, condition: impl Fn(&Self) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if condition(self) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl RemoteClient for ScriptedRemoteClient {
    async fn connect(
        &self,
        device: &DeviceDescriptor,
        listener: Arc<dyn LifecycleListener>,
    ) -> Result<(), RemoteError> {
        self.record(ClientCall::Connect(device.display_name.clone()));
        self.connects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(device.clone());
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&listener));

        if let Some(e) = &self.connect_error {
            return Err(e.clone());
        }
        for event in &self.script {
            dispatch(listener.as_ref(), event);
        }
        Ok(())
    }

    async fn send_command(&self, key: RemoteKeyCode, press: PressKind) -> Result<(), RemoteError> {
        self.record(ClientCall::Command(key, press));
        if self.should_fail {
            return Err(RemoteError::Send("scripted send failure".into()));
        }
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key, press));
        Ok(())
    }

    async fn send_secret(&self, secret: &str) -> Result<(), RemoteError> {
        self.record(ClientCall::Secret(secret.to_string()));
        if self.should_fail {
            return Err(RemoteError::Send("scripted send failure".into()));
        }
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(secret.to_string());
        Ok(())
    }

    async fn disconnect(&self) {
        // A real client awaits its socket close here.
        tokio::task::yield_now().await;
        self.record(ClientCall::Disconnect);
        *self.disconnects.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }
}
