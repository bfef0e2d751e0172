//! SessionController: owns the one connection to a TV and its state machine.
//!
//! The controller wraps a [`RemoteClient`] (the pairing/remote protocol
//! implementation) and turns its callback-style lifecycle into a single
//! observable [`ConnectionState`].
//!
//! # Architecture
//!
//! ```text
//! UI thread                 SessionController                 Tokio tasks
//! ─────────                 ─────────────────                 ───────────
//! connect(device) ───────>  attempt #n, Connecting  ───queue──> client.connect(device, listener#n)
//!                                   ^                                   │ callbacks, any thread
//!                                   └──── apply(#n, LifecycleEvent) <───┘
//! subscribe()     <───────  watch::Receiver<SessionSnapshot>
//! send_key(cmd)   ───────>  Connected? ─────────────────queue──> client.send_command(..)
//! disconnect()    ───────>  Disconnected ───────────────queue──> client.disconnect()
//! ```
//!
//! Every transition, whether caused by a callback or by an API call, happens
//! while holding one mutex, and every callback carries the [`AttemptId`] of
//! the `connect()` that created its listener. Callbacks from an older attempt
//! are ignored, so a slow handshake to a previously selected TV cannot
//! overwrite the state of the current one.
//!
//! All public methods return immediately. Client calls go through one
//! `mpsc` queue drained by a single worker task on the runtime handle given
//! at construction, so the client sees them in the order the controller
//! issued them: a `disconnect()` followed by `connect()` always reaches the
//! client as disconnect, then connect. Results arrive through the watch
//! channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use tvremote_core::{
    AttemptCounter, AttemptId, ConnectionState, DeviceDescriptor, KeyCommand, LifecycleEvent,
    PendingSecret, PressKind, RemoteKeyCode,
};

/// Error type reported by a [`RemoteClient`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The handshake could not be started.
    #[error("connection failed: {0}")]
    Connect(String),
    /// A command or secret could not be written.
    #[error("send failed: {0}")]
    Send(String),
    /// The client has no open remote channel.
    #[error("not connected")]
    NotConnected,
}

/// Callbacks a [`RemoteClient`] invokes while a connection attempt progresses.
///
/// Each method is called at most once per logical event, from any thread.
pub trait LifecycleListener: Send + Sync {
    fn on_session_created(&self);
    fn on_secret_requested(&self);
    fn on_paired(&self);
    fn on_connecting_to_remote(&self);
    fn on_connected(&self);
    fn on_disconnect(&self);
    fn on_error(&self, message: &str);
}

/// Invokes the callback on `listener` that corresponds to `event`.
pub fn dispatch(listener: &dyn LifecycleListener, event: &LifecycleEvent) {
    match event {
        LifecycleEvent::SessionCreated => listener.on_session_created(),
        LifecycleEvent::SecretRequested => listener.on_secret_requested(),
        LifecycleEvent::Paired => listener.on_paired(),
        LifecycleEvent::ConnectingToRemote => listener.on_connecting_to_remote(),
        LifecycleEvent::Connected => listener.on_connected(),
        LifecycleEvent::Disconnected => listener.on_disconnect(),
        LifecycleEvent::Error(message) => listener.on_error(message),
    }
}

/// The Android TV pairing/remote protocol client.
///
/// Wire encoding (TLS, protobuf framing, certificate handling) lives behind
/// this trait. Implementations report handshake progress through the
/// listener passed to [`connect`](RemoteClient::connect).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Starts a handshake with `device`.
    ///
    /// Should return once the handshake is under way; progress is reported
    /// through `listener`. Calls are issued one at a time, so an
    /// implementation that waits here for pairing to finish would hold back
    /// the secret that pairing needs.
    async fn connect(
        &self,
        device: &DeviceDescriptor,
        listener: Arc<dyn LifecycleListener>,
    ) -> Result<(), RemoteError>;

    /// Sends one key press on the remote channel.
    async fn send_command(&self, key: RemoteKeyCode, press: PressKind) -> Result<(), RemoteError>;

    /// Sends the PIN the TV asked for.
    async fn send_secret(&self, secret: &str) -> Result<(), RemoteError>;

    /// Closes any open channel. Safe to call in any state.
    async fn disconnect(&self);
}

/// Point-in-time view of the session, published on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    /// The device of the latest `connect()`.
    pub device: Option<DeviceDescriptor>,
    /// Message of the last failure; cleared by the next `connect()`.
    pub last_error: Option<String>,
    /// `true` while the UI should show the PIN dialog.
    pub pin_requested: bool,
}

#[derive(Default)]
struct SessionInner {
    state: ConnectionState,
    device: Option<DeviceDescriptor>,
    last_error: Option<String>,
    current_attempt: Option<AttemptId>,
    pending_secret: Option<PendingSecret>,
}

impl SessionInner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            device: self.device.clone(),
            last_error: self.last_error.clone(),
            pin_requested: self.state.is_awaiting_secret(),
        }
    }
}

/// State shared between the controller and the listeners it hands out.
struct Shared {
    inner: Mutex<SessionInner>,
    updates: watch::Sender<SessionSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &SessionInner) {
        self.updates.send_replace(inner.snapshot());
    }

    /// The one place lifecycle events change state.
    fn apply(&self, attempt: AttemptId, event: LifecycleEvent) {
        let mut inner = self.lock();

        if inner.current_attempt != Some(attempt) {
            debug!(%attempt, event = event.name(), "ignoring callback from stale attempt");
            return;
        }

        let Some(next) = inner.state.on_event(&event) else {
            debug!(%attempt, event = event.name(), state = %inner.state, "event does not apply; ignored");
            return;
        };

        if let LifecycleEvent::Error(message) = &event {
            warn!(%attempt, "connection attempt failed: {message}");
            inner.last_error = Some(message.clone());
        }

        if next.is_awaiting_secret() {
            inner.pending_secret = Some(PendingSecret::new());
        } else {
            inner.pending_secret = None;
        }

        if next != inner.state {
            info!(%attempt, from = %inner.state, to = %next, "session state changed");
        }
        inner.state = next;
        self.publish(&inner);
    }
}

/// Listener handed to the client for one attempt.
struct AttemptListener {
    attempt: AttemptId,
    shared: Weak<Shared>,
}

impl AttemptListener {
    fn emit(&self, event: LifecycleEvent) {
        match self.shared.upgrade() {
            Some(shared) => shared.apply(self.attempt, event),
            None => debug!(attempt = %self.attempt, "callback after controller was dropped"),
        }
    }
}

impl LifecycleListener for AttemptListener {
    fn on_session_created(&self) {
        self.emit(LifecycleEvent::SessionCreated);
    }

    fn on_secret_requested(&self) {
        self.emit(LifecycleEvent::SecretRequested);
    }

    fn on_paired(&self) {
        self.emit(LifecycleEvent::Paired);
    }

    fn on_connecting_to_remote(&self) {
        self.emit(LifecycleEvent::ConnectingToRemote);
    }

    fn on_connected(&self) {
        self.emit(LifecycleEvent::Connected);
    }

    fn on_disconnect(&self) {
        self.emit(LifecycleEvent::Disconnected);
    }

    fn on_error(&self, message: &str) {
        self.emit(LifecycleEvent::Error(message.to_string()));
    }
}

/// A call on the [`RemoteClient`], queued for the client worker.
enum ClientOp {
    Connect {
        attempt: AttemptId,
        device: DeviceDescriptor,
        listener: Arc<dyn LifecycleListener>,
    },
    Secret {
        attempt: AttemptId,
        secret: String,
    },
    Key(KeyCommand),
    Disconnect,
}

/// Runs queued client calls one at a time until the controller is dropped.
///
/// A failed connect or secret becomes an `Error` event for its attempt; a
/// failed key send is only logged.
async fn run_client_ops(
    client: Arc<dyn RemoteClient>,
    shared: Weak<Shared>,
    mut ops: mpsc::UnboundedReceiver<ClientOp>,
) {
    while let Some(op) = ops.recv().await {
        let failure = match op {
            ClientOp::Connect {
                attempt,
                device,
                listener,
            } => client
                .connect(&device, listener)
                .await
                .err()
                .map(|e| (attempt, e)),
            ClientOp::Secret { attempt, secret } => client
                .send_secret(&secret)
                .await
                .err()
                .map(|e| (attempt, e)),
            ClientOp::Key(command) => {
                if let Err(e) = client.send_command(command.key, command.press).await {
                    warn!(key = %command.key, "key send failed: {e}");
                }
                None
            }
            ClientOp::Disconnect => {
                client.disconnect().await;
                None
            }
        };

        if let Some((attempt, e)) = failure {
            match shared.upgrade() {
                Some(shared) => shared.apply(attempt, LifecycleEvent::Error(e.to_string())),
                None => debug!(%attempt, "client error after controller was dropped: {e}"),
            }
        }
    }
    debug!("client queue closed");
}

/// Owner of the single remote-control session.
pub struct SessionController {
    shared: Arc<Shared>,
    ops: mpsc::UnboundedSender<ClientOp>,
    attempts: AttemptCounter,
}

impl SessionController {
    /// Creates an idle controller whose client calls run on `runtime`.
    ///
    /// Spawns the worker that drains the client queue; it exits when the
    /// controller is dropped.
    pub fn new(client: Arc<dyn RemoteClient>, runtime: Handle) -> Self {
        let (updates, _) = watch::channel(SessionSnapshot::default());
        let shared = Arc::new(Shared {
            inner: Mutex::new(SessionInner::default()),
            updates,
        });
        let (ops, queue) = mpsc::unbounded_channel();
        runtime.spawn(run_client_ops(client, Arc::downgrade(&shared), queue));
        Self {
            shared,
            ops,
            attempts: AttemptCounter::new(),
        }
    }

    fn enqueue(&self, op: ClientOp) {
        if self.ops.send(op).is_err() {
            warn!("client worker has stopped; call dropped");
        }
    }

    /// Starts a handshake with `device`, abandoning any earlier attempt.
    ///
    /// Clears the last error. Returns the identifier of the new attempt.
    pub fn connect(&self, device: DeviceDescriptor) -> AttemptId {
        let attempt = self.attempts.next();
        {
            let mut inner = self.shared.lock();
            if let Some(previous) = inner.current_attempt {
                debug!(%previous, %attempt, "superseding in-flight attempt");
            }
            inner.current_attempt = Some(attempt);
            inner.state = ConnectionState::Connecting;
            inner.device = Some(device.clone());
            inner.last_error = None;
            inner.pending_secret = None;
            self.shared.publish(&inner);
        }
        info!(%attempt, %device, "connecting");

        let listener: Arc<dyn LifecycleListener> = Arc::new(AttemptListener {
            attempt,
            shared: Arc::downgrade(&self.shared),
        });
        self.enqueue(ClientOp::Connect {
            attempt,
            device,
            listener,
        });

        attempt
    }

    /// Replaces the PIN text typed so far. No-op unless awaiting a secret.
    pub fn update_pending_secret(&self, text: &str) -> bool {
        let mut inner = self.shared.lock();
        if !inner.state.is_awaiting_secret() {
            return false;
        }
        match inner.pending_secret.as_mut() {
            Some(pending) => {
                pending.update(text);
                true
            }
            None => false,
        }
    }

    /// `true` if a PIN is requested and the typed text has at least `min_len`
    /// characters after trimming.
    pub fn pending_secret_ready(&self, min_len: usize) -> bool {
        let inner = self.shared.lock();
        inner
            .pending_secret
            .as_ref()
            .is_some_and(|p| p.is_submittable(min_len))
    }

    /// Sends `pin` (trimmed) to the TV and moves to `Pairing`.
    ///
    /// No-op unless awaiting a secret; returns whether the PIN was forwarded.
    /// The pending secret is consumed, so a repeat call does nothing until
    /// the TV asks again.
    pub fn submit_secret(&self, pin: &str) -> bool {
        self.forward_secret(Some(pin))
    }

    /// Like [`submit_secret`](Self::submit_secret), using the text entered via
    /// [`update_pending_secret`](Self::update_pending_secret).
    pub fn submit_pending_secret(&self) -> bool {
        self.forward_secret(None)
    }

    fn forward_secret(&self, pin: Option<&str>) -> bool {
        let (attempt, secret) = {
            let mut inner = self.shared.lock();
            let (true, Some(attempt)) = (inner.state.is_awaiting_secret(), inner.current_attempt)
            else {
                debug!(state = %inner.state, "secret submitted outside awaiting_secret; ignored");
                return false;
            };
            let mut pending = inner.pending_secret.take().unwrap_or_default();
            if let Some(pin) = pin {
                pending.update(pin);
            }
            inner.state = ConnectionState::Pairing;
            info!(%attempt, from = "awaiting_secret", to = "pairing", "session state changed");
            self.shared.publish(&inner);
            (attempt, pending.into_secret())
        };

        self.enqueue(ClientOp::Secret { attempt, secret });
        true
    }

    /// Dismisses the PIN request: abandons the attempt and disconnects.
    ///
    /// No-op unless awaiting a secret.
    pub fn cancel_secret(&self) -> bool {
        {
            let mut inner = self.shared.lock();
            if !inner.state.is_awaiting_secret() {
                return false;
            }
            inner.pending_secret = None;
            inner.current_attempt = None;
            inner.state = ConnectionState::Disconnected;
            info!("pairing cancelled by user");
            self.shared.publish(&inner);
        }
        self.enqueue(ClientOp::Disconnect);
        true
    }

    /// Sends `command` if connected; otherwise drops it silently.
    ///
    /// Returns whether a send was dispatched. Send failures are logged and do
    /// not change the session state.
    pub fn send_key(&self, command: KeyCommand) -> bool {
        {
            let inner = self.shared.lock();
            if !inner.state.is_connected() {
                debug!(key = %command.key, state = %inner.state, "key dropped: not connected");
                return false;
            }
        }

        self.enqueue(ClientOp::Key(command));
        true
    }

    /// Abandons the current attempt, closes the connection, and moves to
    /// `Disconnected`. Succeeds from any state.
    pub fn disconnect(&self) {
        {
            let mut inner = self.shared.lock();
            inner.current_attempt = None;
            inner.pending_secret = None;
            if inner.state != ConnectionState::Disconnected {
                info!(from = %inner.state, to = "disconnected", "session state changed");
            }
            inner.state = ConnectionState::Disconnected;
            self.shared.publish(&inner);
        }
        self.enqueue(ClientOp::Disconnect);
    }

    /// Subscribes to snapshots; the receiver starts at the current one.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.updates.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().last_error.clone()
    }

    pub fn device(&self) -> Option<DeviceDescriptor> {
        self.shared.lock().device.clone()
    }

    /// Identifier of the attempt whose callbacks are currently honoured.
    pub fn current_attempt(&self) -> Option<AttemptId> {
        self.shared.lock().current_attempt
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::remote::mock::{ClientCall, ScriptedRemoteClient};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn tv(addr: &str) -> DeviceDescriptor {
        DeviceDescriptor::new(format!("tv-{addr}"), addr.parse().unwrap(), 6466)
    }

    /// Waits for the `index`-th connect to reach the client, then returns
    /// its listener so the test can fire callbacks by hand.
    async fn listener_of(client: &ScriptedRemoteClient, index: usize) -> Arc<dyn LifecycleListener> {
        let registered = client
            .wait_until(Duration::from_secs(1), |c| c.listener(index).is_some())
            .await;
        assert!(registered, "listener {index} was never registered");
        client.listener(index).unwrap()
    }

    fn controller(client: Arc<ScriptedRemoteClient>) -> SessionController {
        SessionController::new(client, Handle::current())
    }

    #[tokio::test]
    async fn test_new_controller_is_idle() {
        let ctl = controller(Arc::new(ScriptedRemoteClient::new()));

        assert_eq!(ctl.state(), ConnectionState::Idle);
        assert!(ctl.current_attempt().is_none());
        assert!(!ctl.snapshot().pin_requested);
    }

    #[tokio::test]
    async fn test_connect_moves_to_connecting_and_records_device() {
        let ctl = controller(Arc::new(ScriptedRemoteClient::new()));

        let attempt = ctl.connect(tv("10.0.0.5"));

        assert_eq!(ctl.state(), ConnectionState::Connecting);
        assert_eq!(ctl.current_attempt(), Some(attempt));
        assert_eq!(ctl.device().unwrap().address.to_string(), "10.0.0.5");
    }

    #[tokio::test]
    async fn test_secret_requested_then_submit_moves_to_pairing_and_consumes_secret() {
        // Arrange
        let client = Arc::new(ScriptedRemoteClient::new());
        let ctl = controller(Arc::clone(&client));
        ctl.connect(tv("10.0.0.5"));
        let listener = listener_of(&client, 0).await;
        listener.on_session_created();
        listener.on_secret_requested();
        assert!(ctl.snapshot().pin_requested);

        // Act
        let first = ctl.submit_secret(" 123456 ");
        let second = ctl.submit_secret("654321");

        // Assert
        assert!(first);
        assert!(!second, "second secret must be ignored until the TV asks again");
        assert_eq!(ctl.state(), ConnectionState::Pairing);
        assert!(!ctl.pending_secret_ready(1));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*client.secrets.lock().unwrap(), vec!["123456".to_string()]);
    }

    #[tokio::test]
    async fn test_pending_secret_buffer_is_submitted() {
        let client = Arc::new(ScriptedRemoteClient::new());
        let ctl = controller(Arc::clone(&client));
        ctl.connect(tv("10.0.0.5"));
        listener_of(&client, 0).await.on_secret_requested();

        assert!(ctl.update_pending_secret("12"));
        assert!(!ctl.pending_secret_ready(4));
        assert!(ctl.update_pending_secret("1234"));
        assert!(ctl.pending_secret_ready(4));
        assert!(ctl.submit_pending_secret());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*client.secrets.lock().unwrap(), vec!["1234".to_string()]);
    }

    #[tokio::test]
    async fn test_update_pending_secret_after_submit_is_noop() {
        let client = Arc::new(ScriptedRemoteClient::new());
        let ctl = controller(Arc::clone(&client));
        ctl.connect(tv("10.0.0.5"));
        listener_of(&client, 0).await.on_secret_requested();
        assert!(ctl.update_pending_secret("12"));

        assert!(ctl.submit_pending_secret());

        assert!(!ctl.update_pending_secret("1234"));
        assert!(!ctl.pending_secret_ready(1));
    }

    #[tokio::test]
    async fn test_update_pending_secret_outside_awaiting_secret_is_noop() {
        let ctl = controller(Arc::new(ScriptedRemoteClient::new()));

        assert!(!ctl.update_pending_secret("1234"));
        assert!(!ctl.submit_secret("1234"));
    }

    #[tokio::test]
    async fn test_secret_rerequest_after_pairing_allows_one_more_submit() {
        let client = Arc::new(ScriptedRemoteClient::new());
        let ctl = controller(Arc::clone(&client));
        ctl.connect(tv("10.0.0.5"));
        let listener = listener_of(&client, 0).await;
        listener.on_secret_requested();
        assert!(ctl.submit_secret("000000"));

        listener.on_secret_requested();

        assert_eq!(ctl.state(), ConnectionState::AwaitingSecret);
        assert!(ctl.submit_secret("123456"));
    }

    #[tokio::test]
    async fn test_error_while_connected_fails_and_keeps_message() {
        let client = Arc::new(ScriptedRemoteClient::new());
        let ctl = controller(Arc::clone(&client));
        ctl.connect(tv("10.0.0.5"));
        let listener = listener_of(&client, 0).await;
        listener.on_paired();
        listener.on_connected();
        assert!(ctl.state().is_connected());

        listener.on_error("timeout");

        assert_eq!(ctl.state(), ConnectionState::Failed("timeout".into()));
        assert_eq!(ctl.last_error().as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_connect_clears_last_error() {
        let client = Arc::new(ScriptedRemoteClient::new());
        let ctl = controller(Arc::clone(&client));
        ctl.connect(tv("10.0.0.5"));
        listener_of(&client, 0).await.on_error("refused");

        ctl.connect(tv("10.0.0.5"));

        assert!(ctl.last_error().is_none());
        assert_eq!(ctl.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_stale_attempt_callbacks_are_ignored() {
        // Arrange: connect to A, then to B before A reports anything.
        let client = Arc::new(ScriptedRemoteClient::new());
        let ctl = controller(Arc::clone(&client));
        ctl.connect(tv("10.0.0.1"));
        let stale = listener_of(&client, 0).await;
        ctl.connect(tv("10.0.0.2"));
        let current = listener_of(&client, 1).await;

        // Act
        stale.on_paired();
        stale.on_connected();
        current.on_secret_requested();
        stale.on_error("late failure from A");

        // Assert
        assert_eq!(ctl.state(), ConnectionState::AwaitingSecret);
        assert!(ctl.last_error().is_none());
        assert_eq!(ctl.device().unwrap().address.to_string(), "10.0.0.2");
    }

    #[tokio::test]
    async fn test_cancel_secret_disconnects_and_blocks_later_submit() {
        let client = Arc::new(ScriptedRemoteClient::new());
        let ctl = controller(Arc::clone(&client));
        ctl.connect(tv("10.0.0.5"));
        let listener = listener_of(&client, 0).await;
        listener.on_secret_requested();

        assert!(ctl.cancel_secret());

        assert_eq!(ctl.state(), ConnectionState::Disconnected);
        assert!(!ctl.submit_secret("123456"));
        listener.on_connected();
        assert_eq!(ctl.state(), ConnectionState::Disconnected, "cancelled attempt is stale");
    }

    #[tokio::test]
    async fn test_disconnect_from_idle_succeeds() {
        let ctl = controller(Arc::new(ScriptedRemoteClient::new()));

        ctl.disconnect();

        assert_eq!(ctl.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_subscribe_sees_transitions() {
        let client = Arc::new(ScriptedRemoteClient::new());
        let ctl = controller(Arc::clone(&client));
        let mut rx = ctl.subscribe();

        ctl.connect(tv("10.0.0.5"));
        let listener = listener_of(&client, 0).await;
        listener.on_connecting_to_remote();
        listener.on_connected();

        let snapshot = tokio::time::timeout(
            Duration::from_secs(1),
            rx.wait_for(|s| s.state.is_connected()),
        )
        .await
        .expect("connected snapshot must be published")
        .expect("sender alive")
        .clone();
        assert_eq!(snapshot.device.unwrap().address.to_string(), "10.0.0.5");
    }

    #[tokio::test]
    async fn test_connect_error_result_becomes_failed_state() {
        // Arrange
        let mut mock = MockRemoteClient::new();
        mock.expect_connect()
            .times(1)
            .returning(|_, _| Err(RemoteError::Connect("no route to host".into())));
        let ctl = SessionController::new(Arc::new(mock), Handle::current());
        let mut rx = ctl.subscribe();

        // Act
        ctl.connect(tv("10.0.0.9"));

        // Assert
        let snapshot = tokio::time::timeout(
            Duration::from_secs(1),
            rx.wait_for(|s| s.state.failure().is_some()),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(
            snapshot.last_error.as_deref(),
            Some("connection failed: no route to host")
        );
    }

    #[tokio::test]
    async fn test_send_key_when_not_connected_never_reaches_client() {
        let mut mock = MockRemoteClient::new();
        mock.expect_send_command().never();
        let ctl = SessionController::new(Arc::new(mock), Handle::current());

        let dispatched = ctl.send_key(KeyCommand::short(RemoteKeyCode::DpadUp));

        assert!(!dispatched);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_send_key_when_connected_dispatches_command() {
        let client = Arc::new(ScriptedRemoteClient::new());
        let ctl = controller(Arc::clone(&client));
        ctl.connect(tv("10.0.0.5"));
        let listener = listener_of(&client, 0).await;
        listener.on_paired();
        listener.on_connected();

        let dispatched = ctl.send_key(KeyCommand::long(RemoteKeyCode::Home));

        assert!(dispatched);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            *client.commands.lock().unwrap(),
            vec![(RemoteKeyCode::Home, PressKind::Long)]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_disconnect_then_connect_reach_client_in_call_order() {
        // Arrange
        let client = Arc::new(ScriptedRemoteClient::new());
        let ctl = controller(Arc::clone(&client));

        // Act
        for _ in 0..100 {
            ctl.disconnect();
            ctl.connect(tv("10.0.0.5"));
        }

        // Assert
        assert!(client.wait_until(Duration::from_secs(2), |c| c.calls().len() == 200).await);
        for pair in client.calls().chunks(2) {
            assert_eq!(
                pair,
                [ClientCall::Disconnect, ClientCall::Connect("tv-10.0.0.5".into())]
            );
        }
    }

    #[tokio::test]
    async fn test_cancel_then_connect_keeps_new_handshake_last() {
        let client = Arc::new(ScriptedRemoteClient::new());
        let ctl = controller(Arc::clone(&client));
        ctl.connect(tv("10.0.0.1"));
        listener_of(&client, 0).await.on_secret_requested();

        assert!(ctl.cancel_secret());
        ctl.connect(tv("10.0.0.2"));

        assert!(client.wait_until(Duration::from_secs(1), |c| c.calls().len() == 3).await);
        assert_eq!(
            client.calls(),
            vec![
                ClientCall::Connect("tv-10.0.0.1".into()),
                ClientCall::Disconnect,
                ClientCall::Connect("tv-10.0.0.2".into()),
            ]
        );
        assert_eq!(ctl.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_dispatch_maps_events_to_callbacks() {
        #[derive(Default)]
        struct Names(StdMutex<Vec<String>>);
        impl LifecycleListener for Names {
            fn on_session_created(&self) { self.0.lock().unwrap().push("created".into()) }
            fn on_secret_requested(&self) { self.0.lock().unwrap().push("secret".into()) }
            fn on_paired(&self) { self.0.lock().unwrap().push("paired".into()) }
            fn on_connecting_to_remote(&self) { self.0.lock().unwrap().push("remote".into()) }
            fn on_connected(&self) { self.0.lock().unwrap().push("connected".into()) }
            fn on_disconnect(&self) { self.0.lock().unwrap().push("disconnect".into()) }
            fn on_error(&self, m: &str) { self.0.lock().unwrap().push(format!("error:{m}")) }
        }

        let names = Names::default();
        dispatch(&names, &LifecycleEvent::Paired);
        dispatch(&names, &LifecycleEvent::Error("x".into()));

        assert_eq!(*names.0.lock().unwrap(), vec!["paired", "error:x"]);
    }
}
