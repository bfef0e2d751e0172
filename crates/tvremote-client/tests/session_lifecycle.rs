//! Integration tests for the session controller.
//!
//! # Purpose
//!
//! These tests drive `SessionController` through its public API with the
//! `ScriptedRemoteClient` from `infrastructure::remote::mock`, the way the UI
//! bridge uses it.  They verify:
//!
//! - The first-time pairing flow: connect → PIN prompt → PIN → connected.
//! - Key presses only reach the client while connected.
//! - Errors replace any state with `Failed(message)` and keep the message.
//! - Re-entrant connects: callbacks of an abandoned attempt change nothing,
//!   even when they race with the current attempt on other threads.
//! - Client calls arrive in the order they were issued, so a retry is never
//!   torn down by the disconnect that preceded it.
//!
//! # Pairing flow
//!
//! ```text
//! SessionController                      TV (ScriptedRemoteClient)
//! ─────────────────                      ─────────────────────────
//! connect(device)          ──────────>   on_session_created
//!   Connecting                           on_secret_requested
//!   AwaitingSecret  (UI shows PIN)
//! submit_secret("123456")  ──────────>   send_secret("123456")
//!   Pairing                              on_paired, on_connecting_to_remote,
//!                                        on_connected
//!   Connected
//! send_key(DpadCenter)     ──────────>   send_command(DpadCenter, Short)
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tvremote_client::application::control_session::{SessionController, SessionSnapshot};
use tvremote_client::infrastructure::remote::mock::{ClientCall, ScriptedRemoteClient};
use tvremote_client::RemoteError;
use tvremote_core::{ConnectionState, DeviceDescriptor, KeyCommand, LifecycleEvent, PressKind, RemoteKeyCode};

const WAIT: Duration = Duration::from_secs(2);

fn tv(name: &str, ip: &str) -> DeviceDescriptor {
    DeviceDescriptor::new(name, ip.parse().unwrap(), 6466)
}

async fn settle(rx: &mut watch::Receiver<SessionSnapshot>, label: &str) -> SessionSnapshot {
    tokio::time::timeout(WAIT, rx.wait_for(|s| s.state.label() == label))
        .await
        .unwrap_or_else(|_| panic!("session never reached {label}"))
        .expect("controller alive")
        .clone()
}

fn setup(client: ScriptedRemoteClient) -> (Arc<ScriptedRemoteClient>, SessionController) {
    let client = Arc::new(client);
    let session = SessionController::new(client.clone(), Handle::current());
    (client, session)
}

// ── Pairing ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_time_pairing_reaches_connected() {
    // Arrange
    let (client, session) = setup(ScriptedRemoteClient::with_script(vec![
        LifecycleEvent::SessionCreated,
        LifecycleEvent::SecretRequested,
    ]));
    let mut rx = session.subscribe();

    // Act: connect and wait for the PIN prompt.
    session.connect(tv("Living Room", "192.168.1.30"));
    let prompt = settle(&mut rx, "awaiting_secret").await;
    assert!(prompt.pin_requested);

    // Act: answer it, then let the TV finish the handshake.
    assert!(session.submit_secret("123456"));
    assert!(client.wait_until(WAIT, |c| c.secrets.lock().unwrap().len() == 1).await);
    client.emit(0, &LifecycleEvent::Paired);
    client.emit(0, &LifecycleEvent::ConnectingToRemote);
    client.emit(0, &LifecycleEvent::Connected);

    // Assert
    let connected = settle(&mut rx, "connected").await;
    assert!(!connected.pin_requested);
    assert_eq!(connected.device.unwrap().display_name, "Living Room");
    assert_eq!(*client.secrets.lock().unwrap(), vec!["123456".to_string()]);
}

#[tokio::test]
async fn test_second_secret_is_not_sent_until_requested_again() {
    let (client, session) = setup(ScriptedRemoteClient::with_script(vec![
        LifecycleEvent::SecretRequested,
    ]));
    let mut rx = session.subscribe();
    session.connect(tv("Den", "10.0.0.4"));
    settle(&mut rx, "awaiting_secret").await;

    assert!(session.submit_secret("123456"));
    assert!(!session.submit_secret("123456"));

    assert!(client.wait_until(WAIT, |c| !c.secrets.lock().unwrap().is_empty()).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.secrets.lock().unwrap().len(), 1);
    assert_eq!(session.state(), ConnectionState::Pairing);
}

#[tokio::test]
async fn test_cancel_secret_disconnects_client() {
    let (client, session) = setup(ScriptedRemoteClient::with_script(vec![
        LifecycleEvent::SecretRequested,
    ]));
    let mut rx = session.subscribe();
    session.connect(tv("Den", "10.0.0.4"));
    settle(&mut rx, "awaiting_secret").await;

    assert!(session.cancel_secret());

    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(client.wait_until(WAIT, |c| c.disconnect_count() == 1).await);
    assert!(!session.submit_secret("123456"));
}

// ── Key sending ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_keys_reach_client_only_while_connected() {
    // Arrange
    let (client, session) = setup(ScriptedRemoteClient::with_script(vec![
        LifecycleEvent::Paired,
        LifecycleEvent::Connected,
    ]));
    let mut rx = session.subscribe();

    // Act
    let while_idle = session.send_key(KeyCommand::short(RemoteKeyCode::Home));
    session.connect(tv("Den", "10.0.0.4"));
    settle(&mut rx, "connected").await;
    let while_connected = session.send_key(KeyCommand::new(RemoteKeyCode::DpadCenter, PressKind::Short));
    client.emit(0, &LifecycleEvent::Error("socket closed".into()));
    let while_failed = session.send_key(KeyCommand::short(RemoteKeyCode::Back));

    // Assert
    assert!(!while_idle);
    assert!(while_connected);
    assert!(!while_failed);
    assert!(client.wait_until(WAIT, |c| !c.commands.lock().unwrap().is_empty()).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        *client.commands.lock().unwrap(),
        vec![(RemoteKeyCode::DpadCenter, PressKind::Short)]
    );
}

#[tokio::test]
async fn test_failed_key_send_keeps_session_connected() {
    let mut failing = ScriptedRemoteClient::with_script(vec![LifecycleEvent::Connected]);
    failing.should_fail = true;
    let (_client, session) = setup(failing);
    let mut rx = session.subscribe();
    session.connect(tv("Den", "10.0.0.4"));
    settle(&mut rx, "connected").await;

    assert!(session.send_key(KeyCommand::long(RemoteKeyCode::Power)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.state().is_connected());
    assert!(session.last_error().is_none());
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_error_while_connected_becomes_failed_with_message() {
    let (client, session) = setup(ScriptedRemoteClient::with_script(vec![
        LifecycleEvent::Paired,
        LifecycleEvent::Connected,
    ]));
    let mut rx = session.subscribe();
    session.connect(tv("Den", "10.0.0.4"));
    settle(&mut rx, "connected").await;

    client.emit(0, &LifecycleEvent::Error("timeout".into()));

    assert_eq!(session.state(), ConnectionState::Failed("timeout".into()));
    assert_eq!(session.last_error().as_deref(), Some("timeout"));
}

#[tokio::test]
async fn test_late_disconnect_keeps_failure_visible() {
    let (client, session) = setup(ScriptedRemoteClient::with_script(vec![
        LifecycleEvent::Error("pairing rejected".into()),
    ]));
    let mut rx = session.subscribe();
    session.connect(tv("Den", "10.0.0.4"));
    settle(&mut rx, "failed").await;

    client.emit(0, &LifecycleEvent::Disconnected);

    assert_eq!(session.state().failure(), Some("pairing rejected"));
}

#[tokio::test]
async fn test_connect_returning_err_fails_and_retry_clears_error() {
    // Arrange
    let mut refusing = ScriptedRemoteClient::new();
    refusing.connect_error = Some(RemoteError::Connect("host unreachable".into()));
    let (client, session) = setup(refusing);
    let mut rx = session.subscribe();

    // Act
    session.connect(tv("Den", "10.0.0.4"));
    let failed = settle(&mut rx, "failed").await;
    session.connect(tv("Den", "10.0.0.4"));

    // Assert
    assert_eq!(failed.last_error.as_deref(), Some("connection failed: host unreachable"));
    assert_eq!(session.state(), ConnectionState::Connecting);
    assert!(session.last_error().is_none());
    assert!(client.wait_until(WAIT, |c| c.connect_count() == 2).await);
}

// ── Re-entrant connect ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reconnect_ignores_abandoned_attempt() {
    // Arrange
    let (client, session) = setup(ScriptedRemoteClient::new());
    let first = session.connect(tv("A", "10.0.0.1"));
    assert!(client.wait_until(WAIT, |c| c.connect_count() == 1).await);

    // Act
    let second = session.connect(tv("B", "10.0.0.2"));
    assert!(client.wait_until(WAIT, |c| c.connect_count() == 2).await);
    client.emit(0, &LifecycleEvent::Paired);
    client.emit(0, &LifecycleEvent::Connected);
    client.emit(1, &LifecycleEvent::SecretRequested);
    client.emit(0, &LifecycleEvent::Error("A timed out".into()));

    // Assert
    assert!(second > first);
    assert_eq!(session.current_attempt(), Some(second));
    assert_eq!(session.state(), ConnectionState::AwaitingSecret);
    assert!(session.last_error().is_none());
    assert_eq!(session.device().unwrap().display_name, "B");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_callbacks_from_both_attempts_do_not_deadlock() {
    // Arrange
    let (client, session) = setup(ScriptedRemoteClient::new());
    let session = Arc::new(session);
    session.connect(tv("A", "10.0.0.1"));
    assert!(client.wait_until(WAIT, |c| c.connect_count() == 1).await);
    session.connect(tv("B", "10.0.0.2"));
    assert!(client.wait_until(WAIT, |c| c.connect_count() == 2).await);
    let stale = client.listener(0).unwrap();
    let current = client.listener(1).unwrap();

    // Act: hammer the stale listener while the current attempt completes.
    let work = tokio::task::spawn_blocking(move || {
        let noisy = thread::spawn(move || {
            for _ in 0..500 {
                stale.on_error("stale");
                stale.on_connected();
                stale.on_disconnect();
            }
        });
        current.on_session_created();
        current.on_paired();
        current.on_connecting_to_remote();
        current.on_connected();
        noisy.join().unwrap();
    });
    let controller = Arc::clone(&session);
    let reader = tokio::spawn(async move { controller.snapshot() });

    // Assert
    tokio::time::timeout(WAIT, work).await.expect("callbacks deadlocked").unwrap();
    reader.await.unwrap();
    assert_eq!(session.state(), ConnectionState::Connected);
    assert!(session.last_error().is_none());

    session.disconnect();
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(client.wait_until(WAIT, |c| c.disconnect_count() == 1).await);
}

#[tokio::test]
async fn test_disconnect_succeeds_from_every_state() {
    let (client, session) = setup(ScriptedRemoteClient::new());

    session.disconnect();
    assert_eq!(session.state(), ConnectionState::Disconnected);

    session.connect(tv("A", "10.0.0.1"));
    session.disconnect();
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(client.wait_until(WAIT, |c| c.connect_count() == 1).await);

    client.emit(0, &LifecycleEvent::Connected);
    assert_eq!(session.state(), ConnectionState::Disconnected, "attempt was abandoned");
}

// ── Client call order ─────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_retry_after_disconnect_is_not_torn_down() {
    // Arrange
    let (client, session) = setup(ScriptedRemoteClient::with_script(vec![
        LifecycleEvent::Error("pairing rejected".into()),
    ]));
    let mut rx = session.subscribe();
    session.connect(tv("Den", "10.0.0.4"));
    settle(&mut rx, "failed").await;

    // Act
    for _ in 0..50 {
        session.disconnect();
        session.connect(tv("Den", "10.0.0.4"));
    }

    // Assert: every retry reaches the client after the disconnect before it.
    assert!(client.wait_until(WAIT, |c| c.connect_count() == 51).await);
    let calls = client.calls();
    assert_eq!(calls.len(), 101);
    assert_eq!(calls.last(), Some(&ClientCall::Connect("Den".into())));
    for pair in calls[1..].chunks(2) {
        assert_eq!(pair, [ClientCall::Disconnect, ClientCall::Connect("Den".into())]);
    }
}

#[tokio::test]
async fn test_cancel_then_connect_reaches_client_in_order() {
    // Arrange
    let (client, session) = setup(ScriptedRemoteClient::with_script(vec![
        LifecycleEvent::SecretRequested,
    ]));
    let mut rx = session.subscribe();
    session.connect(tv("A", "10.0.0.1"));
    settle(&mut rx, "awaiting_secret").await;

    // Act
    assert!(session.cancel_secret());
    session.connect(tv("B", "10.0.0.2"));

    // Assert
    let prompt = settle(&mut rx, "awaiting_secret").await;
    assert_eq!(prompt.device.unwrap().display_name, "B");
    assert_eq!(
        client.calls(),
        vec![
            ClientCall::Connect("A".into()),
            ClientCall::Disconnect,
            ClientCall::Connect("B".into()),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_consecutive_keys_are_sent_in_order() {
    // Arrange
    let (client, session) = setup(ScriptedRemoteClient::with_script(vec![
        LifecycleEvent::Connected,
    ]));
    let mut rx = session.subscribe();
    session.connect(tv("Den", "10.0.0.4"));
    settle(&mut rx, "connected").await;
    let keys = [
        RemoteKeyCode::DpadUp,
        RemoteKeyCode::DpadUp,
        RemoteKeyCode::DpadRight,
        RemoteKeyCode::DpadCenter,
        RemoteKeyCode::Back,
        RemoteKeyCode::Home,
    ];

    // Act
    for key in keys {
        assert!(session.send_key(KeyCommand::short(key)));
    }

    // Assert
    assert!(client.wait_until(WAIT, |c| c.commands.lock().unwrap().len() == keys.len()).await);
    let sent: Vec<RemoteKeyCode> = client.commands.lock().unwrap().iter().map(|(k, _)| *k).collect();
    assert_eq!(sent, keys);
}
