//! Framework-neutral command bridge for a remote-control UI.
//!
//! Exposes discovery, the device list, the PIN prompt and key sending to a UI
//! shell (Tauri, a mobile host, a test harness) as plain functions returning
//! serializable DTOs.  Only this module references both the application layer
//! and the presentation-facing shapes.
//!
//! # Command flow (for beginners)
//!
//! ```text
//! UI                               Rust backend
//! ─────────────────────────────────────────────────────────────
//! start_scan()          ────────>  DiscoveryService::start  (5 s in background)
//! list_devices()        ────────>  Vec<DeviceDto>           (poll while scanning)
//! select_device("ip")   ────────>  SessionController::connect
//! get_status()          ────────>  RemoteStatusDto { pin_requested: true, .. }
//! update_pin("12") ... submit_pin()
//! press_key({ key: "dpad_up", long_press: false })
//! ```
//!
//! # `CommandResult<T>`
//!
//! All commands return `CommandResult<T>`, a unified envelope:
//! ```json
//! { "success": true,  "data": {...}, "error": null  }
//! { "success": false, "data": null,  "error": "..."  }
//! ```
//! Network failures never show up here; they surface as the session's
//! `error` field in [`RemoteStatusDto`].  Only validation failures (unknown
//! device, unknown key, PIN too short) are returned as errors.
//!
//! # std Mutex for the device list
//!
//! The device list is written from the discovery worker thread, which is a
//! blocking thread outside any async context, so it uses `std::sync::Mutex`.
//! No guard is held across an `.await`.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, info};
use tvremote_core::{DeviceDescriptor, DeviceList, KeyCommand, PressKind, RemoteKeyCode};

use crate::application::control_session::{RemoteClient, SessionController};
use crate::application::discover_devices::{DiscoveryService, StartOutcome};
use crate::application::multicast::{MulticastLock, MulticastPermission};
use crate::infrastructure::config::RemoteConfig;
use crate::infrastructure::network::mdns::MdnsBrowserFactory;

// ── Shared application state ──────────────────────────────────────────────────

/// State shared between UI commands.
pub struct RemoteAppState {
    devices: Mutex<DeviceList>,
    scans_completed: AtomicU64,
    discovery: DiscoveryService,
    session: SessionController,
    min_pin_length: usize,
}

impl RemoteAppState {
    pub fn new(
        discovery: DiscoveryService,
        session: SessionController,
        min_pin_length: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            devices: Mutex::new(DeviceList::new()),
            scans_completed: AtomicU64::new(0),
            discovery,
            session,
            min_pin_length,
        })
    }

    /// Wires the production stack: `mdns-sd` discovery guarded by
    /// `permission`, and `client` for the session.
    pub fn from_config(
        config: &RemoteConfig,
        client: Arc<dyn RemoteClient>,
        permission: Arc<dyn MulticastPermission>,
        runtime: Handle,
    ) -> Arc<Self> {
        let discovery = DiscoveryService::new(
            Arc::new(MdnsBrowserFactory),
            MulticastLock::new("tvremote-discovery", permission),
            config.discovery.to_options(),
            runtime.clone(),
        );
        let session = SessionController::new(client, runtime);
        Self::new(discovery, session, config.session.min_pin_length)
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn discovery(&self) -> &DiscoveryService {
        &self.discovery
    }

    fn devices(&self) -> MutexGuard<'_, DeviceList> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── DTOs ──────────────────────────────────────────────────────────────────────

/// One discovered TV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDto {
    pub name: String,
    /// IP address as text; pass it back to `select_device`.
    pub address: String,
    pub port: u16,
}

impl From<&DeviceDescriptor> for DeviceDto {
    fn from(device: &DeviceDescriptor) -> Self {
        Self {
            name: device.display_name.clone(),
            address: device.address.to_string(),
            port: device.port,
        }
    }
}

/// Full status snapshot for the UI.
///
/// `connection_state` is the snake-case state label (`"awaiting_secret"`,
/// `"connected"`, `"failed"`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStatusDto {
    pub connection_state: String,
    pub device: Option<DeviceDto>,
    pub error: Option<String>,
    pub pin_requested: bool,
    pub scanning: bool,
    pub device_count: usize,
    pub scans_completed: u64,
}

/// A key press from the UI, e.g. `{ "key": "volume_up", "long_press": false }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPressDto {
    pub key: String,
    #[serde(default)]
    pub long_press: bool,
}

/// Unified response wrapper for bridge commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    /// `true` if the command completed successfully; `false` on error.
    pub success: bool,
    /// The command's return value, present only when `success` is `true`.
    pub data: Option<T>,
    /// A human-readable error message, present only when `success` is `false`.
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Starts a scan. Returns `false` if one was already running.
///
/// Found devices are merged into the device list (one entry per address);
/// `scans_completed` in [`get_status`] increments when the scan ends.
pub fn start_scan(state: &Arc<RemoteAppState>) -> CommandResult<bool> {
    let found_state = Arc::downgrade(state);
    let done_state = Arc::downgrade(state);

    let outcome = state.discovery.start(
        move |device| {
            if let Some(state) = found_state.upgrade() {
                let added = state.devices().upsert(device);
                debug!(added, "device list updated");
            }
        },
        move || {
            if let Some(state) = done_state.upgrade() {
                state.scans_completed.fetch_add(1, Ordering::SeqCst);
                info!(devices = state.devices().len(), "scan complete");
            }
        },
    );

    CommandResult::ok(outcome == StartOutcome::Started)
}

/// Returns the discovered devices in first-seen order.
pub fn list_devices(state: &RemoteAppState) -> CommandResult<Vec<DeviceDto>> {
    CommandResult::ok(state.devices().iter().map(DeviceDto::from).collect())
}

/// Empties the device list. Returns how many entries were removed.
pub fn clear_devices(state: &RemoteAppState) -> CommandResult<usize> {
    let mut devices = state.devices();
    let removed = devices.len();
    devices.clear();
    CommandResult::ok(removed)
}

/// Connects to the listed device with IP `address`.
pub fn select_device(state: &RemoteAppState, address: &str) -> CommandResult<DeviceDto> {
    let ip: IpAddr = match address.trim().parse() {
        Ok(ip) => ip,
        Err(_) => return CommandResult::err(format!("invalid address: {address:?}")),
    };
    let Some(device) = state.devices().find(ip).cloned() else {
        return CommandResult::err(format!("unknown device: {ip}"));
    };

    let dto = DeviceDto::from(&device);
    state.session.connect(device);
    CommandResult::ok(dto)
}

/// Replaces the PIN text typed so far. Returns whether it can be submitted.
pub fn update_pin(state: &RemoteAppState, text: &str) -> CommandResult<bool> {
    if !state.session.update_pending_secret(text) {
        return CommandResult::err("no PIN was requested");
    }
    CommandResult::ok(state.session.pending_secret_ready(state.min_pin_length))
}

/// Submits the PIN entered with [`update_pin`].
pub fn submit_pin(state: &RemoteAppState) -> CommandResult<()> {
    if !state.session.snapshot().pin_requested {
        return CommandResult::err("no PIN was requested");
    }
    if !state.session.pending_secret_ready(state.min_pin_length) {
        return CommandResult::err(format!(
            "PIN must have at least {} characters",
            state.min_pin_length
        ));
    }
    if !state.session.submit_pending_secret() {
        return CommandResult::err("no PIN was requested");
    }
    CommandResult::ok(())
}

/// Dismisses the PIN prompt and drops the connection attempt.
pub fn cancel_pin(state: &RemoteAppState) -> CommandResult<()> {
    if state.session.cancel_secret() {
        CommandResult::ok(())
    } else {
        CommandResult::err("no PIN was requested")
    }
}

/// Sends a key. Returns `false` (not an error) when not connected.
pub fn press_key(state: &RemoteAppState, press: KeyPressDto) -> CommandResult<bool> {
    let key = match press.key.parse::<RemoteKeyCode>() {
        Ok(key) => key,
        Err(e) => return CommandResult::err(e.to_string()),
    };
    let command = KeyCommand::new(key, PressKind::from_long_press(press.long_press));
    CommandResult::ok(state.session.send_key(command))
}

pub fn disconnect(state: &RemoteAppState) -> CommandResult<()> {
    state.session.disconnect();
    CommandResult::ok(())
}

/// Returns the current status snapshot. Intended for periodic polling.
pub fn get_status(state: &RemoteAppState) -> CommandResult<RemoteStatusDto> {
    let snapshot = state.session.snapshot();
    let device_count = state.devices().len();

    CommandResult::ok(RemoteStatusDto {
        connection_state: snapshot.state.label().to_string(),
        device: snapshot.device.as_ref().map(DeviceDto::from),
        error: snapshot.last_error,
        pin_requested: snapshot.pin_requested,
        scanning: state.discovery.is_scanning(),
        device_count,
        scans_completed: state.scans_completed.load(Ordering::SeqCst),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
