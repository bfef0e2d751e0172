//! # tvremote-core
//!
//! Shared library for tvremote containing the device model, the pairing
//! session state machine, and the remote key code table.
//!
//! This crate is used by the client crate and by any UI shell that wants to
//! render tvremote state. It has zero dependencies on OS APIs, async
//! runtimes, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! tvremote turns a desktop or phone into a remote control for Android TV
//! devices on the same network. Using it takes three steps:
//!
//! 1. **Discover**: browse the LAN for the `_androidtvremote._tcp.local.`
//!    mDNS service and build a list of TVs.
//! 2. **Pair**: connect to one TV. The first time, the TV shows a PIN that the
//!    user types back in; after that the TV remembers the client.
//! 3. **Control**: send key presses (D-pad, home, volume, ...) while the
//!    session is connected.
//!
//! This crate defines the pieces every layer agrees on:
//!
//! - **`domain`** – `DeviceDescriptor` and the deduplicating `DeviceList`,
//!   plus the `ConnectionState` machine and the `PendingSecret` PIN buffer.
//! - **`keymap`** – `RemoteKeyCode` (with Android `KeyEvent` codes),
//!   `PressKind`, and the `KeyCommand` value sent per key press.
//! - **`protocol`** – the lifecycle events emitted by a pairing/remote client
//!   and the attempt identifiers that tag them.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::device::{DeviceDescriptor, DeviceList};
pub use domain::session::{ConnectionState, PendingSecret, DEFAULT_MIN_PIN_LENGTH};
pub use keymap::remote_key::{KeyCodeError, KeyCommand, PressKind, RemoteKeyCode};
pub use protocol::lifecycle::{AttemptCounter, AttemptId, LifecycleEvent};
pub use protocol::ANDROID_TV_REMOTE_SERVICE;
