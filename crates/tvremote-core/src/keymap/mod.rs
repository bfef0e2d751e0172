//! Remote key codes and the per-press command value.
//!
//! The canonical representation is the Android `KeyEvent` key code, which is
//! what the Android TV remote protocol carries on the wire. UI shells refer
//! to keys by snake-case name (`"dpad_up"`) and translate through
//! [`RemoteKeyCode::from_name`].

pub mod remote_key;

pub use remote_key::{KeyCodeError, KeyCommand, PressKind, RemoteKeyCode};
