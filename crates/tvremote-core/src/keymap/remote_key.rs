//! Android TV remote key codes.
//!
//! # Where do the numbers come from? (for beginners)
//!
//! Android assigns every input key a number in `android.view.KeyEvent`
//! (`KEYCODE_DPAD_UP = 19`, `KEYCODE_HOME = 3`, ...). The Android TV remote
//! protocol sends those numbers unchanged, so the discriminant of each
//! [`RemoteKeyCode`] variant is its Android key code.
//!
//! | Key              | Android key code |
//! |------------------|------------------|
//! | D-pad up         | 19               |
//! | D-pad center/OK  | 23               |
//! | Back             | 4                |
//! | Play/pause       | 85               |
//!
//! # Short vs long presses
//!
//! A remote button can be tapped or held. [`PressKind::Long`] is what makes
//! "hold HOME" open the app switcher on most TVs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a key name or key code has no mapping.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyCodeError {
    /// The snake-case key name is not known.
    #[error("unknown remote key name: {0:?}")]
    UnknownName(String),
    /// The Android key code is not supported.
    #[error("unsupported Android key code: {0}")]
    UnsupportedCode(u32),
}

/// A key the remote can send. The discriminant is the Android `KeyEvent` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum RemoteKeyCode {
    // Navigation
    Home = 3,
    Back = 4,
    DpadUp = 19,
    DpadDown = 20,
    DpadLeft = 21,
    DpadRight = 22,
    DpadCenter = 23,
    Menu = 82,

    // Volume and power
    VolumeUp = 24,
    VolumeDown = 25,
    Power = 26,
    VolumeMute = 164,

    // Media transport
    MediaPlayPause = 85,
    MediaNext = 87,
    MediaPrevious = 88,

    // Channels
    ChannelUp = 166,
    ChannelDown = 167,
}

impl RemoteKeyCode {
    /// Every supported key, in pad order.
    pub const ALL: [RemoteKeyCode; 17] = [
        RemoteKeyCode::DpadUp,
        RemoteKeyCode::DpadDown,
        RemoteKeyCode::DpadLeft,
        RemoteKeyCode::DpadRight,
        RemoteKeyCode::DpadCenter,
        RemoteKeyCode::Back,
        RemoteKeyCode::Home,
        RemoteKeyCode::Menu,
        RemoteKeyCode::MediaPlayPause,
        RemoteKeyCode::MediaNext,
        RemoteKeyCode::MediaPrevious,
        RemoteKeyCode::VolumeUp,
        RemoteKeyCode::VolumeDown,
        RemoteKeyCode::VolumeMute,
        RemoteKeyCode::Power,
        RemoteKeyCode::ChannelUp,
        RemoteKeyCode::ChannelDown,
    ];

    /// Returns the Android `KeyEvent` key code.
    pub fn android_keycode(self) -> u32 {
        self as u32
    }

    /// Looks up a key by its Android `KeyEvent` key code.
    ///
    /// # Errors
    ///
    /// Returns [`KeyCodeError::UnsupportedCode`] for codes outside [`Self::ALL`].
    pub fn from_android_keycode(code: u32) -> Result<Self, KeyCodeError> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.android_keycode() == code)
            .ok_or(KeyCodeError::UnsupportedCode(code))
    }

    /// Snake-case name used by UI shells, e.g. `"dpad_up"`.
    pub fn name(self) -> &'static str {
        match self {
            RemoteKeyCode::Home => "home",
            RemoteKeyCode::Back => "back",
            RemoteKeyCode::DpadUp => "dpad_up",
            RemoteKeyCode::DpadDown => "dpad_down",
            RemoteKeyCode::DpadLeft => "dpad_left",
            RemoteKeyCode::DpadRight => "dpad_right",
            RemoteKeyCode::DpadCenter => "dpad_center",
            RemoteKeyCode::Menu => "menu",
            RemoteKeyCode::VolumeUp => "volume_up",
            RemoteKeyCode::VolumeDown => "volume_down",
            RemoteKeyCode::Power => "power",
            RemoteKeyCode::VolumeMute => "volume_mute",
            RemoteKeyCode::MediaPlayPause => "media_play_pause",
            RemoteKeyCode::MediaNext => "media_next",
            RemoteKeyCode::MediaPrevious => "media_previous",
            RemoteKeyCode::ChannelUp => "channel_up",
            RemoteKeyCode::ChannelDown => "channel_down",
        }
    }

    /// Looks up a key by snake-case name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`KeyCodeError::UnknownName`] if no key has that name.
    pub fn from_name(name: &str) -> Result<Self, KeyCodeError> {
        let wanted = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| KeyCodeError::UnknownName(name.to_string()))
    }

    /// Returns `true` for the five D-pad keys.
    pub fn is_directional(self) -> bool {
        matches!(
            self,
            RemoteKeyCode::DpadUp
                | RemoteKeyCode::DpadDown
                | RemoteKeyCode::DpadLeft
                | RemoteKeyCode::DpadRight
                | RemoteKeyCode::DpadCenter
        )
    }
}

impl fmt::Display for RemoteKeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RemoteKeyCode {
    type Err = KeyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// How long the key is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressKind {
    #[default]
    Short,
    Long,
}

impl PressKind {
    /// Maps a "long press" flag from a UI gesture.
    pub fn from_long_press(long: bool) -> Self {
        if long {
            PressKind::Long
        } else {
            PressKind::Short
        }
    }
}

/// One key press to send to a connected TV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCommand {
    pub key: RemoteKeyCode,
    pub press: PressKind,
}

impl KeyCommand {
    pub fn new(key: RemoteKeyCode, press: PressKind) -> Self {
        Self { key, press }
    }

    /// A short press of `key`.
    pub fn short(key: RemoteKeyCode) -> Self {
        Self::new(key, PressKind::Short)
    }

    /// A long press of `key`.
    pub fn long(key: RemoteKeyCode) -> Self {
        Self::new(key, PressKind::Long)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
