//! Protocol-level vocabulary shared with the pairing/remote client.

pub mod lifecycle;

pub use lifecycle::{AttemptId, LifecycleEvent};

/// DNS-SD service type advertised by Android TV remote service v2.
pub const ANDROID_TV_REMOTE_SERVICE: &str = "_androidtvremote._tcp.local.";
