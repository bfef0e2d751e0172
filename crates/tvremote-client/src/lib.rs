//! tvremote-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/` and
//! embedding applications share the same module tree.
//!
//! # What does tvremote-client do? (for beginners)
//!
//! The client is the phone or desktop acting as a remote control.  It:
//!
//! 1. Browses the LAN for 5 seconds for TVs advertising
//!    `_androidtvremote._tcp.local.` (holding the multicast lock meanwhile)
//!    and collects them into a list, one entry per IP address.
//! 2. Connects to the TV the user picks.  A TV that has not seen this client
//!    before shows a PIN; the UI asks the user for it and sends it back.
//! 3. Once connected, forwards key presses (D-pad, home, volume, ...) to the
//!    TV until the user disconnects or the connection fails.
//!
//! The encrypted pairing/remote wire protocol is supplied by the embedding
//! application as a `RemoteClient`; this crate owns discovery, the session
//! state machine and the UI-facing commands around it.
//!
//! ```ignore
//! let config = RemoteConfig::from_toml_str(&text)?;
//! init_logging(&config.logging.level)?;
//! let state = RemoteAppState::from_config(
//!     &config,
//!     Arc::new(MyRemoteClient::new()),
//!     Arc::new(UnrestrictedMulticast),
//!     tokio::runtime::Handle::current(),
//! );
//! start_scan(&state);
//! ```

/// Application layer: discovery and session use cases.
pub mod application;

/// Infrastructure layer: mDNS adapter, mocks, config, logging, UI bridge.
pub mod infrastructure;

pub use application::control_session::{
    LifecycleListener, RemoteClient, RemoteError, SessionController, SessionSnapshot,
};
pub use application::discover_devices::{
    DiscoveryError, DiscoveryOptions, DiscoveryService, StartOutcome,
};
pub use application::multicast::{MulticastLock, MulticastPermission, UnrestrictedMulticast};
pub use infrastructure::config::{ConfigError, RemoteConfig};
pub use infrastructure::logging::{init_logging, LoggingError};
