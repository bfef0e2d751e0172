//! Infrastructure layer for the remote-control client.
//!
//! Contains OS- and framework-facing adapters: the mDNS browser, test
//! doubles for the network seams, configuration parsing, logging setup, and
//! the UI command bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `tvremote_core`, but MUST NOT be imported by the `application` or domain
//! layers.
//!
//! # Sub-modules
//!
//! - **`network`** – `ServiceBrowser` implementations: `MdnsBrowser` over the
//!   `mdns-sd` daemon, plus a scripted browser for tests.
//!
//! - **`remote`** – `RemoteClient` test double that records calls and replays
//!   lifecycle callbacks.
//!
//! - **`config`** – `RemoteConfig` parsed from and rendered to TOML text.
//!
//! - **`logging`** – `tracing-subscriber` initialisation.
//!
//! - **`ui_bridge`** – Command handlers that expose discovery and the session
//!   to a UI shell as serializable DTOs.

pub mod config;
pub mod logging;
pub mod network;
pub mod remote;
pub mod ui_bridge;
