//! Application layer use cases for the remote-control client.
//!
//! # What use cases does the client have?
//!
//! - **`discover_devices`** – Runs a time-boxed mDNS browse for
//!   `_androidtvremote._tcp` and reports every resolved TV.  The actual DNS-SD
//!   client is a `ServiceBrowser` implementation injected at construction time.
//!
//! - **`control_session`** – Drives the connect → pair → control lifecycle of
//!   one TV.  The pairing/remote protocol itself is a `RemoteClient`
//!   implementation injected at construction time; the controller turns its
//!   callbacks into a single observable `ConnectionState`.
//!
//! - **`multicast`** – Reference-counted multicast reception lock held for the
//!   duration of each scan.

pub mod control_session;
pub mod discover_devices;
pub mod multicast;
