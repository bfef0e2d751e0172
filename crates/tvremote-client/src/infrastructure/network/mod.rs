//! DNS-SD browser implementations.
//!
//! - **`mdns`** – [`MdnsBrowser`](mdns::MdnsBrowser), backed by the `mdns-sd`
//!   daemon.  Used in production.
//! - **`mock`** – [`ScriptedServiceBrowser`](mock::ScriptedServiceBrowser),
//!   which replays a fixed list of events.  Used in tests.

pub mod mdns;
pub mod mock;
