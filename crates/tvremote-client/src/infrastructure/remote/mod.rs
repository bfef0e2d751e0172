//! Remote protocol client implementations.
//!
//! The Android TV pairing and remote-control wire protocol (TLS with a client
//! certificate, protobuf framing on ports 6467 and 6466) is provided by the
//! embedding application as a [`RemoteClient`](crate::application::control_session::RemoteClient).
//!
//! - **`mock`** – [`ScriptedRemoteClient`](mock::ScriptedRemoteClient), which
//!   records every call and plays lifecycle callbacks on demand.  Used in
//!   tests and UI demos.

pub mod mock;
