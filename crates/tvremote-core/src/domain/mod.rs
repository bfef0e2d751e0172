//! Domain entities for tvremote.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What lives here? (for beginners)
//!
//! Two concepts make tvremote what it is:
//!
//! - A **device list** that is safe to feed with repeated discovery results.
//!   mDNS answers arrive more than once (several interfaces, re-announcements),
//!   so the list keys devices by IP address and updates an entry in place
//!   instead of growing a duplicate.
//! - A **connection state machine** for the one TV being controlled. Every
//!   callback from the pairing client is translated into a transition here,
//!   which keeps the rules in one place and makes them testable without a
//!   network.

/// Discovered devices and the deduplicating list.
pub mod device;

/// Connection states, the transition table, and the PIN buffer.
pub mod session;
