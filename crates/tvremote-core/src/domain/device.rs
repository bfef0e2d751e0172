//! Discovered device descriptors and the consumer-visible device list.
//!
//! The discovery layer may report the same TV several times in one scan. The
//! [`DeviceList`] absorbs those repeats: an address appears at most once, and
//! a repeat replaces the stored name/port while keeping the entry's position
//! so a rendered list does not jump around.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// A resolved Android TV remote service on the local network.
///
/// Equality for deduplication purposes is by [`address`](Self::address) only;
/// the name and port are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Human-readable instance name advertised by the TV (e.g. `"Living Room"`).
    pub display_name: String,
    /// IPv4 or IPv6 address the service resolved to.
    pub address: IpAddr,
    /// Advertised port of the remote service.
    pub port: u16,
}

impl DeviceDescriptor {
    /// Creates a new descriptor.
    pub fn new(display_name: impl Into<String>, address: IpAddr, port: u16) -> Self {
        Self {
            display_name: display_name.into(),
            address,
            port,
        }
    }

    /// Returns `true` if `other` describes the same device (same address).
    pub fn same_device(&self, other: &DeviceDescriptor) -> bool {
        self.address == other.address
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            IpAddr::V4(v4) => write!(f, "{} ({}:{})", self.display_name, v4, self.port),
            IpAddr::V6(v6) => write!(f, "{} ([{}]:{})", self.display_name, v6, self.port),
        }
    }
}

/// Ordered list of discovered devices holding at most one entry per address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceList {
    entries: Vec<DeviceDescriptor>,
}

impl DeviceList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `device`, or replaces the entry with the same address.
    ///
    /// Returns `true` if the address was not previously present.
    pub fn upsert(&mut self, device: DeviceDescriptor) -> bool {
        match self.entries.iter_mut().find(|d| d.same_device(&device)) {
            Some(existing) => {
                *existing = device;
                false
            }
            None => {
                self.entries.push(device);
                true
            }
        }
    }

    /// Looks up a device by address.
    pub fn find(&self, address: IpAddr) -> Option<&DeviceDescriptor> {
        self.entries.iter().find(|d| d.address == address)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.entries.iter()
    }

    /// Returns a copy of the entries in display order.
    pub fn to_vec(&self) -> Vec<DeviceDescriptor> {
        self.entries.clone()
    }
}

impl Extend<DeviceDescriptor> for DeviceList {
    fn extend<T: IntoIterator<Item = DeviceDescriptor>>(&mut self, iter: T) {
        for device in iter {
            self.upsert(device);
        }
    }
}

impl FromIterator<DeviceDescriptor> for DeviceList {
    fn from_iter<T: IntoIterator<Item = DeviceDescriptor>>(iter: T) -> Self {
        let mut list = DeviceList::new();
        list.extend(iter);
        list
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
