//! Reference-counted multicast reception lock.
//!
//! Some platforms drop inbound multicast packets unless the application holds
//! an OS permission while it listens (Android's `WifiManager.MulticastLock`
//! is the classic example). [`MulticastPermission`] is the seam for that OS
//! call; [`MulticastLock`] counts holders and hands out a [`MulticastGuard`]
//! that gives its share back exactly once when dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

/// Error returned when the OS refuses the multicast permission.
#[derive(Debug, Error)]
#[error("multicast permission denied: {0}")]
pub struct MulticastError(pub String);

/// OS hook invoked on every acquisition and release.
pub trait MulticastPermission: Send + Sync {
    /// Requests permission to receive multicast traffic.
    fn acquire(&self) -> Result<(), MulticastError>;

    /// Returns one previously acquired permission.
    fn release(&self);
}

/// Permission for platforms that receive multicast without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnrestrictedMulticast;

impl MulticastPermission for UnrestrictedMulticast {
    fn acquire(&self) -> Result<(), MulticastError> {
        Ok(())
    }

    fn release(&self) {}
}

/// Counts outstanding holders of the multicast permission.
///
/// Cloning shares the same counter.
#[derive(Clone)]
pub struct MulticastLock {
    tag: Arc<str>,
    held: Arc<AtomicUsize>,
    permission: Arc<dyn MulticastPermission>,
}

impl MulticastLock {
    /// Creates a lock named `tag` (shown in logs) over `permission`.
    pub fn new(tag: &str, permission: Arc<dyn MulticastPermission>) -> Self {
        Self {
            tag: Arc::from(tag),
            held: Arc::new(AtomicUsize::new(0)),
            permission,
        }
    }

    /// Creates a lock that needs no OS permission.
    pub fn unrestricted(tag: &str) -> Self {
        Self::new(tag, Arc::new(UnrestrictedMulticast))
    }

    /// Acquires one share of the permission.
    ///
    /// # Errors
    ///
    /// Returns [`MulticastError`] if the OS hook refuses; the count is unchanged.
    pub fn acquire(&self) -> Result<MulticastGuard, MulticastError> {
        self.permission.acquire()?;
        let held = self.held.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(lock = %self.tag, held, "multicast lock acquired");
        Ok(MulticastGuard { lock: self.clone() })
    }

    /// Number of guards currently alive.
    pub fn held_count(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    /// Returns `true` while at least one guard is alive.
    pub fn is_held(&self) -> bool {
        self.held_count() > 0
    }

    fn release_one(&self) {
        let previous = self
            .held
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match previous {
            Ok(n) => {
                self.permission.release();
                debug!(lock = %self.tag, held = n - 1, "multicast lock released");
            }
            Err(_) => warn!(lock = %self.tag, "multicast lock released more times than acquired"),
        }
    }
}

impl std::fmt::Debug for MulticastLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MulticastLock")
            .field("tag", &self.tag)
            .field("held", &self.held_count())
            .finish()
    }
}

/// One share of the multicast permission; released on drop.
#[must_use = "the multicast permission is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct MulticastGuard {
    lock: MulticastLock,
}

impl Drop for MulticastGuard {
    fn drop(&mut self) {
        self.lock.release_one();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
