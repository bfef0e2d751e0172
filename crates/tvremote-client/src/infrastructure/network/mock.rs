//! Scripted service browser for testing discovery without a network.
//!
//! [`ScriptedServiceBrowser`] replays a fixed list of [`BrowseEvent`]s, one per
//! `next_event` call, and records every call it receives.  Once the script is
//! exhausted it behaves like a quiet network: `next_event` sleeps for the full
//! timeout and returns `Ok(None)`.
//!
//! # Usage in tests
//!
//! ```ignore
//! let factory = Arc::new(ScriptedBrowserFactory::new(vec![
//!     BrowseEvent::Added { instance: "Den".into() },
//!     BrowseEvent::Resolved(service),
//! ]));
//! let discovery = DiscoveryService::new(factory.clone(), lock, options, handle);
//! discovery.start(|device| ..., || ...);
//!
//! assert_eq!(factory.log().shutdowns, 1);
//! ```
//!
//! # Failure flags
//!
//! `fail_create` makes the factory refuse to build a browser; `fail_browse`
//! makes `browse` return an error.  Both let tests drive the error paths of the
//! discovery service.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::application::discover_devices::{
    BrowseEvent, DiscoveryError, ServiceBrowser, ServiceBrowserFactory,
};

/// Calls observed across every browser a factory created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserLog {
    pub created: usize,
    pub browsed: Vec<String>,
    pub resolved: Vec<String>,
    pub stopped: Vec<String>,
    pub shutdowns: usize,
}

/// A [`ServiceBrowser`] that replays a script.
pub struct ScriptedServiceBrowser {
    script: std::vec::IntoIter<BrowseEvent>,
    log: Arc<Mutex<BrowserLog>>,
    fail_browse: bool,
}

impl ScriptedServiceBrowser {
    fn record(&self, f: impl FnOnce(&mut BrowserLog)) {
        f(&mut self.log.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

impl ServiceBrowser for ScriptedServiceBrowser {
    fn browse(&mut self, service_type: &str) -> Result<(), DiscoveryError> {
        self.record(|log| log.browsed.push(service_type.to_string()));
        if self.fail_browse {
            return Err(DiscoveryError::Daemon("scripted browse failure".into()));
        }
        Ok(())
    }

    fn next_event(&mut self, timeout: Duration) -> Result<Option<BrowseEvent>, DiscoveryError> {
        match self.script.next() {
            Some(event) => Ok(Some(event)),
            None => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn resolve(&mut self, _service_type: &str, instance: &str) -> Result<(), DiscoveryError> {
        self.record(|log| log.resolved.push(instance.to_string()));
        Ok(())
    }

    fn stop_browse(&mut self, service_type: &str) -> Result<(), DiscoveryError> {
        self.record(|log| log.stopped.push(service_type.to_string()));
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DiscoveryError> {
        self.record(|log| log.shutdowns += 1);
        Ok(())
    }
}

/// Builds a [`ScriptedServiceBrowser`] with the same script for every scan.
#[derive(Default)]
pub struct ScriptedBrowserFactory {
    script: Vec<BrowseEvent>,
    log: Arc<Mutex<BrowserLog>>,
    /// When `true`, `create` returns `DiscoveryError::Daemon`.
    pub fail_create: bool,
    /// When `true`, the created browsers fail on `browse`.
    pub fail_browse: bool,
}

impl ScriptedBrowserFactory {
    pub fn new(script: Vec<BrowseEvent>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// A factory whose `create` always fails.
    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    /// A factory whose browsers fail on `browse`.
    pub fn failing_browse() -> Self {
        Self {
            fail_browse: true,
            ..Self::default()
        }
    }

    /// Snapshot of every call recorded so far.
    pub fn log(&self) -> BrowserLog {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ServiceBrowserFactory for ScriptedBrowserFactory {
    fn create(&self) -> Result<Box<dyn ServiceBrowser>, DiscoveryError> {
        if self.fail_create {
            return Err(DiscoveryError::Daemon("scripted daemon failure".into()));
        }
        self.log.lock().unwrap_or_else(PoisonError::into_inner).created += 1;
        Ok(Box::new(ScriptedServiceBrowser {
            script: self.script.clone().into_iter(),
            log: Arc::clone(&self.log),
            fail_browse: self.fail_browse,
        }))
    }
}
