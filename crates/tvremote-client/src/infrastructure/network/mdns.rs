//! `mdns-sd` backed [`ServiceBrowser`].
//!
//! # How mdns-sd works (for beginners)
//!
//! `ServiceDaemon::new()` spawns a background thread that owns the multicast
//! sockets (224.0.0.251:5353 and ff02::fb:5353).  `browse()` returns a `flume`
//! channel on which the daemon pushes `ServiceEvent`s:
//!
//! ```text
//! SearchStarted ─> ServiceFound(type, fullname) ─> ServiceResolved(info) ─> ... ─> SearchStopped
//! ```
//!
//! The daemon resolves found instances on its own (it sends the SRV/A/AAAA
//! queries), so [`ServiceBrowser::resolve`] is a no-op here.
//!
//! Each scan gets its own daemon, which is shut down when the scan ends or
//! when the browser is dropped.

use std::time::Duration;

use flume::{Receiver, RecvTimeoutError};
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tracing::{debug, trace, warn};

use crate::application::discover_devices::{
    BrowseEvent, DiscoveryError, ResolvedService, ServiceBrowser, ServiceBrowserFactory,
};

fn daemon_error(e: mdns_sd::Error) -> DiscoveryError {
    DiscoveryError::Daemon(e.to_string())
}

/// One mDNS daemon plus the event stream of its current browse.
pub struct MdnsBrowser {
    daemon: Option<ServiceDaemon>,
    events: Option<Receiver<ServiceEvent>>,
}

impl MdnsBrowser {
    /// Starts a new daemon.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Daemon`] if the multicast sockets cannot be
    /// opened.
    pub fn new() -> Result<Self, DiscoveryError> {
        let daemon = ServiceDaemon::new().map_err(daemon_error)?;
        debug!("mDNS daemon started");
        Ok(Self {
            daemon: Some(daemon),
            events: None,
        })
    }

    fn daemon(&self) -> Result<&ServiceDaemon, DiscoveryError> {
        self.daemon.as_ref().ok_or(DiscoveryError::Closed)
    }
}

impl ServiceBrowser for MdnsBrowser {
    fn browse(&mut self, service_type: &str) -> Result<(), DiscoveryError> {
        let events = self.daemon()?.browse(service_type).map_err(daemon_error)?;
        self.events = Some(events);
        Ok(())
    }

    fn next_event(&mut self, timeout: Duration) -> Result<Option<BrowseEvent>, DiscoveryError> {
        let events = self.events.as_ref().ok_or(DiscoveryError::Closed)?;
        match events.recv_timeout(timeout) {
            Ok(event) => Ok(translate(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(DiscoveryError::Closed),
        }
    }

    fn resolve(&mut self, _service_type: &str, instance: &str) -> Result<(), DiscoveryError> {
        trace!(%instance, "resolution is driven by the daemon");
        Ok(())
    }

    fn stop_browse(&mut self, service_type: &str) -> Result<(), DiscoveryError> {
        self.events = None;
        match &self.daemon {
            Some(daemon) => daemon.stop_browse(service_type).map_err(daemon_error),
            None => Ok(()),
        }
    }

    fn shutdown(&mut self) -> Result<(), DiscoveryError> {
        self.events = None;
        match self.daemon.take() {
            Some(daemon) => {
                daemon.shutdown().map_err(daemon_error)?;
                debug!("mDNS daemon shut down");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for MdnsBrowser {
    fn drop(&mut self) {
        if let Some(daemon) = self.daemon.take() {
            if let Err(e) = daemon.shutdown() {
                warn!("mDNS daemon shutdown on drop failed: {e}");
            }
        }
    }
}

/// Creates one [`MdnsBrowser`] per scan.
#[derive(Debug, Default, Clone, Copy)]
pub struct MdnsBrowserFactory;

impl ServiceBrowserFactory for MdnsBrowserFactory {
    fn create(&self) -> Result<Box<dyn ServiceBrowser>, DiscoveryError> {
        Ok(Box::new(MdnsBrowser::new()?))
    }
}

/// Maps a daemon event onto a [`BrowseEvent`]; search bookkeeping maps to `None`.
fn translate(event: ServiceEvent) -> Option<BrowseEvent> {
    match event {
        ServiceEvent::ServiceFound(service_type, fullname) => Some(BrowseEvent::Added {
            instance: instance_name(&fullname, &service_type),
        }),
        ServiceEvent::ServiceResolved(info) => Some(BrowseEvent::Resolved(resolved(&info))),
        ServiceEvent::ServiceRemoved(service_type, fullname) => Some(BrowseEvent::Removed {
            instance: instance_name(&fullname, &service_type),
        }),
        other => {
            trace!(?other, "mDNS search event");
            None
        }
    }
}

fn resolved(info: &ServiceInfo) -> ResolvedService {
    let mut addresses: Vec<_> = info.get_addresses().iter().copied().collect();
    addresses.sort();
    ResolvedService {
        instance_name: instance_name(info.get_fullname(), info.get_type()),
        addresses,
        port: info.get_port(),
    }
}

/// `"Living Room._androidtvremote._tcp.local."` → `"Living Room"`.
///
/// Falls back to the full name when it does not end with the service type.
fn instance_name(fullname: &str, service_type: &str) -> String {
    fullname
        .strip_suffix(service_type)
        .map(|s| s.trim_end_matches('.'))
        .filter(|s| !s.is_empty())
        .unwrap_or(fullname)
        .to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TY: &str = "_androidtvremote._tcp.local.";

    #[test]
    fn test_instance_name_strips_service_type() {
        assert_eq!(
            instance_name("Living Room TV._androidtvremote._tcp.local.", TY),
            "Living Room TV"
        );
    }

    #[test]
    fn test_instance_name_keeps_unrelated_fullname() {
        assert_eq!(instance_name("printer._ipp._tcp.local.", TY), "printer._ipp._tcp.local.");
    }

    #[test]
    fn test_translate_found_and_removed() {
        let found = translate(ServiceEvent::ServiceFound(
            TY.to_string(),
            format!("Bedroom.{TY}"),
        ));
        let removed = translate(ServiceEvent::ServiceRemoved(
            TY.to_string(),
            format!("Bedroom.{TY}"),
        ));

        assert_eq!(found, Some(BrowseEvent::Added { instance: "Bedroom".into() }));
        assert_eq!(removed, Some(BrowseEvent::Removed { instance: "Bedroom".into() }));
    }

    #[test]
    fn test_translate_search_bookkeeping_is_dropped() {
        assert_eq!(translate(ServiceEvent::SearchStarted(TY.to_string())), None);
        assert_eq!(translate(ServiceEvent::SearchStopped(TY.to_string())), None);
    }

    #[test]
    fn test_translate_resolved_copies_address_and_port() {
        let info = ServiceInfo::new(
            TY,
            "Den",
            "den-tv.local.",
            "192.168.1.23",
            6466,
            None::<HashMap<String, String>>,
        )
        .unwrap();

        let event = translate(ServiceEvent::ServiceResolved(info));

        let Some(BrowseEvent::Resolved(service)) = event else {
            panic!("expected a resolved event, got {event:?}");
        };
        assert_eq!(service.instance_name, "Den");
        assert_eq!(service.port, 6466);
        assert_eq!(service.addresses, vec!["192.168.1.23".parse::<std::net::IpAddr>().unwrap()]);
    }
}
