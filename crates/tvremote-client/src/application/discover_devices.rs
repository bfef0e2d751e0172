//! DiscoveryService: a time-boxed mDNS browse for Android TV remote services.
//!
//! One call to [`DiscoveryService::start`] runs one scan on a blocking worker
//! of the Tokio runtime:
//!
//! 1. Take a share of the multicast lock.
//! 2. Create a [`ServiceBrowser`] and browse the configured service type.
//! 3. Resolve every added record; turn every resolved record with an address
//!    into a [`DeviceDescriptor`] and hand it to `on_found`.
//! 4. When the window (5 s by default) has elapsed, stop browsing, shut the
//!    browser down, drop the lock share, and call `on_done`.
//!
//! Errors and panics anywhere in steps 1–4 are logged and swallowed. `on_done`
//! always runs, and always after the lock share has been returned.
//!
//! `on_found` may see the same device more than once; callers feed it into a
//! [`tvremote_core::DeviceList`], which is idempotent under repeats.

use std::net::IpAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use tvremote_core::{DeviceDescriptor, ANDROID_TV_REMOTE_SERVICE};

use super::multicast::{MulticastError, MulticastLock};

/// Length of one scan unless configured otherwise.
pub const DEFAULT_DISCOVERY_WINDOW: Duration = Duration::from_secs(5);

/// Error type for discovery operations. Never surfaced past the service.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The mDNS daemon reported a failure.
    #[error("mDNS daemon error: {0}")]
    Daemon(String),
    /// The browser's event stream ended before the window elapsed.
    #[error("browse event stream closed")]
    Closed,
    /// The multicast permission could not be obtained.
    #[error(transparent)]
    Multicast(#[from] MulticastError),
}

/// A service record with its addresses resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedService {
    /// Instance part of the service name, e.g. `"Living Room TV"`.
    pub instance_name: String,
    pub addresses: Vec<IpAddr>,
    pub port: u16,
}

impl ResolvedService {
    /// First IPv4 address, else first IPv6 address.
    pub fn preferred_address(&self) -> Option<IpAddr> {
        self.addresses
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| self.addresses.iter().find(|a| a.is_ipv6()))
            .copied()
    }

    /// Builds a descriptor, or `None` if the record carries no address.
    pub fn to_descriptor(&self) -> Option<DeviceDescriptor> {
        self.preferred_address()
            .map(|address| DeviceDescriptor::new(self.instance_name.clone(), address, self.port))
    }
}

/// Something the browser observed on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseEvent {
    /// A new service instance was announced and still needs resolving.
    Added { instance: String },
    /// A service instance resolved to addresses and a port.
    Resolved(ResolvedService),
    /// A service instance went away.
    Removed { instance: String },
}

/// A DNS-SD browsing client bound to an ephemeral local endpoint.
///
/// The infrastructure layer provides an `mdns-sd` implementation; tests use a
/// scripted one.
pub trait ServiceBrowser: Send {
    /// Starts browsing for `service_type`.
    fn browse(&mut self, service_type: &str) -> Result<(), DiscoveryError>;

    /// Waits up to `timeout` for the next event. `Ok(None)` means nothing
    /// arrived in time.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<BrowseEvent>, DiscoveryError>;

    /// Requests resolution of `instance`. Must not block on the answer.
    fn resolve(&mut self, service_type: &str, instance: &str) -> Result<(), DiscoveryError>;

    /// Stops browsing for `service_type`.
    fn stop_browse(&mut self, service_type: &str) -> Result<(), DiscoveryError>;

    /// Releases all sockets and threads owned by the browser.
    fn shutdown(&mut self) -> Result<(), DiscoveryError>;
}

/// Creates a fresh [`ServiceBrowser`] for each scan.
pub trait ServiceBrowserFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn ServiceBrowser>, DiscoveryError>;
}

/// Scan parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Fully qualified DNS-SD service type, ending in `.local.`.
    pub service_type: String,
    /// How long one scan listens before finishing.
    pub window: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            service_type: ANDROID_TV_REMOTE_SERVICE.to_string(),
            window: DEFAULT_DISCOVERY_WINDOW,
        }
    }
}

/// Result of [`DiscoveryService::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new scan is running; `on_done` will be called.
    Started,
    /// A scan was already running; the callbacks were dropped unused.
    AlreadyRunning,
}

/// Runs one scan at a time.
pub struct DiscoveryService {
    factory: Arc<dyn ServiceBrowserFactory>,
    lock: MulticastLock,
    options: DiscoveryOptions,
    active: Arc<AtomicBool>,
    runtime: Handle,
}

impl DiscoveryService {
    /// Creates a service that spawns its scans on `runtime`.
    pub fn new(
        factory: Arc<dyn ServiceBrowserFactory>,
        lock: MulticastLock,
        options: DiscoveryOptions,
        runtime: Handle,
    ) -> Self {
        Self {
            factory,
            lock,
            options,
            active: Arc::new(AtomicBool::new(false)),
            runtime,
        }
    }

    /// Returns `true` while a scan is running.
    pub fn is_scanning(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Starts a scan unless one is already running. Never blocks.
    ///
    /// `on_found` is called from the scan's worker thread for every resolved
    /// device; `on_done` is called exactly once when the scan ends.
    pub fn start<F, D>(&self, mut on_found: F, on_done: D) -> StartOutcome
    where
        F: FnMut(DeviceDescriptor) + Send + 'static,
        D: FnOnce() + Send + 'static,
    {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("discovery start ignored: a scan is already running");
            return StartOutcome::AlreadyRunning;
        }

        let scan = Scan {
            factory: Arc::clone(&self.factory),
            lock: self.lock.clone(),
            options: self.options.clone(),
        };
        let active = ActiveScan(Arc::clone(&self.active));

        self.runtime.spawn_blocking(move || {
            let started = Instant::now();
            info!(
                service_type = %scan.options.service_type,
                window_ms = scan.options.window.as_millis() as u64,
                "discovery scan started"
            );

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| scan.run(&mut on_found)));
            match outcome {
                Ok(Ok(found)) => info!(
                    found,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "discovery scan finished"
                ),
                Ok(Err(e)) => warn!("discovery scan ended early: {e}"),
                Err(payload) => error!("discovery scan panicked: {}", panic_message(&*payload)),
            }

            drop(active);
            on_done();
        });

        StartOutcome::Started
    }
}

/// Clears the "scan running" flag on every exit path.
struct ActiveScan(Arc<AtomicBool>);

impl Drop for ActiveScan {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Everything one scan needs, moved onto the worker thread.
struct Scan {
    factory: Arc<dyn ServiceBrowserFactory>,
    lock: MulticastLock,
    options: DiscoveryOptions,
}

impl Scan {
    /// Runs the scan and returns the number of devices reported.
    fn run(&self, on_found: &mut dyn FnMut(DeviceDescriptor)) -> Result<usize, DiscoveryError> {
        let _guard = self.lock.acquire()?;
        let mut browser = self.factory.create()?;

        let result = self.listen(browser.as_mut(), on_found);
        let teardown = teardown(browser.as_mut(), &self.options.service_type);

        let found = result?;
        teardown?;
        Ok(found)
    }

    fn listen(
        &self,
        browser: &mut dyn ServiceBrowser,
        on_found: &mut dyn FnMut(DeviceDescriptor),
    ) -> Result<usize, DiscoveryError> {
        let service_type = self.options.service_type.as_str();
        browser.browse(service_type)?;

        let deadline = Instant::now() + self.options.window;
        let mut found = 0usize;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match browser.next_event(remaining)? {
                None => continue,
                Some(BrowseEvent::Added { instance }) => {
                    debug!(%instance, "service added; resolving");
                    if let Err(e) = browser.resolve(service_type, &instance) {
                        warn!(%instance, "resolve request failed: {e}");
                    }
                }
                Some(BrowseEvent::Resolved(service)) => match service.to_descriptor() {
                    Some(device) => {
                        debug!(%device, "device resolved");
                        found += 1;
                        on_found(device);
                    }
                    None => debug!(
                        instance = %service.instance_name,
                        "resolved service has no address; dropped"
                    ),
                },
                Some(BrowseEvent::Removed { instance }) => {
                    debug!(%instance, "service removed");
                }
            }
        }

        Ok(found)
    }
}

/// Stops browsing and shuts the browser down, attempting both steps even if
/// the first fails. Returns the first error.
fn teardown(browser: &mut dyn ServiceBrowser, service_type: &str) -> Result<(), DiscoveryError> {
    let stopped = browser.stop_browse(service_type);
    if let Err(e) = &stopped {
        warn!("stop_browse failed: {e}");
    }
    let shut = browser.shutdown();
    if let Err(e) = &shut {
        warn!("browser shutdown failed: {e}");
    }
    stopped.and(shut)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
