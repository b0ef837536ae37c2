//! Change-event watching: the source boundary the reaction loop blocks on,
//! the control flags that interrupt it, and address-set snapshots.

pub mod poller;

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::core::errors::Result;

/// Process control requests, bridged from signal handlers as plain atomic
/// flags. The handlers set flags; every decision runs on the control thread.
#[derive(Debug, Clone, Default)]
pub struct ControlFlags {
    shutdown: Arc<AtomicBool>,
    force_reinvoke: Arc<AtomicBool>,
}

impl ControlFlags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a termination request has been received. Terminal.
    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Requests a clean shutdown.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Requests one force-reinvoke pass.
    pub fn request_force_reinvoke(&self) {
        self.force_reinvoke.store(true, Ordering::Relaxed);
    }

    /// Consumes a pending force-reinvoke request, if any.
    #[must_use]
    pub fn take_force_reinvoke(&self) -> bool {
        self.force_reinvoke.swap(false, Ordering::Relaxed)
    }

    /// Flag storage for the signal bridge.
    pub(crate) fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Flag storage for the signal bridge.
    pub(crate) fn force_reinvoke_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.force_reinvoke)
    }
}

/// Why a blocking wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The host's address configuration changed. One wake may coalesce any
    /// number of underlying interface changes.
    Changed,
    /// A force-reinvoke request arrived.
    ForceReinvoke,
    /// A termination request arrived.
    Shutdown,
    /// The caller-supplied timeout elapsed with nothing else to report.
    TimedOut,
}

/// A source of discrete, not-necessarily-deduplicated change notifications.
///
/// `wait_next` suspends the control thread until a change is observed, a
/// control flag is raised, or `timeout` (when given) elapses. The loop passes
/// a timeout only while it owes an outstanding child a retry cycle.
pub trait ChangeSource {
    fn wait_next(&mut self, control: &ControlFlags, timeout: Option<Duration>) -> Result<Wake>;
}

/// Point-in-time set of assigned addresses, keyed by interface name.
///
/// Two snapshots compare equal iff no IPv4/IPv6 assignment appeared, moved,
/// or vanished; ordering inside the set is irrelevant by construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddrSnapshot {
    entries: BTreeSet<(String, IpAddr)>,
}

impl AddrSnapshot {
    /// Builds a snapshot from `(interface, address)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, IpAddr)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Number of tracked address assignments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
