//! Polling change source backed by `getifaddrs(3)`.
//!
//! The platform has no push notification the daemon can portably subscribe
//! to from safe code, so the source samples the interface address set on a
//! coarse cadence and reports a change whenever two samples differ. A burst
//! of underlying changes between two samples lands as a single wake.

use std::net::IpAddr;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{AddrSnapshot, ChangeSource, ControlFlags, Wake};
use crate::core::errors::{NwdError, Result};

/// Cadence at which control flags are rechecked while suspended.
const FLAG_CHECK_SLICE: Duration = Duration::from_millis(200);

/// Default cadence for address-set samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Address-set polling [`ChangeSource`].
pub struct AddrPoller {
    previous: AddrSnapshot,
    poll_interval: Duration,
    last_poll: Instant,
}

impl AddrPoller {
    /// Takes the initial address snapshot and starts watching.
    ///
    /// Failure here means the change-notification subscription could not be
    /// established; the daemon must not enter its loop.
    pub fn subscribe(poll_interval: Duration) -> Result<Self> {
        let previous = snapshot()?;
        debug!(
            addresses = previous.len(),
            "watching interface address assignments"
        );
        Ok(Self {
            previous,
            poll_interval,
            last_poll: Instant::now(),
        })
    }
}

impl ChangeSource for AddrPoller {
    fn wait_next(&mut self, control: &ControlFlags, timeout: Option<Duration>) -> Result<Wake> {
        let started = Instant::now();
        loop {
            if control.shutdown_requested() {
                return Ok(Wake::Shutdown);
            }
            if control.take_force_reinvoke() {
                return Ok(Wake::ForceReinvoke);
            }
            if self.last_poll.elapsed() >= self.poll_interval {
                self.last_poll = Instant::now();
                match snapshot() {
                    Ok(current) => {
                        if current != self.previous {
                            self.previous = current;
                            return Ok(Wake::Changed);
                        }
                    }
                    // Enumeration can fail transiently under interface
                    // churn; the next sample resolves it either way.
                    Err(err) => warn!(%err, "interface snapshot failed; treating as unchanged"),
                }
            }
            if let Some(limit) = timeout
                && started.elapsed() >= limit
            {
                return Ok(Wake::TimedOut);
            }
            thread::sleep(FLAG_CHECK_SLICE);
        }
    }
}

/// Samples the current IPv4/IPv6 assignment set across all interfaces.
fn snapshot() -> Result<AddrSnapshot> {
    let addrs =
        nix::ifaddrs::getifaddrs().map_err(|source| NwdError::AddressSnapshot { source })?;
    let entries = addrs.filter_map(|ifaddr| {
        let addr = ifaddr.address?;
        let ip = addr
            .as_sockaddr_in()
            .map(|sin| IpAddr::V4(sin.ip()))
            .or_else(|| addr.as_sockaddr_in6().map(|sin6| IpAddr::V6(sin6.ip())))?;
        Some((ifaddr.interface_name, ip))
    });
    Ok(AddrSnapshot::from_entries(entries))
}
