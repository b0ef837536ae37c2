//! Event reaction loop: bridges the change source and control flags into
//! reaction cycles against the supervisor.

use std::time::Duration;

use tracing::{debug, info};

use crate::core::errors::Result;
use crate::daemon::child::ChildLifecycle;
use crate::daemon::supervisor::Supervisor;
use crate::watch::{ChangeSource, ControlFlags, Wake};

/// How long a wait is allowed to run before an outstanding stale child gets
/// another forced cycle.
pub const STALE_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Runs the daemon's main loop until a termination request arrives.
///
/// One reaction cycle per delivered event, in delivery order; termination is
/// cooperative and leaves any outstanding child running.
pub fn run<L, S>(
    supervisor: &mut Supervisor<L>,
    source: &mut S,
    control: &ControlFlags,
) -> Result<()>
where
    L: ChildLifecycle,
    S: ChangeSource,
{
    info!("listening for IP configuration changes");
    loop {
        let timeout = (supervisor.pending_retries() > 0).then_some(STALE_RETRY_INTERVAL);
        match source.wait_next(control, timeout)? {
            Wake::Shutdown => break,
            Wake::ForceReinvoke => supervisor.force_reinvoke(),
            Wake::Changed => {
                info!("IP configuration changed");
                supervisor.on_change_event();
            }
            Wake::TimedOut => {
                debug!("retrying stale utility");
                supervisor.retry_stale();
            }
        }
    }
    info!("done listening for IP configuration changes");
    Ok(())
}
