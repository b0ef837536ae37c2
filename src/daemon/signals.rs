//! Signal-to-flag bridge.
//!
//! The only work that happens in signal context is setting one atomic flag;
//! the reaction loop observes the flags from its blocking wait. SIGCHLD is
//! left at its default disposition on purpose: child state is discovered
//! only by explicit non-blocking reaps, never by interrupting the wait.

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::flag;

use crate::core::errors::{NwdError, Result};
use crate::watch::ControlFlags;

/// Registers the daemon's trigger surface: SIGTERM/SIGINT request a clean
/// shutdown, SIGHUP requests a force-reinvoke of the utility.
pub fn install(control: &ControlFlags) -> Result<()> {
    let map = |source| NwdError::SignalSetup { source };
    flag::register(SIGTERM, control.shutdown_flag()).map_err(map)?;
    flag::register(SIGINT, control.shutdown_flag()).map_err(map)?;
    flag::register(SIGHUP, control.force_reinvoke_flag()).map_err(map)?;
    Ok(())
}
