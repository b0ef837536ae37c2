//! Child process lifecycle: spawn the utility, reap it non-blockingly, and
//! apply signals to it.
//!
//! The supervisor only talks to the [`ChildLifecycle`] trait so its decision
//! procedure can be exercised against a fake; [`UnixChildLifecycle`] is the
//! real process-table implementation.

use std::os::fd::AsFd;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use nix::sys::signal::{self, Signal};
use nix::unistd::{AccessFlags, Pid, access};
use tracing::{debug, info, warn};

use crate::core::config::{ClosedStreams, DaemonConfig, RedirectMode};
use crate::core::errors::{NwdError, Result};

/// Kind of change a spawned utility is told about via argv[1].
///
/// Only address changes are produced today; the argument slot is the
/// discriminator for any future event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The host's IP address configuration changed.
    IpChanged,
}

impl ChangeKind {
    /// The argv[1] value the utility receives.
    #[must_use]
    pub const fn as_arg(self) -> &'static str {
        match self {
            Self::IpChanged => "IP_CHANGED",
        }
    }
}

/// Signals the supervisor escalates through, in ascending severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSignal {
    Hangup,
    Interrupt,
    Kill,
}

impl ChildSignal {
    const fn as_signal(self) -> Signal {
        match self {
            Self::Hangup => Signal::SIGHUP,
            Self::Interrupt => Signal::SIGINT,
            Self::Kill => Signal::SIGKILL,
        }
    }
}

/// Result of a non-blocking reap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapStatus {
    /// Still running.
    Alive,
    /// Exited on its own with the given code.
    ExitedNormally(i32),
    /// Terminated by a signal, or otherwise gone without a code.
    ExitedAbnormally,
}

/// Everything needed to construct a utility process image.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Resolved executable path.
    pub utility_path: PathBuf,
    /// Name passed as the utility's argv[0].
    pub argv0: String,
    /// Output rewiring applied before exec.
    pub redirect: RedirectMode,
    /// Streams rebound to the null device.
    pub closed: ClosedStreams,
}

impl LaunchSpec {
    /// Extracts the launch-relevant slice of the daemon configuration.
    #[must_use]
    pub fn for_config(config: &DaemonConfig) -> Self {
        Self {
            utility_path: config.utility_path.clone(),
            argv0: config.argv0.clone(),
            redirect: config.redirect,
            closed: config.closed,
        }
    }
}

/// Operations the supervisor needs against the process table.
///
/// None of these touch supervisor state; callers update their own state from
/// the return values.
pub trait ChildLifecycle {
    /// Identifies one spawned child for later probes and signals.
    type Handle;

    /// Whether `path` currently names an executable file.
    fn is_executable(&self, path: &Path) -> bool;

    /// Constructs a new process image running the utility with argument
    /// vector `[argv0, kind]`.
    fn spawn(&mut self, spec: &LaunchSpec, kind: ChangeKind) -> Result<Self::Handle>;

    /// Non-blocking wait; never suspends the caller.
    fn reap_if_exited(&mut self, handle: &mut Self::Handle) -> ReapStatus;

    /// Probes liveness without reaping (signal-0 equivalent).
    fn is_alive(&self, handle: &Self::Handle) -> bool;

    /// Best-effort signal delivery; absence of the target is not an error.
    fn signal(&self, handle: &Self::Handle, kind: ChildSignal);
}

/// Handle to a spawned utility process.
#[derive(Debug)]
pub struct UnixChild {
    pid: Pid,
    child: Child,
}

impl UnixChild {
    /// Raw pid, for logging.
    #[must_use]
    pub fn pid(&self) -> i32 {
        self.pid.as_raw()
    }
}

/// Process-table implementation of [`ChildLifecycle`].
#[derive(Debug, Default)]
pub struct UnixChildLifecycle;

impl ChildLifecycle for UnixChildLifecycle {
    type Handle = UnixChild;

    fn is_executable(&self, path: &Path) -> bool {
        access(path, AccessFlags::X_OK).is_ok()
    }

    fn spawn(&mut self, spec: &LaunchSpec, kind: ChangeKind) -> Result<UnixChild> {
        let map_io = |source| NwdError::Spawn {
            path: spec.utility_path.clone(),
            source,
        };
        let mut command = Command::new(&spec.utility_path);
        command
            .arg0(&spec.argv0)
            .arg(kind.as_arg())
            .stdin(Stdio::null())
            .stdout(stdout_stdio(spec).map_err(map_io)?)
            .stderr(stderr_stdio(spec).map_err(map_io)?);
        let child = command.spawn().map_err(map_io)?;
        let pid = Pid::from_raw(child.id().cast_signed());
        info!(pid = pid.as_raw(), path = %spec.utility_path.display(), "spawned utility");
        Ok(UnixChild { pid, child })
    }

    fn reap_if_exited(&mut self, handle: &mut UnixChild) -> ReapStatus {
        match handle.child.try_wait() {
            Ok(None) => ReapStatus::Alive,
            Ok(Some(status)) => {
                if let Some(code) = status.code() {
                    info!(pid = handle.pid(), code, "utility exited");
                    ReapStatus::ExitedNormally(code)
                } else {
                    warn!(pid = handle.pid(), signal = status.signal(), "utility terminated abnormally");
                    ReapStatus::ExitedAbnormally
                }
            }
            Err(err) => {
                // ECHILD: nothing left to collect for this pid.
                debug!(pid = handle.pid(), %err, "non-blocking wait failed; treating child as gone");
                ReapStatus::ExitedAbnormally
            }
        }
    }

    fn is_alive(&self, handle: &UnixChild) -> bool {
        signal::kill(handle.pid, None).is_ok()
    }

    fn signal(&self, handle: &UnixChild, kind: ChildSignal) {
        if let Err(err) = signal::kill(handle.pid, kind.as_signal()) {
            debug!(pid = handle.pid(), ?kind, %err, "signal not delivered");
        }
    }
}

/// Stdio the child's stdout is bound to. Closing wins over redirection.
fn stdout_stdio(spec: &LaunchSpec) -> std::io::Result<Stdio> {
    if spec.closed.stdout {
        return Ok(Stdio::null());
    }
    if spec.redirect == RedirectMode::StdoutToStderr {
        let fd = std::io::stderr().as_fd().try_clone_to_owned()?;
        return Ok(Stdio::from(fd));
    }
    Ok(Stdio::inherit())
}

/// Stdio the child's stderr is bound to. Closing wins over redirection.
fn stderr_stdio(spec: &LaunchSpec) -> std::io::Result<Stdio> {
    if spec.closed.stderr {
        return Ok(Stdio::null());
    }
    if spec.redirect == RedirectMode::StderrToStdout {
        let fd = std::io::stdout().as_fd().try_clone_to_owned()?;
        return Ok(Stdio::from(fd));
    }
    Ok(Stdio::inherit())
}

#[cfg(test)]
mod tests {
    use super::ChangeKind;

    #[test]
    fn change_kind_argument_is_stable() {
        // The spawned-utility contract: argv[1] is exactly this string.
        assert_eq!(ChangeKind::IpChanged.as_arg(), "IP_CHANGED");
    }
}
