//! Process supervision state machine.
//!
//! The supervisor owns one child-process slot. Every delivered change event
//! runs one reaction cycle that either spawns the utility, records the event
//! as owed while the previous invocation is still running, or escalates
//! signals against an invocation that refuses to finish. At most one child
//! is ever outstanding; overlapping triggers coalesce into the
//! pending-retry counter instead of piling up processes.

use tracing::{debug, info, warn};

use crate::daemon::child::{ChangeKind, ChildLifecycle, ChildSignal, LaunchSpec, ReapStatus};

/// Pending-retry count above which each cycle sends the child a hangup.
pub const HANGUP_AFTER: u32 = 4;
/// Pending-retry count above which the hangup escalates to an interrupt.
pub const INTERRUPT_AFTER: u32 = 8;
/// Pending-retry count above which the child is killed and abandoned.
///
/// The thresholds count suppressed invocations, not elapsed time; they are
/// damping values, and the hard cap bounds how long a stuck child can hold
/// the slot.
pub const ABANDON_AFTER: u32 = 12;

/// Observable state of the child slot, as the `(last_child, pending)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorStatus {
    /// No child outstanding.
    Idle,
    /// A child is outstanding and no event has arrived since it spawned.
    Running,
    /// A child is outstanding and this many events arrived while it ran.
    Stale(u32),
}

/// Single-slot child supervisor. See the module docs for the state machine.
pub struct Supervisor<L: ChildLifecycle> {
    lifecycle: L,
    launch: LaunchSpec,
    last_child: Option<L::Handle>,
    pending_retries: u32,
}

impl<L: ChildLifecycle> Supervisor<L> {
    /// Creates an idle supervisor for the given launch configuration.
    pub fn new(lifecycle: L, launch: LaunchSpec) -> Self {
        Self {
            lifecycle,
            launch,
            last_child: None,
            pending_retries: 0,
        }
    }

    /// Change events observed while the outstanding child was still running.
    /// Reads 0 whenever no child is outstanding.
    #[must_use]
    pub fn pending_retries(&self) -> u32 {
        self.pending_retries
    }

    /// Whether a child slot is occupied.
    #[must_use]
    pub fn has_outstanding_child(&self) -> bool {
        self.last_child.is_some()
    }

    /// Current slot state.
    #[must_use]
    pub fn status(&self) -> SupervisorStatus {
        match (&self.last_child, self.pending_retries) {
            (None, _) => SupervisorStatus::Idle,
            (Some(_), 0) => SupervisorStatus::Running,
            (Some(_), n) => SupervisorStatus::Stale(n),
        }
    }

    /// One ordinary reaction cycle, triggered by a delivered change event.
    pub fn on_change_event(&mut self) {
        self.react(ChangeKind::IpChanged, true);
    }

    /// Forced cycle against an outstanding child while events are sparse:
    /// reaps and respawns if it exited, otherwise re-sends the current
    /// escalation step. Only delivered events advance the counter.
    pub fn retry_stale(&mut self) {
        if self.pending_retries > 0 {
            self.react(ChangeKind::IpChanged, false);
        }
    }

    /// Manual override: escalate any outstanding child through hangup,
    /// interrupt, and kill — each sent only while it still answers a
    /// liveness probe — then vacate the slot and spawn afresh. Bypasses the
    /// threshold counters entirely.
    pub fn force_reinvoke(&mut self) {
        info!("force-reinvoke requested");
        if let Some(mut handle) = self.last_child.take()
            && matches!(self.lifecycle.reap_if_exited(&mut handle), ReapStatus::Alive)
        {
            for step in [ChildSignal::Hangup, ChildSignal::Interrupt, ChildSignal::Kill] {
                if !self.lifecycle.is_alive(&handle) {
                    break;
                }
                self.lifecycle.signal(&handle, step);
            }
        }
        self.pending_retries = 0;
        self.last_child = self.try_spawn(ChangeKind::IpChanged);
    }

    fn react(&mut self, kind: ChangeKind, fresh_event: bool) {
        if let Some(mut handle) = self.last_child.take() {
            match self.lifecycle.reap_if_exited(&mut handle) {
                ReapStatus::Alive => {
                    if fresh_event {
                        self.pending_retries += 1;
                    }
                    debug!(pending = self.pending_retries, "utility still running");
                    self.last_child = self.escalate(handle, kind);
                    return;
                }
                ReapStatus::ExitedNormally(_) | ReapStatus::ExitedAbnormally => {
                    // An exited child never blocks the event from being
                    // serviced.
                    self.pending_retries = 0;
                }
            }
        }
        self.last_child = self.try_spawn(kind);
    }

    /// Applies the escalation ladder to a live child and returns what should
    /// occupy the slot afterwards.
    fn escalate(&mut self, mut handle: L::Handle, kind: ChangeKind) -> Option<L::Handle> {
        if self.pending_retries > ABANDON_AFTER {
            self.lifecycle.signal(&handle, ChildSignal::Kill);
            warn!("abandoning stubborn utility; its exit will not be collected");
            self.pending_retries = 0;
            return None;
        }
        if let Some(step) = escalation_step(self.pending_retries) {
            debug!(?step, pending = self.pending_retries, "signaling busy utility");
            self.lifecycle.signal(&handle, step);
            if !self.lifecycle.is_alive(&handle) {
                // It answered the signal by exiting; service the owed event
                // in this cycle rather than the next.
                let _ = self.lifecycle.reap_if_exited(&mut handle);
                self.pending_retries = 0;
                return self.try_spawn(kind);
            }
        }
        Some(handle)
    }

    /// Attempts one spawn. A missing or unspawnable utility is not an error
    /// condition here; the next trigger retries from scratch.
    fn try_spawn(&mut self, kind: ChangeKind) -> Option<L::Handle> {
        if !self.lifecycle.is_executable(&self.launch.utility_path) {
            info!(
                path = %self.launch.utility_path.display(),
                "no executable utility; nothing to invoke"
            );
            return None;
        }
        match self.lifecycle.spawn(&self.launch, kind) {
            Ok(handle) => {
                self.pending_retries = 0;
                Some(handle)
            }
            Err(err) => {
                warn!(%err, "spawn failed; will retry on the next trigger");
                None
            }
        }
    }
}

/// Signal owed to a child that has suppressed `pending` invocations, below
/// the abandonment cap.
const fn escalation_step(pending: u32) -> Option<ChildSignal> {
    if pending > INTERRUPT_AFTER {
        Some(ChildSignal::Interrupt)
    } else if pending > HANGUP_AFTER {
        Some(ChildSignal::Hangup)
    } else {
        None
    }
}
