//! netwatchd — invokes a user-supplied utility whenever the host's IP
//! address configuration changes.
//!
//! The daemon keeps a single child-process slot: each change notification
//! either spawns the configured utility (`~/.netwatch` by default, called as
//! `<argv0> IP_CHANGED`), records the event as owed while a previous
//! invocation is still running, or escalates signals against an invocation
//! that refuses to finish. See [`daemon::supervisor`] for the state machine.

#[cfg(feature = "cli")]
pub mod cli_app;
pub mod core;
pub mod daemon;
pub mod watch;
