//! Daemon subsystem: child lifecycle, supervision state machine, signal
//! bridge, and the main reaction loop.

pub mod child;
pub mod loop_main;
#[cfg(feature = "daemon")]
pub mod signals;
pub mod supervisor;
