//! NWD-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::PathBuf;

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, NwdError>;

/// Top-level error type for netwatchd.
#[derive(Debug, Error)]
pub enum NwdError {
    #[error("[NWD-1001] invalid utility path '{given}': {reason}")]
    InvalidUtilityPath { given: String, reason: &'static str },

    #[error("[NWD-1002] utility path too long: {path}")]
    UtilityPathTooLong { path: PathBuf },

    #[error("[NWD-1003] unable to determine home directory: {details}")]
    HomeDirectory { details: String },

    #[error("[NWD-1101] unable to daemonize: {source}")]
    Daemonize {
        #[source]
        source: nix::Error,
    },

    #[error("[NWD-1102] unable to change working directory to {path}: {source}")]
    Workdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[NWD-1103] unable to install signal handlers: {source}")]
    SignalSetup {
        #[source]
        source: std::io::Error,
    },

    #[error("[NWD-2001] unable to read interface addresses: {source}")]
    AddressSnapshot {
        #[source]
        source: nix::Error,
    },

    #[error("[NWD-3001] unable to spawn {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl NwdError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidUtilityPath { .. } => "NWD-1001",
            Self::UtilityPathTooLong { .. } => "NWD-1002",
            Self::HomeDirectory { .. } => "NWD-1003",
            Self::Daemonize { .. } => "NWD-1101",
            Self::Workdir { .. } => "NWD-1102",
            Self::SignalSetup { .. } => "NWD-1103",
            Self::AddressSnapshot { .. } => "NWD-2001",
            Self::Spawn { .. } => "NWD-3001",
        }
    }

    /// Whether the error terminates the daemon. Everything that can happen
    /// before the reaction loop starts is fatal; spawn failures are retried
    /// on the next triggering cycle.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Spawn { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::NwdError;

    #[test]
    fn codes_match_display_prefix() {
        let err = NwdError::InvalidUtilityPath {
            given: "bad/".to_string(),
            reason: "trailing slash",
        };
        assert!(err.to_string().starts_with(&format!("[{}]", err.code())));
    }

    #[test]
    fn spawn_errors_are_not_fatal() {
        let err = NwdError::Spawn {
            path: "/home/u/.netwatch".into(),
            source: std::io::Error::other("fork failed"),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.code(), "NWD-3001");
    }

    #[test]
    fn startup_errors_are_fatal() {
        let err = NwdError::HomeDirectory {
            details: "no passwd entry".to_string(),
        };
        assert!(err.is_fatal());
    }
}
