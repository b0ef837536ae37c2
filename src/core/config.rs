//! Daemon configuration: utility path resolution and child output policy.
//!
//! Everything the original design kept in process-wide globals lives here as
//! an explicit [`DaemonConfig`] built once at startup and never mutated.

use std::env;
use std::path::{Path, PathBuf};

use crate::core::errors::{NwdError, Result};

/// Utility filename resolved under the home directory when no explicit
/// `--utility` path is given.
pub const DEFAULT_UTILITY_NAME: &str = ".netwatch";

/// Longest resolved utility path accepted, in bytes.
const MAX_PATH_BYTES: usize = libc::PATH_MAX as usize;

/// How the child's standard output streams are rewired before exec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectMode {
    /// Child inherits both streams untouched.
    #[default]
    None,
    /// Child's stdout is duplicated onto the daemon's stderr.
    StdoutToStderr,
    /// Child's stderr is duplicated onto the daemon's stdout.
    StderrToStdout,
}

/// Which of the child's standard streams are rebound to the null device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClosedStreams {
    pub stdout: bool,
    pub stderr: bool,
}

/// Immutable daemon configuration, fixed before the reaction loop starts.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Resolved path of the utility to invoke.
    pub utility_path: PathBuf,
    /// Name the utility sees as its own argv[0]; the final path component.
    pub argv0: String,
    /// Output rewiring applied to every spawned child.
    pub redirect: RedirectMode,
    /// Streams rebound to the null device in every spawned child.
    pub closed: ClosedStreams,
    /// Stay attached to the terminal instead of detaching.
    pub foreground: bool,
    /// Directory the daemon changes into before the loop, when any.
    pub workdir: Option<PathBuf>,
}

impl DaemonConfig {
    /// Builds the configuration from an optional explicit utility path argument.
    ///
    /// With no argument the utility is the `.netwatch` dotfile under `home` and
    /// the daemon later changes into `home` (so a relative-path-happy
    /// utility always runs from a predictable place). An explicit path skips
    /// the directory change and is joined under `home` only when relative.
    pub fn resolve(
        utility_arg: Option<&str>,
        home: &Path,
        redirect: RedirectMode,
        closed: ClosedStreams,
        foreground: bool,
    ) -> Result<Self> {
        let (utility_path, argv0) = resolve_utility(utility_arg, home)?;
        let workdir = utility_arg.is_none().then(|| home.to_path_buf());
        Ok(Self {
            utility_path,
            argv0,
            redirect,
            closed,
            foreground,
            workdir,
        })
    }
}

/// Determines the home directory: `$HOME` when set and non-empty, otherwise
/// the passwd entry for the current uid.
pub fn home_dir() -> Result<PathBuf> {
    if let Some(home) = env::var_os("HOME")
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }
    let user = nix::unistd::User::from_uid(nix::unistd::Uid::current())
        .map_err(|err| NwdError::HomeDirectory {
            details: err.to_string(),
        })?
        .ok_or_else(|| NwdError::HomeDirectory {
            details: "no passwd entry for current uid".to_string(),
        })?;
    Ok(user.dir)
}

/// Resolves a utility path argument to `(absolute-ish path, argv0)`.
///
/// `None` selects [`DEFAULT_UTILITY_NAME`] under `home`. Relative paths are
/// joined under `home`; absolute paths are taken as-is.
pub fn resolve_utility(given: Option<&str>, home: &Path) -> Result<(PathBuf, String)> {
    let raw = given.unwrap_or(DEFAULT_UTILITY_NAME);
    let argv0 = validate_utility_arg(raw)?;
    let path = if raw.starts_with('/') {
        PathBuf::from(raw)
    } else {
        home.join(raw)
    };
    if path.as_os_str().len() >= MAX_PATH_BYTES {
        return Err(NwdError::UtilityPathTooLong { path });
    }
    Ok((path, argv0.to_string()))
}

/// Checks that a raw utility path can ever name an executable file,
/// returning its final component. Empty paths, directory-looking paths, and
/// paths whose final component is `.` or `..` are configuration errors.
fn validate_utility_arg(raw: &str) -> Result<&str> {
    let reject = |reason| {
        Err(NwdError::InvalidUtilityPath {
            given: raw.to_string(),
            reason,
        })
    };
    if raw.is_empty() {
        return reject("empty path");
    }
    if raw.ends_with('/') {
        return reject("ends in '/'");
    }
    let last = raw.rsplit('/').next().unwrap_or(raw);
    match last {
        "." => reject("final component is '.'"),
        ".." => reject("final component is '..'"),
        _ => Ok(last),
    }
}
