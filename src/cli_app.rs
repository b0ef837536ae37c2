//! Top-level CLI definition and daemon startup sequence.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::core::config::{ClosedStreams, DaemonConfig, RedirectMode, home_dir};
use crate::core::errors::{NwdError, Result};
use crate::daemon::child::{LaunchSpec, UnixChildLifecycle};
use crate::daemon::supervisor::Supervisor;
use crate::daemon::{loop_main, signals};
use crate::watch::ControlFlags;
use crate::watch::poller::{AddrPoller, DEFAULT_POLL_INTERVAL};

/// netwatchd — invokes a utility whenever the host's IP configuration changes.
#[derive(Parser, Debug)]
#[command(name = "netwatchd", version, about)]
pub struct Cli {
    /// Only log warnings and errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log supervision decisions in detail.
    #[arg(short, long)]
    pub verbose: bool,

    /// Stay attached to the terminal instead of detaching.
    #[arg(short, long)]
    pub foreground: bool,

    /// Utility to invoke on each change. Relative paths resolve under the
    /// home directory; defaults to ~/.netwatch.
    #[arg(short, long, value_name = "PATH")]
    pub utility: Option<String>,

    /// Duplicate the utility's stdout onto the daemon's stderr.
    #[arg(long, conflicts_with = "stderr_to_stdout")]
    pub stdout_to_stderr: bool,

    /// Duplicate the utility's stderr onto the daemon's stdout.
    #[arg(long)]
    pub stderr_to_stdout: bool,

    /// Rebind the utility's stdout to the null device.
    #[arg(long)]
    pub close_stdout: bool,

    /// Rebind the utility's stderr to the null device.
    #[arg(long)]
    pub close_stderr: bool,
}

impl Cli {
    fn redirect_mode(&self) -> RedirectMode {
        if self.stdout_to_stderr {
            RedirectMode::StdoutToStderr
        } else if self.stderr_to_stdout {
            RedirectMode::StderrToStdout
        } else {
            RedirectMode::None
        }
    }

    fn closed_streams(&self) -> ClosedStreams {
        ClosedStreams {
            stdout: self.close_stdout,
            stderr: self.close_stderr,
        }
    }

    /// Resolves the immutable daemon configuration from the parsed flags.
    pub fn to_config(&self) -> Result<DaemonConfig> {
        let home = home_dir()?;
        DaemonConfig::resolve(
            self.utility.as_deref(),
            &home,
            self.redirect_mode(),
            self.closed_streams(),
            self.foreground,
        )
    }
}

/// Installs the stderr tracing subscriber. `RUST_LOG` overrides the
/// flag-derived level.
pub fn init_logging(cli: &Cli) {
    let default = if cli.quiet {
        "netwatchd=warn"
    } else if cli.verbose {
        "netwatchd=debug"
    } else {
        "netwatchd=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves configuration, detaches, and runs the daemon to completion.
pub fn run(cli: &Cli) -> Result<()> {
    let config = cli.to_config()?;
    if !config.foreground {
        nix::unistd::daemon(true, true).map_err(|source| NwdError::Daemonize { source })?;
        info!(pid = std::process::id(), "daemonized");
    }
    if let Some(dir) = &config.workdir {
        std::env::set_current_dir(dir).map_err(|source| NwdError::Workdir {
            path: dir.clone(),
            source,
        })?;
    }
    let control = ControlFlags::new();
    signals::install(&control)?;
    let mut source = AddrPoller::subscribe(DEFAULT_POLL_INTERVAL)?;
    info!(utility = %config.utility_path.display(), "supervising utility");
    let launch = LaunchSpec::for_config(&config);
    let mut supervisor = Supervisor::new(UnixChildLifecycle, launch);
    loop_main::run(&mut supervisor, &mut source, &control)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use clap::Parser;

    use super::Cli;
    use crate::core::config::RedirectMode;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn redirect_flags_are_mutually_exclusive() {
        let err = Cli::try_parse_from([
            "netwatchd",
            "--stdout-to-stderr",
            "--stderr-to-stdout",
        ])
        .expect_err("conflicting redirects must not parse");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn quiet_and_verbose_are_mutually_exclusive() {
        let err = Cli::try_parse_from(["netwatchd", "-q", "-v"])
            .expect_err("conflicting levels must not parse");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn defaults_inherit_both_streams() {
        let cli = Cli::try_parse_from(["netwatchd"]).expect("bare invocation parses");
        assert_eq!(cli.redirect_mode(), RedirectMode::None);
        assert!(!cli.closed_streams().stdout);
        assert!(!cli.closed_streams().stderr);
        assert!(!cli.foreground);
    }

    #[test]
    fn close_flags_compose_with_redirect() {
        let cli = Cli::try_parse_from(["netwatchd", "--stdout-to-stderr", "--close-stderr"])
            .expect("parses");
        assert_eq!(cli.redirect_mode(), RedirectMode::StdoutToStderr);
        assert!(cli.closed_streams().stderr);
    }
}
