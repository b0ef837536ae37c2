//! Real-process scenarios for the Unix child lifecycle: spawn an actual
//! shell script, observe its argument contract, reap it, and kill it.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use netwatchd::core::config::{ClosedStreams, RedirectMode};
use netwatchd::daemon::child::{
    ChangeKind, ChildLifecycle, ChildSignal, LaunchSpec, ReapStatus, UnixChild,
    UnixChildLifecycle,
};

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod script");
}

fn launch_spec(path: &Path) -> LaunchSpec {
    LaunchSpec {
        utility_path: path.to_path_buf(),
        argv0: path
            .file_name()
            .expect("script has a name")
            .to_string_lossy()
            .into_owned(),
        redirect: RedirectMode::None,
        closed: ClosedStreams {
            stdout: true,
            stderr: true,
        },
    }
}

fn wait_for_exit(lifecycle: &mut UnixChildLifecycle, handle: &mut UnixChild) -> ReapStatus {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        match lifecycle.reap_if_exited(handle) {
            ReapStatus::Alive => {
                assert!(Instant::now() < deadline, "child did not exit in time");
                thread::sleep(Duration::from_millis(20));
            }
            done => return done,
        }
    }
}

#[test]
fn spawned_utility_receives_the_event_kind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("netwatch-hook");
    let observed = dir.path().join("observed");
    write_script(
        &script,
        &format!("printf '%s %s' \"$0\" \"$1\" > '{}'", observed.display()),
    );

    let mut lifecycle = UnixChildLifecycle;
    assert!(lifecycle.is_executable(&script));
    let mut handle = lifecycle
        .spawn(&launch_spec(&script), ChangeKind::IpChanged)
        .expect("spawn");
    assert_eq!(wait_for_exit(&mut lifecycle, &mut handle), ReapStatus::ExitedNormally(0));

    let contents = fs::read_to_string(&observed).expect("hook wrote its arguments");
    let (argv0, event) = contents.split_once(' ').expect("two arguments");
    // The shebang interpreter sees the script path as $0.
    assert!(argv0.ends_with("netwatch-hook"), "unexpected $0: {argv0}");
    assert_eq!(event, "IP_CHANGED");
}

#[test]
fn nonzero_exit_code_is_collected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("failing-hook");
    write_script(&script, "exit 3");

    let mut lifecycle = UnixChildLifecycle;
    let mut handle = lifecycle
        .spawn(&launch_spec(&script), ChangeKind::IpChanged)
        .expect("spawn");
    assert_eq!(wait_for_exit(&mut lifecycle, &mut handle), ReapStatus::ExitedNormally(3));
}

#[test]
fn kill_terminates_a_sleeping_child_abnormally() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("sleepy-hook");
    write_script(&script, "sleep 30");

    let mut lifecycle = UnixChildLifecycle;
    let mut handle = lifecycle
        .spawn(&launch_spec(&script), ChangeKind::IpChanged)
        .expect("spawn");
    assert!(lifecycle.is_alive(&handle));

    lifecycle.signal(&handle, ChildSignal::Kill);
    assert_eq!(
        wait_for_exit(&mut lifecycle, &mut handle),
        ReapStatus::ExitedAbnormally
    );
    assert!(!lifecycle.is_alive(&handle));
}

#[test]
fn missing_utility_is_not_executable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let lifecycle = UnixChildLifecycle;
    assert!(!lifecycle.is_executable(&dir.path().join("absent")));
}

#[test]
fn unreadable_spawn_reports_a_transient_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("not-a-program");
    // Present but not executable: spawn must fail without panicking.
    fs::write(&script, "just text").expect("write file");

    let mut lifecycle = UnixChildLifecycle;
    assert!(!lifecycle.is_executable(&script));
    let err = lifecycle
        .spawn(&launch_spec(&script), ChangeKind::IpChanged)
        .expect_err("spawn must fail");
    assert!(!err.is_fatal());
    assert_eq!(err.code(), "NWD-3001");
}
