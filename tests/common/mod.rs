//! Shared helpers for integration tests: run the built binary with a
//! scratch HOME and keep a per-case log for post-mortem reading.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

pub struct CliResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

pub fn run_cli_case(case: &str, args: &[&str]) -> CliResult {
    let scratch = scratch_dir(case);
    let home = scratch.join("home");
    fs::create_dir_all(&home).expect("create scratch home");
    let output = Command::new(env!("CARGO_BIN_EXE_netwatchd"))
        .args(args)
        .env("HOME", &home)
        .env_remove("RUST_LOG")
        .output()
        .expect("run netwatchd binary");
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let log_path = scratch.join("case.log");
    fs::write(
        &log_path,
        format!(
            "status: {:?}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}\n",
            output.status
        ),
    )
    .expect("write case log");
    CliResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

fn scratch_dir(case: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("netwatchd-tests").join(case);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
