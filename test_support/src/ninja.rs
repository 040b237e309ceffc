//! Helpers for running the real `ninja` executable against generated files.

use anyhow::{Context, Result, ensure};
use std::path::Path;
use std::process::Command;

/// Whether a working `ninja` is on `PATH`.
pub fn ninja_available() -> bool {
    Command::new("ninja")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

/// Run `ninja -f build_file ARGS` in `dir` and return its stdout.
pub fn run_ninja(dir: &Path, build_file: &Path, args: &[&str]) -> Result<String> {
    let out = Command::new("ninja")
        .arg("-f")
        .arg(build_file)
        .args(args)
        .current_dir(dir)
        .output()
        .context("spawn ninja")?;
    ensure!(
        out.status.success(),
        "ninja {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8(out.stdout).context("ninja stdout is not UTF-8")
}
