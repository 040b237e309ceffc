//! The regeneration edge must rebuild the file it was written into.
//!
//! Each test generates a build file with non-default options, then replays
//! the `generate` rule the way Ninja would and compares the bytes.

use anyhow::{Context, Result, ensure};
use assert_cmd::Command;
use std::fs::{File, OpenOptions};
use std::time::{Duration, SystemTime};
use test_support::Site;
use test_support::ninja::{ninja_available, run_ninja};

const OUTPUT: &str = "gen/out.ninja";

fn ninjagen() -> Result<Command> {
    Command::cargo_bin("ninjagen").context("locate ninjagen binary")
}

/// A site whose configuration lives away from the default location.
fn relocated_site() -> Result<Site> {
    let site = Site::with_files(&["main.js", "index.html", "src/a.js"])?;
    site.write("conf/gen.toml", "dependency_gate = \"order-only\"\n")?;
    Ok(site)
}

fn generate_relocated(site: &Site) -> Result<String> {
    ninjagen()?
        .current_dir(site.path())
        .args(["--preset", "legacy", "--config", "conf/gen.toml", "generate", OUTPUT])
        .assert()
        .success();
    site.read(OUTPUT)
}

/// The stored regeneration options, as a shell would split them.
fn stored_args(ninja: &str) -> Result<Vec<String>> {
    let line = ninja
        .lines()
        .find_map(|line| line.strip_prefix("NINJAGEN_ARGS = "))
        .context("NINJAGEN_ARGS variable")?;
    shlex::split(&line.replace("$$", "$")).context("split NINJAGEN_ARGS")
}

#[test]
fn regeneration_edge_names_the_written_file() -> Result<()> {
    let site = relocated_site()?;
    let ninja = generate_relocated(&site)?;
    ensure!(
        ninja.contains("\nbuild gen/out.ninja: generate conf/gen.toml\n"),
        "{ninja}"
    );
    ensure!(!ninja.contains("build build.ninja:"), "{ninja}");
    Ok(())
}

#[test]
fn replaying_the_generate_command_reproduces_the_file() -> Result<()> {
    let site = relocated_site()?;
    let first = generate_relocated(&site)?;
    let args = stored_args(&first)?;
    ensure!(
        args == ["-C", ".", "--config", "conf/gen.toml", "--preset", "legacy"],
        "stored args: {args:?}"
    );

    site.write(OUTPUT, "")?;
    ninjagen()?
        .current_dir(site.path())
        .args(&args)
        .args(["generate", OUTPUT])
        .assert()
        .success();
    let second = site.read(OUTPUT)?;
    ensure!(first == second, "regenerated file differs:\n{second}");
    ensure!(second.contains("build out/main.js: babel main.js || .package.json.stamp"));
    Ok(())
}

#[test]
fn replay_honours_later_configuration_edits() -> Result<()> {
    let site = relocated_site()?;
    let first = generate_relocated(&site)?;
    let args = stored_args(&first)?;

    site.write("conf/gen.toml", "dependency_gate = \"implicit\"\n")?;
    ninjagen()?
        .current_dir(site.path())
        .args(&args)
        .args(["generate", OUTPUT])
        .assert()
        .success();
    let second = site.read(OUTPUT)?;
    ensure!(
        second.contains("build out/main.js: babel main.js | .package.json.stamp"),
        "{second}"
    );
    ensure!(second.contains("build docs/index.html: copy index.html"), "preset lost");
    Ok(())
}

#[test]
fn ninja_regenerates_identical_bytes() -> Result<()> {
    if !ninja_available() {
        eprintln!("skipping test: ninja must be installed for integration tests");
        return Ok(());
    }
    let site = relocated_site()?;
    let config = format!(
        "dependency_gate = \"order-only\"\n\n[tools]\nninjagen = {:?}\n",
        env!("CARGO_BIN_EXE_ninjagen")
    );
    site.write("conf/gen.toml", &config)?;
    let first = generate_relocated(&site)?;

    let build_file = site.root().join(OUTPUT);
    let stale = SystemTime::now() - Duration::from_secs(3600);
    OpenOptions::new()
        .write(true)
        .open(&build_file)
        .and_then(|file: File| file.set_modified(stale))
        .context("age build file")?;

    run_ninja(site.path(), build_file.as_std_path(), &[OUTPUT])?;
    let second = site.read(OUTPUT)?;
    ensure!(first == second, "ninja regenerated different bytes:\n{second}");
    Ok(())
}
