//! Integration tests for CLI execution using `assert_cmd`.
//!
//! These tests invoke the compiled binary against temporary site projects and
//! check what lands on stdout, on stderr, and on disk.

use anyhow::{Context, Result, ensure};
use assert_cmd::Command;
use predicates::prelude::*;
use test_support::Site;

fn ninjagen() -> Result<Command> {
    Command::cargo_bin("ninjagen").context("locate ninjagen binary")
}

#[test]
fn bare_invocation_prints_graph_to_stdout() -> Result<()> {
    let site = Site::scenario()?;
    let output = ninjagen()?
        .current_dir(site.path())
        .output()
        .context("run ninjagen")?;
    ensure!(output.status.success(), "ninjagen should succeed");
    let stdout = String::from_utf8(output.stdout).context("stdout is UTF-8")?;
    ensure!(
        stdout.starts_with("# Generated by ninjagen"),
        "stdout should start with the header, got: {stdout}"
    );
    ensure!(stdout.contains("\nbuild out/bundle.js: bundle out/src/main.js"));
    ensure!(!site.root().join("build.ninja").exists(), "stdout mode wrote a file");
    Ok(())
}

#[test]
fn generate_dash_streams_to_stdout() -> Result<()> {
    let site = Site::scenario()?;
    ninjagen()?
        .current_dir(site.path())
        .args(["generate", "-"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rule babel"));
    ensure!(!site.root().join("-").exists(), "should not create a file named '-'");
    Ok(())
}

#[test]
fn generate_writes_file_under_project_root() -> Result<()> {
    let site = Site::scenario()?;
    site.write("src/deep/.keep", "")?;
    ninjagen()?
        .current_dir(site.root().join("src/deep"))
        .args(["generate", "build.ninja"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    let written = site.read("build.ninja")?;
    ensure!(written.contains("build build.ninja: generate ninjagen.toml"));
    ensure!(
        !site.root().join("src/deep/build.ninja").exists(),
        "relative output should resolve against the project root"
    );
    Ok(())
}

#[test]
fn directory_option_selects_project() -> Result<()> {
    let site = Site::scenario()?;
    let elsewhere = tempfile::tempdir().context("create unrelated dir")?;
    ninjagen()?
        .current_dir(elsewhere.path())
        .arg("-C")
        .arg(site.path())
        .args(["generate", "gen/out.ninja"])
        .assert()
        .success();
    ensure!(site.root().join("gen/out.ninja").is_file(), "missing output");
    Ok(())
}

#[test]
fn preset_flag_overrides_configuration() -> Result<()> {
    let site = Site::with_files(&["main.js", "index.html"])?;
    ninjagen()?
        .current_dir(site.path())
        .args(["--preset", "legacy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("build docs/index.html: copy index.html"));
    Ok(())
}

#[test]
fn graph_subcommand_prints_dot() -> Result<()> {
    let site = Site::scenario()?;
    ninjagen()?
        .current_dir(site.path())
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph ninjagen {"))
        .stdout(predicate::str::contains("\"src/a.js\" -> \"edge2\";"));
    Ok(())
}

#[test]
fn rules_subcommand_lists_catalogue() -> Result<()> {
    let site = Site::new()?;
    ninjagen()?
        .current_dir(site.path())
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("csv_to_json"))
        .stdout(predicate::str::contains("cp $in $out"));
    Ok(())
}

#[test]
fn invalid_configuration_fails_without_output() -> Result<()> {
    let site = Site::scenario()?;
    site.write("ninjagen.toml", "source_glob = \"\"\n")?;
    ninjagen()?
        .current_dir(site.path())
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("source_glob"));
    Ok(())
}

#[test]
fn incompatible_rule_table_is_rejected() -> Result<()> {
    let site = Site::scenario()?;
    site.write("ninjagen.toml", "requires = \"^2\"\n")?;
    ninjagen()?
        .current_dir(site.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("rule table"));
    Ok(())
}
