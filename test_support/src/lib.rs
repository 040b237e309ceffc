//! Test utilities for building throwaway site projects.
//!
//! [`Site`] owns a temporary directory laid out like the site repository the
//! generator targets. Integration tests populate it, point the generator at
//! it, and inspect the rendered graph.

pub mod ninja;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Configuration matching the two-data-set scenario used across the suite.
pub const SCENARIO_CONFIG: &str = "data = [\"x\", \"y\"]\n";

/// A temporary project root holding a `package.json`.
#[derive(Debug)]
pub struct Site {
    dir: TempDir,
    root: Utf8PathBuf,
}

impl Site {
    /// Create a project containing only `package.json`.
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("create site temp dir")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("temp dir {} is not UTF-8", path.display()))?;
        let site = Self { dir, root };
        site.write("package.json", "{}\n")?;
        Ok(site)
    }

    /// Create a project and write an empty file at each relative path.
    pub fn with_files(files: &[&str]) -> Result<Self> {
        let site = Self::new()?;
        for file in files {
            site.write(file, "")?;
        }
        Ok(site)
    }

    /// The scenario project: three scripts, two data sets and a template.
    pub fn scenario() -> Result<Self> {
        let site = Self::with_files(&[
            "src/a.js",
            "src/b.js",
            "src/main.js",
            "src/index.html",
            "data/x.csv",
            "data/y.csv",
        ])?;
        site.write("ninjagen.toml", SCENARIO_CONFIG)?;
        Ok(site)
    }

    /// Absolute project root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Absolute project root as a standard path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {path}"))
    }

    /// Rename `from` to `to`, both relative to the root.
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        fs::rename(self.root.join(from), self.root.join(to))
            .with_context(|| format!("rename {from} to {to}"))
    }

    /// Read the file at `rel`.
    pub fn read(&self, rel: &str) -> Result<String> {
        fs::read_to_string(self.root.join(rel)).with_context(|| format!("read {rel}"))
    }
}
