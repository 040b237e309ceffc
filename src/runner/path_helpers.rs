//! Path resolution helpers for the runner module.
//!
//! Centralises project root, configuration and output path logic so the main
//! runner module stays focused on command dispatch. Every path returned here
//! is absolute or relative to the project root; the process working
//! directory is only read, never changed.

use super::RunnerError;
use crate::cli::Cli;
use crate::config::{GenConfig, locate_root};
use camino::{Utf8Path, Utf8PathBuf};
use std::path::Path;

/// Where the configuration file lives and how the build file refers to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ConfigLocation {
    /// Directory the file is read from.
    pub dir: Utf8PathBuf,
    /// File name within `dir`.
    pub file: Utf8PathBuf,
    /// Path written into the regeneration edge.
    pub reference: Utf8PathBuf,
}

/// Convert a command line path to UTF-8.
pub(super) fn utf8_path(what: &'static str, path: &Path) -> Result<Utf8PathBuf, RunnerError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|path| RunnerError::NonUtf8Path { what, path })
}

fn current_dir() -> Result<Utf8PathBuf, RunnerError> {
    let cwd = std::env::current_dir().map_err(|source| RunnerError::CurrentDir { source })?;
    utf8_path("working directory", &cwd)
}

/// Determine the absolute project root.
///
/// `-C DIR` wins; otherwise the nearest ancestor of the working directory
/// holding the configuration file or the dependency manifest.
pub(super) fn resolve_base_dir(cli: &Cli) -> Result<Utf8PathBuf, RunnerError> {
    let cwd = current_dir()?;
    if let Some(dir) = &cli.directory {
        return Ok(cwd.join(utf8_path("project", dir)?));
    }
    Ok(locate_root(&cwd, &GenConfig::default().manifest))
}

/// Locate the configuration file named by `--config`.
///
/// Relative paths are taken from the project root. The reference written
/// into the build file stays relative when the file lies under the root.
pub(super) fn resolve_config_location(
    cli: &Cli,
    root: &Utf8Path,
) -> Result<ConfigLocation, RunnerError> {
    let configured = utf8_path("configuration", &cli.config)?;
    if configured.is_relative() {
        return Ok(ConfigLocation {
            dir: root.to_path_buf(),
            file: configured.clone(),
            reference: configured,
        });
    }
    let (Some(dir), Some(file)) = (configured.parent(), configured.file_name()) else {
        return Err(RunnerError::ConfigPath {
            path: configured.into_string(),
        });
    };
    let reference = configured
        .strip_prefix(root)
        .map_or_else(|_| configured.clone(), Utf8Path::to_path_buf);
    Ok(ConfigLocation {
        dir: dir.to_path_buf(),
        file: Utf8PathBuf::from(file),
        reference,
    })
}

/// Resolve an output path against the project root.
///
/// The emitted graph uses root-relative paths, so a relative output file is
/// placed under the root whatever directory the command ran from.
pub(super) fn resolve_output_path(
    root: &Utf8Path,
    path: &Path,
) -> Result<Utf8PathBuf, RunnerError> {
    Ok(root.join(utf8_path("output", path)?))
}

/// Express a resolved output as a graph path: relative to the root when it
/// lies beneath it, absolute otherwise.
pub(super) fn graph_path(root: &Utf8Path, output: &Utf8Path) -> Utf8PathBuf {
    output
        .strip_prefix(root)
        .map_or_else(|_| output.to_path_buf(), Utf8Path::to_path_buf)
}
