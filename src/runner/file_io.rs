//! Output helpers for the runner.
//! Writes rendered text to stdout or to files through capability-based
//! directories.

use super::Rendered;
use anyhow::{Context, Result as AnyResult, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs as cap_fs};
use std::io;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Return `true` when `path` is the CLI sentinel indicating "write to stdout".
#[must_use]
pub fn is_stdout_path(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Write `content` to `path` under `dir`, creating parent directories.
pub fn write_file_utf8(dir: &cap_fs::Dir, path: &Utf8Path, content: &Rendered) -> AnyResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        dir.create_dir_all(parent.as_str())
            .with_context(|| format!("creating directory {parent}"))?;
    }
    let mut file = dir
        .create(path.as_str())
        .with_context(|| format!("creating {path}"))?;
    file.write_all(content.as_str().as_bytes())
        .with_context(|| format!("writing {path}"))?;
    file.flush().with_context(|| format!("flushing {path}"))?;
    file.sync_all().with_context(|| format!("syncing {path}"))?;
    Ok(())
}

/// Open the deepest existing ancestor of an absolute `path`.
fn derive_dir_and_relative(path: &Utf8Path) -> AnyResult<(cap_fs::Dir, Utf8PathBuf)> {
    if path.is_relative() {
        let dir = cap_fs::Dir::open_ambient_dir(".", ambient_authority())
            .context("opening the working directory")?;
        return Ok((dir, path.to_owned()));
    }

    let mut ancestors = path.ancestors();
    ancestors.next();
    let (base, dir) = ancestors
        .find_map(|candidate| {
            cap_fs::Dir::open_ambient_dir(candidate.as_str(), ambient_authority())
                .ok()
                .map(|dir| (candidate.to_owned(), dir))
        })
        .ok_or_else(|| anyhow!("no existing ancestor directory for {path}"))?;
    let relative = path
        .strip_prefix(&base)
        .with_context(|| format!("deriving {path} relative to {base}"))?
        .to_owned();
    Ok((dir, relative))
}

/// Write `content` to `path`, creating missing parent directories.
pub fn write_file(path: &Utf8Path, content: &Rendered) -> AnyResult<()> {
    let (dir, relative) = derive_dir_and_relative(path)?;
    write_file_utf8(&dir, &relative, content)?;
    info!(%path, bytes = content.as_str().len(), "wrote output file");
    Ok(())
}

fn is_broken_pipe(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::BrokenPipe
}

fn write_all_ignoring_broken_pipe(writer: &mut impl Write, buf: &[u8]) -> io::Result<()> {
    match writer.write_all(buf) {
        Ok(()) => Ok(()),
        Err(err) if is_broken_pipe(&err) => Ok(()),
        Err(err) => Err(err),
    }
}

fn flush_ignoring_broken_pipe(writer: &mut impl Write) -> io::Result<()> {
    match writer.flush() {
        Ok(()) => Ok(()),
        Err(err) if is_broken_pipe(&err) => Ok(()),
        Err(err) => Err(err),
    }
}

/// Write `content` to stdout. A reader closing the pipe early is not an error.
pub fn write_stdout(content: &Rendered) -> AnyResult<()> {
    let mut stdout = io::stdout().lock();
    write_all_ignoring_broken_pipe(&mut stdout, content.as_str().as_bytes())
        .context("writing to stdout")?;
    flush_ignoring_broken_pipe(&mut stdout).context("flushing stdout")?;
    Ok(())
}
