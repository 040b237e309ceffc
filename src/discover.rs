//! Source discovery.
//!
//! Expands the configured source glob below an explicit base directory and
//! returns the matches as base-relative, `/`-separated paths in a stable
//! order. Discovery never changes the process working directory: the base is
//! opened as a capability handle and every match is checked through it.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::Dir};
use glob::{MatchOptions, glob_with};
use miette::Diagnostic;
use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Errors raised while enumerating sources.
#[derive(Debug, Error, Diagnostic)]
pub enum DiscoveryError {
    /// The glob pattern is syntactically invalid.
    #[error("invalid source pattern '{pattern}': {detail}")]
    #[diagnostic(code(ninjagen::discover::pattern))]
    Pattern {
        /// Pattern as configured.
        pattern: String,
        /// Parser message.
        detail: String,
    },

    /// The base directory could not be opened.
    #[error("cannot open project root {path}")]
    #[diagnostic(code(ninjagen::discover::root))]
    Root {
        /// Base directory.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Listing or inspecting a matched path failed.
    #[error("cannot read {path} while expanding '{pattern}'")]
    #[diagnostic(
        code(ninjagen::discover::io),
        help("check the permissions of the source directory")
    )]
    Io {
        /// Pattern being expanded.
        pattern: String,
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A match contains characters Ninja cannot express in a build line.
    #[error("source path {path:?} cannot be written to the build file")]
    #[diagnostic(
        code(ninjagen::discover::unrepresentable),
        help("rename the file: `|` and line breaks are not allowed in source paths")
    )]
    Unrepresentable {
        /// The offending path, relative to the project root.
        path: String,
    },

    /// A match is not valid UTF-8 and cannot be written to the graph.
    #[error("source path {} is not valid UTF-8", path.display())]
    #[diagnostic(code(ninjagen::discover::non_utf8))]
    NonUtf8 {
        /// The offending path.
        path: PathBuf,
    },
}

/// Discovered source files, sorted and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet(Vec<Utf8PathBuf>);

impl SourceSet {
    /// Number of sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no sources were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the sources in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Utf8PathBuf> {
        self.0.iter()
    }

    /// Whether `path` is one of the sources.
    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.0
            .binary_search_by(|candidate| candidate.as_path().cmp(path))
            .is_ok()
    }
}

impl<P: Into<Utf8PathBuf>> FromIterator<P> for SourceSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let unique: BTreeSet<Utf8PathBuf> = iter.into_iter().map(Into::into).collect();
        Self(unique.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SourceSet {
    type Item = &'a Utf8PathBuf;
    type IntoIter = std::slice::Iter<'a, Utf8PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Expand `pattern` below `base`.
///
/// A pattern whose directory does not exist yields an empty set. Matches
/// that are not regular files are skipped.
///
/// # Errors
///
/// Returns [`DiscoveryError`] when the pattern is invalid, `base` cannot be
/// opened, a directory cannot be listed for any reason other than absence,
/// or a match is not valid UTF-8.
pub fn discover(base: &Utf8Path, pattern: &str) -> Result<SourceSet, DiscoveryError> {
    let root = Dir::open_ambient_dir(base, ambient_authority()).map_err(|source| {
        DiscoveryError::Root {
            path: base.to_owned(),
            source,
        }
    })?;

    let opts = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let escaped_base = glob::Pattern::escape(base.as_str());
    let full = format!("{}/{}", escaped_base.trim_end_matches('/'), pattern);
    let entries = glob_with(&full, opts).map_err(|err| DiscoveryError::Pattern {
        pattern: pattern.to_owned(),
        detail: err.msg.to_owned(),
    })?;

    let mut found = BTreeSet::new();
    for entry in entries {
        if let Some(path) = process_entry(entry, base, &root, pattern)? {
            found.insert(path);
        }
    }
    debug!(%base, pattern, count = found.len(), "discovered sources");
    Ok(SourceSet(found.into_iter().collect()))
}

/// Turn one glob result into a base-relative file path.
fn process_entry(
    entry: Result<PathBuf, glob::GlobError>,
    base: &Utf8Path,
    root: &Dir,
    pattern: &str,
) -> Result<Option<Utf8PathBuf>, DiscoveryError> {
    let path = match entry {
        Ok(path) => path,
        Err(err) if err.error().kind() == io::ErrorKind::NotFound => {
            debug!(path = %err.path().display(), "skipping vanished path");
            return Ok(None);
        }
        Err(err) => {
            let path = err.path().to_path_buf();
            return Err(DiscoveryError::Io {
                pattern: pattern.to_owned(),
                path,
                source: err.into_error(),
            });
        }
    };
    let utf8 = Utf8PathBuf::try_from(path).map_err(|err| DiscoveryError::NonUtf8 {
        path: err.into_path_buf(),
    })?;
    let relative = utf8.strip_prefix(base).unwrap_or(utf8.as_path());
    let metadata = match root.metadata(relative) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(DiscoveryError::Io {
                pattern: pattern.to_owned(),
                path: utf8.into_std_path_buf(),
                source,
            });
        }
    };
    if !metadata.is_file() {
        return Ok(None);
    }
    let normalised = relative.as_str().replace('\\', "/");
    if normalised.contains(['|', '\n', '\r']) {
        return Err(DiscoveryError::Unrepresentable { path: normalised });
    }
    Ok(Some(Utf8PathBuf::from(normalised)))
}
