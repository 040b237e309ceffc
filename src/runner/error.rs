//! Error types for the runner module.
//!
//! This submodule isolates derive-macro-affected code to scope lint suppressions
//! narrowly. The `unused_assignments` lint fires in some Rust versions due to
//! thiserror/miette derive macro expansion.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros. `#[expect]` fails when the lint doesn't
// fire, so `#[allow]` is used here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving paths for a command.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// A path from the command line or environment is not valid UTF-8.
    #[error("{what} path {} is not valid UTF-8", path.display())]
    #[diagnostic(
        code(ninjagen::runner::non_utf8_path),
        help("build paths are written into the Ninja file and must be UTF-8")
    )]
    NonUtf8Path {
        /// Which path was rejected.
        what: &'static str,
        /// The offending path.
        path: PathBuf,
    },

    /// The current working directory could not be determined.
    #[error("cannot determine the current directory")]
    #[diagnostic(code(ninjagen::runner::current_dir))]
    CurrentDir {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configuration path does not name a file.
    #[error("configuration path {path} does not name a file")]
    #[diagnostic(code(ninjagen::runner::config_path))]
    ConfigPath {
        /// The configured path.
        path: String,
    },
}
