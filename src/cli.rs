//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. Running
//! `ninjagen` with no arguments is equivalent to `ninjagen generate`, which
//! prints the build graph to stdout.

use crate::config::{CONFIG_FILE_NAME, DependencyGate, Preset};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generates the Ninja build graph for the site's JavaScript, data and assets.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use this directory as the project root instead of searching upwards.
    ///
    /// Without this option the root is the nearest ancestor of the current
    /// directory holding `ninjagen.toml` or `package.json`.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Configuration file, relative to the project root.
    #[arg(long, value_name = "FILE", default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Pipeline variant, overriding the configuration file.
    #[arg(long, value_enum, value_name = "PRESET")]
    pub preset: Option<Preset>,

    /// How tool steps wait for installed dependencies, overriding the
    /// configuration file.
    #[arg(long, value_enum, value_name = "GATE")]
    pub dependency_gate: Option<DependencyGate>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Optional subcommand to execute; defaults to `generate` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            directory: None,
            config: PathBuf::from(CONFIG_FILE_NAME),
            preset: None,
            dependency_gate: None,
            verbose: false,
            command: None,
        }
    }
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Generate { file: None });
        }
        self
    }
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Write the Ninja build graph (stdout by default).
    Generate {
        /// Output path; `-` or no value writes to stdout.
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Write the build graph in DOT format for visualisation.
    Graph {
        /// Output path; `-` or no value writes to stdout.
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// List the rule catalogue.
    Rules,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_defaults_to_generate_on_stdout() {
        let cli = Cli::try_parse_from(["ninjagen"])
            .expect("parse")
            .with_default_command();
        assert_eq!(cli.command, Some(Commands::Generate { file: None }));
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE_NAME));
        assert!(cli.directory.is_none());
    }

    #[rstest]
    #[case(&["ninjagen", "--preset", "legacy"], Some(Preset::Legacy))]
    #[case(&["ninjagen", "--preset", "minified", "rules"], Some(Preset::Minified))]
    #[case(&["ninjagen", "graph"], None)]
    fn preset_override_parses(#[case] args: &[&str], #[case] expected: Option<Preset>) {
        let cli = Cli::try_parse_from(args).expect("parse");
        assert_eq!(cli.preset, expected);
    }

    #[test]
    fn dependency_gate_uses_kebab_case() {
        let cli = Cli::try_parse_from(["ninjagen", "--dependency-gate", "order-only"])
            .expect("parse");
        assert_eq!(cli.dependency_gate, Some(DependencyGate::OrderOnly));
    }

    #[test]
    fn unknown_preset_is_rejected() {
        assert!(Cli::try_parse_from(["ninjagen", "--preset", "fancy"]).is_err());
    }

    #[test]
    fn generate_accepts_output_file() {
        let cli = Cli::try_parse_from(["ninjagen", "-C", "site", "generate", "build.ninja"])
            .expect("parse");
        assert_eq!(cli.directory, Some(PathBuf::from("site")));
        assert_eq!(
            cli.command,
            Some(Commands::Generate {
                file: Some(PathBuf::from("build.ninja"))
            })
        );
    }
}
