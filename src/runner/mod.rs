//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! resolves the project, builds the graph and writes the requested rendering.
//! Only rendered output goes to stdout; diagnostics go through `tracing`.

mod error;
mod file_io;
mod path_helpers;

pub use error::RunnerError;

use crate::cli::{Cli, Commands};
use crate::config::GenConfig;
use crate::discover::discover;
use crate::emit::{EmitContext, build_graph};
use crate::ir::BuildGraph;
use crate::rules::RuleKind;
use crate::{dot_gen, ninja_gen};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::path::Path;
use tracing::{debug, info};

use path_helpers::{graph_path, resolve_base_dir, resolve_config_location, resolve_output_path};

/// Wrapper around rendered output text.
#[derive(Debug, Clone)]
pub struct Rendered(String);
impl Rendered {
    /// Store the rendered text.
    #[must_use]
    pub const fn new(content: String) -> Self {
        Self(content)
    }
    /// Borrow the underlying text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A project root together with its effective configuration.
#[derive(Debug, Clone)]
pub struct Project {
    /// Absolute project root; every graph path is relative to it.
    pub root: Utf8PathBuf,
    /// Configuration after file and command-line overrides.
    pub config: GenConfig,
    /// Configuration file as referenced from the build file, when present.
    pub config_file: Option<Utf8PathBuf>,
    /// Options the regeneration edge passes back to `ninjagen`.
    pub generator_args: Vec<String>,
}

impl Project {
    /// Resolve the root and configuration described by `cli`.
    ///
    /// # Errors
    ///
    /// Returns an error when a path is not UTF-8 or the configuration cannot
    /// be read, parsed, or validated.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let root = resolve_base_dir(cli)?;
        let location = resolve_config_location(cli, &root)?;
        let (mut config, present) = GenConfig::load(&location.dir, &location.file)
            .with_context(|| format!("loading configuration for project {root}"))?;
        if let Some(preset) = cli.preset {
            config.preset = preset;
        }
        if let Some(gate) = cli.dependency_gate {
            config.dependency_gate = gate;
        }
        config.validate().context("validating configuration")?;
        debug!(%root, preset = ?config.preset, gate = ?config.dependency_gate, "resolved project");
        let generator_args = generator_args(cli, &location.reference);
        Ok(Self {
            root,
            config,
            config_file: present.then_some(location.reference),
            generator_args,
        })
    }

    /// Discover sources and build the graph.
    ///
    /// # Errors
    ///
    /// Returns an error when discovery fails or the configuration makes two
    /// edges collide.
    pub fn graph(&self) -> Result<BuildGraph> {
        self.graph_for(None)
    }

    /// Build the graph whose regeneration edge rewrites `build_file`.
    ///
    /// `None` falls back to the configured build file.
    ///
    /// # Errors
    ///
    /// Returns an error when discovery fails, the configuration makes two
    /// edges collide, or a regeneration argument cannot be quoted.
    pub fn graph_for(&self, build_file: Option<&Utf8Path>) -> Result<BuildGraph> {
        let sources = discover(&self.root, &self.config.source_glob)
            .with_context(|| format!("discovering sources in {}", self.root))?;
        let mut ctx = EmitContext::new(&self.config).with_generator_args(&self.generator_args);
        if let Some(file) = &self.config_file {
            ctx = ctx.with_generator_input(file);
        }
        if let Some(file) = build_file {
            ctx = ctx.with_build_file(file);
        }
        let graph = build_graph(ctx, &sources).context("building the graph")?;
        info!(
            sources = sources.len(),
            edges = graph.edges().len(),
            "built graph"
        );
        Ok(graph)
    }
}

/// Execute the parsed [`Cli`] command.
///
/// # Errors
///
/// Returns an error if the project cannot be resolved, the graph cannot be
/// built, or the output cannot be written.
pub fn run(cli: &Cli) -> Result<()> {
    let command = cli
        .command
        .clone()
        .unwrap_or(Commands::Generate { file: None });
    match command {
        Commands::Generate { file } => {
            let project = Project::resolve(cli)?;
            let target = match file.as_deref() {
                Some(path) if !file_io::is_stdout_path(path) => {
                    Some(resolve_output_path(&project.root, path)?)
                }
                _ => None,
            };
            let build_file = target.as_deref().map(|path| graph_path(&project.root, path));
            let ninja = Rendered::new(ninja_gen::generate(
                &project.graph_for(build_file.as_deref())?,
            ));
            match target {
                Some(path) => file_io::write_file(&path, &ninja),
                None => file_io::write_stdout(&ninja),
            }
        }
        Commands::Graph { file } => {
            let project = Project::resolve(cli)?;
            let dot = Rendered::new(dot_gen::generate(&project.graph()?));
            write_output(&project, file.as_deref(), &dot)
        }
        Commands::Rules => file_io::write_stdout(&Rendered::new(rule_listing())),
    }
}

fn write_output(project: &Project, file: Option<&Path>, content: &Rendered) -> Result<()> {
    match file {
        Some(path) if !file_io::is_stdout_path(path) => {
            let output = resolve_output_path(&project.root, path)?;
            file_io::write_file(&output, content)
        }
        _ => file_io::write_stdout(content),
    }
}

/// Options that make a regeneration run rebuild the same graph.
///
/// The project root and configuration file are always pinned. Preset and
/// gate are passed only when given on the command line so later edits to
/// the configuration file still take effect.
fn generator_args(cli: &Cli, config_reference: &Utf8Path) -> Vec<String> {
    let mut args = vec![
        "-C".to_owned(),
        ".".to_owned(),
        "--config".to_owned(),
        config_reference.to_string(),
    ];
    if let Some(preset) = cli.preset {
        args.extend(["--preset".to_owned(), preset.name().to_owned()]);
    }
    if let Some(gate) = cli.dependency_gate {
        args.extend(["--dependency-gate".to_owned(), gate.name().to_owned()]);
    }
    args
}

/// Format the rule catalogue, one rule per line: name, generator flag, command.
#[must_use]
pub fn rule_listing() -> String {
    let width = RuleKind::ALL
        .iter()
        .map(|kind| kind.name().len())
        .max()
        .unwrap_or_default();
    RuleKind::ALL
        .iter()
        .map(|kind| {
            let flag = if kind.is_generator() { "generator" } else { "-" };
            format!("{:<width$}  {flag:<9}  {}\n", kind.name(), kind.command())
        })
        .collect()
}
