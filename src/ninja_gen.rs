//! Ninja file generator.
//!
//! This module converts a [`crate::ir::BuildGraph`] into the textual
//! representation expected by the Ninja build system. Variables, rules and
//! edges are written in declaration order, so the output is byte-identical
//! for identical graphs and no edge refers to an output before the edge that
//! produces it.

use crate::ir::{BuildEdge, BuildGraph, Rule};
use crate::rules::RULE_TABLE_VERSION;
use camino::Utf8PathBuf;
use itertools::Itertools;
use std::fmt::{self, Display, Formatter};

macro_rules! write_kv {
    ($f:expr, $key:expr, $opt:expr) => {
        if let Some(val) = $opt {
            writeln!($f, "  {} = {}", $key, val)?;
        }
    };
}

macro_rules! write_flag {
    ($f:expr, $key:expr, $cond:expr) => {
        if $cond {
            writeln!($f, "  {} = 1", $key)?;
        }
    };
}

/// Generate a Ninja build file as a string.
#[must_use]
pub fn generate(graph: &BuildGraph) -> String {
    DisplayGraph(graph).to_string()
}

/// Wrapper struct to display a complete graph.
struct DisplayGraph<'a>(&'a BuildGraph);

impl Display for DisplayGraph<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let graph = self.0;
        writeln!(
            f,
            "# Generated by ninjagen (rule table {RULE_TABLE_VERSION}). Do not edit."
        )?;
        writeln!(f)?;
        if !graph.variables().is_empty() {
            for (name, value) in graph.variables() {
                writeln!(f, "{name} = {value}")?;
            }
            writeln!(f)?;
        }
        for rule in graph.rules() {
            write!(f, "{}", DisplayRule(rule))?;
        }
        for edge in graph.edges() {
            write!(f, "{}", DisplayEdge(edge))?;
        }
        Ok(())
    }
}

/// Wrapper struct to display a rule block.
struct DisplayRule<'a>(&'a Rule);

impl Display for DisplayRule<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rule = self.0;
        writeln!(f, "rule {}", rule.name)?;
        writeln!(f, "  command = {}", rule.command)?;
        write_kv!(f, "description", &rule.description);
        write_flag!(f, "generator", rule.generator);
        writeln!(f)
    }
}

/// Wrapper struct to display a build edge.
struct DisplayEdge<'a>(&'a BuildEdge);

impl Display for DisplayEdge<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let edge = self.0;
        write!(f, "build {}", join(&edge.explicit_outputs))?;
        if !edge.implicit_outputs.is_empty() {
            write!(f, " | {}", join(&edge.implicit_outputs))?;
        }
        write!(f, ": {}", edge.rule)?;
        if !edge.inputs.is_empty() {
            write!(f, " {}", join(&edge.inputs))?;
        }
        if !edge.implicit_deps.is_empty() {
            write!(f, " | {}", join(&edge.implicit_deps))?;
        }
        if !edge.order_only_deps.is_empty() {
            write!(f, " || {}", join(&edge.order_only_deps))?;
        }
        writeln!(f)
    }
}

/// Convert a slice of paths into a space-separated, escaped string.
fn join(paths: &[Utf8PathBuf]) -> String {
    paths.iter().map(|p| escape_path(p.as_str())).join(" ")
}

/// Escape the characters Ninja treats specially in build-line paths.
fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for ch in path.chars() {
        if matches!(ch, '$' | ' ' | ':') {
            escaped.push('$');
        }
        escaped.push(ch);
    }
    escaped
}
