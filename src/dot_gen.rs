//! Graphviz rendering of a [`BuildGraph`].
//!
//! Files become box nodes and each build edge becomes an ellipse node named
//! after its rule, linked from its inputs and to its outputs. Implicit
//! dependencies are dashed and order-only dependencies dotted, so the picture
//! shows which prerequisites trigger rebuilds.

use crate::ir::{BuildEdge, BuildGraph};
use camino::Utf8PathBuf;
use indexmap::IndexSet;
use std::fmt::{self, Display, Formatter};

/// Render `graph` as a DOT digraph.
#[must_use]
pub fn generate(graph: &BuildGraph) -> String {
    DisplayDot(graph).to_string()
}

struct DisplayDot<'a>(&'a BuildGraph);

impl Display for DisplayDot<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let graph = self.0;
        let files: IndexSet<&Utf8PathBuf> = graph
            .edges()
            .iter()
            .flat_map(|edge| edge.prerequisites().chain(edge.outputs()))
            .collect();

        writeln!(f, "digraph ninjagen {{")?;
        writeln!(f, "  rankdir=\"LR\";")?;
        writeln!(f, "  node [fontsize=10, shape=box, height=0.25];")?;
        for file in &files {
            writeln!(f, "  {};", quote(file.as_str()))?;
        }
        for (index, edge) in graph.edges().iter().enumerate() {
            write_edge(f, index, edge)?;
        }
        writeln!(f, "}}")
    }
}

fn write_edge(f: &mut Formatter<'_>, index: usize, edge: &BuildEdge) -> fmt::Result {
    let node = format!("\"edge{index}\"");
    writeln!(
        f,
        "  {node} [label={}, shape=ellipse];",
        quote(&edge.rule)
    )?;
    for input in &edge.inputs {
        writeln!(f, "  {} -> {node};", quote(input.as_str()))?;
    }
    for dep in &edge.implicit_deps {
        writeln!(f, "  {} -> {node} [style=dashed];", quote(dep.as_str()))?;
    }
    for dep in &edge.order_only_deps {
        writeln!(f, "  {} -> {node} [style=dotted];", quote(dep.as_str()))?;
    }
    for output in edge.outputs() {
        writeln!(f, "  {node} -> {};", quote(output.as_str()))?;
    }
    Ok(())
}

/// Quote an identifier for DOT, escaping embedded quotes and backslashes.
fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        if matches!(ch, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}
