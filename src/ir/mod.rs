//! Intermediate Representation structures.
//!
//! This module defines the build graph assembled by [`crate::emit`] before it
//! is rendered. The IR mirrors the conceptual model of Ninja (variables, rules
//! and build edges) without embedding any Ninja-specific syntax; escaping and
//! layout belong to [`crate::ninja_gen`].
//!
//! Unlike a manifest-driven graph, edges are kept in the order they were
//! declared. [`BuildGraph::push`] validates each edge against everything
//! declared before it, so a graph that exists is a graph whose listing never
//! references an output before the edge producing it.
//!
//! # Examples
//!
//! ```
//! use ninjagen::ir::{BuildEdge, BuildGraph, Rule};
//! use camino::Utf8PathBuf;
//!
//! let mut graph = BuildGraph::default();
//! graph.add_rule(Rule::new("copy", "cp $in $out"));
//! graph
//!     .push(BuildEdge::new("copy", "docs/app.css").with_inputs(["app.css"]))
//!     .expect("valid edge");
//! assert_eq!(graph.edges().len(), 1);
//! assert!(graph.produces(&Utf8PathBuf::from("docs/app.css")));
//! ```

mod graph;

pub use graph::{BuildEdge, BuildGraph, IrGenError, Rule};
