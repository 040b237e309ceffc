//! Core IR types: rules, build edges and the ordered build graph.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::{IndexMap, IndexSet};
use miette::Diagnostic;
use thiserror::Error;

/// A named command template.
///
/// Rules are declared once and referenced by name from build edges. A rule
/// flagged as a generator produces the build description itself, which Ninja
/// treats specially when deciding whether to reload the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Unique identifier referenced by build edges.
    pub name: String,
    /// Shell command template using `$in`, `$out` and graph variables.
    pub command: String,
    /// Optional summary printed by the executor instead of the command.
    pub description: Option<String>,
    /// Whether the rule regenerates the build description.
    pub generator: bool,
}

impl Rule {
    /// Create an ordinary rule with no description.
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            description: None,
            generator: false,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the rule as a generator rule.
    #[must_use]
    pub const fn as_generator(mut self) -> Self {
        self.generator = true;
        self
    }
}

/// One transformation step in the build graph.
///
/// Explicit outputs and inputs become `$out` and `$in` in the rule's command.
/// Implicit outputs are produced alongside the explicit ones (a source map,
/// for instance). Implicit dependencies rebuild the edge when they change but
/// are not passed to the command; order-only dependencies only need to exist
/// before the edge runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEdge {
    /// Name of the rule invoked by this edge.
    pub rule: String,
    /// Outputs substituted for `$out`.
    pub explicit_outputs: Vec<Utf8PathBuf>,
    /// Additional outputs produced by the same invocation.
    pub implicit_outputs: Vec<Utf8PathBuf>,
    /// Inputs substituted for `$in`.
    pub inputs: Vec<Utf8PathBuf>,
    /// Dependencies listed after `|`.
    pub implicit_deps: Vec<Utf8PathBuf>,
    /// Dependencies listed after `||`.
    pub order_only_deps: Vec<Utf8PathBuf>,
}

impl BuildEdge {
    /// Create an edge producing `output` with `rule` and no inputs.
    #[must_use]
    pub fn new(rule: impl Into<String>, output: impl Into<Utf8PathBuf>) -> Self {
        Self {
            rule: rule.into(),
            explicit_outputs: vec![output.into()],
            implicit_outputs: Vec::new(),
            inputs: Vec::new(),
            implicit_deps: Vec::new(),
            order_only_deps: Vec::new(),
        }
    }

    /// Append an implicit output.
    #[must_use]
    pub fn with_implicit_output(mut self, output: impl Into<Utf8PathBuf>) -> Self {
        self.implicit_outputs.push(output.into());
        self
    }

    /// Append explicit inputs.
    #[must_use]
    pub fn with_inputs<I, P>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    /// Append implicit dependencies.
    #[must_use]
    pub fn with_implicit_deps<I, P>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.implicit_deps.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Append order-only dependencies.
    #[must_use]
    pub fn with_order_only_deps<I, P>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.order_only_deps.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Every output of the edge, explicit first.
    pub fn outputs(&self) -> impl Iterator<Item = &Utf8PathBuf> {
        self.explicit_outputs.iter().chain(&self.implicit_outputs)
    }

    /// Every path the edge depends on, in listing order.
    pub fn prerequisites(&self) -> impl Iterator<Item = &Utf8PathBuf> {
        self.inputs
            .iter()
            .chain(&self.implicit_deps)
            .chain(&self.order_only_deps)
    }

    /// Returns `true` when `path` appears among the edge's prerequisites.
    #[must_use]
    pub fn depends_on(&self, path: &Utf8Path) -> bool {
        self.prerequisites().any(|p| p == path)
    }

    fn display_name(&self) -> Utf8PathBuf {
        self.explicit_outputs.first().cloned().unwrap_or_default()
    }
}

/// Errors raised while assembling a [`BuildGraph`].
#[derive(Debug, Error, Diagnostic)]
pub enum IrGenError {
    /// An edge names a rule that was never declared.
    #[error("build edge for {output} references unknown rule '{rule}'")]
    #[diagnostic(code(ninjagen::ir::unknown_rule))]
    UnknownRule {
        /// Rule name referenced by the edge.
        rule: String,
        /// First output of the offending edge.
        output: Utf8PathBuf,
    },

    /// Two edges (or one edge twice) claim the same output.
    #[error("output {output} is declared by more than one build edge")]
    #[diagnostic(code(ninjagen::ir::duplicate_output))]
    DuplicateOutput {
        /// The contested output path.
        output: Utf8PathBuf,
    },

    /// A generated path is used before any edge produces it.
    #[error("{input}, needed by {output}, is not produced by an earlier build edge")]
    #[diagnostic(
        code(ninjagen::ir::undefined_input),
        help("declare the edge producing {input} before the edges that consume it")
    )]
    UndefinedInput {
        /// The missing generated path.
        input: Utf8PathBuf,
        /// First output of the consuming edge.
        output: Utf8PathBuf,
    },

    /// A regeneration argument cannot be written on one Ninja line.
    #[error("generator argument {argument:?} cannot be written to the build file")]
    #[diagnostic(
        code(ninjagen::ir::unrepresentable_argument),
        help("paths passed to ninjagen must not contain newlines or NUL bytes")
    )]
    UnrepresentableArgument {
        /// The rejected argument.
        argument: String,
    },

    /// An edge declares no explicit output.
    #[error("build edge using rule '{rule}' declares no outputs")]
    #[diagnostic(code(ninjagen::ir::empty_outputs))]
    EmptyOutputs {
        /// Rule name of the offending edge.
        rule: String,
    },
}

/// An ordered build graph: variables, rules and edges in declaration order.
#[derive(Debug, Clone, Default)]
pub struct BuildGraph {
    variables: IndexMap<String, String>,
    rules: IndexMap<String, Rule>,
    edges: Vec<BuildEdge>,
    producers: IndexMap<Utf8PathBuf, usize>,
    generated_roots: Vec<Utf8PathBuf>,
}

impl BuildGraph {
    /// Create an empty graph that treats paths under `roots` as generated.
    ///
    /// A generated path must be produced by an earlier edge before another
    /// edge may depend on it. Paths outside every root are primary sources.
    #[must_use]
    pub fn with_generated_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        Self {
            generated_roots: roots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Define (or redefine) a top-level variable.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Declare a rule, replacing any previous rule of the same name.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.insert(rule.name.clone(), rule);
    }

    /// Append a build edge after validating it against the graph so far.
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError`] when the edge has no outputs, references an
    /// undeclared rule, claims an output already produced, or depends on a
    /// generated path no earlier edge produces.
    pub fn push(&mut self, edge: BuildEdge) -> Result<(), IrGenError> {
        if edge.explicit_outputs.is_empty() {
            return Err(IrGenError::EmptyOutputs { rule: edge.rule });
        }
        if !self.rules.contains_key(&edge.rule) {
            return Err(IrGenError::UnknownRule {
                output: edge.display_name(),
                rule: edge.rule,
            });
        }
        let mut claimed = IndexSet::new();
        for output in edge.outputs() {
            if self.producers.contains_key(output) || !claimed.insert(output) {
                return Err(IrGenError::DuplicateOutput {
                    output: output.clone(),
                });
            }
        }
        if let Some(input) = edge
            .prerequisites()
            .find(|p| self.is_generated(p) && !self.producers.contains_key(*p))
        {
            return Err(IrGenError::UndefinedInput {
                input: input.clone(),
                output: edge.display_name(),
            });
        }

        let index = self.edges.len();
        for output in edge.outputs() {
            self.producers.insert(output.clone(), index);
        }
        tracing::debug!(rule = %edge.rule, output = %edge.display_name(), "added build edge");
        self.edges.push(edge);
        Ok(())
    }

    /// Variables in definition order.
    #[must_use]
    pub const fn variables(&self) -> &IndexMap<String, String> {
        &self.variables
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Edges in declaration order.
    #[must_use]
    pub fn edges(&self) -> &[BuildEdge] {
        &self.edges
    }

    /// Returns `true` when some edge produces `path`.
    #[must_use]
    pub fn produces(&self, path: &Utf8Path) -> bool {
        self.producers.contains_key(path)
    }

    /// The edge producing `path`, if any.
    #[must_use]
    pub fn producer(&self, path: &Utf8Path) -> Option<&BuildEdge> {
        self.producers
            .get(path)
            .and_then(|&index| self.edges.get(index))
    }

    /// Edges invoking the named rule, in declaration order.
    pub fn edges_for_rule<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a BuildEdge> {
        self.edges.iter().filter(move |edge| edge.rule == rule)
    }

    fn is_generated(&self, path: &Utf8Path) -> bool {
        self.generated_roots.iter().any(|root| path.starts_with(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn graph() -> BuildGraph {
        let mut graph = BuildGraph::with_generated_roots(["out", "docs", ".stamp"]);
        graph.add_rule(Rule::new("install", "npm install && touch $out"));
        graph.add_rule(Rule::new("babel", "$BABEL $in > $out"));
        graph
    }

    #[rstest]
    fn push_accepts_edges_in_dependency_order(mut graph: BuildGraph) {
        graph
            .push(BuildEdge::new("install", ".stamp").with_inputs(["package.json"]))
            .expect("install edge");
        graph
            .push(
                BuildEdge::new("babel", "out/src/a.js")
                    .with_inputs(["src/a.js"])
                    .with_implicit_deps([".stamp"]),
            )
            .expect("babel edge");
        assert_eq!(graph.edges().len(), 2);
        let producer = graph
            .producer(Utf8Path::new("out/src/a.js"))
            .expect("producer");
        assert_eq!(producer.rule, "babel");
    }

    #[rstest]
    fn push_rejects_unknown_rule(mut graph: BuildGraph) {
        let err = graph
            .push(BuildEdge::new("bundle", "out/bundle.js"))
            .expect_err("unknown rule");
        assert!(
            matches!(err, IrGenError::UnknownRule { ref rule, .. } if rule == "bundle"),
            "unexpected error: {err:?}"
        );
    }

    #[rstest]
    fn push_rejects_duplicate_outputs_across_edges(mut graph: BuildGraph) {
        graph
            .push(BuildEdge::new("babel", "out/a.js").with_inputs(["a.js"]))
            .expect("first edge");
        let err = graph
            .push(BuildEdge::new("babel", "out/a.js").with_inputs(["b.js"]))
            .expect_err("duplicate output");
        assert!(matches!(err, IrGenError::DuplicateOutput { .. }));
        assert_eq!(graph.edges().len(), 1, "rejected edge must not be recorded");
    }

    #[rstest]
    fn push_rejects_duplicate_outputs_within_edge(mut graph: BuildGraph) {
        let err = graph
            .push(BuildEdge::new("babel", "out/a.js").with_implicit_output("out/a.js"))
            .expect_err("duplicate output");
        assert!(matches!(err, IrGenError::DuplicateOutput { .. }));
    }

    #[rstest]
    #[case::explicit(BuildEdge::new("babel", "out/a.js").with_inputs(["out/z.js"]))]
    #[case::implicit(BuildEdge::new("babel", "out/a.js").with_implicit_deps([".stamp"]))]
    #[case::order_only(BuildEdge::new("babel", "out/a.js").with_order_only_deps(["docs/x"]))]
    fn push_rejects_undefined_generated_inputs(mut graph: BuildGraph, #[case] edge: BuildEdge) {
        let err = graph.push(edge).expect_err("undefined input");
        assert!(
            matches!(err, IrGenError::UndefinedInput { .. }),
            "unexpected error: {err:?}"
        );
    }

    #[rstest]
    fn push_accepts_primary_sources_outside_generated_roots(mut graph: BuildGraph) {
        graph
            .push(BuildEdge::new("babel", "out/a.js").with_inputs(["src/missing.js"]))
            .expect("primary sources need no producer");
    }

    #[rstest]
    fn push_rejects_edges_without_outputs(mut graph: BuildGraph) {
        let mut edge = BuildEdge::new("babel", "out/a.js");
        edge.explicit_outputs.clear();
        let err = graph.push(edge).expect_err("no outputs");
        assert!(matches!(err, IrGenError::EmptyOutputs { .. }));
    }

    #[test]
    fn generated_roots_match_whole_components() {
        let graph = BuildGraph::with_generated_roots(["out"]);
        assert!(graph.is_generated(Utf8Path::new("out/bundle.js")));
        assert!(graph.is_generated(Utf8Path::new("out")));
        assert!(!graph.is_generated(Utf8Path::new("outline.js")));
    }

    #[test]
    fn rule_builders_set_flags() {
        let rule = Rule::new("generate", "$NINJAGEN $NINJAGEN_ARGS generate $out")
            .with_description("REGENERATE $out")
            .as_generator();
        assert!(rule.generator);
        assert_eq!(rule.description.as_deref(), Some("REGENERATE $out"));
    }
}
