//! Graph emitter.
//!
//! Maps a [`SourceSet`] and a [`GenConfig`] onto the rule catalogue,
//! producing a [`BuildGraph`] whose edges are declared in dependency order:
//!
//! 1. regenerate the build description from the generator configuration;
//! 2. install dependencies, stamping the marker;
//! 3. transpile every source (and the entry script);
//! 4. bundle the transpiled entry, depending on every other transpiled module;
//! 5. minify the bundle into the published script and its source map;
//! 6. convert each data set from CSV to JSON;
//! 7. publish the template page and vendor assets.
//!
//! Every edge running an installed tool waits on the dependency marker.

use crate::config::{DependencyGate, GenConfig};
use crate::discover::SourceSet;
use crate::ir::{BuildEdge, BuildGraph, IrGenError};
use crate::rules::{self, RuleKind};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

/// Inputs to graph construction besides the discovered sources.
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    /// Layout and pipeline settings.
    pub config: &'a GenConfig,
    /// Generator configuration file to list as the `generate` input, if it
    /// exists.
    pub generator_input: Option<&'a Utf8Path>,
    /// Where the rendered graph is written, when not `config.build_file`.
    pub build_file: Option<&'a Utf8Path>,
    /// Options the `generate` rule passes back to the generator.
    pub generator_args: &'a [String],
}

impl<'a> EmitContext<'a> {
    /// Context with no generator input and no regeneration options.
    #[must_use]
    pub const fn new(config: &'a GenConfig) -> Self {
        Self {
            config,
            generator_input: None,
            build_file: None,
            generator_args: &[],
        }
    }

    /// List `path` as the input of the regeneration edge.
    #[must_use]
    pub const fn with_generator_input(mut self, path: &'a Utf8Path) -> Self {
        self.generator_input = Some(path);
        self
    }

    /// Make the regeneration edge produce `path`.
    #[must_use]
    pub const fn with_build_file(mut self, path: &'a Utf8Path) -> Self {
        self.build_file = Some(path);
        self
    }

    /// Re-run the generator with `args` when regenerating.
    #[must_use]
    pub const fn with_generator_args(mut self, args: &'a [String]) -> Self {
        self.generator_args = args;
        self
    }
}

/// Build the complete graph for `sources`.
///
/// An empty source set still yields every terminal artefact: the entry
/// script is always compiled and bundled on its own.
///
/// # Errors
///
/// Returns [`IrGenError`] when the configuration makes two edges claim the
/// same output (for example a vendor file named like the published script),
/// or a generator argument cannot be written to the build file.
pub fn build_graph(ctx: EmitContext<'_>, sources: &SourceSet) -> Result<BuildGraph, IrGenError> {
    let mut emitter = Emitter::new(ctx.config);
    emitter
        .graph
        .set_variable(rules::GENERATOR_ARGS, command_line(ctx.generator_args)?);
    emitter.regenerate(ctx.build_file, ctx.generator_input)?;
    emitter.install()?;
    let transpiled = emitter.transpile(sources)?;
    let bundle = emitter.bundle(&transpiled)?;
    emitter.minify(&bundle)?;
    emitter.convert_data(sources)?;
    emitter.publish_static()?;
    Ok(emitter.finish())
}

/// Shell-quote `args` into one Ninja variable value.
fn command_line(args: &[String]) -> Result<String, IrGenError> {
    let unrepresentable = |arg: &String| IrGenError::UnrepresentableArgument {
        argument: arg.clone(),
    };
    let mut quoted = Vec::with_capacity(args.len());
    for arg in args {
        if arg.contains(['\n', '\r']) {
            return Err(unrepresentable(arg));
        }
        let word = shlex::try_quote(arg).map_err(|_| unrepresentable(arg))?;
        quoted.push(word.replace('$', "$$"));
    }
    Ok(quoted.join(" "))
}

/// Output of the transpile step.
struct Transpiled {
    entry: Utf8PathBuf,
    modules: Vec<Utf8PathBuf>,
}

struct Emitter<'a> {
    config: &'a GenConfig,
    graph: BuildGraph,
}

impl<'a> Emitter<'a> {
    fn new(config: &'a GenConfig) -> Self {
        let mut graph = BuildGraph::with_generated_roots(config.generated_roots());
        for (name, value) in rules::variables(&config.tools) {
            graph.set_variable(name, value);
        }
        for rule in rules::catalogue() {
            graph.add_rule(rule);
        }
        Self { config, graph }
    }

    fn finish(self) -> BuildGraph {
        self.graph
    }

    /// Gate an edge on the dependency marker.
    fn gated(&self, edge: BuildEdge) -> BuildEdge {
        let marker = [self.config.marker.clone()];
        match self.config.dependency_gate {
            DependencyGate::Implicit => edge.with_implicit_deps(marker),
            DependencyGate::OrderOnly => edge.with_order_only_deps(marker),
        }
    }

    fn push(&mut self, edge: BuildEdge) -> Result<(), IrGenError> {
        self.graph.push(edge)
    }

    fn regenerate(
        &mut self,
        output: Option<&Utf8Path>,
        input: Option<&Utf8Path>,
    ) -> Result<(), IrGenError> {
        let config = self.config;
        let output = output.unwrap_or(&config.build_file);
        let edge = BuildEdge::new(RuleKind::Generate.name(), output)
            .with_inputs(input.map(Utf8Path::to_path_buf));
        self.push(edge)
    }

    fn install(&mut self) -> Result<(), IrGenError> {
        let edge = BuildEdge::new(RuleKind::Install.name(), self.config.marker.clone())
            .with_inputs([self.config.manifest.clone()]);
        self.push(edge)
    }

    fn transpiled_path(&self, source: &Utf8Path) -> Utf8PathBuf {
        self.config.intermediate_root.join(source)
    }

    fn transpile(&mut self, sources: &SourceSet) -> Result<Transpiled, IrGenError> {
        let entry_source = self.config.entry_point();
        let mut modules = Vec::with_capacity(sources.len());
        for source in sources {
            let output = self.transpiled_path(source);
            self.push_transpile(source, &output)?;
            if *source != entry_source {
                modules.push(output);
            }
        }
        let entry = self.transpiled_path(&entry_source);
        if !sources.contains(&entry_source) {
            debug!(entry = %entry_source, "entry script is outside the source set");
            self.push_transpile(&entry_source, &entry)?;
        }
        Ok(Transpiled { entry, modules })
    }

    fn push_transpile(&mut self, source: &Utf8Path, output: &Utf8Path) -> Result<(), IrGenError> {
        let edge = self.gated(BuildEdge::new(RuleKind::Babel.name(), output).with_inputs([source]));
        self.push(edge)
    }

    fn bundle(&mut self, transpiled: &Transpiled) -> Result<Utf8PathBuf, IrGenError> {
        let output = self.config.intermediate_root.join(&self.config.bundle_name);
        let edge = self.gated(
            BuildEdge::new(RuleKind::Bundle.name(), output.clone())
                .with_inputs([transpiled.entry.clone()])
                .with_implicit_deps(transpiled.modules.iter().cloned()),
        );
        self.push(edge)?;
        Ok(output)
    }

    fn minify(&mut self, bundle: &Utf8Path) -> Result<(), IrGenError> {
        let script = self.config.artifact_root.join(&self.config.script_name);
        let map = Utf8PathBuf::from(format!("{script}.map"));
        let edge = self.gated(
            BuildEdge::new(RuleKind::Ugly.name(), script)
                .with_implicit_output(map)
                .with_inputs([bundle]),
        );
        self.push(edge)
    }

    fn convert_data(&mut self, sources: &SourceSet) -> Result<(), IrGenError> {
        let config = self.config;
        let helper = config.data_helper.as_deref().and_then(|helper| {
            if sources.contains(helper) {
                Some(self.transpiled_path(helper))
            } else {
                warn!(%helper, "data helper is not a discovered source; omitting dependency");
                None
            }
        });
        for name in &config.data {
            let csv = config.data_dir.join(format!("{name}.csv"));
            let json = config.artifact_root.join(format!("{name}.json"));
            let edge = self
                .gated(BuildEdge::new(RuleKind::CsvToJson.name(), json).with_inputs([csv]))
                .with_implicit_deps([config.tools.csv_to_json.clone()])
                .with_implicit_deps(helper.clone());
            self.push(edge)?;
        }
        Ok(())
    }

    fn publish_static(&mut self) -> Result<(), IrGenError> {
        let config = self.config;
        let template = config.template_page();
        let page_name = template.file_name().unwrap_or("index.html");
        let page = config.artifact_root.join(page_name);
        let edge = if config.preset.minifies_template() {
            self.gated(BuildEdge::new(RuleKind::HtmlMinify.name(), page).with_inputs([template]))
        } else {
            BuildEdge::new(RuleKind::Copy.name(), page).with_inputs([template])
        };
        self.push(edge)?;

        for asset in &config.vendor {
            let Some(name) = asset.file_name() else {
                continue;
            };
            let output = config.artifact_root.join(name);
            let edge =
                self.gated(BuildEdge::new(RuleKind::Copy.name(), output).with_inputs([asset]));
            self.push(edge)?;
        }
        Ok(())
    }
}
