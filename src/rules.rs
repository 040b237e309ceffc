//! The fixed rule catalogue.
//!
//! Every transformation the generated graph can perform is a [`RuleKind`].
//! The catalogue is data only: each kind maps to a command template that
//! refers to `$in`, `$out` and the tool variables from [`ToolConfig`], and is
//! executed by Ninja rather than by this crate.

use crate::config::ToolConfig;
use crate::ir::Rule;
use indexmap::IndexMap;

/// Version of the rule catalogue.
///
/// Bump the major version whenever a rule is renamed or its command changes
/// shape in a way that breaks an existing `build.ninja`.
pub const RULE_TABLE_VERSION: &str = "1.0.0";

/// Variable holding the options the `generate` rule passes back to the
/// generator, so a regenerated graph is built with the same settings.
pub const GENERATOR_ARGS: &str = "NINJAGEN_ARGS";

/// A kind of transformation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Regenerate the build description itself.
    Generate,
    /// Install external packages and stamp the dependency marker.
    Install,
    /// Transpile one script.
    Babel,
    /// Bundle a module graph into one file.
    Bundle,
    /// Minify the bundle, producing a companion source map.
    Ugly,
    /// Convert one CSV file into JSON.
    CsvToJson,
    /// Minify an HTML page.
    HtmlMinify,
    /// Copy a file verbatim.
    Copy,
}

impl RuleKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Generate,
        Self::Install,
        Self::Babel,
        Self::Bundle,
        Self::Ugly,
        Self::CsvToJson,
        Self::HtmlMinify,
        Self::Copy,
    ];

    /// Name used in the rendered graph.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Install => "install",
            Self::Babel => "babel",
            Self::Bundle => "bundle",
            Self::Ugly => "ugly",
            Self::CsvToJson => "csv_to_json",
            Self::HtmlMinify => "html_minify",
            Self::Copy => "copy",
        }
    }

    /// Command template for the kind.
    #[must_use]
    pub const fn command(self) -> &'static str {
        match self {
            Self::Generate => "$NINJAGEN $NINJAGEN_ARGS generate $out",
            Self::Install => "npm install && touch $out",
            Self::Babel => "$BABEL $in > $out",
            Self::Bundle => "$BROWSERIFY --debug $in > $out",
            // uglifyjs writes the map's `sources` relative to its working
            // directory, so run it from the bundle's directory.
            Self::Ugly => concat!(
                "cd `dirname $in` && ../$UGLIFYJS `basename $in` -o ../$out",
                " --in-source-map inline --source-map ../$out.map",
                " --source-map-includeSources $UGLIFYJS_FLAGS"
            ),
            Self::CsvToJson => "$CSV_TO_JSON $in > $out",
            Self::HtmlMinify => "$HTML_MINIFY $HTML_MINIFY_FLAGS $in > $out",
            Self::Copy => "cp $in $out",
        }
    }

    /// Summary printed by Ninja while the step runs.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Generate => "REGENERATE $out",
            Self::Install => "INSTALL $in",
            Self::Babel => "BABEL $out",
            Self::Bundle => "BUNDLE $out",
            Self::Ugly => "UGLIFY $out",
            Self::CsvToJson => "CSV_TO_JSON $out",
            Self::HtmlMinify => "HTML_MINIFY $out",
            Self::Copy => "COPY $out",
        }
    }

    /// Whether the kind regenerates the build description.
    #[must_use]
    pub const fn is_generator(self) -> bool {
        matches!(self, Self::Generate)
    }

    /// Whether the step runs a tool installed by the `install` rule.
    ///
    /// Edges of these kinds must be gated on the dependency marker. `copy` is
    /// not listed: only copies of installed vendor files need the marker, and
    /// the emitter decides that per edge.
    #[must_use]
    pub const fn needs_installed_tools(self) -> bool {
        matches!(
            self,
            Self::Babel | Self::Bundle | Self::Ugly | Self::CsvToJson | Self::HtmlMinify
        )
    }

    /// Look up a kind by its rendered name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Build the IR rule for this kind.
    #[must_use]
    pub fn to_rule(self) -> Rule {
        let rule = Rule::new(self.name(), self.command()).with_description(self.description());
        if self.is_generator() {
            rule.as_generator()
        } else {
            rule
        }
    }
}

/// Every rule in the catalogue, in declaration order.
#[must_use]
pub fn catalogue() -> Vec<Rule> {
    RuleKind::ALL.into_iter().map(RuleKind::to_rule).collect()
}

/// Variables referenced by the command templates.
///
/// Tool paths are written relative to `NODE_BIN` so relocating the installed
/// packages only touches one line of the rendered graph.
#[must_use]
pub fn variables(tools: &ToolConfig) -> IndexMap<&'static str, String> {
    let mut vars = IndexMap::new();
    vars.insert("NODE_BIN", tools.node_bin.clone());
    vars.insert("BABEL", format!("${{NODE_BIN}}/{}", tools.babel));
    vars.insert("BROWSERIFY", format!("${{NODE_BIN}}/{}", tools.browserify));
    vars.insert("HTML_MINIFY", format!("${{NODE_BIN}}/{}", tools.html_minify));
    vars.insert("UGLIFYJS", format!("${{NODE_BIN}}/{}", tools.uglifyjs));
    vars.insert("CSV_TO_JSON", tools.csv_to_json.to_string());
    vars.insert("UGLIFYJS_FLAGS", tools.uglifyjs_flags.clone());
    vars.insert("HTML_MINIFY_FLAGS", tools.html_minify_flags.clone());
    vars.insert("NINJAGEN", tools.ninjagen.clone());
    vars.insert(GENERATOR_ARGS, String::new());
    vars
}
