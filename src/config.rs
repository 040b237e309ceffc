//! Generator configuration.
//!
//! All layout decisions (where sources live, where intermediate and final
//! artefacts go, which historical variant of the pipeline to emit) are held
//! in [`GenConfig`]. Values come from built-in defaults, then an optional
//! `ninjagen.toml` in the project root, then command-line overrides applied by
//! the runner.
//!
//! ```toml
//! preset = "legacy"
//! source_glob = "src/*.js"
//! data = ["election_2010", "election_2015"]
//!
//! [tools]
//! node_bin = "node_modules/.bin"
//! ```

use crate::rules::RULE_TABLE_VERSION;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::Dir};
use miette::Diagnostic;
use semver::{Version, VersionReq};
use serde::Deserialize;
use std::io;
use thiserror::Error;
use tracing::debug;

/// File name of the optional configuration file.
pub const CONFIG_FILE_NAME: &str = "ninjagen.toml";

/// Historical variants of the asset pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Bundle `src/main.js` and minify `src/index.html`.
    #[default]
    Minified,
    /// Compile a top-level `main.js` as the entry and copy `index.html`.
    Legacy,
}

impl Preset {
    /// Entry script compiled and handed to the bundler.
    #[must_use]
    pub fn entry(self) -> Utf8PathBuf {
        match self {
            Self::Minified => Utf8PathBuf::from("src/main.js"),
            Self::Legacy => Utf8PathBuf::from("main.js"),
        }
    }

    /// Template page published alongside the bundle.
    #[must_use]
    pub fn template(self) -> Utf8PathBuf {
        match self {
            Self::Minified => Utf8PathBuf::from("src/index.html"),
            Self::Legacy => Utf8PathBuf::from("index.html"),
        }
    }

    /// Name used on the command line and in `ninjagen.toml`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Minified => "minified",
            Self::Legacy => "legacy",
        }
    }

    /// Whether the template page is minified rather than copied.
    #[must_use]
    pub const fn minifies_template(self) -> bool {
        matches!(self, Self::Minified)
    }
}

/// How edges wait for the dependency marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyGate {
    /// List the marker after `|`: reinstalling packages rebuilds tool outputs.
    #[default]
    Implicit,
    /// List the marker after `||`: it only has to exist before the step runs.
    OrderOnly,
}

impl DependencyGate {
    /// Name used on the command line and in `ninjagen.toml`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Implicit => "implicit",
            Self::OrderOnly => "order-only",
        }
    }
}

/// Tool locations and flag sets referenced by the rule commands.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Directory holding installed package binaries.
    pub node_bin: String,
    /// Transpiler binary name under `node_bin`.
    pub babel: String,
    /// Bundler binary name under `node_bin`.
    pub browserify: String,
    /// HTML minifier binary name under `node_bin`.
    pub html_minify: String,
    /// Script minifier binary name under `node_bin`.
    pub uglifyjs: String,
    /// Project-local CSV to JSON converter script.
    pub csv_to_json: Utf8PathBuf,
    /// Flags passed to the script minifier.
    pub uglifyjs_flags: String,
    /// Flags passed to the HTML minifier.
    pub html_minify_flags: String,
    /// Command used by the `generate` rule to re-run this generator.
    pub ninjagen: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            node_bin: String::from("node_modules/.bin"),
            babel: String::from("babel"),
            browserify: String::from("browserify"),
            html_minify: String::from("html-minifier"),
            uglifyjs: String::from("uglifyjs"),
            csv_to_json: Utf8PathBuf::from("data/election_csv_to_json.js"),
            uglifyjs_flags: String::from("--compress --mangle"),
            html_minify_flags: String::from(
                "--collapse-whitespace --remove-comments --remove-optional-tags",
            ),
            ninjagen: String::from("ninjagen"),
        }
    }
}

/// Layout and pipeline settings for one project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenConfig {
    /// Rule table versions this configuration was written against.
    pub requires: Option<VersionReq>,
    /// Pipeline variant.
    pub preset: Preset,
    /// Glob selecting the scripts to transpile, relative to the project root.
    pub source_glob: String,
    /// Overrides the preset's entry script.
    pub entry: Option<Utf8PathBuf>,
    /// Overrides the preset's template page.
    pub template: Option<Utf8PathBuf>,
    /// Root for transpiled scripts and the bundle.
    pub intermediate_root: Utf8PathBuf,
    /// Root for published artefacts.
    pub artifact_root: Utf8PathBuf,
    /// Dependency manifest consumed by the installer.
    pub manifest: Utf8PathBuf,
    /// Sentinel file stamped once dependencies are installed.
    pub marker: Utf8PathBuf,
    /// Generated build description.
    pub build_file: Utf8PathBuf,
    /// How tool-invoking edges depend on the marker.
    pub dependency_gate: DependencyGate,
    /// File name of the bundle under the intermediate root.
    pub bundle_name: String,
    /// File name of the minified script under the artefact root.
    pub script_name: String,
    /// Directory holding the CSV data files.
    pub data_dir: Utf8PathBuf,
    /// Data sets converted from `<data_dir>/<name>.csv` to `<artifact_root>/<name>.json`.
    pub data: Vec<String>,
    /// Source module the converter loads through its compiled form.
    pub data_helper: Option<Utf8PathBuf>,
    /// Installed vendor files copied into the artefact root.
    pub vendor: Vec<Utf8PathBuf>,
    /// Tool locations and flags.
    pub tools: ToolConfig,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            requires: None,
            preset: Preset::default(),
            source_glob: String::from("src/*.js"),
            entry: None,
            template: None,
            intermediate_root: Utf8PathBuf::from("out"),
            artifact_root: Utf8PathBuf::from("docs"),
            manifest: Utf8PathBuf::from("package.json"),
            marker: Utf8PathBuf::from(".package.json.stamp"),
            build_file: Utf8PathBuf::from("build.ninja"),
            dependency_gate: DependencyGate::default(),
            bundle_name: String::from("bundle.js"),
            script_name: String::from("main.js"),
            data_dir: Utf8PathBuf::from("data"),
            data: vec![String::from("election_2010"), String::from("election_2015")],
            data_helper: Some(Utf8PathBuf::from("src/model.js")),
            vendor: vec![
                Utf8PathBuf::from("node_modules/bootstrap/dist/css/bootstrap.min.css"),
                Utf8PathBuf::from("node_modules/bootstrap/dist/css/bootstrap.min.css.map"),
            ],
            tools: ToolConfig::default(),
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read {path}")]
    #[diagnostic(code(ninjagen::config::read))]
    Read {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML or has unknown keys.
    #[error("failed to parse {path}")]
    #[diagnostic(code(ninjagen::config::parse))]
    Parse {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Underlying TOML error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// A field holds a value the generator cannot use.
    #[error("invalid `{field}`: {reason}")]
    #[diagnostic(code(ninjagen::config::invalid))]
    Invalid {
        /// Offending field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration pins a rule table version this build does not provide.
    #[error("configuration requires rule table {required}, but this generator provides {actual}")]
    #[diagnostic(
        code(ninjagen::config::version),
        help("update the `requires` range in ninjagen.toml or upgrade ninjagen")
    )]
    IncompatibleVersion {
        /// Requested version range.
        required: VersionReq,
        /// Version of the built-in rule table.
        actual: Version,
    },
}

impl GenConfig {
    /// Parse configuration from TOML text.
    ///
    /// `path` is only used for error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys, and
    /// any error reported by [`GenConfig::validate`].
    pub fn from_toml(text: &str, path: &Utf8Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source: Box::new(source),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `file` from `base`, falling back to defaults when it is absent.
    ///
    /// Returns the configuration and whether the file was present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but cannot be read,
    /// parsed, or validated.
    pub fn load(base: &Utf8Path, file: &Utf8Path) -> Result<(Self, bool), ConfigError> {
        let path = base.join(file);
        let read_error = |source| ConfigError::Read {
            path: path.clone(),
            source,
        };
        let dir = Dir::open_ambient_dir(base, ambient_authority()).map_err(read_error)?;
        match dir.read_to_string(file) {
            Ok(text) => {
                debug!(%path, "loaded configuration");
                Ok((Self::from_toml(&text, &path)?, true))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(%path, "no configuration file; using defaults");
                Ok((Self::default(), false))
            }
            Err(err) => Err(read_error(err)),
        }
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for empty or absolute layout paths and
    /// overlapping roots, and [`ConfigError::IncompatibleVersion`] when
    /// `requires` excludes the built-in rule table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(required) = &self.requires {
            let actual = Version::parse(RULE_TABLE_VERSION).map_err(|err| ConfigError::Invalid {
                field: "requires",
                reason: err.to_string(),
            })?;
            if !required.matches(&actual) {
                return Err(ConfigError::IncompatibleVersion {
                    required: required.clone(),
                    actual,
                });
            }
        }
        if self.source_glob.trim().is_empty() {
            return Err(invalid("source_glob", "pattern is empty"));
        }
        if Utf8Path::new(&self.source_glob).is_absolute() {
            return Err(invalid("source_glob", "pattern must be relative"));
        }
        for (field, path) in [
            ("intermediate_root", &self.intermediate_root),
            ("artifact_root", &self.artifact_root),
            ("manifest", &self.manifest),
            ("marker", &self.marker),
            ("build_file", &self.build_file),
        ] {
            require_relative(field, path)?;
        }
        // The minifier runs from the bundle's directory and reaches the
        // project root through a single `../`.
        if !matches!(
            self.intermediate_root.components().collect::<Vec<_>>().as_slice(),
            [Utf8Component::Normal(_)]
        ) {
            return Err(invalid(
                "intermediate_root",
                "must be a single directory below the project root",
            ));
        }
        if Utf8Path::new(&self.tools.node_bin).is_absolute() {
            return Err(invalid("tools.node_bin", "must be relative to the project root"));
        }
        if self.intermediate_root.starts_with(&self.artifact_root)
            || self.artifact_root.starts_with(&self.intermediate_root)
        {
            return Err(invalid(
                "artifact_root",
                "must not overlap the intermediate root",
            ));
        }
        for (field, name) in [
            ("bundle_name", &self.bundle_name),
            ("script_name", &self.script_name),
        ] {
            if name.is_empty() || name.contains('/') {
                return Err(invalid(field, "must be a bare file name"));
            }
        }
        if let Some(asset) = self.vendor.iter().find(|asset| asset.file_name().is_none()) {
            return Err(invalid("vendor", format!("{asset} does not name a file")));
        }
        if let Some(name) = self.data.iter().find(|name| name.is_empty()) {
            return Err(invalid("data", format!("empty data set name {name:?}")));
        }
        Ok(())
    }

    /// Entry script, honouring an explicit override.
    #[must_use]
    pub fn entry_point(&self) -> Utf8PathBuf {
        self.entry.clone().unwrap_or_else(|| self.preset.entry())
    }

    /// Template page, honouring an explicit override.
    #[must_use]
    pub fn template_page(&self) -> Utf8PathBuf {
        self.template.clone().unwrap_or_else(|| self.preset.template())
    }

    /// Roots whose paths must be produced by an edge before use.
    #[must_use]
    pub fn generated_roots(&self) -> [Utf8PathBuf; 3] {
        [
            self.intermediate_root.clone(),
            self.artifact_root.clone(),
            self.marker.clone(),
        ]
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn require_relative(field: &'static str, path: &Utf8Path) -> Result<(), ConfigError> {
    if path.as_str().is_empty() {
        Err(invalid(field, "path is empty"))
    } else if path.is_absolute() {
        Err(invalid(field, format!("{path} must be relative to the project root")))
    } else {
        Ok(())
    }
}

/// Find the project root for `start`.
///
/// Walks up from `start` to the nearest directory holding
/// [`CONFIG_FILE_NAME`], then to the nearest holding `manifest`. Falls back
/// to `start` itself.
#[must_use]
pub fn locate_root(start: &Utf8Path, manifest: &Utf8Path) -> Utf8PathBuf {
    let find = |marker: &Utf8Path| {
        start
            .ancestors()
            .find(|dir| dir.join(marker).is_file())
            .map(Utf8Path::to_path_buf)
    };
    find(Utf8Path::new(CONFIG_FILE_NAME))
        .or_else(|| find(manifest))
        .unwrap_or_else(|| start.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("utf-8 temp path")
    }

    #[test]
    fn defaults_match_the_published_layout() {
        let config = GenConfig::default();
        assert_eq!(config.entry_point(), "src/main.js");
        assert_eq!(config.template_page(), "src/index.html");
        assert_eq!(config.marker, ".package.json.stamp");
        config.validate().expect("defaults validate");
    }

    #[test]
    fn from_toml_reads_preset_and_tools() {
        let text = concat!(
            "preset = \"legacy\"\n",
            "dependency_gate = \"order-only\"\n",
            "data = [\"x\", \"y\"]\n",
            "[tools]\n",
            "node_bin = \"bin\"\n",
        );
        let config = GenConfig::from_toml(text, Utf8Path::new("ninjagen.toml")).expect("parse");
        assert_eq!(config.preset, Preset::Legacy);
        assert_eq!(config.dependency_gate, DependencyGate::OrderOnly);
        assert_eq!(config.entry_point(), "main.js");
        assert_eq!(config.data, vec![String::from("x"), String::from("y")]);
        assert_eq!(config.tools.node_bin, "bin");
        assert_eq!(config.tools.babel, "babel", "unset tools keep defaults");
    }

    #[test]
    fn from_toml_rejects_unknown_keys() {
        let err = GenConfig::from_toml("sources = \"*.js\"\n", Utf8Path::new("ninjagen.toml"))
            .expect_err("unknown key");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[rstest]
    #[case("source_glob = \"\"\n", "source_glob")]
    #[case("source_glob = \"/abs/*.js\"\n", "source_glob")]
    #[case("artifact_root = \"/srv/www\"\n", "artifact_root")]
    #[case("artifact_root = \"out\"\n", "artifact_root")]
    #[case("bundle_name = \"a/b.js\"\n", "bundle_name")]
    #[case("marker = \"\"\n", "marker")]
    #[case("intermediate_root = \"build/js\"\n", "intermediate_root")]
    #[case("intermediate_root = \"./out\"\n", "intermediate_root")]
    #[case("[tools]\nnode_bin = \"/usr/lib/node/bin\"\n", "tools.node_bin")]
    #[case("vendor = [\"node_modules/x/..\"]\n", "vendor")]
    fn validate_rejects_bad_layouts(#[case] text: &str, #[case] expected: &str) {
        let err = GenConfig::from_toml(text, Utf8Path::new("ninjagen.toml")).expect_err("invalid");
        match err {
            ConfigError::Invalid { field, .. } => assert_eq!(field, expected),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[rstest]
    #[case("^1", true)]
    #[case(">=1.0, <2", true)]
    #[case("^2", false)]
    fn requires_is_checked_against_rule_table(#[case] range: &str, #[case] ok: bool) {
        let text = format!("requires = \"{range}\"\n");
        let result = GenConfig::from_toml(&text, Utf8Path::new("ninjagen.toml"));
        if ok {
            result.expect("compatible range");
        } else {
            assert!(matches!(
                result,
                Err(ConfigError::IncompatibleVersion { .. })
            ));
        }
    }

    #[test]
    fn load_falls_back_to_defaults_when_absent() {
        let temp = tempdir().expect("temp dir");
        let (config, present) =
            GenConfig::load(&utf8(temp.path()), Utf8Path::new(CONFIG_FILE_NAME)).expect("load");
        assert!(!present);
        assert_eq!(config, GenConfig::default());
    }

    #[test]
    fn load_reads_file_relative_to_base() {
        let temp = tempdir().expect("temp dir");
        fs::write(temp.path().join(CONFIG_FILE_NAME), "preset = \"legacy\"\n").expect("write");
        let (config, present) =
            GenConfig::load(&utf8(temp.path()), Utf8Path::new(CONFIG_FILE_NAME)).expect("load");
        assert!(present);
        assert_eq!(config.preset, Preset::Legacy);
    }

    #[test]
    fn locate_root_prefers_config_over_manifest() {
        let temp = tempdir().expect("temp dir");
        let root = utf8(temp.path());
        let nested = root.join("app/src/deep");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(root.join(CONFIG_FILE_NAME), "").expect("config");
        fs::write(root.join("app/package.json"), "{}").expect("manifest");
        assert_eq!(locate_root(&nested, Utf8Path::new("package.json")), root);
    }

    #[test]
    fn locate_root_falls_back_to_manifest_then_start() {
        let temp = tempdir().expect("temp dir");
        let root = utf8(temp.path());
        let nested = root.join("app/src");
        fs::create_dir_all(&nested).expect("mkdir");
        assert_eq!(locate_root(&nested, Utf8Path::new("package.json")), nested);
        fs::write(root.join("app/package.json"), "{}").expect("manifest");
        assert_eq!(
            locate_root(&nested, Utf8Path::new("package.json")),
            root.join("app")
        );
    }
}
