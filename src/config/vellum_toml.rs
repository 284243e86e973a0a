//! Parsing and validation for vellum.toml configuration files

use crate::error::ConfigError;
use crate::types::{GlobPattern, Level};
use globset::Glob;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration struct for vellum.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub vellum: VellumMeta,

    /// Per-rule overrides keyed by `Style.Rule`
    #[serde(default)]
    pub rules: BTreeMap<String, RuleValue>,

    /// Extension aliases, e.g. `mdx = "md"`
    #[serde(default)]
    pub formats: HashMap<String, String>,

    /// File glob to blueprint name
    #[serde(default)]
    pub blueprints: BTreeMap<String, String>,

    /// File glob to a custom `[start, end]` comment delimiter pair
    #[serde(default)]
    pub comment_delimiters: BTreeMap<String, Vec<String>>,

    /// File glob to patterns that should be treated as inline code
    #[serde(default)]
    pub token_ignores: BTreeMap<String, Vec<String>>,

    /// Attributes passed to asciidoctor (`YES` sets, `NO` unsets)
    #[serde(default)]
    pub asciidoctor: BTreeMap<String, String>,

    /// Directory the configuration was loaded from
    #[serde(skip)]
    pub root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            vellum: VellumMeta::default(),
            rules: BTreeMap::new(),
            formats: HashMap::new(),
            blueprints: BTreeMap::new(),
            comment_delimiters: BTreeMap::new(),
            token_ignores: BTreeMap::new(),
            asciidoctor: BTreeMap::new(),
            root: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Relative paths inside the file resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        config.root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.vellum.version != "1" {
            return Err(ConfigError::Validation(format!(
                "Unsupported configuration version '{}'. Expected '1'",
                self.vellum.version
            )));
        }

        for pattern in self.vellum.include.iter().chain(&self.vellum.exclude) {
            check_glob(pattern.as_str(), "file")?;
        }
        for glob in self.blueprints.keys() {
            check_glob(glob, "blueprint")?;
        }
        for glob in self.token_ignores.keys() {
            check_glob(glob, "token_ignores")?;
        }

        for (glob, pair) in &self.comment_delimiters {
            check_glob(glob, "comment_delimiters")?;
            if pair.len() != 2 || pair.iter().any(|d| d.is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "comment_delimiters for '{}' must name both a start and an end delimiter",
                    glob
                )));
            }
        }

        for (glob, patterns) in &self.token_ignores {
            for pattern in patterns {
                regex::Regex::new(pattern).map_err(|e| {
                    ConfigError::Validation(format!(
                        "Invalid token_ignores pattern '{}' for '{}': {}",
                        pattern, glob, e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// Style search paths, most specific first
    pub fn search_paths(&self) -> Vec<PathBuf> {
        std::iter::once(&self.vellum.styles_path)
            .chain(&self.vellum.search_paths)
            .map(|p| {
                if p.is_absolute() {
                    p.clone()
                } else {
                    self.root.join(p)
                }
            })
            .collect()
    }

    /// Locate `config/<kind>/<name>` on the search paths
    pub fn find_asset(&self, kind: &str, name: &str) -> Option<PathBuf> {
        self.search_paths()
            .into_iter()
            .map(|p| p.join("config").join(kind).join(name))
            .find(|p| p.is_file())
    }

    /// Level override configured for a rule, if any
    pub fn level_override(&self, rule: &str) -> Option<Level> {
        match self.rules.get(rule)? {
            RuleValue::Level(level) => Some(*level),
            RuleValue::Settings(settings) => settings.level,
            RuleValue::Enabled(_) => None,
        }
    }

    /// True when the rule is switched off with `"Style.Rule" = false`
    pub fn is_disabled(&self, rule: &str) -> bool {
        match self.rules.get(rule) {
            Some(RuleValue::Enabled(enabled)) => !enabled,
            Some(RuleValue::Settings(settings)) => settings.enabled == Some(false),
            _ => false,
        }
    }

    /// Blueprint name registered for `path`
    pub fn blueprint_for(&self, path: &Path) -> Option<&str> {
        self.blueprints
            .iter()
            .filter(|(glob, _)| glob_matches(glob, path))
            .map(|(_, name)| name.as_str())
            .last()
    }

    /// Custom comment delimiters for `path` as `(start, end)`
    pub fn comment_delimiters_for(&self, path: &Path) -> Option<(&str, &str)> {
        self.comment_delimiters
            .iter()
            .find(|(glob, _)| glob_matches(glob, path))
            .and_then(|(_, pair)| match pair.as_slice() {
                [start, end] => Some((start.as_str(), end.as_str())),
                _ => None,
            })
    }

    /// Token-ignore patterns that apply to `path`
    pub fn token_ignores_for(&self, path: &Path) -> Vec<&str> {
        self.token_ignores
            .iter()
            .filter(|(glob, _)| glob_matches(glob, path))
            .flat_map(|(_, patterns)| patterns.iter().map(String::as_str))
            .collect()
    }
}

fn check_glob(pattern: &str, what: &str) -> Result<(), ConfigError> {
    Glob::new(pattern).map(|_| ()).map_err(|e| {
        ConfigError::Validation(format!(
            "Invalid {} glob pattern '{}': {}",
            what, pattern, e
        ))
    })
}

fn glob_matches(pattern: &str, path: &Path) -> bool {
    Glob::new(pattern)
        .map(|g| g.compile_matcher().is_match(path))
        .unwrap_or(false)
}

/// `[vellum]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VellumMeta {
    /// Configuration version (must be "1")
    #[serde(default = "default_version")]
    pub version: String,

    /// Primary directory holding styles, relative to the config file
    #[serde(default = "default_styles_path")]
    pub styles_path: PathBuf,

    /// Extra style directories searched after `styles_path`
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Alerts below this level are dropped
    #[serde(default = "default_min_level")]
    pub min_alert_level: Level,

    /// Styles whose rules are all loaded
    #[serde(default)]
    pub based_on_styles: Vec<String>,

    /// Scopes that are never linted
    #[serde(default = "default_ignored_scopes")]
    pub ignored_scopes: Vec<String>,

    /// Block-level HTML tags skipped with their content
    #[serde(default = "default_skipped_scopes")]
    pub skipped_scopes: Vec<String>,

    /// File patterns to include
    #[serde(default = "default_include")]
    pub include: Vec<GlobPattern>,

    /// File patterns to exclude
    #[serde(default)]
    pub exclude: Vec<GlobPattern>,

    /// Rule filter: an expression, a path, or an asset under `config/filters`
    #[serde(default)]
    pub filter: Option<String>,

    /// Vocabularies under `config/vocabularies/<name>`
    #[serde(default)]
    pub vocab: Vec<String>,

    /// Accepted terms
    #[serde(default)]
    pub accept: Vec<String>,

    /// Rejected terms
    #[serde(default)]
    pub reject: Vec<String>,
}

impl Default for VellumMeta {
    fn default() -> Self {
        VellumMeta {
            version: default_version(),
            styles_path: default_styles_path(),
            search_paths: Vec::new(),
            min_alert_level: default_min_level(),
            based_on_styles: Vec::new(),
            ignored_scopes: default_ignored_scopes(),
            skipped_scopes: default_skipped_scopes(),
            include: default_include(),
            exclude: Vec::new(),
            filter: None,
            vocab: Vec::new(),
            accept: Vec::new(),
            reject: Vec::new(),
        }
    }
}

fn default_version() -> String {
    "1".to_string()
}

fn default_styles_path() -> PathBuf {
    PathBuf::from("styles")
}

fn default_min_level() -> Level {
    Level::Suggestion
}

fn default_ignored_scopes() -> Vec<String> {
    vec!["code".to_string(), "tt".to_string()]
}

fn default_skipped_scopes() -> Vec<String> {
    ["script", "style", "pre", "figure"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_include() -> Vec<GlobPattern> {
    vec![GlobPattern::new("**/*")]
}

/// A rule entry: on/off, a bare level, or a settings table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Enabled(bool),
    Level(Level),
    Settings(RuleSettings),
}

/// Settings table for an individual rule
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}
