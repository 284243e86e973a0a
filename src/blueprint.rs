#![forbid(unsafe_code)]

//! Blueprints: declarative scope to query mappings
//!
//! A blueprint is a YAML asset stored under
//! `<StylesPath>/config/blueprints/<Name>.yml`:
//!
//! ```yaml
//! engine: dasel
//! scopes:
//!   - name: title
//!     expr: .info.title
//!   - name: description
//!     expr: .info.description
//!     type: md
//! ```
//!
//! `steps` with `{scope, operation}` entries is accepted as an alias for
//! `scopes`. The `tree-sitter` engine turns each scope into a comment query;
//! `dasel` runs a [`selector::Selector`] over the parsed document; `command`
//! runs an external command with the file on stdin and reads a JSON array
//! of strings from its stdout.

pub mod selector;

use crate::code::QuerySpec;
use crate::error::{ConfigError, LintError};
use crate::transform::render::execute_with_input;
use crate::types::Format;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::LazyLock;

pub use selector::Selector;

static BLOCK_CHOMPING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w: )>(-?\s*)").expect("valid chomping regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    TreeSitter,
    Dasel,
    Command,
}

impl std::str::FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tree-sitter" => Ok(Engine::TreeSitter),
            "dasel" => Ok(Engine::Dasel),
            "command" => Ok(Engine::Command),
            other => Err(format!("unsupported engine '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawScope {
    #[serde(alias = "scope")]
    name: String,
    #[serde(alias = "operation")]
    expr: String,
    #[serde(default, rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct RawBlueprint {
    #[serde(default)]
    engine: String,
    #[serde(default)]
    scopes: Vec<RawScope>,
    #[serde(default)]
    steps: Vec<RawScope>,
}

/// One named query of a blueprint
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub expr: String,
    /// Sub-format of the extracted values (`md`, `rst`, ...); empty means plain
    pub kind: String,
    selector: Option<Selector>,
}

/// Values extracted by one step, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedValues {
    pub scope: String,
    pub format: Format,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Blueprint {
    pub name: String,
    pub engine: Engine,
    pub steps: Vec<Step>,
}

impl Blueprint {
    pub fn load(name: &str, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse(name, &text)
    }

    pub fn parse(name: &str, text: &str) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::Blueprint {
            name: name.to_string(),
            message,
        };

        let raw: RawBlueprint = serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;
        if raw.engine.is_empty() {
            return Err(invalid("missing engine".to_string()));
        }
        let engine: Engine = raw.engine.parse().map_err(invalid)?;

        let mut raw_steps = raw.scopes;
        raw_steps.extend(raw.steps);
        if raw_steps.is_empty() {
            return Err(invalid("missing queries".to_string()));
        }

        let steps = raw_steps
            .into_iter()
            .map(|s| {
                let selector = match engine {
                    Engine::Dasel => Some(
                        Selector::parse(&s.expr)
                            .map_err(|e| invalid(format!("{}: {e}", s.expr)))?,
                    ),
                    _ => None,
                };
                Ok(Step {
                    name: s.name,
                    expr: s.expr,
                    kind: s.kind,
                    selector,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Blueprint {
            name: name.to_string(),
            engine,
            steps,
        })
    }

    /// The steps as comment queries, for the tree-sitter engine
    pub fn queries(&self) -> Vec<QuerySpec> {
        self.steps
            .iter()
            .map(|s| QuerySpec::new(s.name.clone(), s.expr.clone()))
            .collect()
    }

    /// Extract every step's values from a structured file
    pub fn apply(
        &self,
        content: &str,
        real_ext: &str,
        path: &Path,
    ) -> Result<Vec<ScopedValues>, LintError> {
        match self.engine {
            Engine::Dasel => {
                let value = value_from_file(content, real_ext, path)?;
                Ok(self
                    .steps
                    .iter()
                    .map(|step| ScopedValues {
                        scope: step.name.clone(),
                        format: Format::from_step_type(&step.kind),
                        values: step
                            .selector
                            .as_ref()
                            .map(|s| s.select_strings(&value))
                            .unwrap_or_default(),
                    })
                    .collect())
            }
            Engine::Command => self
                .steps
                .iter()
                .map(|step| {
                    Ok(ScopedValues {
                        scope: step.name.clone(),
                        format: Format::from_step_type(&step.kind),
                        values: run_command(&step.expr, content)?,
                    })
                })
                .collect(),
            Engine::TreeSitter => Err(LintError::Selector {
                expr: self.name.clone(),
                message: "tree-sitter blueprints apply to code, not structured data".to_string(),
            }),
        }
    }
}

fn run_command(expr: &str, content: &str) -> Result<Vec<String>, LintError> {
    let mut words = expr.split_whitespace();
    let program = words.next().ok_or_else(|| LintError::Selector {
        expr: expr.to_string(),
        message: "empty command".to_string(),
    })?;
    let args: Vec<String> = words.map(String::from).collect();
    let stdout = execute_with_input(program, &args, content)?;
    serde_json::from_str(&stdout).map_err(|e| LintError::Selector {
        expr: expr.to_string(),
        message: format!("expected a JSON array of strings: {e}"),
    })
}

/// Parse a structured file into a generic tree keyed by its real extension
///
/// YAML folded scalars (`key: >`) are rewritten to literal ones first so
/// their line breaks survive and values can be found in the source.
pub fn value_from_file(content: &str, real_ext: &str, path: &Path) -> Result<Value, LintError> {
    let parse_error = |message: String| LintError::Parse {
        file: path.to_path_buf(),
        line: 1,
        message,
    };
    let text = BLOCK_CHOMPING.replace_all(content, "${1}|${2}");

    match real_ext.trim_start_matches('.') {
        "json" => serde_json::from_str(&text).map_err(|e| parse_error(e.to_string())),
        "yml" | "yaml" => serde_yaml::from_str(&text).map_err(|e| parse_error(e.to_string())),
        "toml" => toml::from_str(&text).map_err(|e| parse_error(e.to_string())),
        _ => Err(parse_error("unsupported file type".to_string())),
    }
}
