#![forbid(unsafe_code)]

//! YAML rule definitions
//!
//! A rule file carries a handful of common fields (`extends`, `message`,
//! `level`, `scope`, ...) plus fields specific to its check type. The common
//! part is read first; `extends` then picks the typed [`CheckKind`] the rest
//! of the document is deserialized into.

use crate::error::RuleError;
use crate::types::{Level, ScopeSet, Selector};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Common {
    extends: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    level: Option<Level>,
    #[serde(default)]
    scope: Option<OneOrMany>,
    #[serde(default)]
    pos: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExistenceSpec {
    pub tokens: Vec<String>,
    pub raw: Vec<String>,
    pub ignorecase: bool,
    pub nonword: bool,
    pub exceptions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubstitutionSpec {
    pub swap: BTreeMap<String, String>,
    pub ignorecase: bool,
    pub nonword: bool,
    pub exceptions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OccurrenceSpec {
    pub token: String,
    pub max: Option<usize>,
    pub min: Option<usize>,
    pub ignorecase: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RepetitionSpec {
    pub tokens: Vec<String>,
    pub alpha: bool,
    pub ignorecase: bool,
    pub exceptions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CapitalizationSpec {
    #[serde(rename = "match")]
    pub pattern: String,
    pub exceptions: Vec<String>,
}

/// The check-specific half of a definition, discriminated by `extends`
#[derive(Debug, Clone)]
pub enum CheckKind {
    Existence(ExistenceSpec),
    Substitution(SubstitutionSpec),
    Occurrence(OccurrenceSpec),
    Repetition(RepetitionSpec),
    Capitalization(CapitalizationSpec),
    /// Check types implemented by an [`NlpProvider`](super::NlpProvider);
    /// the raw document is kept for it to interpret
    Delegated(serde_yaml::Value),
}

/// A parsed rule
#[derive(Debug, Clone)]
pub struct Definition {
    /// `Style.Rule`
    pub name: String,
    pub extends: String,
    pub level: Level,
    pub scope: ScopeSet,
    pub message: String,
    pub description: String,
    pub link: String,
    pub pos: String,
    /// File the rule was read from; `None` for built-in rules
    pub path: Option<PathBuf>,
    pub kind: CheckKind,
}

impl Definition {
    /// Read a rule file; the rule is named `Style.File` after its location
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        let name = rule_name(path).ok_or_else(|| RuleError::InvalidDefinition {
            name: path.display().to_string(),
            message: "rule files live at <style>/<rule>.yml".to_string(),
        })?;
        let source = std::fs::read_to_string(path).map_err(|e| RuleError::InvalidDefinition {
            name: name.clone(),
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let mut definition = Self::parse(&name, &source)?;
        definition.path = Some(path.to_path_buf());
        Ok(definition)
    }

    pub fn parse(name: &str, source: &str) -> Result<Self, RuleError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(source).map_err(|e| invalid(name, e.to_string()))?;
        Self::from_value(name, value)
    }

    pub fn from_value(name: &str, value: serde_yaml::Value) -> Result<Self, RuleError> {
        let common: Common =
            serde_yaml::from_value(value.clone()).map_err(|e| invalid(name, e.to_string()))?;

        let kind = match common.extends.as_str() {
            "existence" => CheckKind::Existence(typed(name, value)?),
            "substitution" => CheckKind::Substitution(typed(name, value)?),
            "occurrence" => CheckKind::Occurrence(typed(name, value)?),
            "repetition" => CheckKind::Repetition(typed(name, value)?),
            "capitalization" => CheckKind::Capitalization(typed(name, value)?),
            "sequence" | "spelling" | "consistency" | "conditional" | "metric" | "readability"
            | "script" => CheckKind::Delegated(value),
            other => return Err(invalid(name, format!("unknown check type '{other}'"))),
        };

        if common.message.is_empty() {
            return Err(invalid(name, "missing 'message'".to_string()));
        }

        let scope = common
            .scope
            .map(OneOrMany::into_vec)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| vec!["text".to_string()]);

        Ok(Definition {
            name: name.to_string(),
            extends: common.extends,
            level: common.level.unwrap_or_default(),
            scope: ScopeSet::new(scope.into_iter().map(Selector::new).collect()),
            message: common.message,
            description: common.description,
            link: common.link,
            pos: common.pos.unwrap_or_default(),
            path: None,
            kind,
        })
    }

    /// POS tagging is needed by sequence rules and rules with a `pos` pattern
    pub fn needs_tagging(&self) -> bool {
        self.extends == "sequence" || !self.pos.is_empty()
    }

    /// Leading sections of every scope selector (`sentence` for `sentence.md`)
    pub fn scope_bases(&self) -> impl Iterator<Item = &str> {
        self.scope.selectors().iter().map(Selector::base)
    }

    pub fn style(&self) -> &str {
        self.name.split('.').next().unwrap_or("")
    }
}

fn typed<T: DeserializeOwned>(name: &str, value: serde_yaml::Value) -> Result<T, RuleError> {
    serde_yaml::from_value(value).map_err(|e| invalid(name, e.to_string()))
}

fn invalid(name: &str, message: String) -> RuleError {
    RuleError::InvalidDefinition {
        name: name.to_string(),
        message,
    }
}

/// `Style.Rule` for `<...>/Style/Rule.yml`
pub fn rule_name(path: &Path) -> Option<String> {
    let rule = path.file_stem()?.to_str()?;
    let style = path.parent()?.file_name()?.to_str()?;
    Some(format!("{style}.{rule}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_existence() {
        let def = Definition::parse(
            "Acme.Weasel",
            "extends: existence\nmessage: \"Avoid '%s'.\"\nlevel: error\nignorecase: true\ntokens:\n  - very\n  - really\n",
        )
        .unwrap();
        assert_eq!(def.level, Level::Error);
        assert_eq!(def.style(), "Acme");
        assert!(def.scope.matches("text.md"));
        match def.kind {
            CheckKind::Existence(spec) => {
                assert!(spec.ignorecase);
                assert_eq!(spec.tokens, vec!["very", "really"]);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_scope_accepts_string_or_list() {
        let one = Definition::parse(
            "A.B",
            "extends: existence\nmessage: m\nscope: heading\ntokens: [x]\n",
        )
        .unwrap();
        assert_eq!(one.scope_bases().collect::<Vec<_>>(), vec!["heading"]);

        let many = Definition::parse(
            "A.B",
            "extends: existence\nmessage: m\nscope: [sentence, ~heading]\ntokens: [x]\n",
        )
        .unwrap();
        assert_eq!(many.scope.selectors().len(), 2);
        assert_eq!(many.level, Level::Warning);
    }

    #[test]
    fn test_sequence_needs_tagging() {
        let def = Definition::parse("A.Seq", "extends: sequence\nmessage: m\ntokens: []\n").unwrap();
        assert!(def.needs_tagging());
        assert!(matches!(def.kind, CheckKind::Delegated(_)));

        let pos = Definition::parse(
            "A.Pos",
            "extends: existence\nmessage: m\ntokens: [x]\npos: NN\n",
        )
        .unwrap();
        assert!(pos.needs_tagging());
    }

    #[test]
    fn test_invalid_definitions() {
        let unknown = Definition::parse("A.B", "extends: telepathy\nmessage: m\n").unwrap_err();
        assert!(unknown.to_string().contains("unknown check type 'telepathy'"));

        let missing = Definition::parse("A.B", "extends: existence\ntokens: [x]\n").unwrap_err();
        assert!(missing.to_string().contains("missing 'message'"));

        let no_extends = Definition::parse("A.B", "message: m\n").unwrap_err();
        assert!(matches!(no_extends, RuleError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_rule_name_from_path() {
        assert_eq!(
            rule_name(Path::new("styles/Acme/Passive.yml")),
            Some("Acme.Passive".to_string())
        );
    }
}
