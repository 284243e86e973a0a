#![forbid(unsafe_code)]

//! Formatters for `vellum list`

use crate::rules::{Definition, RuleSet};
use crate::types::Level;
use serde::Serialize;

/// Where a rule was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    Builtin,
    Style,
}

impl RuleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleSource::Builtin => "builtin",
            RuleSource::Style => "style",
        }
    }
}

/// One row of the rule listing
#[derive(Debug, Clone)]
pub struct RuleInfo {
    pub name: String,
    pub extends: String,
    pub level: Level,
    pub scope: Vec<String>,
    pub source: RuleSource,
    pub message: String,
}

impl RuleInfo {
    pub fn from_definition(definition: &Definition) -> Self {
        RuleInfo {
            name: definition.name.clone(),
            extends: definition.extends.clone(),
            level: definition.level,
            scope: definition
                .scope
                .selectors()
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            source: if definition.path.is_some() {
                RuleSource::Style
            } else {
                RuleSource::Builtin
            },
            message: definition.message.clone(),
        }
    }

    /// Rows for every rule in the set, by name
    pub fn collect(rules: &RuleSet) -> Vec<RuleInfo> {
        rules
            .iter()
            .map(|check| RuleInfo::from_definition(check.definition()))
            .collect()
    }
}

/// Human-readable rule listing
pub struct RuleListHumanFormatter;

impl RuleListHumanFormatter {
    pub fn new() -> Self {
        RuleListHumanFormatter
    }

    pub fn format(&self, rules: &[RuleInfo]) -> String {
        let mut output = format!("Rules ({} active):\n\n", rules.len());
        for rule in rules {
            output.push_str(&format!("{} ({})\n", rule.name, rule.source.as_str()));
            output.push_str(&format!("  Extends: {}\n", rule.extends));
            output.push_str(&format!("  Level: {}\n", rule.level.as_str()));
            output.push_str(&format!("  Scope: {}\n", rule.scope.join(", ")));
            if !rule.message.is_empty() {
                output.push_str(&format!("  Message: {}\n", rule.message));
            }
            output.push('\n');
        }
        output
    }

    pub fn write_to_stdout(&self, rules: &[RuleInfo]) {
        print!("{}", self.format(rules));
    }
}

impl Default for RuleListHumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonlRule<'a> {
    name: &'a str,
    extends: &'a str,
    level: Level,
    scope: &'a [String],
    source: &'static str,
    message: &'a str,
}

/// One JSON object per rule
pub struct RuleListJsonlFormatter;

impl RuleListJsonlFormatter {
    pub fn new() -> Self {
        RuleListJsonlFormatter
    }

    pub fn format(&self, rules: &[RuleInfo]) -> String {
        let mut output = String::new();
        for rule in rules {
            let record = JsonlRule {
                name: &rule.name,
                extends: &rule.extends,
                level: rule.level,
                scope: &rule.scope,
                source: rule.source.as_str(),
                message: &rule.message,
            };
            if let Ok(json) = serde_json::to_string(&record) {
                output.push_str(&json);
                output.push('\n');
            }
        }
        output
    }

    pub fn write_to_stdout(&self, rules: &[RuleInfo]) {
        print!("{}", self.format(rules));
    }
}

impl Default for RuleListJsonlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, source: RuleSource) -> RuleInfo {
        RuleInfo {
            name: name.to_string(),
            extends: "existence".to_string(),
            level: Level::Warning,
            scope: vec!["text".to_string(), "~heading".to_string()],
            source,
            message: "Avoid '%s'.".to_string(),
        }
    }

    #[test]
    fn test_from_definition_marks_builtin() {
        let definition =
            Definition::parse("Vellum.Avoid", "extends: existence\nmessage: x\ntokens: [a]\n")
                .unwrap();
        let info = RuleInfo::from_definition(&definition);
        assert_eq!(info.source, RuleSource::Builtin);
        assert_eq!(info.extends, "existence");
        assert_eq!(info.scope, vec!["text"]);
    }

    #[test]
    fn test_human_format() {
        let output = RuleListHumanFormatter::new().format(&[info("Acme.Slang", RuleSource::Style)]);
        assert!(output.starts_with("Rules (1 active):\n\n"));
        assert!(output.contains("Acme.Slang (style)\n"));
        assert!(output.contains("  Scope: text, ~heading\n"));
        assert!(output.contains("  Level: warning\n"));
    }

    #[test]
    fn test_human_format_empty() {
        let output = RuleListHumanFormatter::new().format(&[]);
        assert_eq!(output, "Rules (0 active):\n\n");
    }

    #[test]
    fn test_jsonl_format() {
        let output = RuleListJsonlFormatter::new().format(&[
            info("Acme.Slang", RuleSource::Style),
            info("Vellum.Terms", RuleSource::Builtin),
        ]);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["name"], "Acme.Slang");
        assert_eq!(first["level"], "warning");
        assert_eq!(first["scope"], serde_json::json!(["text", "~heading"]));
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["source"], "builtin");
    }
}
