#![forbid(unsafe_code)]

//! The built-in `Vellum` style, embedded at compile time
//!
//! `Repetition` and `Spelling` are always part of the style. `Terms` and
//! `Avoid` are generated from the accepted and rejected vocabulary and only
//! exist when that vocabulary is non-empty.

use super::definition::Definition;
use crate::error::RuleError;
use serde_yaml::{Mapping, Value};

/// Name of the built-in style
pub const BUILTIN_STYLE: &str = "Vellum";

const BUILTIN_RULES: &[(&str, &str)] = &[
    (
        "Repetition",
        include_str!("../../builtin-styles/Vellum/Repetition.yml"),
    ),
    (
        "Spelling",
        include_str!("../../builtin-styles/Vellum/Spelling.yml"),
    ),
];

const TERMS: &str = include_str!("../../builtin-styles/Vellum/Terms.yml");
const AVOID: &str = include_str!("../../builtin-styles/Vellum/Avoid.yml");

fn template(name: &str, source: &str) -> Result<Mapping, RuleError> {
    let value: Value = serde_yaml::from_str(source).map_err(|e| RuleError::InvalidDefinition {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    match value {
        Value::Mapping(map) => Ok(map),
        _ => Err(RuleError::InvalidDefinition {
            name: name.to_string(),
            message: "expected a mapping".to_string(),
        }),
    }
}

/// `Vellum.Repetition` and `Vellum.Spelling`
pub fn base_rules() -> Result<Vec<Definition>, RuleError> {
    BUILTIN_RULES
        .iter()
        .map(|(rule, source)| Definition::parse(&format!("{BUILTIN_STYLE}.{rule}"), source))
        .collect()
}

/// `Vellum.Terms`: suggests the accepted spelling of each term
pub fn terms(accepted: &[String]) -> Result<Option<Definition>, RuleError> {
    if accepted.is_empty() {
        return Ok(None);
    }
    let name = format!("{BUILTIN_STYLE}.Terms");
    let mut rule = template(&name, TERMS)?;
    let swap: Mapping = accepted
        .iter()
        .map(|term| {
            (
                Value::String(term.to_lowercase()),
                Value::String(term.clone()),
            )
        })
        .collect();
    rule.insert(Value::from("swap"), Value::Mapping(swap));
    Definition::from_value(&name, Value::Mapping(rule)).map(Some)
}

/// `Vellum.Avoid`: flags every rejected term
pub fn avoid(rejected: &[String]) -> Result<Option<Definition>, RuleError> {
    if rejected.is_empty() {
        return Ok(None);
    }
    let name = format!("{BUILTIN_STYLE}.Avoid");
    let mut rule = template(&name, AVOID)?;
    let tokens = rejected.iter().cloned().map(Value::String).collect();
    rule.insert(Value::from("tokens"), Value::Sequence(tokens));
    Definition::from_value(&name, Value::Mapping(rule)).map(Some)
}
