use super::{Check, alert, build_regex, format_message};
use crate::error::{LintError, RuleError};
use crate::model::{Alert, Block, File};
use crate::rules::definition::{Definition, RepetitionSpec};
use regex::Regex;

/// Flags a token immediately repeated ("the the")
pub struct Repetition {
    definition: Definition,
    pattern: Regex,
    alpha: bool,
    ignorecase: bool,
    exceptions: Vec<String>,
}

impl Repetition {
    pub fn new(definition: Definition, spec: RepetitionSpec) -> Result<Self, RuleError> {
        let source = if spec.tokens.is_empty() {
            r"[^\s]+".to_string()
        } else {
            spec.tokens.join("|")
        };
        let pattern = build_regex(&definition.name, &source, spec.ignorecase)?;
        Ok(Repetition {
            definition,
            pattern,
            alpha: spec.alpha,
            ignorecase: spec.ignorecase,
            exceptions: spec.exceptions,
        })
    }

    fn same(&self, a: &str, b: &str) -> bool {
        if self.ignorecase {
            a.to_lowercase() == b.to_lowercase()
        } else {
            a == b
        }
    }
}

impl Check for Repetition {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn run(&self, block: &Block, _file: &File) -> Result<Vec<Alert>, LintError> {
        let text = &block.text;
        let mut alerts = Vec::new();
        let mut previous: Option<regex::Match<'_>> = None;

        for current in self.pattern.find_iter(text) {
            let token = current.as_str();
            if self.alpha && !token.chars().all(char::is_alphabetic) {
                previous = None;
                continue;
            }
            if let Some(prev) = previous
                && self.same(prev.as_str(), token)
                && text[prev.end()..current.start()].chars().all(char::is_whitespace)
                && !self.exceptions.iter().any(|e| self.same(e, token))
            {
                let message = format_message(&self.definition.message, &[token]);
                alerts.push(alert(
                    &self.definition,
                    text,
                    prev.start()..current.end(),
                    message,
                ));
                previous = None;
                continue;
            }
            previous = Some(current);
        }
        Ok(alerts)
    }
}
