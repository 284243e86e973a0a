use super::{Check, alert, build_regex, format_message, required};
use crate::error::{LintError, RuleError};
use crate::model::{Alert, Block, File};
use crate::rules::definition::{Definition, OccurrenceSpec};
use regex::Regex;

/// Limits how often a token may appear in one block
pub struct Occurrence {
    definition: Definition,
    pattern: Regex,
    max: Option<usize>,
    min: Option<usize>,
}

impl Occurrence {
    pub fn new(definition: Definition, spec: OccurrenceSpec) -> Result<Self, RuleError> {
        if spec.token.is_empty() {
            return Err(required(&definition.name, "token"));
        }
        if spec.max.is_none() && spec.min.is_none() {
            return Err(required(&definition.name, "max' or 'min"));
        }
        let pattern = build_regex(&definition.name, &spec.token, spec.ignorecase)?;
        Ok(Occurrence {
            definition,
            pattern,
            max: spec.max,
            min: spec.min,
        })
    }
}

impl Check for Occurrence {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn run(&self, block: &Block, _file: &File) -> Result<Vec<Alert>, LintError> {
        let found: Vec<_> = self
            .pattern
            .find_iter(&block.text)
            .filter(|m| !m.is_empty())
            .collect();
        let count = found.len().to_string();

        if let Some(max) = self.max
            && let Some(over) = found.get(max)
        {
            let message = format_message(&self.definition.message, &[&count]);
            return Ok(vec![alert(&self.definition, &block.text, over.range(), message)]);
        }

        if let Some(min) = self.min
            && found.len() < min
        {
            let text = block.text.trim_end();
            let start = text.len() - text.trim_start().len();
            let end = text.find('\n').unwrap_or(text.len()).max(start);
            if start < end {
                let message = format_message(&self.definition.message, &[&count]);
                return Ok(vec![alert(&self.definition, &block.text, start..end, message)]);
            }
        }

        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::definition::CheckKind;
    use std::collections::HashMap;

    fn occurrence(extra: &str) -> Occurrence {
        let yaml = format!("extends: occurrence\nmessage: \"Found %s.\"\n{extra}");
        let def = Definition::parse("Test.Occurrence", &yaml).unwrap();
        let CheckKind::Occurrence(spec) = def.kind.clone() else {
            panic!("not an occurrence rule");
        };
        Occurrence::new(def, spec).unwrap()
    }

    #[test]
    fn test_max_flags_first_excess_token() {
        let check = occurrence("token: '[^\\s]+'\nmax: 3\n");
        let file = File::new("a.md", "", &HashMap::new());
        let alerts = check
            .run(&Block::new("one two three four five", "heading"), &file)
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].matched, "four");
        assert_eq!(alerts[0].message, "Found 5.");
    }

    #[test]
    fn test_min_flags_block_start() {
        let check = occurrence("token: 'example'\nmin: 1\n");
        let file = File::new("a.md", "", &HashMap::new());
        let alerts = check
            .run(&Block::new("  No samples here.\nSecond line", "text"), &file)
            .unwrap();
        assert_eq!(alerts[0].matched, "No samples here.");
        assert_eq!(alerts[0].span, (3, 18));
    }

    #[test]
    fn test_within_limits() {
        let check = occurrence("token: 'a'\nmax: 2\nmin: 1\n");
        let file = File::new("a.md", "", &HashMap::new());
        assert!(check.run(&Block::new("a a", "text"), &file).unwrap().is_empty());
    }
}
