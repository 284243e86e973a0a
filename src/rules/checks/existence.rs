use super::{Check, alert, build_regex, format_message, required, word_bounded};
use crate::error::{LintError, RuleError};
use crate::model::{Alert, Block, File};
use crate::rules::definition::{Definition, ExistenceSpec};
use regex::Regex;

/// Flags every occurrence of a token
pub struct Existence {
    definition: Definition,
    pattern: Regex,
    exceptions: Vec<String>,
    ignorecase: bool,
}

impl Existence {
    pub fn new(definition: Definition, spec: ExistenceSpec) -> Result<Self, RuleError> {
        let source = if spec.raw.is_empty() {
            if spec.tokens.is_empty() {
                return Err(required(&definition.name, "tokens"));
            }
            word_bounded(&spec.tokens.join("|"), spec.nonword)
        } else {
            spec.raw.concat()
        };
        let pattern = build_regex(&definition.name, &source, spec.ignorecase)?;
        Ok(Existence {
            definition,
            pattern,
            exceptions: spec.exceptions,
            ignorecase: spec.ignorecase,
        })
    }

    fn is_exception(&self, matched: &str) -> bool {
        self.exceptions.iter().any(|e| {
            if self.ignorecase {
                e.eq_ignore_ascii_case(matched)
            } else {
                e == matched
            }
        })
    }
}

impl Check for Existence {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn run(&self, block: &Block, _file: &File) -> Result<Vec<Alert>, LintError> {
        Ok(self
            .pattern
            .find_iter(&block.text)
            .filter(|m| !m.is_empty() && !self.is_exception(m.as_str()))
            .map(|m| {
                let message = format_message(&self.definition.message, &[m.as_str()]);
                alert(&self.definition, &block.text, m.range(), message)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::definition::CheckKind;
    use std::collections::HashMap;

    fn existence(yaml: &str) -> Existence {
        let def = Definition::parse("Test.Existence", yaml).unwrap();
        let CheckKind::Existence(spec) = def.kind.clone() else {
            panic!("not an existence rule");
        };
        Existence::new(def, spec).unwrap()
    }

    #[test]
    fn test_flags_tokens_on_word_boundaries() {
        let check = existence(
            "extends: existence\nmessage: \"Avoid '%s'.\"\nignorecase: true\ntokens: [very]\n",
        );
        let file = File::new("a.txt", "", &HashMap::new());
        let block = Block::new("Very good.\neverything is very fine. VERY", "text.txt");
        let alerts = check.run(&block, &file).unwrap();
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].message, "Avoid 'Very'.");
        assert_eq!(alerts[1].line, 2);
        assert_eq!(alerts[1].span, (15, 18));
    }

    #[test]
    fn test_exceptions_are_skipped() {
        let check = existence(
            "extends: existence\nmessage: m\ntokens: ['[A-Z]{2,}']\nexceptions: [API]\n",
        );
        let file = File::new("a.txt", "", &HashMap::new());
        let alerts = check.run(&Block::new("The API and SDK", "text"), &file).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].matched, "SDK");
    }

    #[test]
    fn test_raw_pattern() {
        let check = existence("extends: existence\nmessage: m\nraw: ['\\d+', '%']\n");
        let file = File::new("a.txt", "", &HashMap::new());
        let alerts = check.run(&Block::new("Up 40% today", "text"), &file).unwrap();
        assert_eq!(alerts[0].matched, "40%");
    }

    #[test]
    fn test_requires_tokens() {
        let def = Definition::parse("T.E", "extends: existence\nmessage: m\n").unwrap();
        let CheckKind::Existence(spec) = def.kind.clone() else {
            unreachable!()
        };
        assert!(Existence::new(def, spec).is_err());
    }
}
