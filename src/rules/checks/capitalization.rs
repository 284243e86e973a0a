use super::{Check, alert, build_regex, format_message, required};
use crate::error::{LintError, RuleError};
use crate::model::{Alert, Block, File};
use crate::rules::definition::{CapitalizationSpec, Definition};
use regex::Regex;

const SMALL_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "from", "if", "in", "into", "nor", "of",
    "on", "or", "per", "so", "the", "to", "up", "via", "vs", "with", "yet",
];

enum Style {
    Title,
    Sentence,
    Lower,
    Upper,
    Pattern(Regex),
}

/// Checks the capitalization of a whole block (typically a heading)
pub struct Capitalization {
    definition: Definition,
    style: Style,
    exceptions: Vec<String>,
}

fn starts_upper(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn is_acronym(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() > 1 && letters.iter().all(|c| c.is_uppercase())
}

impl Capitalization {
    pub fn new(definition: Definition, spec: CapitalizationSpec) -> Result<Self, RuleError> {
        let style = match spec.pattern.as_str() {
            "" => return Err(required(&definition.name, "match")),
            "$title" => Style::Title,
            "$sentence" => Style::Sentence,
            "$lower" => Style::Lower,
            "$upper" => Style::Upper,
            pattern => Style::Pattern(build_regex(&definition.name, pattern, false)?),
        };
        Ok(Capitalization {
            definition,
            style,
            exceptions: spec.exceptions,
        })
    }

    fn excepted(&self, word: &str) -> bool {
        let bare = word.trim_matches(|c: char| !c.is_alphanumeric());
        self.exceptions.iter().any(|e| e == bare)
    }

    fn conforms(&self, text: &str) -> bool {
        let words: Vec<&str> = text.split_whitespace().collect();
        let last = words.len().saturating_sub(1);
        match &self.style {
            Style::Lower => text == text.to_lowercase(),
            Style::Upper => text == text.to_uppercase(),
            Style::Pattern(re) => re.find(text).is_some_and(|m| m.as_str() == text),
            Style::Title => words.iter().enumerate().all(|(i, word)| {
                let lead = word.chars().next().is_some_and(char::is_alphabetic);
                !lead
                    || self.excepted(word)
                    || starts_upper(word)
                    || (i != 0 && i != last && SMALL_WORDS.contains(&word.to_lowercase().as_str()))
            }),
            Style::Sentence => words.iter().enumerate().all(|(i, word)| {
                let lead = word.chars().next().is_some_and(char::is_alphabetic);
                if !lead || self.excepted(word) {
                    return true;
                }
                let after_colon = i > 0 && words[i - 1].ends_with(':');
                if i == 0 || after_colon {
                    starts_upper(word)
                } else {
                    !starts_upper(word) || is_acronym(word) || *word == "I"
                }
            }),
        }
    }
}

impl Check for Capitalization {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn run(&self, block: &Block, _file: &File) -> Result<Vec<Alert>, LintError> {
        let line_end = block.text.find('\n').unwrap_or(block.text.len());
        let first = &block.text[..line_end];
        let text = first.trim();
        if text.is_empty() || self.conforms(text) {
            return Ok(Vec::new());
        }
        let start = first.len() - first.trim_start().len();
        let message = format_message(&self.definition.message, &[text]);
        Ok(vec![alert(
            &self.definition,
            &block.text,
            start..start + text.len(),
            message,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::definition::CheckKind;
    use std::collections::HashMap;

    fn capitalization(pattern: &str) -> Capitalization {
        let yaml = format!(
            "extends: capitalization\nmessage: \"'%s' should be in the expected case.\"\nscope: heading\nmatch: {pattern}\nexceptions: [iOS]\n"
        );
        let def = Definition::parse("Test.Headings", &yaml).unwrap();
        let CheckKind::Capitalization(spec) = def.kind.clone() else {
            panic!("not a capitalization rule");
        };
        Capitalization::new(def, spec).unwrap()
    }

    fn flagged(check: &Capitalization, text: &str) -> bool {
        let file = File::new("a.md", "", &HashMap::new());
        !check
            .run(&Block::new(text, "text.heading.h1.md"), &file)
            .unwrap()
            .is_empty()
    }

    #[test]
    fn test_title_case() {
        let check = capitalization("$title");
        assert!(!flagged(&check, "The Art of Writing"));
        assert!(!flagged(&check, "Building for iOS"));
        assert!(flagged(&check, "The art of writing"));
        assert!(flagged(&check, "Where it comes from"));
    }

    #[test]
    fn test_sentence_case() {
        let check = capitalization("$sentence");
        assert!(!flagged(&check, "Getting started with the API"));
        assert!(!flagged(&check, "Setup: Install the tool"));
        assert!(flagged(&check, "Getting Started"));
        assert!(flagged(&check, "getting started"));
    }

    #[test]
    fn test_alert_covers_heading_text() {
        let check = capitalization("$lower");
        let file = File::new("a.md", "", &HashMap::new());
        let alerts = check.run(&Block::new("  Shouting", "heading"), &file).unwrap();
        assert_eq!(alerts[0].matched, "Shouting");
        assert_eq!(alerts[0].span, (3, 10));
        assert_eq!(alerts[0].message, "'Shouting' should be in the expected case.");
    }
}
