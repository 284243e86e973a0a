use super::{Check, alert, build_regex, format_message, required, word_bounded};
use crate::error::{LintError, RuleError};
use crate::model::{Alert, Block, File};
use crate::rules::definition::{Definition, SubstitutionSpec};
use regex::Regex;

/// Suggests a replacement for each matched key of `swap`
///
/// Keys are tried longest first (ties broken lexically) in a single
/// alternation, so results never depend on map iteration order.
pub struct Substitution {
    definition: Definition,
    pattern: Regex,
    replacements: Vec<String>,
    exceptions: Vec<String>,
    ignorecase: bool,
}

/// Turn capturing groups into non-capturing ones
fn convert_capture_groups(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut escaped = false;
    let mut in_class = false;
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '(' if !in_class && chars.peek() != Some(&'?') => out.push_str("?:"),
            _ => {}
        }
    }
    out
}

/// Alternatives of a `|`-separated replacement; `\|` is a literal bar
pub fn options(pattern: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut current = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => found.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    found.push(current);
    found.retain(|s| !s.is_empty());
    found
}

impl Substitution {
    pub fn new(definition: Definition, spec: SubstitutionSpec) -> Result<Self, RuleError> {
        if spec.swap.is_empty() {
            return Err(required(&definition.name, "swap"));
        }

        let mut pairs: Vec<(String, String)> = spec.swap.into_iter().collect();
        pairs.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let alternatives = pairs
            .iter()
            .map(|(key, _)| format!("({})", convert_capture_groups(key)))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = build_regex(
            &definition.name,
            &word_bounded(&alternatives, spec.nonword),
            spec.ignorecase,
        )?;

        Ok(Substitution {
            definition,
            pattern,
            replacements: pairs.into_iter().map(|(_, v)| v).collect(),
            exceptions: spec.exceptions,
            ignorecase: spec.ignorecase,
        })
    }
}

impl Check for Substitution {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn run(&self, block: &Block, _file: &File) -> Result<Vec<Alert>, LintError> {
        let mut alerts = Vec::new();
        for caps in self.pattern.captures_iter(&block.text) {
            let Some(whole) = caps.get(0).filter(|m| !m.is_empty()) else {
                continue;
            };
            let Some(index) = (1..caps.len()).find(|&i| caps.get(i).is_some()) else {
                continue;
            };
            let Some(expected) = self.replacements.get(index - 1) else {
                continue;
            };
            let observed = whole.as_str();

            if observed == expected
                || self
                    .exceptions
                    .iter()
                    .any(|e| e == observed || (self.ignorecase && e.eq_ignore_ascii_case(observed)))
            {
                continue;
            }
            if options(expected).iter().any(|o| o == observed) {
                continue;
            }

            let suggestion = options(expected).join("' or '");
            let message = format_message(&self.definition.message, &[&suggestion, observed]);
            alerts.push(alert(&self.definition, &block.text, whole.range(), message));
        }
        Ok(alerts)
    }
}
