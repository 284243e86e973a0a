#![forbid(unsafe_code)]

//! Check implementations
//!
//! Every [`Definition`] compiles into one [`Check`]. Regexes are compiled
//! here, at load time, so a broken rule fails the run before any file is
//! read.

mod capitalization;
mod delegated;
mod existence;
mod occurrence;
mod repetition;
mod substitution;

pub use capitalization::Capitalization;
pub use delegated::Delegated;
pub use existence::Existence;
pub use occurrence::Occurrence;
pub use repetition::Repetition;
pub use substitution::{Substitution, options};

use super::definition::{CheckKind, Definition};
use crate::error::{LintError, RuleError};
use crate::model::{Alert, Block, File};
use regex::{Regex, RegexBuilder};
use std::ops::Range;
use std::sync::Arc;

/// A compiled rule
///
/// The trait is `Send + Sync` so one rule set can serve every worker.
pub trait Check: Send + Sync {
    fn definition(&self) -> &Definition;

    /// Alerts for `block`, positioned relative to `block.text`
    fn run(&self, block: &Block, file: &File) -> Result<Vec<Alert>, LintError>;
}

/// Natural-language services used by check types that need them
/// (`sequence`, `spelling`, ...)
pub trait NlpProvider: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, definition: &Definition, block: &Block) -> Result<Vec<Alert>, LintError>;
}

/// Compile a definition into its check
pub fn compile(
    definition: Definition,
    nlp: Option<Arc<dyn NlpProvider>>,
) -> Result<Arc<dyn Check>, RuleError> {
    let check: Arc<dyn Check> = match definition.kind.clone() {
        CheckKind::Existence(spec) => Arc::new(Existence::new(definition, spec)?),
        CheckKind::Substitution(spec) => Arc::new(Substitution::new(definition, spec)?),
        CheckKind::Occurrence(spec) => Arc::new(Occurrence::new(definition, spec)?),
        CheckKind::Repetition(spec) => Arc::new(Repetition::new(definition, spec)?),
        CheckKind::Capitalization(spec) => Arc::new(Capitalization::new(definition, spec)?),
        CheckKind::Delegated(_) => Arc::new(Delegated::new(definition, nlp)),
    };
    Ok(check)
}

/// Replace each `%s` in `template` with the next argument
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(i) = rest.find("%s") {
        out.push_str(&rest[..i]);
        out.push_str(args.next().copied().unwrap_or(""));
        rest = &rest[i + 2..];
    }
    out.push_str(rest);
    out
}

/// An alert for `definition` at `range` of `text`
pub fn alert(definition: &Definition, text: &str, range: Range<usize>, message: String) -> Alert {
    let mut alert =
        Alert::new(&definition.name, definition.level, message).located(text, range);
    alert.description = definition.description.clone();
    alert.link = definition.link.clone();
    alert
}

pub(crate) fn build_regex(name: &str, pattern: &str, ignorecase: bool) -> Result<Regex, RuleError> {
    RegexBuilder::new(pattern)
        .case_insensitive(ignorecase)
        .build()
        .map_err(|e| RuleError::InvalidRegex {
            name: name.to_string(),
            message: e.to_string(),
        })
}

pub(crate) fn required(name: &str, field: &str) -> RuleError {
    RuleError::InvalidDefinition {
        name: name.to_string(),
        message: format!("missing '{field}'"),
    }
}

/// Wrap alternatives in word boundaries unless `nonword` is set
pub(crate) fn word_bounded(alternatives: &str, nonword: bool) -> String {
    if nonword {
        format!("(?:{alternatives})")
    } else {
        format!(r"\b(?:{alternatives})\b")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        assert_eq!(
            format_message("Use '%s' instead of '%s'.", &["sub", "foo"]),
            "Use 'sub' instead of 'foo'."
        );
        assert_eq!(format_message("No args %s", &[]), "No args ");
        assert_eq!(format_message("Plain", &["x"]), "Plain");
    }

    #[test]
    fn test_invalid_regex_reported_with_rule_name() {
        let err = build_regex("Acme.Bad", "(unclosed", false).unwrap_err();
        assert!(matches!(err, RuleError::InvalidRegex { ref name, .. } if name == "Acme.Bad"));
    }
}
