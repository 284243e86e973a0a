#![forbid(unsafe_code)]

//! Human-readable output, grouped per file
//!
//! ```text
//!  docs/intro.md
//!  3:14   error       Avoid using 'very'.        Vellum.Avoid
//!  9:1    suggestion  'intro' should be in ...    Acme.Headings
//!
//! ✖ 1 error, 0 warnings and 1 suggestion in 4 files.
//! ```

use crate::engine::ExecutionResult;
use crate::types::Level;
use std::io::{self, Write};
use termcolor::{Buffer, Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warning => Color::Yellow,
        Level::Suggestion => Color::Blue,
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Human-readable formatter
pub struct HumanFormatter {
    color: ColorChoice,
}

impl HumanFormatter {
    pub fn new(color: ColorChoice) -> Self {
        HumanFormatter { color }
    }

    /// Render to a string without color codes
    pub fn format(&self, result: &ExecutionResult) -> String {
        let mut buffer = Buffer::no_color();
        // Writing into memory cannot fail.
        let _ = self.write(result, &mut buffer);
        String::from_utf8_lossy(buffer.as_slice()).into_owned()
    }

    pub fn write_to_stdout(&self, result: &ExecutionResult) -> io::Result<()> {
        let mut stdout = StandardStream::stdout(self.color);
        self.write(result, &mut stdout)
    }

    pub fn write(&self, result: &ExecutionResult, out: &mut dyn WriteColor) -> io::Result<()> {
        for file in &result.files {
            let alerts = file.alerts();
            if alerts.is_empty() {
                continue;
            }

            out.set_color(ColorSpec::new().set_bold(true).set_underline(true))?;
            write!(out, " {}", file.path.display())?;
            out.reset()?;
            writeln!(out)?;

            let width = alerts
                .iter()
                .map(|a| a.message.chars().count())
                .max()
                .unwrap_or(0);
            for alert in alerts {
                write!(out, " {:<7}", format!("{}:{}", alert.line, alert.span.0))?;
                out.set_color(ColorSpec::new().set_fg(Some(level_color(alert.level))))?;
                write!(out, "{:<12}", alert.level.as_str())?;
                out.reset()?;
                write!(out, "{:<width$}  ", alert.message)?;
                out.set_color(ColorSpec::new().set_dimmed(true))?;
                write!(out, "{}", alert.check)?;
                out.reset()?;
                writeln!(out)?;
            }
            writeln!(out)?;
        }

        for (path, error) in result.failures() {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
            write!(out, "error")?;
            out.reset()?;
            writeln!(out, ": {}: {}", path.display(), error)?;
        }

        let errors = result.count(Level::Error);
        let summary = format!(
            "{}, {} and {} in {}.",
            plural(errors, "error"),
            plural(result.count(Level::Warning), "warning"),
            plural(result.count(Level::Suggestion), "suggestion"),
            plural(result.files_checked(), "file"),
        );
        if errors > 0 {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            write!(out, "✖ ")?;
        } else {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(out, "✔ ")?;
        }
        out.reset()?;
        writeln!(out, "{summary}")
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new(ColorChoice::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FileResult;
    use crate::error::LintError;
    use crate::model::{Alert, File};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn result() -> ExecutionResult {
        let mut file = File::new("docs/intro.md", "", &HashMap::new());
        let mut alert = Alert::new("Vellum.Avoid", Level::Error, "Avoid using 'very'.");
        alert.line = 3;
        alert.span = (14, 17);
        file.alerts.push(alert);

        ExecutionResult {
            files: vec![
                FileResult {
                    path: PathBuf::from("docs/intro.md"),
                    outcome: Ok(file),
                },
                FileResult {
                    path: PathBuf::from("docs/broken.adoc"),
                    outcome: Err(LintError::MissingTool("asciidoctor".to_string())),
                },
            ],
            rules_executed: 1,
        }
    }

    #[test]
    fn test_format_groups_by_file() {
        let output = HumanFormatter::default().format(&result());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], " docs/intro.md");
        assert!(lines[1].starts_with(" 3:14   error"));
        assert!(lines[1].ends_with("Vellum.Avoid"));
        assert!(output.contains("error: docs/broken.adoc: asciidoctor not found on PATH"));
        assert!(output.ends_with("1 error, 0 warnings and 0 suggestions in 2 files.\n"));
    }

    #[test]
    fn test_clean_run_summary() {
        let result = ExecutionResult {
            files: vec![],
            rules_executed: 0,
        };
        let output = HumanFormatter::default().format(&result);
        assert_eq!(output, "✔ 0 errors, 0 warnings and 0 suggestions in 0 files.\n");
    }
}
