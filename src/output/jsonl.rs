#![forbid(unsafe_code)]

//! JSONL output formatter for machine-readable output
//!
//! Outputs one JSON object per line in a deterministic order:
//! 1. All alert records (by file, then line, then column)
//! 2. One error record per file that could not be linted
//! 3. One summary record

use crate::engine::ExecutionResult;
use crate::model::Alert;
use crate::types::Level;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct AlertRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    file: &'a Path,
    #[serde(flatten)]
    alert: &'a Alert,
}

#[derive(Serialize)]
struct ErrorRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    file: &'a Path,
    message: String,
}

#[derive(Serialize)]
struct SummaryRecord {
    #[serde(rename = "type")]
    record_type: &'static str,
    files: usize,
    rules: usize,
    errors: usize,
    warnings: usize,
    suggestions: usize,
    failures: usize,
}

/// JSONL output formatter
pub struct JsonlFormatter;

impl JsonlFormatter {
    pub fn new() -> Self {
        JsonlFormatter
    }

    pub fn format(&self, result: &ExecutionResult) -> String {
        let mut lines: Vec<String> = Vec::new();

        // Files are already sorted by path and alerts by position.
        for (path, alert) in result.alerts() {
            push(
                &mut lines,
                &AlertRecord {
                    record_type: "alert",
                    file: path,
                    alert,
                },
            );
        }

        for (path, error) in result.failures() {
            push(
                &mut lines,
                &ErrorRecord {
                    record_type: "error",
                    file: path,
                    message: error.to_string(),
                },
            );
        }

        push(
            &mut lines,
            &SummaryRecord {
                record_type: "summary",
                files: result.files_checked(),
                rules: result.rules_executed,
                errors: result.count(Level::Error),
                warnings: result.count(Level::Warning),
                suggestions: result.count(Level::Suggestion),
                failures: result.failures().count(),
            },
        );

        let mut output = lines.join("\n");
        output.push('\n');
        output
    }
}

fn push<T: Serialize>(lines: &mut Vec<String>, record: &T) {
    match serde_json::to_string(record) {
        Ok(line) => lines.push(line),
        Err(e) => tracing::error!(error = %e, "failed to serialize output record"),
    }
}

impl Default for JsonlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FileResult;
    use crate::error::LintError;
    use crate::model::File;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn file_with(path: &str, alerts: Vec<Alert>) -> FileResult {
        let mut file = File::new(path, "", &HashMap::new());
        file.alerts = alerts;
        FileResult {
            path: PathBuf::from(path),
            outcome: Ok(file),
        }
    }

    fn alert(line: usize, level: Level) -> Alert {
        let mut alert = Alert::new("Test.Rule", level, "Avoid it.");
        alert.line = line;
        alert.span = (3, 5);
        alert.matched = "foo".to_string();
        alert
    }

    #[test]
    fn test_alert_record_fields() {
        let result = ExecutionResult {
            files: vec![file_with("a.md", vec![alert(2, Level::Warning)])],
            rules_executed: 4,
        };
        let output = JsonlFormatter::new().format(&result);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["type"], "alert");
        assert_eq!(record["file"], "a.md");
        assert_eq!(record["check"], "Test.Rule");
        assert_eq!(record["level"], "warning");
        assert_eq!(record["line"], 2);
        assert_eq!(record["span"], serde_json::json!([3, 5]));
        assert_eq!(record["match"], "foo");
        assert!(record.get("link").is_none());

        let summary: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(summary["type"], "summary");
        assert_eq!(summary["files"], 1);
        assert_eq!(summary["rules"], 4);
        assert_eq!(summary["warnings"], 1);
        assert_eq!(summary["errors"], 0);
    }

    #[test]
    fn test_failures_come_before_summary() {
        let result = ExecutionResult {
            files: vec![
                file_with("a.md", vec![alert(1, Level::Error), alert(9, Level::Suggestion)]),
                FileResult {
                    path: PathBuf::from("b.rst"),
                    outcome: Err(LintError::MissingTool("rst2html".to_string())),
                },
            ],
            rules_executed: 1,
        };
        let output = JsonlFormatter::new().format(&result);
        let records: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let kinds: Vec<&str> = records.iter().map(|r| r["type"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["alert", "alert", "error", "summary"]);
        assert_eq!(records[0]["line"], 1);
        assert_eq!(records[1]["line"], 9);
        assert_eq!(records[2]["file"], "b.rst");
        assert_eq!(records[3]["failures"], 1);
    }
}
