//! Scalability tests for vellum
//!
//! These create a few hundred documents and check that discovery and
//! parallel linting stay fast and produce stable, complete results.

mod common;

use common::Project;
use std::time::Instant;
use vellum::ExecutionEngine;
use vellum::engine::FormatDetector;
use vellum::engine::file_walker::{FileEntry, FileWalker};
use vellum::{Level, Linter};

fn project_with_docs(count: usize) -> Project {
    let project = Project::new("");
    for i in 0..count {
        let content = format!(
            "# Chapter {i}\n\nThis chapter is very short.\n\nWe utilize section {i} here.\n\n```rust\nlet very = {i};\n```\n"
        );
        project.write(&format!("docs/part{}/chapter{i}.md", i / 50), &content);
    }
    project
}

fn discover(project: &Project, linter: &Linter) -> Vec<FileEntry> {
    let detector = FormatDetector::new(linter.config(), linter.languages()).unwrap();
    let config = linter.config();
    FileWalker::new(
        &project.path().join("docs"),
        &config.vellum.include,
        &config.vellum.exclude,
        detector,
    )
    .unwrap()
    .walk()
    .filter_map(Result::ok)
    .collect()
}

#[test]
fn test_scalability_500_documents() {
    let project = project_with_docs(500);
    let linter = project.linter();

    let start = Instant::now();
    let files = discover(&project, &linter);
    println!("Discovery of 500 documents took: {:?}", start.elapsed());
    assert_eq!(files.len(), 500);

    let engine = ExecutionEngine::new(linter);
    let start = Instant::now();
    let result = engine.execute(files);
    let elapsed = start.elapsed();
    println!("Linting 500 documents took: {:?}", elapsed);

    assert_eq!(result.files_checked(), 500);
    assert_eq!(result.failures().count(), 0);
    assert_eq!(result.count(Level::Error), 500);
    assert_eq!(result.count(Level::Warning), 500);
    assert!(elapsed.as_secs() < 30, "linting took too long: {elapsed:?}");
}

#[test]
fn test_parallel_results_are_stable() {
    let project = project_with_docs(120);

    let run = || {
        let linter = project.linter();
        let files = discover(&project, &linter);
        let result = ExecutionEngine::new(linter).execute(files);
        result
            .alerts()
            .map(|(path, alert)| (path.clone(), alert.check.clone(), alert.line, alert.span))
            .collect::<Vec<_>>()
    };

    let first = run();
    assert_eq!(first.len(), 240);
    for _ in 0..3 {
        assert_eq!(run(), first);
    }
}
