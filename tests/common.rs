//! Test utilities for vellum integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vellum::{Alert, Config, Linter, RuleManager};

/// Result type alias for tests
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Extract Ok value or panic with context
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("assertion failed: expected Ok, got Err({:?})", e),
        }
    };
    ($expr:expr, $msg:literal) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Extract Some value or panic with context
#[macro_export]
macro_rules! assert_some {
    ($expr:expr) => {
        match $expr {
            Some(v) => v,
            None => panic!("assertion failed: expected Some, got None"),
        }
    };
    ($expr:expr, $msg:literal) => {
        match $expr {
            Some(v) => v,
            None => panic!("{}: got None", $msg),
        }
    };
}

/// A throwaway project: `vellum.toml` plus a `styles/` tree
pub struct Project {
    pub dir: TempDir,
}

pub const VERY_RULE: &str = "extends: existence\nmessage: \"Avoid '%s'.\"\nlevel: error\nignorecase: true\ntokens: [very]\n";

pub const SWAP_RULE: &str = "extends: substitution\nmessage: \"Use '%s' instead of '%s'.\"\nlevel: warning\nignorecase: true\nswap:\n  utilize: use\n  \"foo|bar\": sub\n";

impl Project {
    /// A project using the `Test` style with `Very` and `Swap` rules
    pub fn new(settings: &str) -> Self {
        let project = Self::empty();
        project.write("styles/Test/Very.yml", VERY_RULE);
        project.write("styles/Test/Swap.yml", SWAP_RULE);
        project.config(&format!("based_on_styles = [\"Test\"]\n{settings}"));
        project
    }

    pub fn empty() -> Self {
        Project {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    /// Write `vellum.toml`; `vellum_settings` lands in the `[vellum]` table
    pub fn config(&self, vellum_settings: &str) {
        self.write(
            "vellum.toml",
            &format!("[vellum]\nversion = \"1\"\n{vellum_settings}"),
        );
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().expect("parent dir")).expect("create dirs");
        fs::write(&path, content).expect("write file");
        path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("vellum.toml")
    }

    pub fn linter(&self) -> Linter {
        let config = Config::load(self.config_path()).expect("config loads");
        let rules = RuleManager::new(&config).build().expect("rules build");
        Linter::new(config, rules).expect("linter builds")
    }
}

/// The characters an alert's span covers in `content`
pub fn covered(content: &str, alert: &Alert) -> String {
    let line = content
        .split('\n')
        .nth(alert.line - 1)
        .expect("alert line exists");
    line.chars()
        .skip(alert.span.0 - 1)
        .take(alert.span.1 - alert.span.0 + 1)
        .collect()
}

/// Every alert's span must cover exactly its match
pub fn assert_round_trip(content: &str, alerts: &[Alert]) {
    assert!(!alerts.is_empty(), "expected alerts");
    for alert in alerts {
        assert_eq!(covered(content, alert), alert.matched, "{alert:?}");
    }
}
