//! Configuration file parsing and validation

pub mod vellum_toml;

pub use vellum_toml::{Config, RuleSettings, RuleValue, VellumMeta};
