#![forbid(unsafe_code)]

//! Rule definitions, checks and the rule manager

pub mod builtin;
pub mod checks;
pub mod definition;
pub mod filter;
pub mod manager;

pub use checks::{Check, NlpProvider};
pub use definition::{CheckKind, Definition};
pub use filter::Filter;
pub use manager::{RuleManager, RuleSet};
