//! File discovery, the per-file lint pipeline and parallel execution

pub mod executor;
pub mod file_walker;
pub mod linter;

pub use executor::{ExecutionEngine, ExecutionResult, FileResult};
pub use file_walker::{FileEntry, FileWalker, FormatDetector};
pub use linter::Linter;
