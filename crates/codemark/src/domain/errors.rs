//! Domain-specific errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// A declared root path is absent. This aborts the run before any file
    /// is opened.
    #[error("path '{}' does not exist", .0.display())]
    MissingRoot(PathBuf),
}
