//! Error types for tasks and the task graph.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of a single task.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// Style source failed to compile
    #[error("failed to compile {}: {message}", file.display())]
    Compile {
        /// Entry point being compiled
        file: PathBuf,
        /// Compiler message
        message: String,
    },
    /// A declared input file does not exist
    #[error("missing input file: {}", .0.display())]
    MissingInput(PathBuf),
    /// A bundle the injector references does not exist
    #[error("missing bundle: {} (run the task that produces it first)", .0.display())]
    MissingBundle(PathBuf),
    /// Invalid glob pattern
    #[error("invalid glob pattern '{pattern}': {message}")]
    Pattern {
        /// The offending pattern
        pattern: String,
        /// Parser message
        message: String,
    },
    /// Stylesheet could not be parsed or printed
    #[error("CSS error in {}: {message}", file.display())]
    Css {
        /// File or bundle being processed
        file: PathBuf,
        /// lightningcss message
        message: String,
    },
    /// Script bundle could not be parsed for minification
    #[error("cannot minify {}: {message}", file.display())]
    Minify {
        /// Bundle being minified
        file: PathBuf,
        /// Parser message
        message: String,
    },
    /// Filesystem error
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path involved in the failed operation
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl TaskError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        TaskError::Io { path: path.as_ref().to_path_buf(), source }
    }

    /// Whether this is a recoverable compilation error (reported as a notification).
    pub fn is_compile_error(&self) -> bool {
        matches!(self, TaskError::Compile { .. })
    }
}

/// Error in the structure of the task graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Circular dependency
    #[error("Circular dependency detected involving task '{0}'")]
    Cycle(String),
    /// Task name not registered
    #[error("Unknown task '{0}'")]
    UnknownTask(String),
    /// Edge points at an unregistered task
    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency {
        /// Task declaring the edge
        task: String,
        /// Missing dependency
        dependency: String,
    },
    /// Two tasks registered with the same name
    #[error("Task '{0}' registered twice")]
    Duplicate(String),
}
