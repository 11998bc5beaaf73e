//! Typed error hierarchy for the assistant pipeline.
//!
//! Each pipeline stage that can stop a run has its own enum:
//! - `GenerationError`: the upstream chat-completion call
//! - `WorkspaceError`: persisting generated source to disk
//!
//! Execution never fails; its outcome is carried by
//! `agent::executor::ExecutionOutcome` instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the script generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    UpstreamFailure(String),

    #[error("completion contained no text")]
    EmptyCompletion,
}

/// Errors from writing a generated script into the workspace directory.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Failed to create workspace directory at {path}: {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write script at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
