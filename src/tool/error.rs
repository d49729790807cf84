//! Tool-specific error types.

use std::io;
use thiserror::Error;

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur while running the metadata tool.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The program path could not be resolved from settings.
    #[error("invalid tool program: {0}")]
    InvalidProgram(String),

    /// Failed to spawn the tool process.
    #[error("failed to spawn tool process `{program}`: {source}")]
    SpawnFailed {
        /// Program that was executed.
        program: String,
        #[source]
        source: io::Error,
    },

    /// The process started but its stdout pipe was not captured.
    #[error("tool stdout pipe unavailable")]
    StdoutUnavailable,

    /// Waiting for the process to exit failed.
    #[error("failed to wait for tool process: {0}")]
    WaitFailed(#[source] io::Error),
}
