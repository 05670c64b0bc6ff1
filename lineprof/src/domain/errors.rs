//! Structured error types for lineprof
//!
//! Using thiserror for automatic Display implementation and error chaining.

use lineprof_script::SyntaxError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("Failed to read script {path}: {source}")]
    ScriptUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse script: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Flush interval must be a positive number of seconds, got {0}")]
    InvalidInterval(f64),

    #[error("Failed to start {thread} thread: {error}")]
    ThreadSpawnFailed { thread: &'static str, error: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum TuiError {
    #[error("Terminal error: {0}")]
    TerminalError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_interval_display() {
        let err = ProfilerError::InvalidInterval(-1.0);
        assert_eq!(err.to_string(), "Flush interval must be a positive number of seconds, got -1");
    }

    #[test]
    fn test_unreadable_script_mentions_path() {
        let err = ProfilerError::ScriptUnreadable {
            path: PathBuf::from("/tmp/missing.py"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/tmp/missing.py"));
        assert!(err.to_string().contains("not found"));
    }
}
