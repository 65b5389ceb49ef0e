//! Unified error type for the lustmolch workspace.
//!
//! Library crates return [`Result`]; the binary wraps these in `anyhow` at
//! the edge.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum LustmolchError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value or argument is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A stored address is not a dotted-quad IPv4 address.
    #[error("invalid IPv4 address: {address:?}")]
    InvalidAddress {
        /// The offending address as stored.
        address: String,
    },

    /// No more ports or address blocks can be handed out.
    #[error("no available {resource} left to allocate")]
    AllocationExhausted {
        /// The exhausted resource.
        resource: &'static str,
    },

    /// A template is missing, malformed, or references an unknown variable.
    #[error("template {template}: {message}")]
    Template {
        /// Name of the template being rendered.
        template: String,
        /// Description of the failure.
        message: String,
    },

    /// An external tool exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}", status = describe_exit(*code))]
    Tool {
        /// Program that was invoked.
        program: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The inventory lock could not be acquired.
    #[error("could not lock {path}: {source}")]
    Lock {
        /// Path of the lock file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl LustmolchError {
    /// Builds an [`LustmolchError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_owned(), |c| format!("status {c}"))
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, LustmolchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_mentions_exit_code() {
        let err = LustmolchError::Tool {
            program: "machinectl".into(),
            code: Some(1),
            stderr: "Machine web not known".into(),
        };
        assert_eq!(
            err.to_string(),
            "machinectl exited with status 1: Machine web not known"
        );
    }

    #[test]
    fn tool_error_without_code_mentions_signal() {
        let err = LustmolchError::Tool {
            program: "debootstrap".into(),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("a signal"));
    }
}
