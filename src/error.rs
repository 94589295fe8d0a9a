//! Error types for tmux-relay.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for terminal session operations.
#[derive(Error, Debug)]
pub enum TerminalError {
    /// The caller already owns a session.
    #[error("caller {0} already has an active terminal session")]
    AlreadyActive(String),

    /// The caller has no session to operate on.
    #[error("caller {0} has no active terminal session")]
    NoActiveSession(String),

    /// The safety filter rejected the command.
    #[error("command blocked: {reason}")]
    Blocked { reason: String },

    /// Nothing to run after trimming.
    #[error("command is empty")]
    EmptyCommand,

    /// The multiplexer backend failed to launch or exited nonzero.
    #[error("multiplexer {operation} failed: {detail}")]
    Backend {
        operation: &'static str,
        detail: String,
    },

    /// Dispatching a command into an existing session failed.
    #[error("command execution failed: {0}")]
    Execution(String),

    /// A scratch file could not be read or removed.
    ///
    /// Only ever logged; capture failures degrade to missing data.
    #[error("capture file {path:?} unusable: {source}")]
    CaptureRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

impl TerminalError {
    pub(crate) fn backend(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            detail: detail.into(),
        }
    }
}

/// Convenience Result type for tmux-relay operations.
pub type Result<T> = std::result::Result<T, TerminalError>;
