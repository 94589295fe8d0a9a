//! Decoded outcome of one dispatched command.

use std::fmt;

/// Exit status recovered from the exit scratch file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitCode {
    /// The shell reported this status.
    Code(i32),
    /// The exit file was missing or did not hold an integer.
    #[default]
    Unknown,
}

impl ExitCode {
    /// Parse the text written by `echo $?`.
    pub fn parse(text: &str) -> Self {
        text.trim()
            .parse::<i32>()
            .map(ExitCode::Code)
            .unwrap_or(ExitCode::Unknown)
    }

    /// The numeric status, if known.
    pub fn code(&self) -> Option<i32> {
        match self {
            ExitCode::Code(c) => Some(*c),
            ExitCode::Unknown => None,
        }
    }

    /// Known and zero.
    pub fn is_success(&self) -> bool {
        *self == ExitCode::Code(0)
    }

    /// Known and nonzero.
    pub fn is_failure(&self) -> bool {
        matches!(self, ExitCode::Code(c) if *c != 0)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Code(c) => write!(f, "{}", c),
            ExitCode::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of a command relayed through a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Combined stdout and stderr, trailing whitespace removed.
    pub output: String,
    /// Exit status of the user command.
    pub exit_code: ExitCode,
    /// Shell working directory after the command, empty if unavailable.
    pub working_dir: String,
}

impl CommandResult {
    /// Whether the command printed anything.
    pub fn has_output(&self) -> bool {
        !self.output.trim().is_empty()
    }

    /// Check if command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code.is_success()
    }

    /// Working directory, if one was captured.
    pub fn working_dir(&self) -> Option<&str> {
        if self.working_dir.is_empty() {
            None
        } else {
            Some(&self.working_dir)
        }
    }

    /// Get output lines.
    pub fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.output.lines()
    }
}
