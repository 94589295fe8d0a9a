//! Chat-facing routing and replies.
//!
//! A chat transport hands over `(caller, text)`; the router decides whether
//! the text opens or closes a terminal or is a command, runs it through the
//! [`SessionManager`], and renders the outcome as a short reply.

use std::sync::Arc;
use std::time::Duration;

use crate::capture::CommandResult;
use crate::error::TerminalError;
use crate::manager::SessionManager;
use crate::session::CallerId;

/// What a chat message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    /// `terminal on`
    Open,
    /// `terminal off`
    Close,
    /// Starts like `terminal on` / `terminal off` but is not exactly either,
    /// such as `terminal on now` or `terminal offline`. Never run.
    Ignored,
    /// Anything else: a shell command.
    Command(&'a str),
}

impl<'a> Request<'a> {
    /// Classify a chat message.
    ///
    /// `terminal on` / `terminal off` are matched case-insensitively, with
    /// an optional leading `/` and any amount of whitespace. Text that only
    /// begins with one of them is [`Request::Ignored`].
    pub fn parse(text: &'a str) -> Self {
        let trimmed = text.trim();
        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let mut words = body.split_whitespace();

        match (words.next(), words.next()) {
            (Some(group), Some(action)) if group.eq_ignore_ascii_case("terminal") => {
                let action = action.to_ascii_lowercase();
                let alone = words.next().is_none();
                match action.as_str() {
                    "on" if alone => Request::Open,
                    "off" if alone => Request::Close,
                    a if a.starts_with("on") || a.starts_with("off") => Request::Ignored,
                    _ => Request::Command(trimmed),
                }
            }
            _ => Request::Command(trimmed),
        }
    }
}

/// Routes chat messages to a session manager.
#[derive(Clone)]
pub struct Router {
    manager: Arc<SessionManager>,
}

impl Router {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Handle one message and produce the reply, if any.
    ///
    /// Ordinary chat from a caller without a terminal is not addressed to
    /// us, so it gets no reply.
    pub async fn handle(&self, caller: &CallerId, text: &str) -> Option<String> {
        match Request::parse(text) {
            Request::Open => Some(render_open(
                self.manager.open(caller).await,
                self.manager.config().idle_timeout,
            )),
            Request::Close => Some(render_close(self.manager.close(caller).await)),
            Request::Ignored => None,
            Request::Command(command) => match self.manager.execute(caller, command).await {
                Err(TerminalError::NoActiveSession(_)) => None,
                Err(TerminalError::EmptyCommand) => None,
                outcome => Some(render_execute(outcome)),
            },
        }
    }
}

/// Reply for an open attempt.
pub fn render_open(outcome: crate::Result<String>, idle_timeout: Duration) -> String {
    match outcome {
        Ok(_) => format!(
            "🟢 Terminal session started\n\
             Send commands directly to run them\n\
             Use `/terminal off` to close the session\n\
             ⚠️ Sessions close automatically after {} minutes without commands",
            idle_timeout.as_secs() / 60
        ),
        Err(TerminalError::AlreadyActive(_)) => "⚠️ You already have an active terminal session".to_string(),
        Err(_) => "❌ Failed to start terminal session".to_string(),
    }
}

/// Reply for a close attempt.
pub fn render_close(outcome: crate::Result<()>) -> String {
    match outcome {
        Ok(()) => "🔴 Terminal session closed".to_string(),
        Err(TerminalError::NoActiveSession(_)) => "⚠️ No active terminal session".to_string(),
        Err(_) => "❌ Terminal session closed, but the backend session could not be killed".to_string(),
    }
}

/// Reply for a command.
pub fn render_execute(outcome: crate::Result<CommandResult>) -> String {
    match outcome {
        Ok(result) => render_result(&result),
        Err(TerminalError::Blocked { .. }) => "⛔ Refused to run a potentially dangerous command".to_string(),
        Err(TerminalError::NoActiveSession(_)) => "⚠️ No active terminal session".to_string(),
        Err(TerminalError::EmptyCommand) => "⚠️ Nothing to run".to_string(),
        Err(e) => format!("❌ Command execution error: {}", e),
    }
}

/// Render a command's captured output, exit code and directory.
pub fn render_result(result: &CommandResult) -> String {
    let mut text = if result.has_output() {
        format!("📋 Command output:\n{}", result.output)
    } else {
        "📋 Command executed, no output".to_string()
    };

    if result.exit_code.is_failure() {
        text.push_str(&format!("\n⚠️ Exit code: {}", result.exit_code));
    }

    if let Some(dir) = result.working_dir() {
        text.push_str(&format!("\n📂 Working directory: {}", dir));
    }

    text
}
