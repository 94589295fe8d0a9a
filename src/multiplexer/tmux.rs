//! tmux-backed multiplexer.

use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use super::{Geometry, Multiplexer};
use crate::error::TerminalError;
use crate::Result;

/// Drives the `tmux` command-line client.
#[derive(Debug, Clone)]
pub struct TmuxMultiplexer {
    program: String,
}

impl TmuxMultiplexer {
    /// Use `tmux` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("tmux")
    }

    /// Use a specific tmux binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, operation: &'static str, args: &[&str]) -> Result<Output> {
        trace!(program = %self.program, ?args, "running multiplexer");
        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TerminalError::backend(operation, format!("failed to launch {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TerminalError::backend(
                operation,
                format!("{} ({})", stderr.trim(), output.status),
            ));
        }
        Ok(output)
    }
}

impl Default for TmuxMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Exact-match session target. Without `=`, tmux falls back to prefix and
/// pattern matching when the named session is gone.
fn session_target(name: &str) -> String {
    format!("={}", name)
}

/// Exact-match session target for pane commands, addressing its active
/// window.
fn pane_target(name: &str) -> String {
    format!("={}:", name)
}

/// tmux reports a missing server as an error; that just means no sessions.
fn is_no_server(detail: &str) -> bool {
    detail.contains("no server running") || detail.contains("error connecting to")
}

#[async_trait]
impl Multiplexer for TmuxMultiplexer {
    async fn create_session(&self, name: &str, geometry: Geometry, shell: &str) -> Result<()> {
        let cols = geometry.cols.to_string();
        let rows = geometry.rows.to_string();
        self.run(
            "new-session",
            &["new-session", "-d", "-s", name, "-x", &cols, "-y", &rows, shell],
        )
        .await?;
        debug!(session = %name, "tmux session created");
        Ok(())
    }

    async fn send_line(&self, name: &str, text: &str) -> Result<()> {
        let target = pane_target(name);
        self.run("send-keys", &["send-keys", "-t", &target, text, "Enter"])
            .await?;
        Ok(())
    }

    async fn kill_session(&self, name: &str) -> Result<()> {
        let target = session_target(name);
        self.run("kill-session", &["kill-session", "-t", &target])
            .await?;
        debug!(session = %name, "tmux session killed");
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        match self
            .run("list-sessions", &["list-sessions", "-F", "#{session_name}"])
            .await
        {
            Ok(output) => Ok(String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect()),
            Err(TerminalError::Backend { detail, .. }) if is_no_server(&detail) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_program() {
        assert_eq!(TmuxMultiplexer::default().program(), "tmux");
        assert_eq!(TmuxMultiplexer::with_program("/usr/bin/tmux").program(), "/usr/bin/tmux");
    }

    #[test]
    fn test_targets_match_exactly() {
        assert_eq!(session_target("relay_terminal_u1_20240101120000"), "=relay_terminal_u1_20240101120000");
        assert_eq!(pane_target("relay_terminal_u1_20240101120000"), "=relay_terminal_u1_20240101120000:");
    }

    #[test]
    fn test_is_no_server() {
        assert!(is_no_server("no server running on /tmp/tmux-0/default"));
        assert!(is_no_server("error connecting to /tmp/tmux-1000/default (No such file or directory)"));
        assert!(!is_no_server("can't find session: x"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_backend_error() {
        let mux = TmuxMultiplexer::with_program("/nonexistent/tmux-relay-test-binary");
        let err = mux
            .create_session("x", Geometry::default(), "/bin/sh")
            .await
            .unwrap_err();
        assert!(matches!(err, TerminalError::Backend { operation: "new-session", .. }));
    }

    #[tokio::test]
    #[ignore] // needs a tmux binary
    async fn test_tmux_lifecycle() {
        let mux = TmuxMultiplexer::new();
        let name = format!("tmux_relay_test_{}", std::process::id());

        mux.create_session(&name, Geometry::default(), "/bin/sh")
            .await
            .unwrap();
        assert!(mux.list_sessions().await.unwrap().contains(&name));

        mux.send_line(&name, "true").await.unwrap();
        mux.kill_session(&name).await.unwrap();
        assert!(!mux.list_sessions().await.unwrap().contains(&name));
    }

    #[tokio::test]
    #[ignore] // needs a tmux binary
    async fn test_kill_does_not_match_prefix() {
        let mux = TmuxMultiplexer::new();
        let short = format!("tmux_relay_prefix_{}", std::process::id());
        let long = format!("{}_longer", short);

        mux.create_session(&long, Geometry::default(), "/bin/sh")
            .await
            .unwrap();

        assert!(mux.kill_session(&short).await.is_err());
        assert!(mux.send_line(&short, "true").await.is_err());
        assert!(mux.list_sessions().await.unwrap().contains(&long));

        mux.kill_session(&long).await.unwrap();
    }
}
