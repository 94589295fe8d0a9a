//! Terminal multiplexer abstraction.
//!
//! Sessions live in an external multiplexer process, outside this process
//! tree. The [`Multiplexer`] trait is the seam the session manager talks
//! through; [`TmuxMultiplexer`] drives the `tmux` binary.

mod tmux;

pub use tmux::TmuxMultiplexer;

use async_trait::async_trait;
use tracing::warn;

use crate::Result;

/// Size of a session window in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Number of columns (width).
    pub cols: u16,
    /// Number of rows (height).
    pub rows: u16,
}

impl Geometry {
    /// Create a new Geometry with the given dimensions.
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

/// Backend hosting detached, named shell sessions.
///
/// Every call is a synchronous round trip to the backend; a nonzero exit
/// is reported as [`TerminalError::Backend`](crate::TerminalError::Backend).
#[async_trait]
pub trait Multiplexer: Send + Sync {
    /// Start a detached session named `name` running `shell`.
    async fn create_session(&self, name: &str, geometry: Geometry, shell: &str) -> Result<()>;

    /// Type `text` into the session followed by Enter.
    async fn send_line(&self, name: &str, text: &str) -> Result<()>;

    /// Terminate the session.
    async fn kill_session(&self, name: &str) -> Result<()>;

    /// Names of every session the backend currently hosts.
    async fn list_sessions(&self) -> Result<Vec<String>>;

    /// Kill every listed session whose name starts with `prefix`.
    ///
    /// Keeps going past individual failures and returns how many were
    /// killed.
    async fn kill_all(&self, prefix: &str) -> Result<usize> {
        let mut killed = 0;
        for name in self.list_sessions().await? {
            if !name.starts_with(prefix) {
                continue;
            }
            match self.kill_session(&name).await {
                Ok(()) => killed += 1,
                Err(e) => warn!(session = %name, error = %e, "failed to kill session"),
            }
        }
        Ok(killed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TerminalError;
    use std::sync::Mutex;

    #[test]
    fn test_geometry_default() {
        let g = Geometry::default();
        assert_eq!(g.cols, 80);
        assert_eq!(g.rows, 24);
        assert_eq!(g, Geometry::new(80, 24));
    }

    struct Listed {
        names: Vec<&'static str>,
        killed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Multiplexer for Listed {
        async fn create_session(&self, _: &str, _: Geometry, _: &str) -> Result<()> {
            Ok(())
        }

        async fn send_line(&self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }

        async fn kill_session(&self, name: &str) -> Result<()> {
            if name.ends_with("stuck") {
                return Err(TerminalError::backend("kill-session", "refused"));
            }
            self.killed.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn list_sessions(&self) -> Result<Vec<String>> {
            Ok(self.names.iter().map(|s| s.to_string()).collect())
        }
    }

    #[tokio::test]
    async fn test_kill_all_filters_prefix_and_continues() {
        let mux = Listed {
            names: vec!["relay_a", "other", "relay_stuck", "relay_b"],
            killed: Mutex::new(Vec::new()),
        };

        let killed = mux.kill_all("relay_").await.unwrap();
        assert_eq!(killed, 2);
        assert_eq!(*mux.killed.lock().unwrap(), vec!["relay_a", "relay_b"]);
    }
}
