//! # tmux-relay
//!
//! Persistent per-user shells hosted in tmux, driven one command at a time.
//!
//! Each caller gets a detached tmux session running a shell. Commands are
//! typed into that shell wrapped so their merged output, exit status and
//! working directory land in scratch files, which are read back after a
//! fixed settle delay. No PTY is ever attached to the orchestrating
//! process.
//!
//! ## Features
//!
//! - **Session Management**: one shell per caller, reaped when idle
//! - **Safety Filter**: regex denylist screening every command
//! - **File Capture**: output, `$?` and `pwd` recovered out of band
//! - **Chat Routing**: `terminal on` / `terminal off` / commands to replies
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tmux_relay::{CallerId, ManagerConfig, SessionManager, TmuxMultiplexer};
//!
//! #[tokio::main]
//! async fn main() -> tmux_relay::Result<()> {
//!     tmux_relay::logging::try_init().ok();
//!
//!     let manager = SessionManager::new(Arc::new(TmuxMultiplexer::new()), ManagerConfig::default());
//!     let caller = CallerId::from("alice");
//!
//!     manager.open(&caller).await?;
//!     let result = manager.execute(&caller, "echo 5").await?;
//!     println!("{} (exit {}) in {}", result.output, result.exit_code, result.working_dir);
//!     manager.close(&caller).await?;
//!
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod multiplexer;
pub mod router;
pub mod security;
pub mod session;

// Re-export commonly used types
pub use capture::{CommandResult, ExitCode};
pub use error::{Result, TerminalError};
pub use manager::{ManagerConfig, SessionManager, ShutdownReport};
pub use multiplexer::{Geometry, Multiplexer, TmuxMultiplexer};
pub use router::{Request, Router};
pub use security::{is_safe, SafetyFilter};
pub use session::{CallerId, IdleReaper, Session, SessionStore};
