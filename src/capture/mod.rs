//! Output capture over scratch files.
//!
//! This module provides the file-based side channel used to recover a
//! command's result from a detached shell:
//! - Dispatch line construction
//! - Settle delay
//! - Read-back and cleanup of scratch files
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use tmux_relay::capture::{build_dispatch_line, read_and_clear, CaptureFiles, CaptureId};
//!
//! let files = CaptureFiles::new(Path::new("tmp"), "relay_term", CaptureId::generate());
//! let line = build_dispatch_line("ls -la", &files);
//! // ... send `line` to the shell, wait ...
//! let result = read_and_clear(&files);
//! println!("exit {}: {}", result.exit_code, result.output);
//! ```

mod protocol;
mod result;

pub use protocol::{
    build_dispatch_line, clear, ensure_dir, purge_dir, read_and_clear, settle, CaptureFiles,
    CaptureId,
};
pub use result::{CommandResult, ExitCode};
