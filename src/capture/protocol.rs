//! Scratch-file capture protocol.
//!
//! The orchestrator has no pipe into the detached shell, so each command is
//! wrapped in a line that writes its merged output, `$?` and `pwd` into three
//! files tagged with a random capture id. After the settle delay those files
//! are read back and removed.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use super::result::{CommandResult, ExitCode};
use crate::error::TerminalError;

/// Random token namespacing one command's scratch files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaptureId(String);

impl CaptureId {
    /// Generate a fresh id from 8 random bytes.
    pub fn generate() -> Self {
        Self(hex::encode(rand::random::<[u8; 8]>()))
    }

    /// Wrap an existing token.
    ///
    /// This is primarily for testing.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three scratch files of one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFiles {
    pub id: CaptureId,
    /// Merged stdout and stderr.
    pub output: PathBuf,
    /// Exit status text.
    pub exit: PathBuf,
    /// Working directory text.
    pub pwd: PathBuf,
}

impl CaptureFiles {
    /// Lay out the files for `id` under `dir`.
    pub fn new(dir: &Path, prefix: &str, id: CaptureId) -> Self {
        Self {
            output: dir.join(format!("{}_out_{}", prefix, id)),
            exit: dir.join(format!("{}_exit_{}", prefix, id)),
            pwd: dir.join(format!("{}_pwd_{}", prefix, id)),
            id,
        }
    }

    pub fn paths(&self) -> [&Path; 3] {
        [&self.output, &self.exit, &self.pwd]
    }
}

/// Build the line typed into the shell for `command`.
///
/// The command reaches `eval` as one single-quoted word, so a trailing `;`,
/// `&` or `# comment` cannot unbalance the surrounding group. `eval` and the
/// brace group both run in the session shell, which keeps `cd` and exported
/// variables. `echo $?` follows the group directly so it records the user
/// command's status rather than that of a redirection.
pub fn build_dispatch_line(command: &str, files: &CaptureFiles) -> String {
    format!(
        "clear 2>/dev/null; {{ eval {}; }} > {} 2>&1; echo $? > {}; pwd > {}",
        shell_quote(command),
        shell_quote_path(&files.output),
        shell_quote_path(&files.exit),
        shell_quote_path(&files.pwd),
    )
}

/// Wait for a dispatched command to settle.
///
/// The backend never signals completion, so this is a fixed delay: long
/// commands will be read before they finish.
pub async fn settle(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Read the capture files back and delete them.
///
/// Missing files mean "no data". Read and delete failures are logged and
/// never returned.
pub fn read_and_clear(files: &CaptureFiles) -> CommandResult {
    let output = read_text(&files.output)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_default();
    let exit_code = read_text(&files.exit)
        .map(|s| ExitCode::parse(&s))
        .unwrap_or_default();
    let working_dir = read_text(&files.pwd)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    clear(files);

    debug!(
        capture = %files.id,
        exit_code = %exit_code,
        output_len = output.len(),
        "capture collected"
    );

    CommandResult {
        output,
        exit_code,
        working_dir,
    }
}

/// Delete the capture files, ignoring ones that were never written.
pub fn clear(files: &CaptureFiles) {
    for path in files.paths() {
        remove_quietly(path);
    }
}

/// Create the scratch directory if needed.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// Remove every capture file under `dir` carrying `prefix`.
///
/// Returns how many files were removed. Failures on individual files are
/// logged and skipped.
pub fn purge_dir(dir: &Path, prefix: &str) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot list scratch directory");
            return 0;
        }
    };

    let marker = format!("{}_", prefix);
    let mut removed = 0;
    for entry in entries.flatten() {
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        let ours = entry.file_name().to_string_lossy().starts_with(&marker);
        if !(is_file && ours) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %entry.path().display(), error = %e, "failed to purge scratch file"),
        }
    }
    removed
}

fn read_text(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(source) => {
            let err = TerminalError::CaptureRead {
                path: path.to_path_buf(),
                source,
            };
            warn!(error = %err, "treating capture file as missing");
            None
        }
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            let err = TerminalError::CaptureRead {
                path: path.to_path_buf(),
                source,
            };
            warn!(error = %err, "failed to remove capture file");
        }
    }
}

fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

fn shell_quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}
