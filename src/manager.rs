//! Session manager.
//!
//! Ties the store, safety filter, capture protocol and multiplexer together
//! into the caller-facing operations: open, close, execute and shutdown.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::capture::{self, CaptureFiles, CaptureId, CommandResult};
use crate::error::TerminalError;
use crate::multiplexer::{Geometry, Multiplexer};
use crate::security::{sanitize_for_display, SafetyFilter};
use crate::session::{session_name, CallerId, Session, SessionStore};
use crate::Result;

/// Default inactivity before a session is reaped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default wait between dispatch and read-back.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1500);

/// Runtime settings of a [`SessionManager`].
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub name_prefix: String,
    pub geometry: Geometry,
    pub shell: String,
    pub idle_timeout: Duration,
    pub scratch_dir: PathBuf,
    pub file_prefix: String,
    pub settle: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            name_prefix: "relay_terminal".to_string(),
            geometry: Geometry::default(),
            shell: "/bin/bash".to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            scratch_dir: PathBuf::from("tmp"),
            file_prefix: "relay_term".to_string(),
            settle: DEFAULT_SETTLE,
        }
    }
}

/// What `shutdown` cleaned up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Sessions killed cleanly.
    pub closed: usize,
    /// Sessions whose kill failed; they are gone from the store anyway.
    pub failed: usize,
    /// Scratch files removed.
    pub purged_files: usize,
}

/// Orchestrates per-caller shell sessions.
///
/// `open`, `close`, reaping and shutdown are serialized through one async
/// lock so the reaper never races a caller's open or close. `execute` does
/// not take it: two overlapping commands for the *same* caller can
/// interleave inside the shell, so callers must wait for one command's
/// result before sending the next.
pub struct SessionManager {
    store: Arc<SessionStore>,
    mux: Arc<dyn Multiplexer>,
    filter: SafetyFilter,
    config: ManagerConfig,
    lifecycle: Mutex<()>,
}

impl SessionManager {
    /// Create a manager with an empty store and the built-in denylist.
    pub fn new(mux: Arc<dyn Multiplexer>, config: ManagerConfig) -> Self {
        Self::with_store(Arc::new(SessionStore::new()), mux, config)
    }

    /// Create a manager over an existing store.
    ///
    /// A relative scratch directory is resolved against the current
    /// directory here, since the session shell would otherwise resolve it
    /// against its own, moving, working directory.
    pub fn with_store(
        store: Arc<SessionStore>,
        mux: Arc<dyn Multiplexer>,
        mut config: ManagerConfig,
    ) -> Self {
        config.scratch_dir = absolute_dir(config.scratch_dir);
        Self {
            store,
            mux,
            filter: SafetyFilter::new(),
            config,
            lifecycle: Mutex::new(()),
        }
    }

    /// Replace the command filter.
    pub fn with_filter(mut self, filter: SafetyFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Backend name of the caller's session, if any.
    pub fn session_name(&self, caller: &CallerId) -> Result<Option<String>> {
        Ok(self.store.get(caller)?.map(|s| s.name))
    }

    /// Number of open sessions.
    pub fn active_sessions(&self) -> usize {
        self.store.count()
    }

    /// Start a session for `caller`.
    ///
    /// Returns the backend session name. Nothing is registered if the
    /// backend fails.
    pub async fn open(&self, caller: &CallerId) -> Result<String> {
        let _guard = self.lifecycle.lock().await;

        if self.store.contains(caller)? {
            return Err(TerminalError::AlreadyActive(caller.to_string()));
        }

        let name = session_name(&self.config.name_prefix, caller);
        if let Err(e) = self
            .mux
            .create_session(&name, self.config.geometry, &self.config.shell)
            .await
        {
            error!(caller = %caller, session = %name, error = %e, "failed to start terminal session");
            return Err(e);
        }

        if let Err(e) = self.store.insert(Session::new(caller.clone(), name.clone())) {
            // Someone else registered the caller through the shared store.
            if let Err(kill_err) = self.mux.kill_session(&name).await {
                warn!(session = %name, error = %kill_err, "failed to discard unregistered session");
            }
            return Err(e);
        }

        info!(caller = %caller, session = %name, "terminal session opened");
        Ok(name)
    }

    /// End the caller's session.
    ///
    /// The session is dropped from the store before the backend is asked to
    /// kill it; a `Backend` error here means the session is closed from our
    /// side but the backend may still host it.
    pub async fn close(&self, caller: &CallerId) -> Result<()> {
        let _guard = self.lifecycle.lock().await;

        let session = self
            .store
            .remove(caller)?
            .ok_or_else(|| TerminalError::NoActiveSession(caller.to_string()))?;

        match self.mux.kill_session(&session.name).await {
            Ok(()) => {
                info!(caller = %caller, session = %session.name, "terminal session closed");
                Ok(())
            }
            Err(e) => {
                error!(caller = %caller, session = %session.name, error = %e, "failed to kill terminal session");
                Err(e)
            }
        }
    }

    /// Run one command in the caller's session and collect its result.
    ///
    /// Liveness is bumped before dispatch, so a command that fails to send
    /// still counts as activity. The result is read after a fixed settle
    /// delay; commands running longer than that come back partial.
    pub async fn execute(&self, caller: &CallerId, raw: &str) -> Result<CommandResult> {
        if !self.store.contains(caller)? {
            return Err(TerminalError::NoActiveSession(caller.to_string()));
        }

        let command = raw.trim();
        if command.is_empty() {
            return Err(TerminalError::EmptyCommand);
        }

        if let Err(reason) = self.filter.check(command) {
            warn!(
                caller = %caller,
                command = %sanitize_for_display(command),
                rule = %reason,
                "blocked dangerous command"
            );
            return Err(TerminalError::Blocked {
                reason: reason.rule,
            });
        }

        let name = self.store.touch(caller)?;

        let files = CaptureFiles::new(
            &self.config.scratch_dir,
            &self.config.file_prefix,
            CaptureId::generate(),
        );
        capture::ensure_dir(&self.config.scratch_dir).map_err(|e| {
            TerminalError::Execution(format!(
                "cannot create scratch directory {}: {}",
                self.config.scratch_dir.display(),
                e
            ))
        })?;

        let line = capture::build_dispatch_line(command, &files);
        debug!(caller = %caller, session = %name, capture = %files.id, "dispatching command");

        if let Err(e) = self.mux.send_line(&name, &line).await {
            capture::clear(&files);
            error!(caller = %caller, session = %name, error = %e, "failed to dispatch command");
            return Err(TerminalError::Execution(e.to_string()));
        }

        capture::settle(self.config.settle).await;
        Ok(capture::read_and_clear(&files))
    }

    /// Tear down every session idle longer than the timeout at `now`.
    ///
    /// Returns the callers reaped. Backend failures are logged and do not
    /// stop the sweep.
    pub async fn reap_expired(&self, now: Instant) -> Result<Vec<CallerId>> {
        let _guard = self.lifecycle.lock().await;

        let expired = self.store.list_expired(now, self.config.idle_timeout)?;
        let mut reaped = Vec::with_capacity(expired.len());

        for caller in expired {
            let Some(session) = self.store.remove(&caller)? else {
                continue;
            };
            if let Err(e) = self.mux.kill_session(&session.name).await {
                warn!(caller = %caller, session = %session.name, error = %e, "failed to kill idle session");
            }
            info!(
                caller = %caller,
                session = %session.name,
                idle_secs = now.saturating_duration_since(session.last_active).as_secs(),
                "reaped idle terminal session"
            );
            reaped.push(caller);
        }

        Ok(reaped)
    }

    /// Kill every session and purge the scratch directory.
    ///
    /// The purge removes only regular files named with the configured
    /// `file_prefix`; anything else in the scratch directory is left in
    /// place. Meant to run once at process teardown.
    pub async fn shutdown(&self) -> ShutdownReport {
        let _guard = self.lifecycle.lock().await;

        let sessions = self.store.drain().unwrap_or_else(|e| {
            error!(error = %e, "cannot drain session store");
            Vec::new()
        });

        let mut report = ShutdownReport::default();
        for session in sessions {
            match self.mux.kill_session(&session.name).await {
                Ok(()) => report.closed += 1,
                Err(e) => {
                    warn!(caller = %session.caller, session = %session.name, error = %e, "failed to kill session on shutdown");
                    report.failed += 1;
                }
            }
        }

        report.purged_files = capture::purge_dir(&self.config.scratch_dir, &self.config.file_prefix);
        info!(
            closed = report.closed,
            failed = report.failed,
            purged_files = report.purged_files,
            "session manager shut down"
        );
        report
    }

    /// Kill backend sessions carrying our prefix that the store does not
    /// know about, such as leftovers from a previous process.
    pub async fn kill_orphans(&self) -> Result<usize> {
        let _guard = self.lifecycle.lock().await;

        let marker = format!("{}_", self.config.name_prefix);
        let known: HashSet<String> = self.store.session_names()?.into_iter().collect();
        if known.is_empty() {
            let killed = self.mux.kill_all(&marker).await?;
            info!(killed, "killed orphaned terminal sessions");
            return Ok(killed);
        }

        let mut killed = 0;
        for name in self.mux.list_sessions().await? {
            if !name.starts_with(&marker) || known.contains(&name) {
                continue;
            }
            match self.mux.kill_session(&name).await {
                Ok(()) => killed += 1,
                Err(e) => warn!(session = %name, error = %e, "failed to kill orphaned session"),
            }
        }
        info!(killed, "killed orphaned terminal sessions");
        Ok(killed)
    }
}

fn absolute_dir(dir: PathBuf) -> PathBuf {
    if dir.is_absolute() {
        return dir;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(dir),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot resolve relative scratch directory");
            dir
        }
    }
}
