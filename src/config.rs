//! Configuration management for tmux-relay.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::manager::ManagerConfig;
use crate::multiplexer::Geometry;
use crate::security::SafetyFilter;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session lifecycle settings.
    pub session: SessionSection,
    /// Scratch-file capture settings.
    pub capture: CaptureSection,
    /// Multiplexer backend settings.
    pub multiplexer: MultiplexerSection,
    /// Command filtering settings.
    pub security: SecuritySection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Session lifecycle section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Prefix of every backend session name.
    pub name_prefix: String,
    /// Inactivity after which a session is reaped.
    pub idle_timeout_secs: u64,
    /// How often the reaper scans for idle sessions.
    pub reap_interval_secs: u64,
    /// Shell started inside each session.
    pub shell: String,
    /// Window width.
    pub cols: u16,
    /// Window height.
    pub rows: u16,
    /// Kill leftover prefixed sessions from an earlier run at startup.
    pub kill_orphans: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            name_prefix: "relay_terminal".to_string(),
            idle_timeout_secs: 30 * 60,
            reap_interval_secs: 5 * 60,
            shell: "/bin/bash".to_string(),
            cols: 80,
            rows: 24,
            kill_orphans: false,
        }
    }
}

/// Capture section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSection {
    /// Directory holding scratch files. Relative paths are resolved by the
    /// binary against its own location.
    pub scratch_dir: PathBuf,
    /// Prefix of every scratch file name.
    pub file_prefix: String,
    /// Delay between dispatch and read-back, in milliseconds.
    pub settle_ms: u64,
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("tmp"),
            file_prefix: "relay_term".to_string(),
            settle_ms: 1500,
        }
    }
}

/// Multiplexer section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplexerSection {
    /// tmux binary to invoke.
    pub program: String,
}

impl Default for MultiplexerSection {
    fn default() -> Self {
        Self {
            program: "tmux".to_string(),
        }
    }
}

/// Security section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    /// Regexes denied on top of the built-in list.
    pub extra_patterns: Vec<String>,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a filter directive.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("TMUX_RELAY_SCRATCH_DIR") {
            if !dir.is_empty() {
                self.capture.scratch_dir = PathBuf::from(dir);
            }
        }

        if let Ok(ms) = std::env::var("TMUX_RELAY_SETTLE_MS") {
            if let Ok(ms) = ms.parse() {
                self.capture.settle_ms = ms;
            }
        }

        if let Ok(program) = std::env::var("TMUX_RELAY_TMUX") {
            if !program.is_empty() {
                self.multiplexer.program = program;
            }
        }

        if let Ok(level) = std::env::var("TMUX_RELAY_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref dir) = args.scratch_dir {
            self.capture.scratch_dir = dir.clone();
        }

        if let Some(ms) = args.settle_ms {
            self.capture.settle_ms = ms;
        }

        if args.kill_orphans {
            self.session.kill_orphans = true;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Reject settings the manager cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.name_prefix.is_empty()
            || !self
                .session
                .name_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Invalid(format!(
                "session.name_prefix must be non-empty [A-Za-z0-9_-]: '{}'",
                self.session.name_prefix
            )));
        }
        if self.session.cols == 0 || self.session.rows == 0 {
            return Err(ConfigError::Invalid("session geometry must be non-zero".into()));
        }
        if self.session.shell.trim().is_empty() {
            return Err(ConfigError::Invalid("session.shell must be set".into()));
        }
        if self.session.reap_interval_secs == 0 {
            return Err(ConfigError::Invalid("session.reap_interval_secs must be > 0".into()));
        }
        if self.capture.file_prefix.is_empty() || self.capture.file_prefix.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "capture.file_prefix is not a file name prefix: '{}'",
                self.capture.file_prefix
            )));
        }
        self.safety_filter()?;
        Ok(())
    }

    /// Resolve a relative scratch directory against `base`.
    pub fn resolve_scratch_dir(&mut self, base: &Path) {
        if self.capture.scratch_dir.is_relative() {
            self.capture.scratch_dir = base.join(&self.capture.scratch_dir);
        }
    }

    /// Settings for the session manager.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            name_prefix: self.session.name_prefix.clone(),
            geometry: Geometry::new(self.session.cols, self.session.rows),
            shell: self.session.shell.clone(),
            idle_timeout: Duration::from_secs(self.session.idle_timeout_secs),
            scratch_dir: self.capture.scratch_dir.clone(),
            file_prefix: self.capture.file_prefix.clone(),
            settle: Duration::from_millis(self.capture.settle_ms),
        }
    }

    /// Compile the command filter.
    pub fn safety_filter(&self) -> Result<SafetyFilter, ConfigError> {
        SafetyFilter::with_patterns(&self.security.extra_patterns).map_err(ConfigError::Pattern)
    }

    /// Interval between reaper scans.
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.session.reap_interval_secs)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// A deny pattern failed to compile.
    Pattern(regex::Error),
    /// A setting is out of range.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::Pattern(e) => write!(f, "invalid deny pattern: {}", e),
            Self::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
