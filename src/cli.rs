//! Command-line interface for tmux-relay.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Caller id used when `--caller` is not given.
pub const DEFAULT_CALLER: &str = "console";

/// Command-line arguments.
#[derive(Debug, Clone)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Identity the console speaks as.
    pub caller: String,
    /// Scratch directory override.
    pub scratch_dir: Option<PathBuf>,
    /// Settle delay override in milliseconds.
    pub settle_ms: Option<u64>,
    /// Kill leftover sessions from an earlier run before serving.
    pub kill_orphans: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: None,
            caller: DEFAULT_CALLER.to_string(),
            scratch_dir: None,
            settle_ms: None,
            kill_orphans: false,
            log_level: None,
            version: false,
            help: false,
        }
    }
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('u') | Long("caller") => {
                let value: String = parser.value()?.parse()?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidValue("caller", value));
                }
                result.caller = value;
            }
            Short('s') | Long("scratch-dir") => {
                result.scratch_dir = Some(parser.value()?.parse()?);
            }
            Long("settle-ms") => {
                let value: String = parser.value()?.parse()?;
                result.settle_ms = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("settle-ms", value))?,
                );
            }
            Long("kill-orphans") => {
                result.kill_orphans = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"tmux-relay {version}
Persistent per-user shells in tmux, driven one command at a time

USAGE:
    tmux-relay [OPTIONS]

Reads one message per line from stdin as the given caller and prints the
reply. `terminal on` opens a session, `terminal off` closes it, anything
else runs as a command in the open session.

OPTIONS:
    -c, --config <FILE>       Path to configuration file (JSON)
    -u, --caller <ID>         Caller identity [default: console]
    -s, --scratch-dir <DIR>   Directory for capture files [default: tmp]
        --settle-ms <MS>      Wait before reading results [default: 1500]
        --kill-orphans        Kill leftover relay sessions at startup
    -l, --log-level <LVL>     Log level (error, warn, info, debug, trace)
    -h, --help                Print help
    -V, --version             Print version

ENVIRONMENT VARIABLES:
    TMUX_RELAY_SCRATCH_DIR    Scratch directory (overrides config)
    TMUX_RELAY_SETTLE_MS      Settle delay (overrides config)
    TMUX_RELAY_TMUX           tmux binary (overrides config)
    TMUX_RELAY_LOG_LEVEL      Log level (overrides config)
    RUST_LOG                  Alternative log level setting

EXAMPLES:
    # Talk to a shell as "alice"
    tmux-relay -u alice

    # Slow commands: give them three seconds
    tmux-relay --settle-ms 3000

    # Start with config file
    tmux-relay -c /etc/tmux-relay/config.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("tmux-relay {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("tmux-relay")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert_eq!(result.caller, "console");
        assert!(result.config.is_none());
        assert!(result.settle_ms.is_none());
        assert!(!result.kill_orphans);
    }

    #[test]
    fn test_caller() {
        let result = parse_args_from(args(&["-u", "alice"])).unwrap();
        assert_eq!(result.caller, "alice");

        let result = parse_args_from(args(&["--caller", "bob"])).unwrap();
        assert_eq!(result.caller, "bob");
    }

    #[test]
    fn test_empty_caller_rejected() {
        assert!(parse_args_from(args(&["-u", "  "])).is_err());
    }

    #[test]
    fn test_config_file() {
        let result = parse_args_from(args(&["-c", "/etc/relay.json"])).unwrap();
        assert_eq!(result.config, Some(PathBuf::from("/etc/relay.json")));
    }

    #[test]
    fn test_scratch_and_settle() {
        let result =
            parse_args_from(args(&["-s", "/var/tmp/relay", "--settle-ms", "250"])).unwrap();
        assert_eq!(result.scratch_dir, Some(PathBuf::from("/var/tmp/relay")));
        assert_eq!(result.settle_ms, Some(250));
    }

    #[test]
    fn test_invalid_settle() {
        assert!(parse_args_from(args(&["--settle-ms", "soon"])).is_err());
    }

    #[test]
    fn test_kill_orphans() {
        let result = parse_args_from(args(&["--kill-orphans"])).unwrap();
        assert!(result.kill_orphans);
    }

    #[test]
    fn test_help_and_version() {
        assert!(parse_args_from(args(&["-h"])).unwrap().help);
        assert!(parse_args_from(args(&["--help"])).unwrap().help);
        assert!(parse_args_from(args(&["-V"])).unwrap().version);
        assert!(parse_args_from(args(&["--version"])).unwrap().version);
    }

    #[test]
    fn test_log_level() {
        let result = parse_args_from(args(&["-l", "debug"])).unwrap();
        assert_eq!(result.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_unexpected_positional() {
        let result = parse_args_from(args(&["stray"]));
        assert!(matches!(result, Err(ArgsError::UnexpectedArgument(_))));
    }
}
