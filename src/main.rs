//! tmux-relay binary entry point.
//!
//! A console stand-in for a chat transport: every stdin line is a message
//! from one caller, every reply goes to stdout.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tmux_relay::cli::{self, Args};
use tmux_relay::config::Config;
use tmux_relay::{logging, CallerId, IdleReaper, Router, SessionManager, TmuxMultiplexer};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load(&args)?;
    if let Some(dir) = exe_dir() {
        config.resolve_scratch_dir(&dir);
    }

    if logging::init_with_filter(config.log_filter()).is_err() {
        eprintln!("warning: logging already initialized");
    }

    info!("tmux-relay v{}", env!("CARGO_PKG_VERSION"));
    info!(
        scratch_dir = %config.capture.scratch_dir.display(),
        settle_ms = config.capture.settle_ms,
        idle_timeout_secs = config.session.idle_timeout_secs,
        "configuration loaded"
    );

    let mux = Arc::new(TmuxMultiplexer::with_program(config.multiplexer.program.clone()));
    let manager = Arc::new(
        SessionManager::new(mux, config.manager_config()).with_filter(config.safety_filter()?),
    );

    if config.session.kill_orphans {
        match manager.kill_orphans().await {
            Ok(killed) => info!(killed, "orphan sweep finished"),
            Err(e) => warn!(error = %e, "orphan sweep failed"),
        }
    }

    let mut reaper = IdleReaper::new(Arc::clone(&manager), config.reap_interval());
    reaper.start();

    let router = Router::new(Arc::clone(&manager));
    let caller = CallerId::new(args.caller.clone());
    info!(caller = %caller, "reading messages from stdin");

    run_console(&router, &caller).await;

    reaper.stop().await;
    let report = manager.shutdown().await;
    info!(closed = report.closed, failed = report.failed, "shutdown complete");
    Ok(())
}

async fn run_console(router: &Router, caller: &CallerId) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(text)) => {
                    if text.trim().is_empty() {
                        continue;
                    }
                    match router.handle(caller, &text).await {
                        Some(reply) => println!("{}\n", reply),
                        None if matches!(router.manager().session_name(caller), Ok(None)) => {
                            println!("⚠️ No active terminal session, send `terminal on` first\n")
                        }
                        None => {}
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "failed to read stdin");
                    break;
                }
            },
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
        }
    }
}

fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
}
