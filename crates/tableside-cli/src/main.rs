//! Tableside CLI - session management for the Tableside restaurant API.
//!
//! Logs in, shows who the current token belongs to and how long it has
//! left, and refreshes or drops the stored session.

mod commands;

use std::io;
use std::path::Path;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tableside_core::{ApiClient, Config};

use commands::Command;

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "tableside.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`), and to a
/// daily rolling file in `log_dir` at debug level.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_filter(filter);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new("tableside_core=debug,tableside=debug"));

            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(stderr_layer).init();
            None
        }
    }
}

fn print_usage() {
    eprintln!("Usage: tableside <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  login [username]   Log in and store the session token");
    eprintln!("  logout             Forget the stored session token");
    eprintln!("  whoami             Show the user behind the current token");
    eprintln!("  status             Show token expiry without contacting the server");
    eprintln!("  refresh            Ask the server for a fresh token");
    eprintln!("  register           Create a new account");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Some(command) => command,
        None => {
            print_usage();
            std::process::exit(2);
        }
    };

    let mut config = Config::load()?;
    let log_dir = config.cache_dir().ok();
    if let Some(ref dir) = log_dir {
        let _ = std::fs::create_dir_all(dir);
    }
    let log_guard = init_tracing(log_dir.as_deref());
    info!(command = ?command, "Tableside CLI starting");

    let client = ApiClient::from_config(&config)?;
    let result = commands::run(command, &client, &mut config).await;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        // Flush the file log before exiting
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}
