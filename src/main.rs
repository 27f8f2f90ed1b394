mod calc;
mod dataset;
mod ipc;
mod session;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "studiod")]
#[command(about = "Analytics sidecar for the studio performance dashboard", long_about = None)]
struct Cli {
    /// CSV snapshot of class sessions
    #[arg(long, default_value = "classes_cleaned.csv")]
    data: PathBuf,

    /// Log filter when RUST_LOG is unset, e.g. "studiod=debug"
    #[arg(long, default_value = "info")]
    log_filter: String,
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // stdout carries the JSON protocol; all logging goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_filter.clone())),
        )
        .with_writer(io::stderr)
        .init();

    let mut state = ipc::AppState::new(cli.data);
    if state.passcode.from_fallback {
        warn!(
            "{} is unset; authenticating against the built-in default passcode",
            session::PASSCODE_ENV
        );
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply with an id we never parsed.
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
