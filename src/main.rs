mod analytics;
mod auth;
mod config;
mod db;
mod export;
mod filters;
mod ipc;
mod logging;
mod model;
mod nav;
mod records;
mod search;
mod seed;
mod session;

use std::io::{self, BufRead, Write};

fn main() {
    if let Err(e) = logging::init() {
        eprintln!("{e:#}");
    }

    let mut state = ipc::AppState::default();
    if let Some(ws) = config::workspace_from_env() {
        if let Err(e) = state.open_workspace(&ws) {
            tracing::warn!(
                workspace = %ws.to_string_lossy(),
                code = e.code(),
                error = %e,
                "could not open workspace from environment"
            );
        }
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

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                tracing::warn!(error = %e, "undecodable request line");
                ipc::bad_json(e.to_string())
            }
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
