use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, optional_str, require_mode, to_value};
use crate::ipc::types::{AppState, Request};
use crate::nav::AdminMode;
use crate::seed::{self, BatchPolicy};
use serde_json::{json, Value};
use std::path::PathBuf;

fn handle_seed_run(state: &mut AppState, req: &Request) -> Value {
    if let Err(e) = require_mode(state, req, AdminMode::DicSeeder) {
        return e;
    }
    let policy_raw = optional_str(req, "policy").unwrap_or_else(|| state.config.seed.policy.clone());
    let Some(policy) = BatchPolicy::parse(&policy_raw) else {
        return err(
            &req.id,
            "bad_params",
            "policy must be one of: best_effort, atomic, dry_run",
            Some(json!({ "policy": policy_raw })),
        );
    };
    let path = optional_str(req, "path")
        .map(PathBuf::from)
        .map(|p| match (&state.workspace, p.is_relative()) {
            (Some(ws), true) => ws.join(p),
            _ => p,
        })
        .unwrap_or_else(|| state.config.seed.csv_path.clone());
    let bytes = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                format!("failed to read {}: {}", path.to_string_lossy(), e),
                Some(json!({ "path": path.to_string_lossy() })),
            )
        }
    };
    let default_district = optional_str(req, "district")
        .or_else(|| state.session.district().map(str::to_string))
        .or_else(|| state.config.auth.default_district.clone());

    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let previous = match seed::previously_seeded(conn, &seed::sha256_hex(&bytes)) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let report = match seed::seed_companies(
        conn,
        &path.to_string_lossy(),
        &bytes,
        policy,
        default_district.as_deref(),
    ) {
        Ok(r) => r,
        Err(e) => return err(&req.id, e.code(), e.to_string(), None),
    };
    let mut result = match to_value(req, &report) {
        Ok(v) => v,
        Err(e) => return e,
    };
    result["previouslySeededAt"] = json!(previous);
    ok(&req.id, result)
}

fn handle_seed_runs(state: &mut AppState, req: &Request) -> Value {
    if let Err(e) = require_mode(state, req, AdminMode::DicSeeder) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match seed::list_seed_runs(conn) {
        Ok(runs) => ok(&req.id, json!({ "runs": runs })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "seed.run" => Some(handle_seed_run(state, req)),
        "seed.runs" => Some(handle_seed_runs(state, req)),
        _ => None,
    }
}
