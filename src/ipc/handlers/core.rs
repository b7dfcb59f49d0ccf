use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let data = state.session.data();
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "signedIn": state.session.auth().is_some(),
            "institutions": data.institutions().len(),
            "demand": data.demand().len(),
            "dataLoadedAt": data.loaded_at().map(|t| t.to_rfc3339()),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match state.open_workspace(&path) {
        Ok(()) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "institutions": state.session.data().institutions().len(),
                "demand": state.session.data().demand().len(),
                "seedCsvPath": state.config.seed.csv_path.to_string_lossy(),
                "seedPolicy": state.config.seed.policy,
            }),
        ),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_data_reload(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    if let Err(e) = state.reload_data() {
        return err(&req.id, "db_query_failed", format!("{e:#}"), None);
    }
    ok(
        &req.id,
        json!({
            "institutions": state.session.data().institutions().len(),
            "demand": state.session.data().demand().len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "data.reload" => Some(handle_data_reload(state, req)),
        _ => None,
    }
}
